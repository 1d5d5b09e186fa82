//! Property-based tests for lined
//!
//! These use proptest to check the line-editing invariants against a simple
//! in-memory model: a file is its lines joined by '\n'.

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use lined::LineEdit;
use lined::rewriter::edit_line;
use lined::scanner::count_lines;
use lined::search::{self, count_occurrences};

use proptest::prelude::*;
use proptest::sample::Index;

const MAX_LINE: usize = 1024;

fn write_fixture(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("test.txt");
    fs::write(&file_path, content).unwrap();
    (temp_dir, file_path)
}

fn lines_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z]{1,8}", 1..20)
}

// ============================================================================
// Line counting
// ============================================================================

proptest! {
    /// An empty file has no lines; otherwise lines = newlines + 1
    #[test]
    fn prop_line_count_formula(content in "[a-z\n]{0,100}") {
        let (_dir, path) = write_fixture(&content);
        let expected = if content.is_empty() {
            0
        } else {
            content.matches('\n').count() + 1
        };
        prop_assert_eq!(count_lines(&path).unwrap(), expected);
    }
}

// ============================================================================
// Line edits match the model
// ============================================================================

proptest! {
    /// Deleting line k removes exactly that line and nothing else
    #[test]
    fn prop_delete_removes_one_line(lines in lines_strategy(), idx in any::<Index>()) {
        let (_dir, path) = write_fixture(&lines.join("\n"));
        let k = idx.index(lines.len()) + 1;

        let after = edit_line(&path, k, LineEdit::Delete, lines.len()).unwrap();

        let mut expected = lines.clone();
        expected.remove(k - 1);
        prop_assert_eq!(after, lines.len() - 1);
        prop_assert_eq!(fs::read_to_string(&path).unwrap(), expected.join("\n"));
        prop_assert_eq!(count_lines(&path).unwrap(), after);
    }

    /// Inserting at k makes the text line k and shifts the rest down
    #[test]
    fn prop_insert_shifts_lines(
        lines in lines_strategy(),
        idx in any::<Index>(),
        text in "[a-z ]{0,8}"
    ) {
        let (_dir, path) = write_fixture(&lines.join("\n"));
        let k = idx.index(lines.len()) + 1;

        let after = edit_line(&path, k, LineEdit::Insert(&text), lines.len()).unwrap();

        let mut expected = lines.clone();
        expected.insert(k - 1, text.clone());
        prop_assert_eq!(after, lines.len() + 1);
        prop_assert_eq!(fs::read_to_string(&path).unwrap(), expected.join("\n"));
    }

    /// Replacing line k keeps the line count and every other line
    #[test]
    fn prop_replace_keeps_count(
        lines in lines_strategy(),
        idx in any::<Index>(),
        text in "[A-Z]{1,8}"
    ) {
        let (_dir, path) = write_fixture(&lines.join("\n"));
        let k = idx.index(lines.len()) + 1;

        let after = edit_line(&path, k, LineEdit::Replace(&text), lines.len()).unwrap();

        let mut expected = lines.clone();
        expected[k - 1] = text.clone();
        prop_assert_eq!(after, lines.len());
        prop_assert_eq!(fs::read_to_string(&path).unwrap(), expected.join("\n"));
    }

    /// Out-of-range line numbers never touch the file
    #[test]
    fn prop_out_of_range_is_rejected(lines in lines_strategy(), extra in 1usize..5) {
        let content = lines.join("\n");
        let (_dir, path) = write_fixture(&content);

        prop_assert!(edit_line(&path, 0, LineEdit::Delete, lines.len()).is_err());
        prop_assert!(edit_line(&path, lines.len() + extra, LineEdit::Delete, lines.len()).is_err());
        prop_assert_eq!(fs::read_to_string(&path).unwrap(), content);
    }
}

// ============================================================================
// Substring replacement
// ============================================================================

proptest! {
    /// Replacing with a marker that never occurs, then back, restores the file
    #[test]
    fn prop_replace_round_trip(
        lines in prop::collection::vec("[a-c]{0,10}", 1..10),
        key in "[ab]{1,3}"
    ) {
        let content = lines.join("\n");
        let (_dir, path) = write_fixture(&content);
        let expected_total: usize = lines
            .iter()
            .map(|l| count_occurrences(l.as_bytes(), key.as_bytes()))
            .sum();

        let forward = search::replace(&path, &key, "#", MAX_LINE).unwrap();
        prop_assert_eq!(forward.total, expected_total);
        prop_assert_eq!(forward.changed(), expected_total > 0);

        let back = search::replace(&path, "#", &key, MAX_LINE).unwrap();
        prop_assert_eq!(back.total, expected_total);
        prop_assert_eq!(fs::read_to_string(&path).unwrap(), content);
    }

    /// Search and replace agree on the number of occurrences
    #[test]
    fn prop_search_total_matches_replace_total(
        lines in prop::collection::vec("[a-c]{0,10}", 1..10),
        key in "[a-c]{1,2}"
    ) {
        let (_dir, path) = write_fixture(&lines.join("\n"));
        let found = search::search(&path, &key, MAX_LINE).unwrap();
        let replaced = search::replace(&path, &key, "", MAX_LINE).unwrap();
        prop_assert_eq!(found.total, replaced.total);
    }
}
