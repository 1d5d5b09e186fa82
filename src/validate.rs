//! Validation of command-line arguments before any file is touched

use crate::error::{EditorError, Result};
use regex::RegexBuilder;

/// Names a newly created file may take: path segments of letters, digits,
/// `.`, `_`, `-` and inner spaces.
pub const FILE_NAME_PATTERN: &str = r"^((/)?[0-9a-zA-Z._-][0-9a-zA-Z._ -]*)+$";

/// Longest accepted line-number argument, in digits.
pub const MAX_LINE_NUMBER_DIGITS: usize = 20;

/// Check that `input` (argument number `arg`) is `min..=max` bytes long.
pub fn check_length(input: &str, min: usize, max: usize, arg: usize) -> Result<()> {
    if input.len() > max {
        return Err(EditorError::InvalidArgument {
            arg,
            reason: format!("too long (max {max})"),
        });
    }
    if input.len() < min {
        return Err(EditorError::InvalidArgument {
            arg,
            reason: "too short".to_string(),
        });
    }
    Ok(())
}

/// Parse a line-number argument: digits only, non-empty, at most 20 digits.
pub fn parse_line_number(input: &str, arg: usize) -> Result<usize> {
    let invalid = |reason: &str| EditorError::InvalidArgument {
        arg,
        reason: format!("invalid line number: {reason}"),
    };

    if input.is_empty() {
        return Err(invalid("empty string"));
    }
    if !input.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("non-digit"));
    }
    if input.len() > MAX_LINE_NUMBER_DIGITS {
        return Err(invalid("too long"));
    }
    input
        .parse::<usize>()
        .map_err(|_| invalid("does not fit an unsigned integer"))
}

/// Check that `path` is acceptable as the name of a new file.
pub fn check_file_name(path: &str) -> Result<()> {
    let pattern = RegexBuilder::new(FILE_NAME_PATTERN)
        .case_insensitive(true)
        .build()
        .map_err(|e| EditorError::InvalidPattern {
            pattern: FILE_NAME_PATTERN.to_string(),
            message: e.to_string(),
        })?;

    if pattern.is_match(path) {
        Ok(())
    } else {
        Err(EditorError::InvalidFileName(path.to_string()))
    }
}
