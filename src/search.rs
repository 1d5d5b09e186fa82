//! Literal search, pattern search and literal substring replacement
//!
//! All three read the file one line at a time, so each begins with
//! [`verify_lines`](crate::scanner::verify_lines). Matching is left to right
//! and non-overlapping: after a match the scan resumes past its end.

use crate::error::{EditorError, IoResultExt, Result};
use crate::rewriter::Rewrite;
use crate::scanner::{number_width, verify_lines};
use regex::bytes::{Regex, RegexBuilder};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// A line that matched, with its line terminator stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMatch {
    pub line_number: usize,
    /// Non-overlapping occurrences in the line (1 for pattern matches)
    pub occurrences: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchReport {
    /// Width of the largest line number in the file
    pub width: usize,
    pub matches: Vec<LineMatch>,
    /// Occurrences across the whole file
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternReport {
    pub width: usize,
    pub matches: Vec<LineMatch>,
}

impl PatternReport {
    /// Number of matching lines.
    pub fn total(&self) -> usize {
        self.matches.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineReplacement {
    pub line_number: usize,
    pub occurrences: usize,
    pub before: String,
    pub after: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceReport {
    pub width: usize,
    pub replacements: Vec<LineReplacement>,
    /// Substitutions made across the whole file
    pub total: usize,
    pub lines_after: usize,
}

impl ReplaceReport {
    /// Whether the file was rewritten.
    pub fn changed(&self) -> bool {
        self.total > 0
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Count non-overlapping occurrences of `key` in `line`.
///
/// An empty key never matches.
pub fn count_occurrences(line: &[u8], key: &[u8]) -> usize {
    let mut count = 0;
    let mut rest = line;
    while let Some(pos) = find(rest, key) {
        count += 1;
        rest = &rest[pos + key.len()..];
    }
    count
}

/// Replace the first `occurrences` matches of `key` in `line` with `sub`.
///
/// The result is `line.len() + occurrences * (sub.len() - key.len())` bytes
/// long when `line` holds at least that many matches.
pub fn substitute(line: &[u8], key: &[u8], sub: &[u8], occurrences: usize) -> Vec<u8> {
    if key.is_empty() {
        return line.to_vec();
    }

    let capacity = (line.len() + occurrences * sub.len()).saturating_sub(occurrences * key.len());
    let mut result = Vec::with_capacity(capacity);
    let mut rest = line;
    for _ in 0..occurrences {
        let Some(pos) = find(rest, key) else {
            break;
        };
        result.extend_from_slice(&rest[..pos]);
        result.extend_from_slice(sub);
        rest = &rest[pos + key.len()..];
    }
    result.extend_from_slice(rest);
    result
}

/// Split a raw line into its body and its trailing `\r`/`\n` bytes.
fn split_terminator(line: &[u8]) -> (&[u8], &[u8]) {
    let body_len = line
        .iter()
        .rposition(|&b| b != b'\n' && b != b'\r')
        .map_or(0, |pos| pos + 1);
    line.split_at(body_len)
}

/// Feed every raw line (terminator included) to `visit`, numbered from 1.
fn for_each_line<F>(path: &Path, mut visit: F) -> Result<()>
where
    F: FnMut(usize, &[u8]) -> Result<()>,
{
    let file = File::open(path).with_path("open", path)?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    let mut line_number = 0;
    loop {
        buf.clear();
        let read = reader.read_until(b'\n', &mut buf).with_path("read", path)?;
        if read == 0 {
            break;
        }
        line_number += 1;
        visit(line_number, &buf)?;
    }
    Ok(())
}

/// Compile a search pattern: extended syntax, case-insensitive, no captures needed.
pub fn compile_pattern(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| EditorError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}

/// Report every line containing `key` and how often it occurs.
pub fn search(path: &Path, key: &str, max_line_length: usize) -> Result<SearchReport> {
    let summary = verify_lines(path, max_line_length)?;
    let key = key.as_bytes();
    let mut matches = Vec::new();
    let mut total = 0;

    for_each_line(path, |line_number, raw| {
        let (body, _) = split_terminator(raw);
        let occurrences = count_occurrences(body, key);
        if occurrences > 0 {
            total += occurrences;
            matches.push(LineMatch {
                line_number,
                occurrences,
                text: String::from_utf8_lossy(body).into_owned(),
            });
        }
        Ok(())
    })?;

    Ok(SearchReport {
        width: number_width(summary.lines),
        matches,
        total,
    })
}

/// Report every line in which `pattern` matches anywhere.
pub fn pattern_search(path: &Path, pattern: &str, max_line_length: usize) -> Result<PatternReport> {
    let regex = compile_pattern(pattern)?;
    let summary = verify_lines(path, max_line_length)?;
    let mut matches = Vec::new();

    for_each_line(path, |line_number, raw| {
        let (body, _) = split_terminator(raw);
        if regex.is_match(body) {
            matches.push(LineMatch {
                line_number,
                occurrences: 1,
                text: String::from_utf8_lossy(body).into_owned(),
            });
        }
        Ok(())
    })?;

    Ok(PatternReport {
        width: number_width(summary.lines),
        matches,
    })
}

/// Replace every occurrence of `key` with `sub`, rewriting the file atomically.
///
/// Rewritten lines keep their original terminator. When nothing matches the
/// temporary file is discarded and the file is left as it was.
pub fn replace(path: &Path, key: &str, sub: &str, max_line_length: usize) -> Result<ReplaceReport> {
    let summary = verify_lines(path, max_line_length)?;
    let (key, sub) = (key.as_bytes(), sub.as_bytes());

    let rewrite = Rewrite::begin(path)?;
    let mut replacements = Vec::new();
    let mut total = 0;

    let lines_after = {
        let mut out = rewrite.writer();
        for_each_line(path, |line_number, raw| {
            let (body, terminator) = split_terminator(raw);
            let occurrences = count_occurrences(body, key);
            if occurrences == 0 {
                return out.write_all(raw).with_path("write temporary file for", path);
            }

            let substituted = substitute(body, key, sub, occurrences);
            out.write_all(&substituted)
                .and_then(|()| out.write_all(terminator))
                .with_path("write temporary file for", path)?;

            total += occurrences;
            replacements.push(LineReplacement {
                line_number,
                occurrences,
                before: String::from_utf8_lossy(body).into_owned(),
                after: String::from_utf8_lossy(&substituted).into_owned(),
            });
            Ok(())
        })?;
        out.finish().with_path("flush temporary file for", path)?
    };

    if total == 0 {
        rewrite.discard()?;
        tracing::debug!(path = %path.display(), "no occurrences, file left untouched");
        return Ok(ReplaceReport {
            width: number_width(summary.lines),
            replacements,
            total,
            lines_after: summary.lines,
        });
    }

    rewrite.commit()?;
    Ok(ReplaceReport {
        width: number_width(summary.lines),
        replacements,
        total,
        lines_after,
    })
}
