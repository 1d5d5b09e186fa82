//! Line counting and line-buffer safety checks
//!
//! Two ways of reading a file coexist in lined. Position-addressed edits and
//! displays walk the raw bytes and accept anything: NUL bytes, arbitrarily
//! long lines, invalid UTF-8. Content operations (search, replace, audit log
//! reads) hold one whole line in memory at a time, so they first run
//! [`verify_lines`] to make sure every line fits the configured limit and that
//! the file carries no NUL bytes.
//!
//! Line counting follows one rule everywhere: an empty file has 0 lines, any
//! other file has one line more than it has newline bytes. A file ending in a
//! newline therefore ends with an empty last line.

use crate::error::{EditorError, IoResultExt, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

const SCAN_BUFFER_SIZE: usize = 64 * 1024;

/// Summary of a full pass over a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Canonical line count (0 for an empty file)
    pub lines: usize,
    /// Total bytes read
    pub bytes: u64,
    /// Whether the last byte is a newline
    pub trailing_newline: bool,
}

impl ScanSummary {
    /// Number of newline-terminated records, plus a trailing partial one.
    ///
    /// This is what the audit log counts as entries: the empty line after the
    /// final newline is not an entry.
    pub fn records(&self) -> usize {
        if self.trailing_newline {
            self.lines - 1
        } else {
            self.lines
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes == 0
    }
}

/// Scan `reader` to the end, counting lines.
///
/// With `max_line_length` set the scan also fails on the first line longer
/// than the limit (newline included) and on the first NUL byte.
pub fn scan<R: Read>(reader: R, path: &Path, max_line_length: Option<usize>) -> Result<ScanSummary> {
    let mut reader = BufReader::with_capacity(SCAN_BUFFER_SIZE, reader);
    let mut summary = ScanSummary::default();
    let mut line_len = 0usize;

    loop {
        let chunk = reader.fill_buf().with_path("read", path)?;
        if chunk.is_empty() {
            break;
        }

        if summary.lines == 0 {
            summary.lines = 1;
        }

        for &byte in chunk {
            line_len += 1;
            if let Some(max) = max_line_length {
                if byte == 0 {
                    return Err(EditorError::NulByte { line: summary.lines });
                }
                if line_len > max {
                    return Err(EditorError::LineTooLong {
                        line: summary.lines,
                        max,
                    });
                }
            }
            if byte == b'\n' {
                summary.lines += 1;
                line_len = 0;
            }
        }

        let consumed = chunk.len();
        summary.trailing_newline = chunk[consumed - 1] == b'\n';
        summary.bytes += consumed as u64;
        reader.consume(consumed);
    }

    Ok(summary)
}

pub fn summarize(path: &Path) -> Result<ScanSummary> {
    let file = File::open(path).with_path("open", path)?;
    scan(file, path, None)
}

/// Count the lines of the file at `path`.
pub fn count_lines(path: &Path) -> Result<usize> {
    Ok(summarize(path)?.lines)
}

/// Count lines and verify the file is safe for line-buffered reads.
pub fn verify_lines(path: &Path, max_line_length: usize) -> Result<ScanSummary> {
    let file = File::open(path).with_path("open", path)?;
    let summary = scan(file, path, Some(max_line_length))?;
    tracing::debug!(path = %path.display(), lines = summary.lines, "verified line-buffer safety");
    Ok(summary)
}

/// Width needed to print line numbers up to `lines`.
pub fn number_width(lines: usize) -> usize {
    let mut digits = 1;
    let mut rest = lines;
    while rest > 9 {
        rest /= 10;
        digits += 1;
    }
    digits
}

/// Copy the file to `out`, prefixing every line with its zero-padded number.
///
/// Bytes are passed through untouched. Returns the number of lines written.
pub fn show_numbered<W: Write>(path: &Path, out: &mut W) -> Result<usize> {
    let lines = count_lines(path)?;
    if lines == 0 {
        return Ok(0);
    }
    let width = number_width(lines);

    let file = File::open(path).with_path("open", path)?;
    let mut reader = BufReader::with_capacity(SCAN_BUFFER_SIZE, file);
    let stdout = Path::new("<output>");

    let mut line_no = 1usize;
    write!(out, "{line_no:0width$} |").with_path("write", stdout)?;
    loop {
        let chunk = reader.fill_buf().with_path("read", path)?;
        if chunk.is_empty() {
            break;
        }
        let consumed = chunk.len();
        let mut start = 0;
        for (i, &byte) in chunk.iter().enumerate() {
            if byte == b'\n' {
                out.write_all(&chunk[start..=i]).with_path("write", stdout)?;
                line_no += 1;
                write!(out, "{line_no:0width$} |").with_path("write", stdout)?;
                start = i + 1;
            }
        }
        out.write_all(&chunk[start..]).with_path("write", stdout)?;
        reader.consume(consumed);
    }
    out.write_all(b"\n").with_path("write", stdout)?;

    Ok(lines)
}

/// Write line `line_no` (1-based) to `out` without its line terminator.
///
/// The caller is responsible for bounds-checking `line_no`.
pub fn show_line<W: Write>(path: &Path, line_no: usize, out: &mut W) -> Result<()> {
    let file = File::open(path).with_path("open", path)?;
    let mut reader = BufReader::with_capacity(SCAN_BUFFER_SIZE, file);
    let stdout = Path::new("<output>");

    crate::rewriter::skip_lines(&mut reader, path, line_no - 1)?;

    // Stream the target line, holding back a '\r' until we know it is not
    // the last byte before the newline.
    let mut pending_cr = false;
    loop {
        let chunk = reader.fill_buf().with_path("read", path)?;
        if chunk.is_empty() {
            break;
        }
        let (body, done) = match chunk.iter().position(|&b| b == b'\n') {
            Some(pos) => (&chunk[..pos], true),
            None => (chunk, false),
        };
        for &byte in body {
            if pending_cr {
                out.write_all(b"\r").with_path("write", stdout)?;
                pending_cr = false;
            }
            if byte == b'\r' {
                pending_cr = true;
            } else {
                out.write_all(&[byte]).with_path("write", stdout)?;
            }
        }
        if done {
            break;
        }
        let consumed = chunk.len();
        reader.consume(consumed);
    }
    out.write_all(b"\n").with_path("write", stdout)?;
    Ok(())
}
