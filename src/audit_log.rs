//! Bounded, append-only audit log of content-changing operations
//!
//! One entry per line: `[YYYY-MM-DD HH:MM:SS] <description>`. After each
//! append the log is checked against its retention ceiling; once it grows
//! past it, the oldest entries are dropped in a batch so that rotation does
//! not run on every append near the boundary.

use crate::error::{EditorError, IoResultExt, Result};
use crate::rewriter::{Rewrite, copy_lines, skip_lines};
use crate::scanner::verify_lines;
use chrono::{DateTime, Local};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub const DEFAULT_RETENTION: usize = 200;
pub const MIN_RETENTION: usize = 10;
/// Entries dropped beyond the ceiling on each rotation
pub const TRIM_BATCH: usize = 10;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// What an entry records, with the paths and payloads involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Created { path: String },
    Deleted { path: String },
    Copied { from: String, to: String },
    Appended { path: String, text: String },
    LineDeleted { path: String, line: usize },
    Inserted { path: String, text: String, line: usize },
    LineReplaced { path: String, line: usize, text: String },
    Substituted { path: String, key: String, sub: String },
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Created { path } => write!(f, "File '{path}' created/overwritten"),
            Action::Deleted { path } => write!(f, "File '{path}' deleted"),
            Action::Copied { from, to } => write!(f, "File '{from}' copied to '{to}'"),
            Action::Appended { path, text } => {
                write!(f, "File '{path}': Line \"{}\" appended", escape(text))
            }
            Action::LineDeleted { path, line } => write!(f, "File '{path}': Line {line} deleted"),
            Action::Inserted { path, text, line } => write!(
                f,
                "File '{path}': Line \"{}\" inserted at Line {line}",
                escape(text)
            ),
            Action::LineReplaced { path, line, text } => write!(
                f,
                "File '{path}': Line {line} was replaced by \"{}\"",
                escape(text)
            ),
            Action::Substituted { path, key, sub } => write!(
                f,
                "File '{path}': Instances of \"{}\" replaced by \"{}\"",
                escape(key),
                escape(sub)
            ),
        }
    }
}

/// Keep payloads on a single log line.
fn escape(text: &str) -> String {
    text.replace('\r', "\\r").replace('\n', "\\n")
}

/// One immutable audit record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub action: Action,
    /// Line count of the affected file afterwards; `None` once it is deleted
    pub lines_after: Option<usize>,
}

impl LogEntry {
    pub fn new(action: Action, lines_after: Option<usize>) -> Self {
        Self {
            timestamp: Local::now(),
            action,
            lines_after,
        }
    }

    /// Serialize to a single line (without the newline), at most `max_len` bytes.
    pub fn to_line(&self, max_len: usize) -> String {
        let mut line = self.to_string();
        if line.len() > max_len {
            let mut cut = max_len;
            while !line.is_char_boundary(cut) {
                cut -= 1;
            }
            line.truncate(cut);
        }
        line
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} | Lines After = ", self.timestamp.format(TIMESTAMP_FORMAT), self.action)?;
        match self.lines_after {
            Some(lines) => write!(f, "{lines}"),
            None => write!(f, "n/a"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
    retention: usize,
    max_line_length: usize,
}

impl AuditLog {
    /// `retention` below [`MIN_RETENTION`] is raised to it.
    pub fn new(path: impl Into<PathBuf>, retention: usize, max_line_length: usize) -> Self {
        Self {
            path: path.into(),
            retention: retention.max(MIN_RETENTION),
            max_line_length,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Append `entry`, then rotate.
    pub fn append(&self, entry: &LogEntry) -> Result<()> {
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)
            .with_path("open log", &self.path)?;

        let needs_separator = !ends_with_newline(&mut file, &self.path)?;
        // Room for the newline so the entry itself passes verification
        let line = entry.to_line(self.max_line_length.saturating_sub(1));

        let mut record = String::with_capacity(line.len() + 2);
        if needs_separator {
            record.push('\n');
        }
        record.push_str(&line);
        record.push('\n');
        file.write_all(record.as_bytes())
            .with_path("write log", &self.path)?;
        drop(file);

        tracing::info!(log = %self.path.display(), entry = %line, "audit entry appended");
        self.rotate()?;
        Ok(())
    }

    /// Number of entries currently in the log, after verifying it.
    pub fn len(&self) -> Result<usize> {
        if !self.path.exists() {
            return Ok(0);
        }
        Ok(self.verify()?.records())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn verify(&self) -> Result<crate::scanner::ScanSummary> {
        verify_lines(&self.path, self.max_line_length).map_err(|e| match e {
            EditorError::LineTooLong { .. } | EditorError::NulByte { .. } => {
                EditorError::LogTampered {
                    path: self.path.clone(),
                    source: Box::new(e),
                }
            }
            other => other,
        })
    }

    /// Drop the oldest entries once the log holds more than the ceiling.
    ///
    /// Keeps the newest entry plus the `retention - TRIM_BATCH` entries before
    /// it. Refuses to touch a log that fails verification. Returns the number
    /// of entries dropped.
    pub fn rotate(&self) -> Result<usize> {
        let entries = self.verify()?.records();
        if entries <= self.retention {
            return Ok(0);
        }

        let keep = self.retention - TRIM_BATCH + 1;
        let drop_count = entries - keep;

        let source = File::open(&self.path).with_path("open log", &self.path)?;
        let mut reader = BufReader::new(source);
        let rewrite = Rewrite::begin(&self.path)?;
        {
            let mut out = rewrite.writer();
            skip_lines(&mut reader, &self.path, drop_count)?;
            copy_lines(&mut reader, &mut out, &self.path, usize::MAX)?;
            out.finish().with_path("flush temporary file for", &self.path)?;
        }
        rewrite.commit()?;

        tracing::info!(
            log = %self.path.display(),
            dropped = drop_count,
            kept = keep,
            "rotated audit log"
        );
        Ok(drop_count)
    }

    /// Write the log to `out`, optionally only the entries about `file`.
    ///
    /// An entry is about `file` when `File '<file>'` occurs in it before the
    /// first double quote, so quoted payloads never produce a match. Returns
    /// the number of entries written.
    pub fn display<W: Write>(&self, file: Option<&str>, out: &mut W) -> Result<usize> {
        if !self.path.exists() {
            return Err(EditorError::LogMissing(self.path.clone()));
        }
        self.verify()?;

        let key = file.map(|f| format!("File '{f}'"));
        let source = File::open(&self.path).with_path("open log", &self.path)?;
        let mut reader = BufReader::new(source);
        let mut buf = Vec::new();
        let mut shown = 0;
        let stdout = Path::new("<output>");

        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .with_path("read log", &self.path)?;
            if read == 0 {
                break;
            }
            let entry = String::from_utf8_lossy(&buf);
            if key.as_deref().is_none_or(|k| mentions_file(&entry, k)) {
                out.write_all(&buf).with_path("write", stdout)?;
                if !buf.ends_with(b"\n") {
                    out.write_all(b"\n").with_path("write", stdout)?;
                }
                shown += 1;
            }
        }

        Ok(shown)
    }
}

fn mentions_file(entry: &str, key: &str) -> bool {
    match (entry.find(key), entry.find('"')) {
        (Some(at), Some(quote)) => at < quote,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

fn ends_with_newline(file: &mut File, path: &Path) -> Result<bool> {
    let len = file.seek(SeekFrom::End(0)).with_path("seek log", path)?;
    if len == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1)).with_path("seek log", path)?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).with_path("read log", path)?;
    Ok(last[0] == b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn test_log(retention: usize) -> (AuditLog, TempDir) {
        let dir = TempDir::new().unwrap();
        let log = AuditLog::new(dir.path().join("editorback.log"), retention, 2560);
        (log, dir)
    }

    fn created(n: usize) -> LogEntry {
        LogEntry::new(
            Action::Created {
                path: format!("file{n}.txt"),
            },
            Some(0),
        )
    }

    fn read_entries(log: &AuditLog) -> Vec<String> {
        fs::read_to_string(log.path())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_entry_format() {
        let entry = LogEntry::new(
            Action::Inserted {
                path: "a.txt".to_string(),
                text: "hi".to_string(),
                line: 2,
            },
            Some(3),
        );
        let line = entry.to_string();
        assert!(line.starts_with('['));
        assert_eq!(&line[20..22], "] ");
        assert!(line.ends_with("File 'a.txt': Line \"hi\" inserted at Line 2 | Lines After = 3"));

        let deleted = LogEntry::new(Action::Deleted { path: "a.txt".into() }, None);
        assert!(deleted.to_string().ends_with("File 'a.txt' deleted | Lines After = n/a"));
    }

    #[test]
    fn test_payload_newlines_are_escaped() {
        let entry = LogEntry::new(
            Action::Appended {
                path: "a.txt".into(),
                text: "two\nlines".into(),
            },
            Some(2),
        );
        assert!(entry.to_string().contains("Line \"two\\nlines\" appended"));
    }

    #[test]
    fn test_to_line_truncates_on_char_boundary() {
        let entry = LogEntry::new(
            Action::Appended {
                path: "a.txt".into(),
                text: "é".repeat(100),
            },
            Some(1),
        );
        let line = entry.to_line(64);
        assert!(line.len() <= 64);
        assert!(line.starts_with('['));
    }

    #[test]
    fn test_append_creates_log() {
        let (log, _dir) = test_log(DEFAULT_RETENTION);
        assert!(log.is_empty().unwrap());
        log.append(&created(1)).unwrap();
        log.append(&created(2)).unwrap();
        let entries = read_entries(&log);
        assert_eq!(entries.len(), 2);
        assert!(entries[1].contains("file2.txt"));
        assert_eq!(log.len().unwrap(), 2);
    }

    #[test]
    fn test_rotation_drops_oldest_in_batches() {
        let (log, _dir) = test_log(DEFAULT_RETENTION);
        for n in 1..=DEFAULT_RETENTION {
            log.append(&created(n)).unwrap();
        }
        assert_eq!(log.len().unwrap(), DEFAULT_RETENTION);

        log.append(&created(DEFAULT_RETENTION + 1)).unwrap();
        let entries = read_entries(&log);
        assert_eq!(entries.len(), DEFAULT_RETENTION - 9);
        // oldest gone, newest kept
        assert!(entries[0].contains("'file11.txt'"));
        assert!(entries.last().unwrap().contains("'file201.txt'"));
    }

    #[test]
    fn test_log_never_exceeds_ceiling() {
        let (log, _dir) = test_log(MIN_RETENTION);
        for n in 1..=35 {
            log.append(&created(n)).unwrap();
            assert!(log.len().unwrap() <= MIN_RETENTION);
        }
    }

    #[test]
    fn test_retention_is_clamped() {
        let (log, _dir) = test_log(3);
        assert_eq!(log.retention(), MIN_RETENTION);
    }

    #[test]
    fn test_tampered_log_is_refused() {
        let (log, _dir) = test_log(DEFAULT_RETENTION);
        fs::write(log.path(), b"[2024-01-01 00:00:00] ok\nbad\0entry\n").unwrap();
        let err = log.append(&created(1)).unwrap_err();
        assert!(matches!(err, EditorError::LogTampered { .. }));

        let mut out = Vec::new();
        assert!(matches!(
            log.display(None, &mut out),
            Err(EditorError::LogTampered { .. })
        ));
    }

    #[test]
    fn test_append_repairs_missing_trailing_newline() {
        let (log, _dir) = test_log(DEFAULT_RETENTION);
        fs::write(log.path(), b"[2024-01-01 00:00:00] foreign").unwrap();
        log.append(&created(1)).unwrap();
        assert_eq!(read_entries(&log).len(), 2);
    }

    #[test]
    fn test_display_missing_log() {
        let (log, _dir) = test_log(DEFAULT_RETENTION);
        let mut out = Vec::new();
        assert!(matches!(
            log.display(None, &mut out),
            Err(EditorError::LogMissing(_))
        ));
    }

    #[test]
    fn test_display_filter_ignores_quoted_payloads() {
        let (log, _dir) = test_log(DEFAULT_RETENTION);
        log.append(&LogEntry::new(Action::Created { path: "a.txt".into() }, Some(0)))
            .unwrap();
        log.append(&LogEntry::new(
            Action::Appended {
                path: "b.txt".into(),
                text: "see File 'a.txt'".into(),
            },
            Some(1),
        ))
        .unwrap();
        log.append(&LogEntry::new(
            Action::Appended {
                path: "a.txt".into(),
                text: "hello".into(),
            },
            Some(1),
        ))
        .unwrap();

        let mut out = Vec::new();
        assert_eq!(log.display(Some("a.txt"), &mut out).unwrap(), 2);
        let shown = String::from_utf8(out).unwrap();
        assert!(!shown.contains("b.txt"));

        let mut all = Vec::new();
        assert_eq!(log.display(None, &mut all).unwrap(), 3);
    }
}
