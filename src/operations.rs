//! The operation layer: one method per editor command
//!
//! `Editor` owns the audit log and the line limit for content operations.
//! Each method checks its preconditions, runs the engine, and records an
//! audit entry when file content changed.

use crate::audit_log::{Action, AuditLog, LogEntry};
use crate::config::Config;
use crate::error::{EditorError, IoResultExt, Result};
use crate::rewriter::{self, LineEdit, Rewrite};
use crate::scanner;
use crate::search::{self, PatternReport, ReplaceReport, SearchReport};
use crate::validate;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

/// Asks the user to approve overwriting an existing file.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> io::Result<bool>;
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> io::Result<bool>,
{
    fn confirm(&mut self, prompt: &str) -> io::Result<bool> {
        self(prompt)
    }
}

#[derive(Debug, Clone)]
pub struct Editor {
    log: AuditLog,
    max_line_length: usize,
}

impl Editor {
    pub fn new(log: AuditLog, max_line_length: usize) -> Self {
        Self {
            log,
            max_line_length,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let log = AuditLog::new(
            config.log.path(),
            config.log.retention(),
            config.log.max_line_length(),
        );
        Self::new(log, config.limits.max_string_length())
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.log
    }

    fn record(&self, action: Action, lines_after: Option<usize>) -> Result<()> {
        self.log.append(&LogEntry::new(action, lines_after))
    }

    /// Make sure an overwrite of `path` is allowed, or that `path` is a
    /// valid name for a new file.
    fn prepare_destination(&self, path: &Path, confirm: &mut dyn Confirm) -> Result<()> {
        match fs::metadata(path) {
            Ok(meta) if meta.is_file() => {
                let prompt = format!(
                    "File '{}' already exists and will be overwritten.",
                    path.display()
                );
                if confirm.confirm(&prompt).with_path("confirm overwrite of", path)? {
                    Ok(())
                } else {
                    Err(EditorError::Aborted(path.to_path_buf()))
                }
            }
            Ok(_) => Err(EditorError::NotRegularFile(path.to_path_buf())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                validate::check_file_name(&path.to_string_lossy())
            }
            Err(e) => Err(EditorError::io("stat", path, e)),
        }
    }

    /// Create an empty file, or truncate an existing one after confirmation.
    pub fn create_file(&self, path: &Path, confirm: &mut dyn Confirm) -> Result<()> {
        self.prepare_destination(path, confirm)?;
        File::create(path).with_path("create", path)?;

        tracing::info!(path = %path.display(), "created file");
        self.record(
            Action::Created {
                path: path.display().to_string(),
            },
            Some(0),
        )
    }

    pub fn delete_file(&self, path: &Path) -> Result<()> {
        ensure_regular_file(path)?;
        fs::remove_file(path).with_path("remove", path)?;

        tracing::info!(path = %path.display(), "deleted file");
        self.record(
            Action::Deleted {
                path: path.display().to_string(),
            },
            None,
        )
    }

    /// Copy `src` to `dst` byte for byte. Returns the line count of the copy.
    pub fn copy_file(&self, src: &Path, dst: &Path, confirm: &mut dyn Confirm) -> Result<usize> {
        ensure_regular_file(src)?;
        self.prepare_destination(dst, confirm)?;

        let mut source = File::open(src).with_path("open", src)?;
        let mut rewrite = Rewrite::begin(dst)?;
        rewrite.inherit_permissions(src);
        let lines = {
            let mut out = rewrite.writer();
            io::copy(&mut source, &mut out).with_path("copy", src)?;
            out.finish().with_path("flush temporary file for", dst)?
        };
        rewrite.commit()?;

        tracing::info!(src = %src.display(), dst = %dst.display(), lines, "copied file");
        self.record(
            Action::Copied {
                from: src.display().to_string(),
                to: dst.display().to_string(),
            },
            Some(lines),
        )?;
        Ok(lines)
    }

    /// Write the whole file with line numbers to `out`.
    pub fn show_file<W: Write>(&self, path: &Path, out: &mut W) -> Result<usize> {
        ensure_regular_file(path)?;
        scanner::show_numbered(path, out)
    }

    pub fn show_line<W: Write>(&self, path: &Path, line: usize, out: &mut W) -> Result<()> {
        ensure_regular_file(path)?;
        let total = scanner::count_lines(path)?;
        rewriter::check_bounds(path, line, total)?;
        scanner::show_line(path, line, out)
    }

    /// Append `text` as the new last line. Returns the resulting line count.
    pub fn append_line(&self, path: &Path, text: &str) -> Result<usize> {
        ensure_regular_file(path)?;
        let lines = rewriter::append_line(path, text)?;

        tracing::info!(path = %path.display(), lines, "appended line");
        self.record(
            Action::Appended {
                path: path.display().to_string(),
                text: text.to_string(),
            },
            Some(lines),
        )?;
        Ok(lines)
    }

    pub fn delete_line(&self, path: &Path, line: usize) -> Result<usize> {
        let lines = self.edit_line(path, line, LineEdit::Delete)?;
        self.record(
            Action::LineDeleted {
                path: path.display().to_string(),
                line,
            },
            Some(lines),
        )?;
        Ok(lines)
    }

    /// Insert `text` so that it becomes line `line`.
    pub fn insert_line(&self, path: &Path, text: &str, line: usize) -> Result<usize> {
        let lines = self.edit_line(path, line, LineEdit::Insert(text))?;
        self.record(
            Action::Inserted {
                path: path.display().to_string(),
                text: text.to_string(),
                line,
            },
            Some(lines),
        )?;
        Ok(lines)
    }

    pub fn replace_line(&self, path: &Path, text: &str, line: usize) -> Result<usize> {
        let lines = self.edit_line(path, line, LineEdit::Replace(text))?;
        self.record(
            Action::LineReplaced {
                path: path.display().to_string(),
                line,
                text: text.to_string(),
            },
            Some(lines),
        )?;
        Ok(lines)
    }

    fn edit_line(&self, path: &Path, line: usize, edit: LineEdit<'_>) -> Result<usize> {
        ensure_regular_file(path)?;
        let total = scanner::count_lines(path)?;
        let lines = rewriter::edit_line(path, line, edit, total)?;
        tracing::info!(path = %path.display(), line, ?edit, lines, "edited line");
        Ok(lines)
    }

    pub fn search(&self, path: &Path, key: &str) -> Result<SearchReport> {
        ensure_regular_file(path)?;
        search::search(path, key, self.max_line_length)
    }

    pub fn pattern_search(&self, path: &Path, pattern: &str) -> Result<PatternReport> {
        ensure_regular_file(path)?;
        search::pattern_search(path, pattern, self.max_line_length)
    }

    /// Replace every occurrence of `key` with `sub` across the file.
    pub fn replace(&self, path: &Path, key: &str, sub: &str) -> Result<ReplaceReport> {
        ensure_regular_file(path)?;
        let report = search::replace(path, key, sub, self.max_line_length)?;

        if report.changed() {
            tracing::info!(path = %path.display(), total = report.total, "replaced substrings");
            self.record(
                Action::Substituted {
                    path: path.display().to_string(),
                    key: key.to_string(),
                    sub: sub.to_string(),
                },
                Some(report.lines_after),
            )?;
        }
        Ok(report)
    }

    pub fn count_lines(&self, path: &Path) -> Result<usize> {
        ensure_regular_file(path)?;
        scanner::count_lines(path)
    }

    /// Write the audit log, or only the entries about `file`, to `out`.
    pub fn display_log<W: Write>(&self, file: Option<&str>, out: &mut W) -> Result<usize> {
        self.log.display(file, out)
    }
}

/// Fail unless `path` exists and is a regular file.
pub fn ensure_regular_file(path: &Path) -> Result<()> {
    let meta = fs::metadata(path).map_err(|_| EditorError::NotFound(path.to_path_buf()))?;
    if !meta.is_file() {
        return Err(EditorError::NotRegularFile(path.to_path_buf()));
    }
    Ok(())
}
