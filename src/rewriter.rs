//! Atomic rewrite of a file through a temporary file
//!
//! Every mutation that touches existing content streams the old file into a
//! fresh temporary file created next to the target, then promotes it with a
//! single rename over the original path. Until [`Rewrite::commit`] succeeds
//! the original file is untouched, and a rewrite that is dropped or fails
//! removes its temporary file.

use crate::error::{EditorError, IoResultExt, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A single line-addressed edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEdit<'a> {
    /// Remove the line together with its terminator
    Delete,
    /// Write a new line before the addressed one
    Insert(&'a str),
    /// Swap the line's content, keeping its terminator
    Replace(&'a str),
}

/// Reject `line` unless it lies in `[1, total]`.
pub fn check_bounds(path: &Path, line: usize, total: usize) -> Result<()> {
    if line == 0 || line > total {
        return Err(EditorError::LineOutOfRange {
            path: path.to_path_buf(),
            line,
            total,
        });
    }
    Ok(())
}

/// An in-flight rewrite of `target`.
pub struct Rewrite {
    target: PathBuf,
    temp: NamedTempFile,
    permissions: Option<fs::Permissions>,
}

impl Rewrite {
    /// Create a uniquely named temporary file in the target's directory.
    pub fn begin(target: &Path) -> Result<Self> {
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "lined".to_string());

        let temp = tempfile::Builder::new()
            .prefix(&format!(".{name}."))
            .suffix(".tmp")
            .tempfile_in(dir)
            .with_path("create temporary file in", dir)?;

        let permissions = fs::metadata(target).ok().map(|m| m.permissions());

        tracing::debug!(
            target = %target.display(),
            temp = %temp.path().display(),
            "started rewrite"
        );

        Ok(Self {
            target: target.to_path_buf(),
            temp,
            permissions,
        })
    }

    /// Give the result the permissions of `source` when the target is new.
    pub fn inherit_permissions(&mut self, source: &Path) {
        if self.permissions.is_none() {
            self.permissions = fs::metadata(source).ok().map(|m| m.permissions());
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    /// Buffered writer into the temporary file, counting what it writes.
    pub fn writer(&self) -> LineCountingWriter<BufWriter<&File>> {
        LineCountingWriter::new(BufWriter::new(self.temp.as_file()))
    }

    /// Flush to disk and rename the temporary file over the target.
    pub fn commit(self) -> Result<()> {
        let temp_path = self.temp.path().to_path_buf();
        self.temp
            .as_file()
            .sync_all()
            .with_path("sync", &temp_path)?;

        if let Some(permissions) = self.permissions {
            fs::set_permissions(&temp_path, permissions).with_path("set permissions on", &temp_path)?;
        }

        self.temp
            .persist(&self.target)
            .map_err(|e| EditorError::io("replace", &self.target, e.error))?;

        tracing::debug!(target = %self.target.display(), "committed rewrite");
        Ok(())
    }

    /// Drop the temporary file and leave the target untouched.
    pub fn discard(self) -> Result<()> {
        let temp_path = self.temp.path().to_path_buf();
        self.temp.close().with_path("remove", &temp_path)?;
        tracing::debug!(target = %self.target.display(), "discarded rewrite");
        Ok(())
    }
}

/// Writer adapter that keeps the canonical line count of everything written.
#[derive(Debug)]
pub struct LineCountingWriter<W> {
    inner: W,
    bytes: u64,
    newlines: usize,
}

impl<W: Write> LineCountingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            bytes: 0,
            newlines: 0,
        }
    }

    /// Lines written so far, counted the way the scanner counts them.
    pub fn lines(&self) -> usize {
        if self.bytes == 0 { 0 } else { self.newlines + 1 }
    }

    /// Flush and return the final line count.
    pub fn finish(mut self) -> io::Result<usize> {
        self.inner.flush()?;
        Ok(self.lines())
    }
}

impl<W: Write> Write for LineCountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.bytes += written as u64;
        self.newlines += buf[..written].iter().filter(|&&b| b == b'\n').count();
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Walk `reader` forward over `count` newline-terminated lines, handing each
/// chunk to `sink`. Returns the number of newlines passed.
fn walk_lines<R, F>(reader: &mut R, path: &Path, count: usize, mut sink: F) -> Result<usize>
where
    R: BufRead,
    F: FnMut(&[u8]) -> Result<()>,
{
    let mut passed = 0;
    while passed < count {
        let chunk = reader.fill_buf().with_path("read", path)?;
        if chunk.is_empty() {
            break;
        }
        let mut take = chunk.len();
        for (i, &byte) in chunk.iter().enumerate() {
            if byte == b'\n' {
                passed += 1;
                if passed == count {
                    take = i + 1;
                    break;
                }
            }
        }
        sink(&chunk[..take])?;
        reader.consume(take);
    }
    Ok(passed)
}

/// Copy `count` whole lines (terminators included) from `reader` to `out`.
pub fn copy_lines<R: BufRead, W: Write>(
    reader: &mut R,
    out: &mut W,
    path: &Path,
    count: usize,
) -> Result<usize> {
    walk_lines(reader, path, count, |chunk| {
        out.write_all(chunk).with_path("write temporary file for", path)
    })
}

/// Discard `count` whole lines from `reader`.
pub fn skip_lines<R: BufRead>(reader: &mut R, path: &Path, count: usize) -> Result<usize> {
    walk_lines(reader, path, count, |_| Ok(()))
}

/// Copy the body of the next line to `out` and consume its newline without
/// writing it. Returns whether a newline ended the line.
fn copy_line_body<R: BufRead, W: Write>(reader: &mut R, out: &mut W, path: &Path) -> Result<bool> {
    loop {
        let chunk = reader.fill_buf().with_path("read", path)?;
        if chunk.is_empty() {
            return Ok(false);
        }
        match chunk.iter().position(|&b| b == b'\n') {
            Some(pos) => {
                out.write_all(&chunk[..pos])
                    .with_path("write temporary file for", path)?;
                reader.consume(pos + 1);
                return Ok(true);
            }
            None => {
                let len = chunk.len();
                out.write_all(chunk).with_path("write temporary file for", path)?;
                reader.consume(len);
            }
        }
    }
}

fn copy_rest<R: Read, W: Write>(reader: &mut R, out: &mut W, path: &Path) -> Result<()> {
    io::copy(reader, out).with_path("copy", path)?;
    Ok(())
}

/// Apply `edit` at `line` of a file known to have `total` lines.
///
/// The line number is bounds-checked before anything is written. Returns the
/// line count of the rewritten file.
pub fn edit_line(path: &Path, line: usize, edit: LineEdit<'_>, total: usize) -> Result<usize> {
    check_bounds(path, line, total)?;

    let source = File::open(path).with_path("open", path)?;
    let mut reader = BufReader::new(source);
    let rewrite = Rewrite::begin(path)?;

    let lines_after = {
        let mut out = rewrite.writer();

        match edit {
            LineEdit::Delete if line == total && line > 1 => {
                // Last line: the newline ending the previous line goes too
                copy_lines(&mut reader, &mut out, path, line - 2)?;
                copy_line_body(&mut reader, &mut out, path)?;
            }
            LineEdit::Delete => {
                copy_lines(&mut reader, &mut out, path, line - 1)?;
                skip_lines(&mut reader, path, 1)?;
                copy_rest(&mut reader, &mut out, path)?;
            }
            LineEdit::Insert(text) => {
                copy_lines(&mut reader, &mut out, path, line - 1)?;
                out.write_all(text.as_bytes())
                    .and_then(|()| out.write_all(b"\n"))
                    .with_path("write temporary file for", path)?;
                copy_rest(&mut reader, &mut out, path)?;
            }
            LineEdit::Replace(text) => {
                copy_lines(&mut reader, &mut out, path, line - 1)?;
                let terminated = skip_lines(&mut reader, path, 1)? == 1;
                out.write_all(text.as_bytes())
                    .with_path("write temporary file for", path)?;
                if terminated {
                    out.write_all(b"\n")
                        .with_path("write temporary file for", path)?;
                }
                copy_rest(&mut reader, &mut out, path)?;
            }
        }

        out.finish().with_path("flush temporary file for", path)?
    };

    rewrite.commit()?;
    Ok(lines_after)
}

/// Append `text` as a new last line, directly at the end of the file.
///
/// A separating newline is written first unless the file is empty. Returns
/// the resulting line count.
pub fn append_line(path: &Path, text: &str) -> Result<usize> {
    let mut file = OpenOptions::new()
        .read(true)
        .append(true)
        .open(path)
        .with_path("open", path)?;

    let len = file.seek(SeekFrom::End(0)).with_path("seek", path)?;
    let mut writer = BufWriter::new(&mut file);
    if len > 0 {
        writer.write_all(b"\n").with_path("write", path)?;
    }
    writer.write_all(text.as_bytes()).with_path("write", path)?;
    writer.flush().with_path("write", path)?;
    drop(writer);

    crate::scanner::count_lines(path)
}
