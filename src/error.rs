//! Error types for lined operations
//!
//! Every engine operation returns [`EditorError`]. The binary turns it into a
//! single message plus an optional hint and exits with status 1.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T, E = EditorError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("line {line} is too long: max line length allowed for this operation is {max}")]
    LineTooLong { line: usize, max: usize },

    #[error("this operation does not support NUL characters in the file (line {line})")]
    NulByte { line: usize },

    #[error("line number {line} out of range for '{}' ({total} lines)", .path.display())]
    LineOutOfRange {
        path: PathBuf,
        line: usize,
        total: usize,
    },

    #[error("given file path either does not exist or cannot be accessed: '{}'", .0.display())]
    NotFound(PathBuf),

    #[error("file path refers to a non-regular file and cannot be modified: '{}'", .0.display())]
    NotRegularFile(PathBuf),

    #[error("invalid file name: '{0}'")]
    InvalidFileName(String),

    #[error("overwrite of '{}' aborted", .0.display())]
    Aborted(PathBuf),

    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("log file '{}' does not exist", .0.display())]
    LogMissing(PathBuf),

    #[error(
        "log file '{}' has been edited by another program; modify it to meet the constraint or delete it",
        .path.display()
    )]
    LogTampered {
        path: PathBuf,
        #[source]
        source: Box<EditorError>,
    },

    #[error("invalid input (argument {arg}): {reason}")]
    InvalidArgument { arg: usize, reason: String },

    #[error("failed to {action} '{}': {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl EditorError {
    pub fn io(action: &'static str, path: &Path, source: io::Error) -> Self {
        EditorError::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Actionable follow-up for resource errors, if there is one.
    pub fn hint(&self) -> Option<String> {
        match self {
            EditorError::Io { path, source, .. } if is_permission_denied(source) => {
                Some(permission_hint(path))
            }
            EditorError::Io { path, source, .. } if is_not_found(source) => Some(format!(
                "Check the path is correct; the parent directory of '{}' must exist",
                path.display()
            )),
            EditorError::LineTooLong { .. } | EditorError::NulByte { .. } => Some(
                "Line-oriented operations need text lines within the configured limit; \
                 use -sh or -lsh to inspect the file"
                    .to_string(),
            ),
            _ => None,
        }
    }
}

/// Attach the failed action and path to a raw I/O result.
pub trait IoResultExt<T> {
    fn with_path(self, action: &'static str, path: &Path) -> Result<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path(self, action: &'static str, path: &Path) -> Result<T> {
        self.map_err(|e| EditorError::io(action, path, e))
    }
}

pub fn is_permission_denied(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::PermissionDenied
}

pub fn is_not_found(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::NotFound
}

fn permission_hint(path: &Path) -> String {
    let parent_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| ".".to_string());

    format!(
        "Possible fixes:\n\
         1. Check file permissions: ls -l '{}'\n\
         2. Rewrites create a temporary file next to the target, so '{}' must be writable",
        path.display(),
        parent_dir
    )
}
