//! lined: a line-addressable text file editor
//!
//! Files are edited one line at a time. Every rewrite goes through a
//! temporary file that is moved over the target in one step, and every
//! content change is recorded in a bounded audit log. The binary is at
//! src/main.rs.

pub mod audit_log;
pub mod cli;
pub mod config;
pub mod error;
pub mod logger;
pub mod operations;
pub mod report;
pub mod rewriter;
pub mod scanner;
pub mod search;
pub mod validate;

// Re-export commonly used types for convenience
pub use audit_log::{Action, AuditLog, LogEntry};
pub use config::Config;
pub use error::{EditorError, Result};
pub use operations::{Confirm, Editor};
pub use rewriter::{LineEdit, Rewrite};
pub use search::{PatternReport, ReplaceReport, SearchReport};
