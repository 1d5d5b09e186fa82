use crate::config::LimitsConfig;
use crate::error::Result;
use crate::operations::Confirm;
use crate::validate::{check_length, parse_line_number};
use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "

License: MIT
Rust Edition: 2024"
);

/// Single-dash spellings accepted in place of the subcommand names
const LEGACY_FLAGS: &[&str] = &[
    "-cr", "-dl", "-cp", "-sh", "-lsh", "-la", "-ldl", "-lin", "-lrp", "-sch", "-schreg", "-rp",
    "-cl", "-chlog",
];

#[derive(Parser)]
#[command(name = "lined")]
#[command(about = "Line-addressable text file editor with an audit log")]
#[command(long_about = "lined edits text files one line at a time.

Every change is written to a temporary file next to the target and moved into
place in one step, so an interrupted edit never leaves a half-written file.
Each change is recorded in a bounded audit log (editorback.log by default).

Line numbers start at 1. Commands may also be spelled with a single leading
dash, e.g. 'lined -la notes.txt hello'.

EXAMPLES:
  lined cr notes.txt                      Create an empty file
  lined la notes.txt 'first line'         Append a line
  lined lin notes.txt 'new first' 1       Insert before line 1
  lined lrp notes.txt 'replaced' 2        Replace line 2
  lined sh notes.txt                      Show the file with line numbers
  lined rp notes.txt foo bar              Replace every 'foo' with 'bar'
  lined chlog notes.txt                   Show the audit log for notes.txt")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_version = LONG_VERSION)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty file (asks before overwriting an existing one)
    #[command(name = "cr")]
    Create {
        #[arg(value_name = "FILE")]
        file: String,

        /// Overwrite without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// Delete an existing file
    #[command(name = "dl")]
    Delete {
        #[arg(value_name = "FILE")]
        file: String,
    },

    /// Copy a file from SRC to DST
    #[command(name = "cp")]
    Copy {
        #[arg(value_name = "SRC")]
        src: String,

        #[arg(value_name = "DST")]
        dst: String,

        /// Overwrite DST without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// Display the file with line numbers
    #[command(name = "sh")]
    Show {
        #[arg(value_name = "FILE")]
        file: String,
    },

    /// Display a single line
    #[command(name = "lsh")]
    ShowLine {
        #[arg(value_name = "FILE")]
        file: String,

        #[arg(value_name = "LINENUM", allow_hyphen_values = true)]
        line: String,
    },

    /// Append a line to the end of the file
    #[command(name = "la")]
    Append {
        #[arg(value_name = "FILE")]
        file: String,

        #[arg(value_name = "LINE", allow_hyphen_values = true)]
        text: String,
    },

    /// Delete a line
    #[command(name = "ldl")]
    DeleteLine {
        #[arg(value_name = "FILE")]
        file: String,

        #[arg(value_name = "LINENUM", allow_hyphen_values = true)]
        line: String,
    },

    /// Insert a line so that it becomes line LINENUM
    #[command(name = "lin")]
    Insert {
        #[arg(value_name = "FILE")]
        file: String,

        #[arg(value_name = "LINE", allow_hyphen_values = true)]
        text: String,

        #[arg(value_name = "LINENUM", allow_hyphen_values = true)]
        line: String,
    },

    /// Replace line LINENUM with the given text
    #[command(name = "lrp")]
    ReplaceLine {
        #[arg(value_name = "FILE")]
        file: String,

        #[arg(value_name = "LINE", allow_hyphen_values = true)]
        text: String,

        #[arg(value_name = "LINENUM", allow_hyphen_values = true)]
        line: String,
    },

    /// Search for a literal string
    #[command(name = "sch")]
    Search {
        #[arg(value_name = "FILE")]
        file: String,

        #[arg(value_name = "KEY", allow_hyphen_values = true)]
        key: String,
    },

    /// Search for lines matching a regular expression (case-insensitive)
    #[command(name = "schreg")]
    PatternSearch {
        #[arg(value_name = "FILE")]
        file: String,

        #[arg(value_name = "PATTERN", allow_hyphen_values = true)]
        pattern: String,
    },

    /// Replace every occurrence of KEY with SUB
    #[command(name = "rp")]
    Replace {
        #[arg(value_name = "FILE")]
        file: String,

        #[arg(value_name = "KEY", allow_hyphen_values = true)]
        key: String,

        #[arg(value_name = "SUB", allow_hyphen_values = true)]
        sub: String,
    },

    /// Report the number of lines
    #[command(name = "cl")]
    Count {
        #[arg(value_name = "FILE")]
        file: String,
    },

    /// Display the audit log, or only the entries about FILE
    #[command(name = "chlog")]
    Log {
        #[arg(value_name = "FILE")]
        file: Option<String>,
    },
}

/// A parsed and validated command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Args {
    Create { file: PathBuf, yes: bool },
    Delete { file: PathBuf },
    Copy { src: PathBuf, dst: PathBuf, yes: bool },
    Show { file: PathBuf },
    ShowLine { file: PathBuf, line: usize },
    Append { file: PathBuf, text: String },
    DeleteLine { file: PathBuf, line: usize },
    Insert { file: PathBuf, text: String, line: usize },
    ReplaceLine { file: PathBuf, text: String, line: usize },
    Search { file: PathBuf, key: String },
    PatternSearch { file: PathBuf, pattern: String },
    Replace { file: PathBuf, key: String, sub: String },
    Count { file: PathBuf },
    Log { file: Option<String> },
}

/// Rewrite a leading legacy flag (`-la`) into its subcommand name (`la`).
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    let command = args
        .get(1)
        .and_then(|first| first.to_str())
        .filter(|flag| LEGACY_FLAGS.contains(flag))
        .map(|flag| OsString::from(&flag[1..]));
    if let Some(command) = command {
        args[1] = command;
    }
    args
}

/// Parse the process arguments. Usage errors are returned unprinted.
pub fn parse_args(limits: &LimitsConfig) -> std::result::Result<Result<Args>, clap::Error> {
    parse_args_from(std::env::args_os(), limits)
}

pub fn parse_args_from<I, T>(
    args: I,
    limits: &LimitsConfig,
) -> std::result::Result<Result<Args>, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let cli = Cli::try_parse_from(normalize_args(args))?;
    Ok(resolve(cli.command, limits))
}

/// Check argument lengths and parse line numbers. Argument positions are
/// counted the way the legacy form numbers them, the flag being argument 1.
fn resolve(command: Commands, limits: &LimitsConfig) -> Result<Args> {
    let max_path = limits.max_path_length();
    let max_string = limits.max_string_length();
    let path = |value: String, arg: usize| -> Result<PathBuf> {
        check_length(&value, 1, max_path, arg)?;
        Ok(PathBuf::from(value))
    };

    let args = match command {
        Commands::Create { file, yes } => Args::Create {
            file: path(file, 2)?,
            yes,
        },
        Commands::Delete { file } => Args::Delete {
            file: path(file, 2)?,
        },
        Commands::Copy { src, dst, yes } => Args::Copy {
            src: path(src, 2)?,
            dst: path(dst, 3)?,
            yes,
        },
        Commands::Show { file } => Args::Show {
            file: path(file, 2)?,
        },
        Commands::ShowLine { file, line } => Args::ShowLine {
            file: path(file, 2)?,
            line: parse_line_number(&line, 3)?,
        },
        Commands::Append { file, text } => {
            let file = path(file, 2)?;
            check_length(&text, 0, max_string, 3)?;
            Args::Append { file, text }
        }
        Commands::DeleteLine { file, line } => Args::DeleteLine {
            file: path(file, 2)?,
            line: parse_line_number(&line, 3)?,
        },
        Commands::Insert { file, text, line } => {
            let file = path(file, 2)?;
            check_length(&text, 0, max_string, 3)?;
            let line = parse_line_number(&line, 4)?;
            Args::Insert { file, text, line }
        }
        Commands::ReplaceLine { file, text, line } => {
            let file = path(file, 2)?;
            check_length(&text, 0, max_string, 3)?;
            let line = parse_line_number(&line, 4)?;
            Args::ReplaceLine { file, text, line }
        }
        Commands::Search { file, key } => {
            let file = path(file, 2)?;
            check_length(&key, 1, max_string, 3)?;
            Args::Search { file, key }
        }
        Commands::PatternSearch { file, pattern } => {
            let file = path(file, 2)?;
            check_length(&pattern, 1, max_path, 3)?;
            Args::PatternSearch { file, pattern }
        }
        Commands::Replace { file, key, sub } => {
            let file = path(file, 2)?;
            check_length(&key, 1, max_string, 3)?;
            check_length(&sub, 0, max_string, 4)?;
            Args::Replace { file, key, sub }
        }
        Commands::Count { file } => Args::Count {
            file: path(file, 2)?,
        },
        Commands::Log { file } => {
            if let Some(file) = &file {
                check_length(file, 1, max_path, 2)?;
            }
            Args::Log { file }
        }
    };
    Ok(args)
}

/// Asks on `output` and reads a single `y` or `n` answer from `input`.
pub struct Prompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl Prompt<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Confirm for Prompt<R, W> {
    fn confirm(&mut self, prompt: &str) -> io::Result<bool> {
        write!(self.output, "{}", prompt)?;
        loop {
            write!(self.output, "\nConfirm (y/n): ")?;
            self.output.flush()?;

            let mut answer = String::new();
            if self.input.read_line(&mut answer)? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "end of input while waiting for confirmation",
                ));
            }
            match answer.trim_end_matches(['\r', '\n']) {
                "y" => return Ok(true),
                "n" => return Ok(false),
                _ => writeln!(self.output, "Invalid input.")?,
            }
        }
    }
}

/// Approves every overwrite, for `-y/--yes`.
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, _prompt: &str) -> io::Result<bool> {
        Ok(true)
    }
}
