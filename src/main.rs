use anyhow::Result;
use lined::cli::{self, Args, AssumeYes, Prompt};
use lined::config;
use lined::logger;
use lined::operations::{Confirm, Editor};
use lined::report::ReportFormatter;
use lined::EditorError;
use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    let config = match config::load_config() {
        Ok(config) => config,
        Err(e) => return fail(&e),
    };

    let args = match cli::parse_args(&config.limits) {
        Ok(Ok(args)) => args,
        Ok(Err(e)) => return fail(&e.into()),
        Err(e) => {
            // --help and --version come through here too
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    if let Err(e) = logger::init_debug_logging(config.log.debug()) {
        eprintln!("Warning: {:#}", e);
    }
    tracing::debug!(?args, "parsed command line");

    let editor = Editor::from_config(&config);
    match execute(&editor, args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e),
    }
}

fn fail(err: &anyhow::Error) -> ExitCode {
    tracing::error!(error = %format!("{:#}", err), "command failed");
    eprintln!("Error: {:#}", err);
    if let Some(hint) = err.downcast_ref::<EditorError>().and_then(EditorError::hint) {
        eprintln!("\n{}", hint);
    }
    ExitCode::FAILURE
}

fn confirmer(yes: bool) -> Box<dyn Confirm> {
    if yes {
        Box::new(AssumeYes)
    } else {
        Box::new(Prompt::stdio())
    }
}

fn execute(editor: &Editor, args: Args) -> Result<()> {
    let use_color = ReportFormatter::should_use_color();
    let mut out = BufWriter::new(io::stdout());

    match args {
        Args::Create { file, yes } => {
            editor.create_file(&file, confirmer(yes).as_mut())?;
        }
        Args::Delete { file } => {
            editor.delete_file(&file)?;
        }
        Args::Copy { src, dst, yes } => {
            editor.copy_file(&src, &dst, confirmer(yes).as_mut())?;
        }
        Args::Show { file } => {
            editor.show_file(&file, &mut out)?;
        }
        Args::ShowLine { file, line } => {
            editor.show_line(&file, line, &mut out)?;
        }
        Args::Append { file, text } => {
            editor.append_line(&file, &text)?;
        }
        Args::DeleteLine { file, line } => {
            editor.delete_line(&file, line)?;
        }
        Args::Insert { file, text, line } => {
            editor.insert_line(&file, &text, line)?;
        }
        Args::ReplaceLine { file, text, line } => {
            editor.replace_line(&file, &text, line)?;
        }
        Args::Search { file, key } => {
            let report = editor.search(&file, &key)?;
            write!(out, "{}", ReportFormatter::format_search(&report, use_color))?;
        }
        Args::PatternSearch { file, pattern } => {
            let report = editor.pattern_search(&file, &pattern)?;
            write!(out, "{}", ReportFormatter::format_pattern_search(&report, use_color))?;
        }
        Args::Replace { file, key, sub } => {
            let report = editor.replace(&file, &key, &sub)?;
            write!(out, "{}", ReportFormatter::format_replace(&report, use_color))?;
        }
        Args::Count { file } => {
            let lines = editor.count_lines(&file)?;
            write!(out, "{}", ReportFormatter::format_count(&file, lines))?;
        }
        Args::Log { file } => {
            editor.display_log(file.as_deref(), &mut out)?;
        }
    }

    out.flush()?;
    Ok(())
}
