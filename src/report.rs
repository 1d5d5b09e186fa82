use crate::search::{PatternReport, ReplaceReport, SearchReport};
use colored::*;
use std::io::IsTerminal;
use std::path::Path;

pub struct ReportFormatter;

impl ReportFormatter {
    /// Auto-detect if we should use colors
    pub fn should_use_color() -> bool {
        // Check NO_COLOR env var (https://no-color.org/)
        if std::env::var("NO_COLOR").is_ok() {
            return false;
        }

        std::io::stdout().is_terminal()
    }

    fn number(line_number: usize, width: usize, use_color: bool) -> String {
        let prefix = format!("{:0width$} |", line_number, width = width);
        if use_color {
            prefix.dimmed().to_string()
        } else {
            prefix
        }
    }

    fn summary(text: String, use_color: bool) -> String {
        if use_color {
            format!("{}\n", text.bold())
        } else {
            format!("{}\n", text)
        }
    }

    /// Literal search: every matching line with its occurrence count, then
    /// the file-wide total
    pub fn format_search(report: &SearchReport, use_color: bool) -> String {
        let mut output = String::new();

        for m in &report.matches {
            let count = format!("{} instance/s:", m.occurrences);
            let count = if use_color {
                count.yellow().to_string()
            } else {
                count
            };
            output.push_str(&format!(
                "{}\n{}{}\n\n",
                count,
                Self::number(m.line_number, report.width, use_color),
                m.text
            ));
        }

        output.push_str(&Self::summary(
            format!("{} instance/s found in the file.", report.total),
            use_color,
        ));
        output
    }

    /// Pattern search: every matching line, then the number of matching lines
    pub fn format_pattern_search(report: &PatternReport, use_color: bool) -> String {
        let mut output = String::new();

        for m in &report.matches {
            output.push_str(&format!(
                "{}{}\n\n",
                Self::number(m.line_number, report.width, use_color),
                m.text
            ));
        }

        output.push_str(&Self::summary(
            format!("{} line matches found in the file.", report.total()),
            use_color,
        ));
        output
    }

    /// Substring replace: each rewritten line before and after, then the
    /// number of substitutions
    pub fn format_replace(report: &ReplaceReport, use_color: bool) -> String {
        let mut output = String::new();

        for r in &report.replacements {
            let number = Self::number(r.line_number, report.width, use_color);
            if use_color {
                output.push_str(&format!(
                    "{}\n{}{}\n to\n{}{}\n\n",
                    format!("{} substitution/s:", r.occurrences).yellow(),
                    number,
                    r.before.red(),
                    number,
                    r.after.green()
                ));
            } else {
                output.push_str(&format!(
                    "{} substitution/s:\n{}{}\n to\n{}{}\n\n",
                    r.occurrences, number, r.before, number, r.after
                ));
            }
        }

        output.push_str(&Self::summary(
            format!("{} instances replaced in the file.", report.total),
            use_color,
        ));
        output
    }

    pub fn format_count(path: &Path, lines: usize) -> String {
        format!("'{}' has {} lines\n", path.display(), lines)
    }
}
