use anyhow::{Context, Result};
use chrono::Local;
use colored::{ColoredString, Colorize};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use crate::builders::rules::Profile;

/// Severity of a console status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warn,
    Error,
}

/// The `Reporter` trait is the presentation seam of the engine.
///
/// The engine never prints directly; it hands every status line to a reporter
/// so tests can capture output and the CLI can style it.
pub trait Reporter {
    fn status(&self, level: Level, message: &str);

    fn info(&self, message: &str) {
        self.status(Level::Info, message);
    }

    fn success(&self, message: &str) {
        self.status(Level::Success, message);
    }

    fn warn(&self, message: &str) {
        self.status(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        self.status(Level::Error, message);
    }
}

/// A concrete implementation of `Reporter` that prints timestamped, colored
/// lines to the standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn new() -> Self {
        Self
    }

    fn tag(level: Level) -> ColoredString {
        match level {
            Level::Info => "ℹ️  INFO".bright_cyan(),
            Level::Success => "✅ SUCCESS".bright_green(),
            Level::Warn => "⚠️  WARN".bright_yellow(),
            Level::Error => "❌ ERROR".bright_red(),
        }
    }

    /// Formats one status line, e.g. `[14:02:11] ✅ SUCCESS: removed example.top`.
    pub fn format_line(level: Level, message: &str) -> String {
        format!(
            "[{}] {}: {}",
            Local::now().format("%H:%M:%S"),
            Self::tag(level),
            message
        )
    }

    /// Prints the banner that opens every run.
    pub fn banner(&self, title: &str) {
        let divider = "=".repeat(60).bright_cyan();
        println!("\n{divider}");
        println!("{}", title.bold());
        println!("{divider}\n");
    }

    /// Waits for the operator to press Enter, so a double-clicked console
    /// window stays open long enough to read the result.
    pub fn pause(&self) -> Result<()> {
        print!("\nPress Enter to exit...");
        io::stdout().flush().context("Failed to flush stdout")?;
        let mut buf = String::new();
        io::stdin()
            .lock()
            .read_line(&mut buf)
            .context("Failed to read from stdin")?;
        Ok(())
    }
}

impl Reporter for ConsoleReporter {
    fn status(&self, level: Level, message: &str) {
        let line = Self::format_line(level, message);
        if level == Level::Error {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    }
}

/// One line a profile would remove.
#[derive(Debug, Clone, Serialize)]
pub struct ScanMatch {
    pub line_number: usize,
    pub domain: String,
    pub rule: String,
}

/// One matched line whose domain token could not be extracted.
#[derive(Debug, Clone, Serialize)]
pub struct ScanMalformed {
    pub line_number: usize,
    pub line: String,
    pub rule: String,
}

/// Result of a `scan`: everything a profile would do to the file.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub path: PathBuf,
    pub profile: Profile,
    pub matches: Vec<ScanMatch>,
    pub malformed: Vec<ScanMalformed>,
}

impl ScanReport {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize scan report to JSON")
    }

    /// Prints the report as status lines.
    pub fn print(&self, reporter: &dyn Reporter) {
        for m in &self.matches {
            reporter.info(&format!("line {}: {} ({})", m.line_number, m.domain, m.rule));
        }
        for m in &self.malformed {
            reporter.warn(&format!(
                "line {}: matched {} but has no domain token: {}",
                m.line_number, m.rule, m.line
            ));
        }
        reporter.info(&format!(
            "{} line(s) would be removed from {} by profile {}",
            self.matches.len(),
            self.path.display(),
            self.profile
        ));
    }
}
