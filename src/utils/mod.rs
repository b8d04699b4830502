use anyhow::{Context, Result, bail};

use crate::builders::reporter::{ConsoleReporter, Reporter, ScanReport};
use crate::builders::rules::Profile;
use crate::builders::validator::SettingsValidator;
use crate::core::config::PruneSettings;
use crate::core::engine::{self, PruneEngine};
use crate::core::error::PruneError;
use crate::core::store::ConfigFile;

/// Output format of the `scan` command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn validate(settings: &PruneSettings) -> Result<()> {
    let issues = SettingsValidator::new().validate(settings);
    if issues.is_empty() {
        return Ok(());
    }
    for issue in &issues {
        tracing::error!("{issue}");
    }
    bail!("Invalid settings: {}", issues.join("; "));
}

fn build_scan_report(settings: &PruneSettings, profile: Profile) -> Result<ScanReport> {
    let file = ConfigFile::open(&settings.config_path)?;
    let rules = profile.rules(&settings.resolver)?;
    let lines = file.load()?;
    let (matches, malformed) = engine::scan(&lines, &rules);
    Ok(ScanReport {
        path: file.path().to_path_buf(),
        profile,
        matches,
        malformed,
    })
}

/// Runs a profile against the configured file, committing every removal.
/// Returns the number of removed lines.
pub fn run_prune(settings: &PruneSettings, profile: Profile, reporter: &dyn Reporter) -> Result<usize> {
    validate(settings)?;

    if settings.dry_run {
        let report = build_scan_report(settings, profile)?;
        reporter.info("dry run: nothing will be written or committed");
        report.print(reporter);
        return Ok(0);
    }

    let file = ConfigFile::open(&settings.config_path)?;
    reporter.info(&format!("processing {}", file.path().display()));

    let rules = profile.rules(&settings.resolver)?;
    let vcs = settings
        .backend
        .open(file.dir(), settings.lock_timeout)
        .context("Failed to open the git repository holding the config file")?;

    let outcome = PruneEngine::new(&file, vcs.as_ref(), reporter)
        .with_commit_delay(settings.commit_delay)
        .run(&rules)?;

    if !outcome.skipped.is_empty() {
        reporter.warn(&format!(
            "{} matched line(s) were left in place, see warnings above",
            outcome.skipped.len()
        ));
    }
    Ok(outcome.removed_count())
}

/// Reports what a profile would remove, without touching anything.
pub fn run_scan(
    settings: &PruneSettings,
    profile: Profile,
    format: OutputFormat,
    reporter: &dyn Reporter,
) -> Result<()> {
    validate(settings)?;
    let report = build_scan_report(settings, profile)?;
    match format {
        OutputFormat::Text => report.print(reporter),
        OutputFormat::Json => println!("{}", report.to_json()?),
    }
    Ok(())
}

/// Full diagnostic text for a failed run, or `None` when the status line
/// alone says everything. A missing list is an expected outcome, not a crash.
pub fn failure_detail(err: &anyhow::Error) -> Option<String> {
    match err.downcast_ref::<PruneError>() {
        Some(e) if e.is_config_not_found() => None,
        _ => Some(format!("{err:?}")),
    }
}

/// Holds the console open until Enter is pressed, when attached to a terminal.
pub fn pause_before_exit(reporter: &ConsoleReporter, enabled: bool) {
    use std::io::IsTerminal;

    if !enabled || !std::io::stdin().is_terminal() {
        return;
    }
    if let Err(e) = reporter.pause() {
        tracing::debug!(error = %e, "Pause prompt failed");
    }
}
