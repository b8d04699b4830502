/// Trims a dnsmasq China forwarding list one entry at a time.
///
/// Every removed `server=/<domain>/<ip>` line becomes its own git commit
/// (`accelerated-domains: remove <domain>`), so any single removal can be
/// reverted later without touching the others.
use clap::{Args, Parser, Subcommand};
use dnsmasq_prune::builders::reporter::{ConsoleReporter, Reporter};
use dnsmasq_prune::builders::rules::{DEFAULT_RESOLVER, Profile};
use dnsmasq_prune::core::config::{
    DEFAULT_COMMIT_DELAY_MS, DEFAULT_LOCK_TIMEOUT_MS, PruneSettings, resolve_config_path,
};
use dnsmasq_prune::core::git::Backend;
use dnsmasq_prune::{logging, utils};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "dnsmasq-prune")]
#[command(about = "Remove entries from a dnsmasq forwarding list, one git commit per domain")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Target file [default: <exe dir>/dnsmasq-china-list/accelerated-domains.china.conf]
    #[arg(short, long, global = true, env = "DNSMASQ_PRUNE_CONFIG")]
    config: Option<PathBuf>,

    /// Resolver address the suffix rules expect
    #[arg(long, global = true, default_value = DEFAULT_RESOLVER)]
    resolver: String,

    /// Version-control backend used to stage and commit
    #[arg(long, global = true, value_enum, default_value_t = Backend::Cli, env = "DNSMASQ_PRUNE_BACKEND")]
    backend: Backend,

    /// Pause after each commit, in milliseconds
    #[arg(long, global = true, default_value_t = DEFAULT_COMMIT_DELAY_MS)]
    commit_delay_ms: u64,

    /// Maximum wait for another git process to release the index lock, in milliseconds
    #[arg(long, global = true, default_value_t = DEFAULT_LOCK_TIMEOUT_MS)]
    lock_timeout_ms: u64,

    /// Report what would be removed without writing or committing
    #[arg(long, global = true)]
    dry_run: bool,

    /// Do not wait for Enter before exiting
    #[arg(long, global = true)]
    no_pause: bool,

    /// Raise diagnostic log level (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Remove every `.top` entry
    Top,
    /// Remove every `.xn--fiqs8s` entry and every entry with a CJK domain
    Cn,
    /// Show what a profile would remove, without touching anything
    Scan {
        #[arg(long, value_enum, default_value_t = Profile::Top)]
        profile: Profile,
        #[arg(long, value_enum, default_value_t = utils::OutputFormat::Text)]
        format: utils::OutputFormat,
    },
}

fn settings(global: &GlobalArgs) -> anyhow::Result<PruneSettings> {
    let path = resolve_config_path(global.config.clone())?;
    Ok(PruneSettings {
        resolver: global.resolver.clone(),
        backend: global.backend,
        commit_delay: Duration::from_millis(global.commit_delay_ms),
        lock_timeout: Duration::from_millis(global.lock_timeout_ms),
        dry_run: global.dry_run,
        ..PruneSettings::for_path(path)
    })
}

fn run(cli: &Cli, reporter: &ConsoleReporter) -> anyhow::Result<()> {
    let settings = settings(&cli.global)?;
    match &cli.command {
        Commands::Top => {
            utils::run_prune(&settings, Profile::Top, reporter)?;
        }
        Commands::Cn => {
            utils::run_prune(&settings, Profile::Cn, reporter)?;
        }
        Commands::Scan { profile, format } => {
            utils::run_scan(&settings, *profile, *format, reporter)?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = logging::init(cli.global.verbose, cli.global.quiet) {
        eprintln!("{e:#}");
    }

    let reporter = ConsoleReporter::new();
    let json_output = matches!(
        cli.command,
        Commands::Scan {
            format: utils::OutputFormat::Json,
            ..
        }
    );
    if !json_output {
        reporter.banner("DNSMASQ China list cleanup");
    }

    let code = match run(&cli, &reporter) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            reporter.error(&format!("{e:#}"));
            if let Some(detail) = utils::failure_detail(&e) {
                eprintln!("{detail}");
            }
            ExitCode::FAILURE
        }
    };

    utils::pause_before_exit(&reporter, !cli.global.no_pause && !json_output);
    code
}
