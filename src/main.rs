use anyhow::{Context, Result};
use clap::Parser;
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};
use std::path::PathBuf;
use std::sync::Arc;

use mirrorsync::config::{load_remote_config, DEFAULT_REMOTE_CONFIG};
use mirrorsync::errorlog::FileErrorLog;
use mirrorsync::settings::{LocalSettings, DEFAULT_LOCAL_CONFIG};
use mirrorsync::sync::SyncManager;
use mirrorsync::ui::Theme;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Mirror flat HTTP autoindex directories onto local disk"
)]
struct Cli {
    /// Remote configuration (base URL and devices)
    #[arg(long, default_value = DEFAULT_REMOTE_CONFIG)]
    remote_config: PathBuf,

    /// Machine-local settings; defaults are used when the file is missing
    #[arg(long, default_value = DEFAULT_LOCAL_CONFIG)]
    local_config: PathBuf,

    /// Concurrent transfers per device, overrides the local settings
    #[arg(short = 'j', long)]
    max_concurrent: Option<usize>,

    /// Directory the error log is written to
    #[arg(long, default_value = ".")]
    error_log_dir: PathBuf,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// No banners and no live progress
    #[arg(short, long)]
    quiet: bool,

    /// Raise diagnostic logging (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let config = ConfigBuilder::new()
        .add_filter_allow_str("mirrorsync")
        .build();
    if let Err(e) = TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto) {
        eprintln!("Failed to initialise logging: {}", e);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let remote = load_remote_config(&cli.remote_config).context("Failed to load remote configuration")?;
    let settings = LocalSettings::load(&cli.local_config).context("Failed to load local settings")?;

    let mut options = settings.to_sync_options(cli.max_concurrent);
    options.quiet = cli.quiet;
    log::info!(
        "Using {} concurrent transfer(s), idle timeout {:?}",
        options.max_concurrent,
        options.idle_timeout
    );

    let theme = if cli.no_color { Theme::plain() } else { Theme::default() };
    let errors = Arc::new(FileErrorLog::new_in(&cli.error_log_dir));

    let manager = SyncManager::new(options, theme, errors).context("Failed to initialise sync")?;
    let summary = manager.run(&remote).await;
    log::info!(
        "Run finished: {} device(s) synced, {} failed, {} error(s) logged",
        summary.reports.len(),
        summary.devices_failed,
        summary.errors_logged
    );

    Ok(())
}
