//! USB device name enumerator - CLI entry point.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use std::io::{Write, stdout};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use usbnames::config::{Config, OutputMode, example_config};
use usbnames::host::HostSession;
use usbnames::sysfs::SysfsSession;
use usbnames::walker::{Walker, write_header};

#[derive(Parser)]
#[command(name = "usbnames")]
#[command(about = "Print the names of attached USB devices")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file path (default: auto-detect)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory listing USB devices (default: /sys/bus/usb/devices)
    #[arg(long)]
    sysfs_root: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print "<manufacturer> <product>" for every non-hub device
    Names,

    /// Dump every device with its full descriptor tree
    Tree,

    /// Print blank example config file
    InitConfig,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Commands that need neither config nor a USB session
    let forced_mode = match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "usbnames", &mut std::io::stdout());
            return Ok(());
        }
        Some(Commands::InitConfig) => {
            print!("{}", example_config());
            return Ok(());
        }
        Some(Commands::Names) => Some(OutputMode::Names),
        Some(Commands::Tree) => Some(OutputMode::Tree),
        None => None,
    };

    // Load config
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    init_logging(&config.settings.log_filter);

    let mode = forced_mode.unwrap_or(config.settings.mode);
    let sysfs_root = cli.sysfs_root.unwrap_or(config.settings.sysfs_root);

    // No session, no enumeration: this error ends the process
    let session = SysfsSession::open_at(&sysfs_root)?;

    let mut out = stdout().lock();
    write_header(&session, &mut out)?;

    let root = session.root_device();
    let mut walker = Walker::new(&session, &mut out);
    match mode {
        OutputMode::Names => {
            walker.enumerate_names(root)?;
            let summary = walker.summary();
            info!(
                hubs = summary.hubs,
                named = summary.named,
                unnamed = summary.unnamed,
                skipped = summary.skipped,
                "walk complete"
            );
        }
        OutputMode::Tree => {
            walker.dump_device_tree(root)?;
        }
    }
    out.flush()?;

    Ok(())
}

fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
