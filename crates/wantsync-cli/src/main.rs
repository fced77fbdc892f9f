use clap::{ArgAction, Args, Parser, Subcommand};
use pvr_sync_models::WantedKind;
use std::path::PathBuf;

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "wantsync")]
#[command(about = "Search your PVRs' wanted lists for missing and cutoff-unmet media")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file path (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Cache directory (defaults to the platform cache directory)
    #[arg(long, global = true, value_name = "DIR")]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for missing media files from the PVR's wanted list
    Missing {
        #[command(flatten)]
        args: WantedArgs,
    },
    /// Search for media files below their configured quality cutoff
    Cutoff {
        #[command(flatten)]
        args: WantedArgs,
    },
}

#[derive(Args)]
struct WantedArgs {
    /// Name of the PVR instance from the config file
    pvr: String,

    /// Refresh the locally stored cache before searching
    #[arg(short, long, action = ArgAction::SetTrue)]
    refresh_cache: bool,

    /// Skip the run when the server's download queue already holds this many items
    #[arg(long, value_name = "N", default_value_t = 5)]
    max_queue_size: usize,

    /// Number of items per search command (must be at least 1)
    #[arg(long, value_name = "N", default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    batch_size: u64,

    /// Also search a final batch smaller than the batch size
    #[arg(long, action = ArgAction::SetTrue)]
    search_trailing: bool,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.quiet)
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let (kind, args) = match cli.command {
        Commands::Missing { args } => (WantedKind::Missing, args),
        Commands::Cutoff { args } => (WantedKind::CutoffUnmet, args),
    };

    commands::wanted::run(kind, args, cli.config, cli.cache_dir).await
}
