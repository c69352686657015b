mod commands;

use clap::{Parser, Subcommand};
use commands::{scrape::ScrapeArgs, Context};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "backscroll")]
#[command(about = "Scroll a chat channel back to a date and export every message on the way", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to <data-dir>/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory for config, cookies, browser profile and outputs (defaults to ~/.backscroll)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the channel, scroll back to the start date and export the messages (default)
    Scrape {
        /// Give up after this many cycles (0 for no limit)
        #[arg(long)]
        max_cycles: Option<u32>,

        /// Where to write the CSV file
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Run the browser without a window
        #[arg(long)]
        headless: bool,
    },

    /// Validate the configuration and look for a usable browser
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let ctx = Context::new(cli.data_dir, cli.config);

    match cli.command {
        None => {
            commands::scrape::run(&ctx, ScrapeArgs::default()).await?;
        }
        Some(Commands::Scrape {
            max_cycles,
            output_dir,
            headless,
        }) => {
            let args = ScrapeArgs {
                max_cycles,
                output_dir,
                headless,
            };
            commands::scrape::run(&ctx, args).await?;
        }
        Some(Commands::Check) => {
            commands::check::run(&ctx).await?;
        }
    }

    Ok(())
}
