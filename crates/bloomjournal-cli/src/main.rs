use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "bloomjournal", version, about = "BloomJournal CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plant lifecycle
    Plant {
        #[command(subcommand)]
        action: commands::plant::PlantAction,
    },
    /// Journal entries
    Entry {
        #[command(subcommand)]
        action: commands::entry::EntryAction,
    },
    /// Entry statistics
    Stats {
        /// User id (defaults to `user.default_id`)
        #[arg(long)]
        user: Option<String>,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// Logs go to stderr so stdout stays machine-readable JSON.
fn setup_logging() {
    let filter = EnvFilter::try_from_env("BLOOMJOURNAL_LOG")
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    setup_logging();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Plant { action } => commands::plant::run(action),
        Commands::Entry { action } => commands::entry::run(action),
        Commands::Stats { user } => commands::stats::run(user),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
