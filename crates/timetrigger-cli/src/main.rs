mod cmd;
mod output;
mod settings;

use clap::{Parser, Subcommand};
use settings::Overrides;

#[derive(Parser)]
#[command(
    name = "timetrigger",
    about = "Exit the process at a posted UTC second so the supervisor restarts it",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service (default)
    Serve,

    /// Probe and print host start time and MAC address
    Info,

    /// Print the effective configuration and validate it
    Config,
}

fn main() {
    let started_at = chrono::Utc::now();
    let cli = Cli::parse();

    let default_level = match &cli.command {
        None | Some(Commands::Serve) => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = cli.overrides.resolve().and_then(|config| match cli.command {
        None | Some(Commands::Serve) => cmd::serve::run(config, started_at),
        Some(Commands::Info) => cmd::info::run(&config, started_at, cli.json),
        Some(Commands::Config) => cmd::config::run(&config, cli.json),
    });

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
