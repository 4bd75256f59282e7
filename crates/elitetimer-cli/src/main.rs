use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "elitetimer-cli", version, about = "Elite Timer CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a new interval session in this terminal
    Run(commands::session::RunArgs),
    /// Continue the saved session
    Resume(commands::session::ResumeArgs),
    /// Show the saved session, if any
    Status,
    /// Delete the saved session
    Discard,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// Log to stderr, filtered by ELITETIMER_LOG (default: warn).
fn init_tracing() {
    let filter = EnvFilter::try_from_env("ELITETIMER_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run(args) => commands::session::run(args),
        Commands::Resume(args) => commands::session::resume(args),
        Commands::Status => commands::session::status(),
        Commands::Discard => commands::session::discard(),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
