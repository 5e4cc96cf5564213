use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "taskpool-cli", version, about = "TaskPool CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Remote synchronization
    Sync {
        #[command(subcommand)]
        action: commands::sync::SyncAction,
    },
    /// Sync connection settings
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Local task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Sync { action } => commands::sync::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Task { action } => commands::task::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
