use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod data;

#[derive(Parser)]
#[command(name = "liftplan-cli", version, about = "Liftplan scheduling CLI")]
struct Cli {
    /// Schedule data file (JSON with workers, events and range)
    #[arg(long, global = true, default_value = "schedule.json")]
    data: PathBuf,

    /// Capacity policy file (TOML); defaults apply when omitted
    #[arg(long, global = true)]
    policy: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Calendar events, filtering and summaries
    Events {
        #[command(subcommand)]
        action: commands::events::EventsAction,
    },
    /// Worker availability matrix
    Availability {
        #[command(subcommand)]
        action: commands::availability::AvailabilityAction,
    },
    /// Conflict detection
    Conflicts {
        #[command(subcommand)]
        action: commands::conflicts::ConflictsAction,
    },
    /// Validate and apply reschedules
    Moves {
        #[command(subcommand)]
        action: commands::moves::MovesAction,
    },
    /// Worker assignment and suggestions
    Assign {
        #[command(subcommand)]
        action: commands::assign::AssignAction,
    },
}

fn main() {
    let cli = Cli::parse();
    let Cli {
        data,
        policy,
        command,
    } = cli;
    let policy = policy.as_deref();

    let result = match command {
        Commands::Events { action } => commands::events::run(action, &data, policy),
        Commands::Availability { action } => commands::availability::run(action, &data, policy),
        Commands::Conflicts { action } => commands::conflicts::run(action, &data, policy),
        Commands::Moves { action } => commands::moves::run(action, &data, policy),
        Commands::Assign { action } => commands::assign::run(action, &data, policy),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
