//! Santa — gift-exchange claim CLI.
//!
//! # Usage
//!
//! ```text
//! santa init [--seed FILE] [--force]
//! santa status [--json]
//! santa serve [--seed FILE] [--rng-seed N]
//! santa stop
//! santa names --actor ID
//! santa claim --actor ID NAME
//! santa confirm --actor ID
//! santa cancel --actor ID
//! santa task --actor ID
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    client::{ActorArgs, ClaimArgs},
    init::InitArgs,
    serve::ServeArgs,
    status::StatusArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "santa",
    version,
    about = "Secret Santa name claiming and gift pairing",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write the initial participant registry.
    Init(InitArgs),

    /// Show who claimed what and the remaining colour pool.
    Status(StatusArgs),

    /// Run the exchange daemon in the foreground.
    Serve(ServeArgs),

    /// Ask a running daemon to shut down.
    Stop,

    /// List the names an actor may still choose.
    Names(ActorArgs),

    /// Propose a name; it is only taken after `confirm`.
    Claim(ClaimArgs),

    /// Confirm the pending proposal and draw a gift recipient.
    Confirm(ActorArgs),

    /// Drop the pending proposal.
    Cancel(ActorArgs),

    /// Show the actor's gift task.
    Task(ActorArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Serve(args) => args.run(),
        Commands::Stop => commands::serve::stop(),
        Commands::Names(args) => commands::client::names(args),
        Commands::Claim(args) => commands::client::claim(args),
        Commands::Confirm(args) => commands::client::confirm(args),
        Commands::Cancel(args) => commands::client::cancel(args),
        Commands::Task(args) => commands::client::task(args),
    }
}
