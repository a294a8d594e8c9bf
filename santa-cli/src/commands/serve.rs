//! `santa serve` / `santa stop` — daemon lifecycle.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use santa_daemon::{request_stop, start_blocking, DaemonError, DaemonOptions};

/// Run the exchange daemon in the foreground.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Seed used when no registry exists yet.
    #[arg(long, value_name = "FILE")]
    pub seed: Option<PathBuf>,

    /// Fix the RNG seed so draws are reproducible.
    #[arg(long, value_name = "N")]
    pub rng_seed: Option<u64>,
}

impl ServeArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home_dir()?;
        let options = DaemonOptions {
            seed: self.seed,
            rng_seed: self.rng_seed,
        };
        start_blocking(&home, options).context("daemon exited with error")
    }
}

pub fn stop() -> Result<()> {
    let home = super::home_dir()?;
    match request_stop(&home) {
        Ok(()) => println!("daemon stop requested"),
        Err(DaemonError::DaemonNotRunning { .. }) => println!("daemon is not running"),
        Err(err) => return Err(err).context("failed to stop daemon"),
    }
    Ok(())
}
