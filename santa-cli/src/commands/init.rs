//! `santa init [--seed FILE] [--force]`

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use santa_core::{store, SeedConfig};

/// Write the initial participant registry.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// YAML seed with `roster` and `attributes`. Defaults to
    /// ~/.santa/seed.yaml when present, else the builtin roster.
    #[arg(long, value_name = "FILE")]
    pub seed: Option<PathBuf>,

    /// Overwrite an existing registry, discarding every claim in it.
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home_dir()?;
        let snapshot_path = store::snapshot_path_at(&home);
        if snapshot_path.exists() && !self.force {
            bail!(
                "registry already exists at {} (use --force to start over)",
                snapshot_path.display()
            );
        }

        let seed_path = store::seed_path_at(&home);
        let explicit = self.seed.as_deref().or_else(|| {
            seed_path
                .exists()
                .then_some(seed_path.as_path())
        });
        let seed = SeedConfig::load_or_builtin(explicit).context("failed to load seed")?;

        let registry = seed
            .clone()
            .into_registry()
            .context("seed does not describe a valid registry")?;
        store::save_snapshot(&snapshot_path, &registry.snapshot())
            .with_context(|| format!("failed to write {}", snapshot_path.display()))?;

        if !seed_path.exists() {
            let yaml = seed.to_yaml().context("failed to encode seed")?;
            std::fs::write(&seed_path, yaml)
                .with_context(|| format!("failed to write {}", seed_path.display()))?;
        }

        println!(
            "✓ Registry ready: {} participants, {} colours",
            registry.participants().len(),
            registry.attributes().len()
        );
        println!("  Saved to: {}", snapshot_path.display());
        Ok(())
    }
}
