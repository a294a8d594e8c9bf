//! `santa status` — who claimed which name, who gives to whom.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use santa_core::{store, Participant, RegistrySnapshot};

/// Arguments for `santa status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home_dir()?;
        let path = store::snapshot_path_at(&home);
        let snapshot = store::load_snapshot(&path)
            .with_context(|| format!("failed to read {}", path.display()))?
            .context("no registry found — run `santa init` first")?;

        let report = StatusReport::from(&snapshot);
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize status JSON")?
            );
            return Ok(());
        }

        print_table(report);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct StatusReport {
    summary: StatusSummary,
    participants: Vec<ParticipantRow>,
    remaining_colours: Vec<String>,
}

#[derive(Debug, Serialize)]
struct StatusSummary {
    participants: usize,
    claimed: usize,
    assigned: usize,
    colours_left: usize,
}

#[derive(Debug, Serialize, Tabled)]
struct ParticipantRow {
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "claimed by", display_with = "display_opt")]
    claimed_by: Option<i64>,
    #[tabled(rename = "gives to", display_with = "display_opt")]
    recipient: Option<String>,
    #[tabled(rename = "colour", display_with = "display_opt")]
    colour: Option<String>,
}

fn display_opt<T: ToString>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "-".to_string())
}

impl From<&Participant> for ParticipantRow {
    fn from(p: &Participant) -> Self {
        Self {
            name: p.name.to_string(),
            claimed_by: p.claimed_by.map(|actor| actor.0),
            recipient: p.assignment.as_ref().map(|a| a.recipient.to_string()),
            colour: p.assignment.as_ref().map(|a| a.attribute.to_string()),
        }
    }
}

impl From<&RegistrySnapshot> for StatusReport {
    fn from(snapshot: &RegistrySnapshot) -> Self {
        let participants: Vec<ParticipantRow> =
            snapshot.participants.iter().map(ParticipantRow::from).collect();
        Self {
            summary: StatusSummary {
                participants: participants.len(),
                claimed: snapshot.participants.iter().filter(|p| p.is_claimed()).count(),
                assigned: snapshot.participants.iter().filter(|p| p.is_assigned()).count(),
                colours_left: snapshot.attributes.len(),
            },
            participants,
            remaining_colours: snapshot.attributes.iter().map(ToString::to_string).collect(),
        }
    }
}

fn print_table(report: StatusReport) {
    let summary = &report.summary;
    println!(
        "Santa v{} | {} participants | {} claimed | {} paired | {} colours left",
        env!("CARGO_PKG_VERSION"),
        summary.participants,
        summary.claimed.to_string().green().bold(),
        summary.assigned,
        summary.colours_left,
    );

    let mut table = Table::new(report.participants);
    table.with(Style::rounded());
    println!("{table}");

    if report.remaining_colours.is_empty() {
        println!("{}", "Colour pool is empty.".yellow());
    } else {
        println!("Colours left: {}", report.remaining_colours.join(", "));
    }
}
