//! Thin socket clients for the claim workflow. Each prints the rendered
//! reply the daemon sends back.

use anyhow::{anyhow, Context, Result};
use clap::Args;

use santa_core::{ActorId, ParticipantName};
use santa_daemon::{
    request_cancel, request_confirm, request_names, request_propose, request_task, DaemonError,
    DaemonResponse,
};

#[derive(Args, Debug)]
pub struct ActorArgs {
    /// Requester id (for example a chat user id).
    #[arg(long)]
    pub actor: i64,
}

#[derive(Args, Debug)]
pub struct ClaimArgs {
    #[command(flatten)]
    pub who: ActorArgs,

    /// Roster name to claim.
    pub name: String,
}

pub fn names(args: ActorArgs) -> Result<()> {
    let home = super::home_dir()?;
    print_reply(request_names(&home, ActorId(args.actor)))
}

pub fn claim(args: ClaimArgs) -> Result<()> {
    let home = super::home_dir()?;
    let name = ParticipantName::from(args.name);
    print_reply(request_propose(&home, ActorId(args.who.actor), &name))
}

pub fn confirm(args: ActorArgs) -> Result<()> {
    let home = super::home_dir()?;
    print_reply(request_confirm(&home, ActorId(args.actor)))
}

pub fn cancel(args: ActorArgs) -> Result<()> {
    let home = super::home_dir()?;
    print_reply(request_cancel(&home, ActorId(args.actor)))
}

pub fn task(args: ActorArgs) -> Result<()> {
    let home = super::home_dir()?;
    print_reply(request_task(&home, ActorId(args.actor)))
}

fn print_reply(result: Result<DaemonResponse, DaemonError>) -> Result<()> {
    let response = match result {
        Ok(response) => response,
        Err(DaemonError::DaemonNotRunning { socket }) => {
            return Err(anyhow!(
                "daemon is not running (no socket at {}); start it with `santa serve`",
                socket.display()
            ));
        }
        Err(err) => return Err(err).context("daemon request failed"),
    };

    match (&response.text, &response.data) {
        (Some(text), _) => println!("{text}"),
        (None, Some(data)) => println!(
            "{}",
            serde_json::to_string_pretty(data).context("failed to render reply JSON")?
        ),
        (None, None) => {}
    }
    if let Some(warning) = &response.warning {
        eprintln!("warning: {warning}");
    }

    if response.ok {
        Ok(())
    } else {
        let kind = response.kind.as_deref().unwrap_or("error");
        let message = response.error.as_deref().unwrap_or("request rejected");
        Err(anyhow!("{kind}: {message}"))
    }
}
