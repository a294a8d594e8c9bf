use std::fs;
use std::io::ErrorKind;
use std::os::unix::net::UnixStream as StdUnixStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;

use santa_core::{ActorId, FileGateway, ParticipantName, PersistenceGateway, SeedConfig};
use santa_exchange::{Exchange, ExchangeError, RandomSelector, Selector};
use santa_renderer::{RenderError, Renderer};

use crate::error::{io_err, DaemonError};
use crate::paths::{santa_root, seed_path, snapshot_path, socket_path, templates_dir};
use crate::protocol::{DaemonRequest, DaemonResponse};

/// Startup knobs for [`run`].
#[derive(Debug, Clone, Default)]
pub struct DaemonOptions {
    /// Seed file used when no snapshot exists yet. Falls back to
    /// `~/.santa/seed.yaml`, then to the builtin roster.
    pub seed: Option<PathBuf>,
    /// Fixed RNG seed for reproducible draws.
    pub rng_seed: Option<u64>,
}

/// Exchange plus reply renderer, shared by every client connection.
pub struct Service {
    exchange: Exchange,
    renderer: Renderer,
    started_at_unix: u64,
    home: PathBuf,
}

impl Service {
    pub fn new(exchange: Exchange, renderer: Renderer, home: PathBuf) -> Self {
        Self {
            exchange,
            renderer,
            started_at_unix: unix_seconds_now(),
            home,
        }
    }

    /// Open the on-disk exchange under `home`.
    pub fn open(home: &Path, options: &DaemonOptions) -> Result<Self, DaemonError> {
        let seed = resolve_seed(home, options.seed.as_deref())?;
        let selector: Box<dyn Selector> = match options.rng_seed {
            Some(rng_seed) => Box::new(RandomSelector::seeded(rng_seed)),
            None => Box::new(RandomSelector::from_entropy()),
        };
        let gateway: Arc<dyn PersistenceGateway> = Arc::new(FileGateway::at_home(home));
        let exchange = Exchange::open(gateway, seed, selector)?;
        let renderer = Renderer::with_overrides(&templates_dir(home))?;
        Ok(Self::new(exchange, renderer, home.to_path_buf()))
    }

    pub fn exchange(&self) -> &Exchange {
        &self.exchange
    }

    /// Serve one workflow or status request. `stop` is handled by the
    /// socket layer and never reaches here.
    pub fn dispatch(&self, request: &DaemonRequest) -> DaemonResponse {
        match request.cmd.as_str() {
            "status" => DaemonResponse::ok(self.status_payload()),
            "names" => self.with_actor(request, |actor| {
                let names = self.exchange.list_claimable_names(actor);
                let text = self.render(|r| r.names(&names));
                Ok(reply(&names, text))
            }),
            "propose" => self.with_actor(request, |actor| {
                let Some(name) = request.name.as_deref().map(str::trim).filter(|n| !n.is_empty())
                else {
                    return Ok(DaemonResponse::error("missing 'name'").with_kind("bad_request"));
                };
                let outcome = self.exchange.propose(actor, ParticipantName::from(name))?;
                let text = self.render(|r| r.proposal(&outcome));
                Ok(reply(&outcome, text))
            }),
            "confirm" => self.with_actor(request, |actor| {
                let confirmed = self.exchange.confirm(actor)?;
                let text = self.render(|r| r.confirmed(&confirmed));
                let warning = confirmed.warning.as_ref().map(|w| w.message.clone());
                Ok(reply(&confirmed, text).with_warning(warning))
            }),
            "cancel" => self.with_actor(request, |actor| {
                let cancelled = self.exchange.cancel(actor)?;
                let text = self.render(|r| r.cancelled(&cancelled));
                Ok(reply(&cancelled, text))
            }),
            "task" => self.with_actor(request, |actor| {
                let view = self.exchange.my_assignment(actor);
                let text = self.render(|r| r.assignment(&view));
                Ok(reply(&view, text))
            }),
            other => {
                DaemonResponse::error(format!("unknown command '{other}'")).with_kind("bad_request")
            }
        }
    }

    fn with_actor(
        &self,
        request: &DaemonRequest,
        handler: impl FnOnce(ActorId) -> Result<DaemonResponse, ExchangeError>,
    ) -> DaemonResponse {
        let Some(actor) = request.actor else {
            return DaemonResponse::error(format!("'{}' requires 'actor'", request.cmd))
                .with_kind("bad_request");
        };
        match handler(actor) {
            Ok(response) => response,
            Err(err) => {
                if err.is_fatal() {
                    tracing::error!(actor = %actor, cmd = %request.cmd, error = %err, "request failed");
                } else {
                    tracing::info!(actor = %actor, cmd = %request.cmd, kind = err.kind(), "request rejected");
                }
                let text = self.render(|r| r.error(&err));
                let warning = err.persistence_warning().map(|w| w.message.clone());
                DaemonResponse::error(err.to_string())
                    .with_kind(err.kind())
                    .with_text(text)
                    .with_warning(warning)
            }
        }
    }

    fn render(&self, f: impl FnOnce(&Renderer) -> Result<String, RenderError>) -> Option<String> {
        match f(&self.renderer) {
            Ok(text) => Some(text),
            Err(err) => {
                tracing::warn!(error = %err, "reply rendering failed");
                None
            }
        }
    }

    fn status_payload(&self) -> Value {
        let snapshot = self.exchange.snapshot();
        let claimed = snapshot
            .participants
            .iter()
            .filter(|p| p.is_claimed())
            .count();
        let assigned = snapshot
            .participants
            .iter()
            .filter(|p| p.is_assigned())
            .count();
        json!({
            "running": true,
            "started_at_unix": self.started_at_unix,
            "participants": snapshot.participants.len(),
            "claimed": claimed,
            "assigned": assigned,
            "attributes_left": snapshot.attributes.len(),
            "pending_proposals": self.exchange.pending_proposals(),
            "socket": socket_path(&self.home).display().to_string(),
            "snapshot": snapshot_path(&self.home).display().to_string(),
        })
    }
}

fn reply<T: Serialize>(data: &T, text: Option<String>) -> DaemonResponse {
    match serde_json::to_value(data) {
        Ok(value) => DaemonResponse::ok(value).with_text(text),
        Err(err) => DaemonResponse::error(format!("failed to encode reply: {err}")),
    }
}

fn resolve_seed(home: &Path, explicit: Option<&Path>) -> Result<SeedConfig, DaemonError> {
    let default_seed = seed_path(home);
    let path = match explicit {
        Some(path) => Some(path),
        None if default_seed.exists() => Some(default_seed.as_path()),
        None => None,
    };
    Ok(SeedConfig::load_or_builtin(path)?)
}

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(home: &Path, options: DaemonOptions) -> Result<(), DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(home.to_path_buf(), options))
}

/// Run the daemon runtime.
pub async fn run(home: PathBuf, options: DaemonOptions) -> Result<(), DaemonError> {
    ensure_runtime_dirs(&home)?;

    let service = {
        let home = home.clone();
        tokio::task::spawn_blocking(move || Service::open(&home, &options))
            .await
            .map_err(|err| DaemonError::Protocol(format!("startup join error: {err}")))??
    };
    let service = Arc::new(service);
    tracing::info!(socket = %socket_path(&home).display(), "santa daemon starting");

    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let socket_handle = {
        let shutdown = shutdown_tx.clone();
        let home = home.clone();
        let service = service.clone();
        tokio::spawn(async move {
            let result =
                socket_server_task(home, service, shutdown.clone(), shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down daemon");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(DaemonError::Protocol(format!("ctrl-c handler failed: {err}"))),
                    }
                }
            }
        })
    };

    let (socket_result, signal_result) = tokio::join!(socket_handle, signal_handle);
    handle_join("socket_server", socket_result)?;
    handle_join("signal_handler", signal_result)?;
    tracing::info!("santa daemon stopped");
    Ok(())
}

async fn socket_server_task(
    home: PathBuf,
    service: Arc<Service>,
    shutdown_tx: broadcast::Sender<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let socket = socket_path(&home);
    prepare_socket_for_bind(&socket)?;

    let listener = UnixListener::bind(&socket).map_err(|e| io_err(&socket, e))?;
    set_socket_permissions(&socket)?;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            accepted = listener.accept() => {
                let (stream, _) = accepted.map_err(|e| io_err(&socket, e))?;
                let service = service.clone();
                let shutdown_tx = shutdown_tx.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_socket_client(stream, service, shutdown_tx).await {
                        tracing::error!(error = %err, "socket client error");
                    }
                });
            }
        }
    }

    if socket.exists() {
        let _ = fs::remove_file(&socket);
    }
    Ok(())
}

async fn handle_socket_client(
    stream: UnixStream,
    service: Arc<Service>,
    shutdown_tx: broadcast::Sender<()>,
) -> Result<(), DaemonError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| io_err("daemon socket read", e))?
    {
        if line.trim().is_empty() {
            continue;
        }

        let request: DaemonRequest = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(err) => {
                write_response(
                    &mut writer,
                    &DaemonResponse::error(format!("invalid request JSON: {err}"))
                        .with_kind("bad_request"),
                )
                .await?;
                continue;
            }
        };

        if request.cmd == "stop" {
            let _ = shutdown_tx.send(());
            write_response(&mut writer, &DaemonResponse::ok(json!({ "stopping": true }))).await?;
            break;
        }

        // `confirm` saves synchronously and every call takes the exchange lock.
        let response = {
            let service = service.clone();
            tokio::task::spawn_blocking(move || service.dispatch(&request))
                .await
                .map_err(|err| DaemonError::Protocol(format!("request join error: {err}")))?
        };
        write_response(&mut writer, &response).await?;
    }

    Ok(())
}

fn prepare_socket_for_bind(socket: &Path) -> Result<(), DaemonError> {
    if !socket.exists() {
        return Ok(());
    }

    if StdUnixStream::connect(socket).is_ok() {
        return Err(DaemonError::Protocol(format!(
            "daemon socket already in use: {}",
            socket.display()
        )));
    }
    tracing::warn!(socket = %socket.display(), "removing stale daemon socket before bind");

    match fs::remove_file(socket) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(socket, err)),
    }
}

fn ensure_runtime_dirs(home: &Path) -> Result<(), DaemonError> {
    santa_core::store::ensure_dir(&santa_root(home))?;
    Ok(())
}

async fn write_response(
    writer: &mut OwnedWriteHalf,
    response: &DaemonResponse,
) -> Result<(), DaemonError> {
    let mut payload = serde_json::to_string(response)?;
    payload.push('\n');
    writer
        .write_all(payload.as_bytes())
        .await
        .map_err(|e| io_err("daemon socket write", e))?;
    writer
        .flush()
        .await
        .map_err(|e| io_err("daemon socket flush", e))?;
    Ok(())
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Protocol(format!(
            "{task} task join failure: {err}"
        ))),
    }
}

fn unix_seconds_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("SANTA_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        let _ = fmt().json().with_env_filter(filter).with_target(false).try_init();
    } else {
        let _ = fmt().with_env_filter(filter).with_target(false).try_init();
    }
}

#[cfg(unix)]
fn set_socket_permissions(path: &Path) -> Result<(), DaemonError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_socket_permissions(_path: &Path) -> Result<(), DaemonError> {
    Ok(())
}
