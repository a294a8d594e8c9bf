//! Santa daemon: owns the exchange and serves it over a Unix socket.

mod error;
pub mod paths;
pub mod protocol;
mod runtime;

pub use error::DaemonError;
pub use protocol::{
    request_cancel, request_confirm, request_names, request_propose, request_status,
    request_stop, request_task, send_request, DaemonRequest, DaemonResponse,
};
pub use runtime::{run, start_blocking, DaemonOptions, Service};
