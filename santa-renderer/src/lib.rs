//! # santa-renderer
//!
//! Tera-based reply rendering for the gift-exchange workflow. Every outcome
//! the exchange can produce maps onto one embedded template; a directory of
//! `.tera` files can override any of them.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use santa_core::ActorId;
//! use santa_exchange::Exchange;
//! use santa_renderer::Renderer;
//!
//! fn reply_names(exchange: &Exchange, actor: ActorId) -> Option<String> {
//!     let renderer = Renderer::new().ok()?;
//!     renderer.names(&exchange.list_claimable_names(actor)).ok()
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::{AssignmentCtx, ReplyContext};
pub use engine::{Renderer, ReplyKind, TemplateEngine};
pub use error::RenderError;
