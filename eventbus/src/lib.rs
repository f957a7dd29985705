//! Subagent lifecycle event bus: an axum HTTP server bound to an ephemeral
//! port (root process only), a client for posting events to it, and
//! mutex-serialized stderr rendering.

mod client;
mod error;
mod render;
mod server;

pub use client::{EventBusClient, SUBAGENT_LOGGING_ADDRESS_ENV};
pub use error::EventBusError;
pub use render::{EventRenderer, RenderMode};
pub use server::EventBusServer;
