//! Errors from event bus server startup and event delivery.

use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum EventBusError {
    #[error("failed to bind event bus listener: {0}")]
    Bind(std::io::Error),
    #[error("failed to deliver subagent_start event: {0}")]
    StartDeliveryFailed(String),
    #[error("failed to deliver event during generation: {0}")]
    DeliveryFailed(String),
}
