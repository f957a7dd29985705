//! Client used by a subagent (running in this process or a child process)
//! to post lifecycle events to the root's event bus.

use reqwest::Client;
use stream_event::SubagentEvent;

use crate::error::EventBusError;

/// Environment variable a child process checks to find its parent's event
/// bus; when set, the child posts events there instead of starting its own
/// server.
pub const SUBAGENT_LOGGING_ADDRESS_ENV: &str = "SUBAGENT_LOGGING_ADDRESS";

#[derive(Clone)]
pub struct EventBusClient {
    url: String,
    http: Client,
}

impl EventBusClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: Client::new(),
        }
    }

    /// Reads `SUBAGENT_LOGGING_ADDRESS` from the environment, if present.
    pub fn from_env() -> Option<Self> {
        std::env::var(SUBAGENT_LOGGING_ADDRESS_ENV).ok().map(Self::new)
    }

    /// Posts `event`. Callers distinguish the first `subagent_start` post
    /// (fatal on failure) from later posts (abort generation on failure)
    /// per the fail-fast delivery policy; this method only reports success
    /// or failure, it does not know which event it was given.
    pub async fn post(&self, event: &SubagentEvent) -> Result<(), EventBusError> {
        let resp = self
            .http
            .post(&self.url)
            .json(event)
            .send()
            .await
            .map_err(|e| EventBusError::DeliveryFailed(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(EventBusError::DeliveryFailed(format!(
                "event bus responded with {}",
                resp.status()
            )));
        }
        Ok(())
    }

    /// Posts the `subagent_start` event, mapping failure to the dedicated
    /// start-delivery error so callers can refuse to run rather than
    /// generating with no visibility.
    pub async fn post_start(&self, event: &SubagentEvent) -> Result<(), EventBusError> {
        self.post(event)
            .await
            .map_err(|e| EventBusError::StartDeliveryFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_absent_returns_none() {
        std::env::remove_var(SUBAGENT_LOGGING_ADDRESS_ENV);
        assert!(EventBusClient::from_env().is_none());
    }

    #[test]
    fn from_env_present_builds_client() {
        std::env::set_var(SUBAGENT_LOGGING_ADDRESS_ENV, "http://127.0.0.1:9/events");
        assert!(EventBusClient::from_env().is_some());
        std::env::remove_var(SUBAGENT_LOGGING_ADDRESS_ENV);
    }

    #[tokio::test]
    async fn post_to_unreachable_address_fails() {
        let client = EventBusClient::new("http://127.0.0.1:1/events");
        let err = client.post(&SubagentEvent::start("s", "r")).await.unwrap_err();
        assert!(matches!(err, EventBusError::DeliveryFailed(_)));
    }
}
