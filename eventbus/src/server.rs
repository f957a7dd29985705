//! Axum server: state, router, and the single `POST /events` handler.
//!
//! Bound to `127.0.0.1:0` so the OS assigns an ephemeral port; the actual
//! address is read back from the listener and advertised to children via
//! `SUBAGENT_LOGGING_ADDRESS`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use stream_event::SubagentEvent;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::EventBusError;
use crate::render::EventRenderer;

#[derive(Clone)]
struct AppState {
    renderer: Arc<EventRenderer>,
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/events", post(post_event))
        .with_state(state)
}

async fn post_event(State(state): State<AppState>, Json(event): Json<SubagentEvent>) -> StatusCode {
    state.renderer.render(&event);
    StatusCode::OK
}

/// A bound, running event bus server. Dropping this does not stop the
/// server; call [`EventBusServer::shutdown`] for a graceful stop.
pub struct EventBusServer {
    pub addr: SocketAddr,
    handle: JoinHandle<()>,
    stop: oneshot::Sender<()>,
}

impl EventBusServer {
    /// Binds an ephemeral port and starts serving in the background.
    pub async fn start(renderer: Arc<EventRenderer>) -> Result<Self, EventBusError> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(EventBusError::Bind)?;
        let addr = listener.local_addr().map_err(EventBusError::Bind)?;
        let app = router(AppState { renderer });
        let (stop, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = stop_rx.await;
            });
            if let Err(e) = serve.await {
                tracing::warn!("event bus server exited: {e}");
            }
        });
        Ok(Self { addr, handle, stop })
    }

    /// URL children should post events to.
    pub fn url(&self) -> String {
        format!("http://{}/events", self.addr)
    }

    /// Signals the server to stop accepting new connections and waits for
    /// any in-flight POST to finish before returning. Called once root
    /// generation completes.
    pub async fn shutdown(self) {
        let _ = self.stop.send(());
        let _ = self.handle.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RenderMode;
    use std::io::Write;
    use std::sync::Mutex as StdMutex;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<StdMutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn posted_event_is_rendered() {
        let buf = SharedBuf::default();
        let renderer = Arc::new(EventRenderer::new(RenderMode::Concise, Box::new(buf.clone())));
        let server = EventBusServer::start(renderer).await.unwrap();

        let client = reqwest::Client::new();
        let resp = client
            .post(server.url())
            .json(&SubagentEvent::start("summarizer", "run-1"))
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success());

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let contents = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert!(contents.contains("summarizer"));
        server.shutdown().await;
    }
}
