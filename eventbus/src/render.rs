//! Renders `SubagentEvent`s to a writer, one line (or pretty block) per
//! event, serialized through a mutex so concurrent posts never interleave
//! within a single line.

use std::io::Write;
use std::sync::Mutex;

use stream_event::SubagentEvent;

/// How much detail the renderer prints per event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    #[default]
    Concise,
    Verbose,
}

pub struct EventRenderer {
    mode: RenderMode,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl EventRenderer {
    pub fn new(mode: RenderMode, writer: Box<dyn Write + Send>) -> Self {
        Self {
            mode,
            writer: Mutex::new(writer),
        }
    }

    /// Builds a renderer writing to the process's stderr.
    pub fn stderr(mode: RenderMode) -> Self {
        Self::new(mode, Box::new(std::io::stderr()))
    }

    /// Renders one event as a single atomic write.
    pub fn render(&self, event: &SubagentEvent) {
        let line = match self.mode {
            RenderMode::Concise => format!("{}\n", event.to_concise_line()),
            RenderMode::Verbose => {
                let pretty = serde_json::to_string_pretty(event)
                    .unwrap_or_else(|_| "<unserializable event>".to_string());
                format!("[{}/{}]\n{}\n", event.subagent_name, event.subagent_run_id, pretty)
            }
        };
        if let Ok(mut w) = self.writer.lock() {
            let _ = w.write_all(line.as_bytes());
            let _ = w.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};

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

    #[test]
    fn concise_mode_renders_one_line_per_event() {
        let buf = SharedBuf::default();
        let renderer = EventRenderer::new(RenderMode::Concise, Box::new(buf.clone()));
        renderer.render(&SubagentEvent::start("summarizer", "run-1"));
        let contents = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.contains("summarizer"));
    }

    #[test]
    fn verbose_mode_pretty_prints_payload() {
        let buf = SharedBuf::default();
        let renderer = EventRenderer::new(RenderMode::Verbose, Box::new(buf.clone()));
        renderer.render(&SubagentEvent::tool_call(
            "s",
            "r1",
            "read",
            "call-1",
            serde_json::json!({"path": "a.rs"}),
        ));
        let contents = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert!(contents.contains("\"path\""));
    }
}
