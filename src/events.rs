//! Progress event vocabulary and output channel.
//!
//! The engine talks to its caller through newline-delimited JSON on stdout:
//! any number of `progress` events followed by exactly one `result` or
//! `error`. Per-document warnings ride on `progress` events with a
//! `Warning:` message prefix; the run keeps going.

use std::io::Write;
use std::sync::Mutex;

use serde::Serialize;
use tracing::warn;

/// One emitted event. Serialized with a lowercase `type` tag so the stream
/// reads `{"type":"progress","percent":40,"message":"..."}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Event {
    Progress {
        percent: u8,
        message: String,
    },
    Result {
        #[serde(flatten)]
        fields: serde_json::Value,
    },
    Error {
        message: String,
    },
}

impl Event {
    pub fn progress(percent: u8, message: impl Into<String>) -> Self {
        Event::Progress {
            percent: percent.min(100),
            message: message.into(),
        }
    }

    pub fn warning(percent: u8, message: impl AsRef<str>) -> Self {
        Event::Progress {
            percent: percent.min(100),
            message: format!("Warning: {}", message.as_ref()),
        }
    }

    pub fn result(fields: serde_json::Value) -> Self {
        Event::Result { fields }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Event::Error {
            message: message.into(),
        }
    }
}

/// Destination for the event stream. Implementations must be safe to share
/// across scan and assembly tasks.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Writes one JSON object per line to stdout, flushing after each event so
/// a supervising process sees progress immediately.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl EventSink for StdoutSink {
    fn emit(&self, event: Event) {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        match serde_json::to_string(&event) {
            Ok(line) => {
                let _ = writeln!(lock, "{line}");
                let _ = lock.flush();
            }
            Err(err) => warn!("failed to serialize event: {err}"),
        }
    }
}

/// Buffering sink for tests and embedding callers.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Event>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut self.events.lock().expect("sink poisoned"))
    }

    pub fn snapshot(&self) -> Vec<Event> {
        self.events.lock().expect("sink poisoned").clone()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: Event) {
        self.events.lock().expect("sink poisoned").push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_serializes_with_type_tag() {
        let json = serde_json::to_string(&Event::progress(40, "Scanning a.pdf")).unwrap();
        assert_eq!(
            json,
            r#"{"type":"progress","percent":40,"message":"Scanning a.pdf"}"#
        );
    }

    #[test]
    fn result_flattens_job_fields() {
        let json = serde_json::to_string(&Event::result(serde_json::json!({
            "success": true,
            "packetsCreated": 2,
        })))
        .unwrap();
        assert!(json.starts_with(r#"{"type":"result""#));
        assert!(json.contains(r#""packetsCreated":2"#));
    }

    #[test]
    fn warning_is_a_progress_event() {
        let event = Event::warning(10, "bad.pdf - parse failure");
        match event {
            Event::Progress { message, .. } => {
                assert!(message.starts_with("Warning: "));
            }
            _ => panic!("expected progress"),
        }
    }

    #[test]
    fn percent_clamps_to_100() {
        match Event::progress(250, "x") {
            Event::Progress { percent, .. } => assert_eq!(percent, 100),
            _ => unreachable!(),
        }
    }
}
