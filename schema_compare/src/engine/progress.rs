//! Progress reporting
//!
//! The engine reports through a small listener trait instead of a fixed
//! console sink. Listeners run inline on the comparison's control flow and
//! should return quickly.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

/// One progress notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProgressEvent {
    /// Phase banner, e.g. "Comparing 12 tables"
    Info { message: String },
    /// Emitted after each compared object; `current` is 1-based
    ProgressTick {
        current: usize,
        total: usize,
        label: String,
    },
}

impl ProgressEvent {
    pub fn info(message: impl Into<String>) -> Self {
        ProgressEvent::Info {
            message: message.into(),
        }
    }

    pub fn tick(current: usize, total: usize, label: impl Into<String>) -> Self {
        ProgressEvent::ProgressTick {
            current,
            total,
            label: label.into(),
        }
    }
}

/// Receives progress events from a running comparison
pub trait ProgressListener: Send + Sync {
    fn on_progress(&self, event: ProgressEvent);
}

impl<F> ProgressListener for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Forwards events into an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelProgressListener {
    sender: UnboundedSender<ProgressEvent>,
}

impl ChannelProgressListener {
    pub fn new(sender: UnboundedSender<ProgressEvent>) -> Self {
        Self { sender }
    }
}

impl ProgressListener for ChannelProgressListener {
    fn on_progress(&self, event: ProgressEvent) {
        // A dropped receiver only means nobody is watching anymore
        let _ = self.sender.send(event);
    }
}

/// Writes events to the tracing subscriber
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgressListener;

impl ProgressListener for TracingProgressListener {
    fn on_progress(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Info { message } => info!("{}", message),
            ProgressEvent::ProgressTick {
                current,
                total,
                label,
            } => debug!(current, total, object = %label, "Compared object"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    #[test]
    fn test_closure_listener() {
        let seen = Mutex::new(Vec::new());
        let listener = |event: ProgressEvent| seen.lock().unwrap().push(event);

        listener.on_progress(ProgressEvent::info("Comparing tables"));
        listener.on_progress(ProgressEvent::tick(1, 2, "orders"));

        assert_eq!(
            seen.into_inner().unwrap(),
            vec![
                ProgressEvent::info("Comparing tables"),
                ProgressEvent::tick(1, 2, "orders"),
            ]
        );
    }

    #[tokio::test]
    async fn test_channel_listener() {
        let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();
        let listener = ChannelProgressListener::new(sender);

        listener.on_progress(ProgressEvent::tick(3, 3, "calc_tax(numeric)"));

        assert_eq!(
            receiver.recv().await,
            Some(ProgressEvent::tick(3, 3, "calc_tax(numeric)"))
        );
    }

    #[test]
    fn test_channel_listener_survives_closed_receiver() {
        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        drop(receiver);

        ChannelProgressListener::new(sender).on_progress(ProgressEvent::info("done"));
    }

    #[test]
    fn test_event_json_is_tagged() {
        let json = serde_json::to_string(&ProgressEvent::tick(1, 4, "orders")).unwrap();
        assert_eq!(json, r#"{"type":"ProgressTick","current":1,"total":4,"label":"orders"}"#);
    }
}
