//! Notification sink
//!
//! Skips and other resolution notes are reported as plain messages. The
//! transport belongs to the host: a terminal, a log, a push channel.

use std::sync::{Mutex, PoisonError};

/// Receiver for human-readable messages produced during reconciliation
pub trait NotificationSink: Send + Sync {
    /// Deliver one message
    fn notify(&self, message: &str);
}

/// Sink that drops every message
pub struct NoNotify;

impl NotificationSink for NoNotify {
    fn notify(&self, _message: &str) {}
}

/// Sink that forwards messages to the `log` facade at info level
pub struct LogNotify;

impl NotificationSink for LogNotify {
    fn notify(&self, message: &str) {
        log::info!("{}", message);
    }
}

/// Sink that keeps every message in memory, in delivery order
#[derive(Debug, Default)]
pub struct CollectNotify {
    messages: Mutex<Vec<String>>,
}

impl CollectNotify {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages delivered so far
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Take all messages, leaving the sink empty
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(
            &mut *self
                .messages
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }
}

impl NotificationSink for CollectNotify {
    fn notify(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}

impl<T: NotificationSink + ?Sized> NotificationSink for &T {
    fn notify(&self, message: &str) {
        (**self).notify(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_notify_keeps_order() {
        let sink = CollectNotify::new();
        sink.notify("first");
        sink.notify("second");
        assert_eq!(sink.messages(), vec!["first", "second"]);
    }

    #[test]
    fn test_collect_notify_drain() {
        let sink = CollectNotify::new();
        sink.notify("only");
        assert_eq!(sink.drain(), vec!["only"]);
        assert!(sink.messages().is_empty());
    }

    #[test]
    fn test_reference_forwards() {
        let sink = CollectNotify::new();
        let by_ref: &dyn NotificationSink = &sink;
        by_ref.notify("via ref");
        assert_eq!(sink.messages(), vec!["via ref"]);
    }
}
