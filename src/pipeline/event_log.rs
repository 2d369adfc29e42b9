//! Event log: the only writer of the timestamped event list

use chrono::{DateTime, Utc};
use std::fmt;
use tokio::sync::{mpsc, oneshot};

/// One timestamped, human-readable event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.timestamp.format("%H:%M:%S%.3f"), self.message)
    }
}

enum LogMessage {
    Append(String),
    Entries(oneshot::Sender<Vec<LogEntry>>),
}

/// Handle to the event log mailbox
#[derive(Clone)]
pub struct EventLog {
    sender: mpsc::UnboundedSender<LogMessage>,
}

impl EventLog {
    /// Spawns the consumer task
    ///
    /// With `mirror` set, every entry is also emitted through `tracing`.
    /// Entries are retained either way.
    pub fn spawn(mirror: bool) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(consume(receiver, mirror));
        Self { sender }
    }

    /// Appends a message; the timestamp is taken by the consumer
    pub fn log(&self, message: impl Into<String>) {
        if self.sender.send(LogMessage::Append(message.into())).is_err() {
            tracing::warn!("Event log consumer has stopped; entry dropped");
        }
    }

    /// Returns every entry appended before this call
    pub async fn entries(&self) -> Vec<LogEntry> {
        let (reply, response) = oneshot::channel();
        if self.sender.send(LogMessage::Entries(reply)).is_err() {
            return Vec::new();
        }
        response.await.unwrap_or_default()
    }
}

async fn consume(mut receiver: mpsc::UnboundedReceiver<LogMessage>, mirror: bool) {
    let mut entries = Vec::new();

    while let Some(message) = receiver.recv().await {
        match message {
            LogMessage::Append(message) => {
                if mirror {
                    tracing::info!("{}", message);
                }
                entries.push(LogEntry {
                    timestamp: Utc::now(),
                    message,
                });
            }
            LogMessage::Entries(reply) => {
                let _ = reply.send(entries.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_entries_keep_arrival_order() {
        let log = EventLog::spawn(false);
        log.log("first");
        log.log("second");
        log.log("third");

        let entries = log.entries().await;
        let messages: Vec<_> = entries.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
        assert!(entries.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[tokio::test]
    async fn test_mirroring_does_not_gate_retention() {
        let quiet = EventLog::spawn(false);
        let loud = EventLog::spawn(true);
        quiet.log("event");
        loud.log("event");

        assert_eq!(quiet.entries().await.len(), 1);
        assert_eq!(loud.entries().await.len(), 1);
    }

    #[test]
    fn test_entry_display() {
        let entry = LogEntry {
            timestamp: "2024-05-01T10:20:30.123Z".parse().unwrap(),
            message: "Scraping https://x.test".to_string(),
        };
        assert_eq!(entry.to_string(), "[10:20:30.123] Scraping https://x.test");
    }
}
