//! Single-writer serialization points
//!
//! Many concurrent fetch tasks produce records and events; each shared
//! collection is owned by exactly one consumer task draining an unbounded
//! mailbox, so mutations are applied one at a time, in arrival order, without
//! locks:
//! - [`Ingestion`] owns the result store (dedup-insert, failed URLs)
//! - [`EventLog`] owns the timestamped event list
//!
//! Mailboxes are FIFO, so a snapshot requested after a send always observes
//! that send.

mod event_log;
mod ingest;

pub use event_log::{EventLog, LogEntry};
pub use ingest::{Ingestion, Transform};
