//! Remote message feed
//!
//! The feed turns a remote, ordered, append-only message log into the local
//! message list:
//! - `RemoteLog` abstracts the log (subscribe to last-N snapshots, append)
//! - `NatsLog` talks to a `LogServer` over NATS
//! - `MemoryLog` keeps the log in-process (tests, local-only sessions)
//! - `FeedAdapter` reconciles each snapshot and detects new messages

pub mod adapter;
pub mod backoff;
pub mod client;
pub mod log;
pub mod messages;
pub mod server;

pub use adapter::{Detection, FeedAdapter, FeedUpdate};
pub use backoff::Backoff;
pub use client::{NatsLog, Subjects};
pub use log::{MemoryLog, RemoteLog};
pub use messages::{log_id, CodeBlock, FetchRequest, MediaType, Message, MessageRecord, Snapshot};
pub use server::LogServer;
