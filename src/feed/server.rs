use anyhow::{Context, Result};
use async_nats::{Client, Message};
use futures::stream::StreamExt;
use tracing::{error, info, warn};

use super::client::Subjects;
use super::log::MemoryLog;
use super::messages::{FetchRequest, MessageRecord};

/// Hosts a `MemoryLog` on NATS
///
/// - `<prefix>.append`: records to append; ids are assigned here
/// - `<prefix>.snapshot`: last-N snapshot broadcast after each append
/// - `<prefix>.fetch`: request/reply for the current snapshot
pub struct LogServer {
    client: Client,
    subjects: Subjects,
    log: MemoryLog,
    limit: usize,
}

impl LogServer {
    pub fn new(client: Client, subject_prefix: &str, log: MemoryLog, limit: usize) -> Self {
        Self {
            client,
            subjects: Subjects::new(subject_prefix),
            log,
            limit,
        }
    }

    /// Serve until both subscriptions end
    pub async fn run(self) -> Result<()> {
        let mut appends = self
            .client
            .subscribe(self.subjects.append.clone())
            .await
            .context("Failed to subscribe to appends")?;
        let mut fetches = self
            .client
            .subscribe(self.subjects.fetch.clone())
            .await
            .context("Failed to subscribe to fetch requests")?;

        info!(
            "Log server listening on {} / {} (snapshot limit={})",
            self.subjects.append, self.subjects.fetch, self.limit
        );

        loop {
            tokio::select! {
                Some(msg) = appends.next() => {
                    if let Err(e) = self.handle_append(msg).await {
                        error!("Failed to handle append: {:#}", e);
                    }
                }
                Some(msg) = fetches.next() => {
                    if let Err(e) = self.handle_fetch(msg).await {
                        error!("Failed to handle fetch: {:#}", e);
                    }
                }
                else => break,
            }
        }

        info!("Log server stopped");
        Ok(())
    }

    async fn handle_append(&self, msg: Message) -> Result<()> {
        let record: MessageRecord = match serde_json::from_slice(&msg.payload) {
            Ok(record) => record,
            Err(e) => {
                warn!("Ignoring malformed record: {}", e);
                return Ok(());
            }
        };

        let id = self.log.push(record).await;
        let snapshot = self.log.snapshot(self.limit).await;
        let payload = serde_json::to_vec(&snapshot)?;

        self.client
            .publish(self.subjects.snapshot.clone(), payload.into())
            .await
            .context("Failed to publish snapshot")?;

        info!("Appended {} and broadcast {} records", id, snapshot.len());
        Ok(())
    }

    async fn handle_fetch(&self, msg: Message) -> Result<()> {
        let Some(reply) = msg.reply else {
            warn!("Fetch request without reply subject");
            return Ok(());
        };

        // An empty or malformed body falls back to the server limit
        let limit = serde_json::from_slice::<FetchRequest>(&msg.payload)
            .map(|req| req.limit.min(self.limit))
            .unwrap_or(self.limit);

        let snapshot = self.log.snapshot(limit).await;
        let payload = serde_json::to_vec(&snapshot)?;

        self.client
            .publish(reply, payload.into())
            .await
            .context("Failed to reply with snapshot")?;

        Ok(())
    }
}
