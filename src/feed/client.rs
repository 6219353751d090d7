use anyhow::{Context, Result};
use async_nats::Client;
use futures::stream::StreamExt;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::backoff::Backoff;
use crate::error::ChatError;
use super::log::RemoteLog;
use super::messages::{FetchRequest, MessageRecord, Snapshot};

/// NATS subjects used by the message log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subjects {
    /// Clients publish `MessageRecord`s here
    pub append: String,
    /// The log server broadcasts a `Snapshot` here after every append
    pub snapshot: String,
    /// Request/reply for the current snapshot
    pub fetch: String,
}

impl Subjects {
    pub fn new(prefix: &str) -> Self {
        Self {
            append: format!("{}.append", prefix),
            snapshot: format!("{}.snapshot", prefix),
            fetch: format!("{}.fetch", prefix),
        }
    }
}

/// Remote log client over NATS
pub struct NatsLog {
    client: Client,
    subjects: Subjects,
}

impl NatsLog {
    /// Connect to NATS server
    pub async fn connect(url: &str, subject_prefix: &str) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self {
            client,
            subjects: Subjects::new(subject_prefix),
        })
    }

    /// Connect, retrying with backoff while the server is unreachable
    ///
    /// Fails with `ChatError::Connection` once the retries are used up.
    pub async fn connect_with_backoff(
        url: &str,
        subject_prefix: &str,
        backoff: &Backoff,
    ) -> Result<Self, ChatError> {
        backoff
            .retry("NATS connect", || Self::connect(url, subject_prefix))
            .await
            .map_err(|e| ChatError::Connection(format!("{:#}", e)))
    }

    async fn fetch_snapshot(&self, limit: usize) -> Result<Snapshot> {
        let request = serde_json::to_vec(&FetchRequest { limit })?;

        let reply = self
            .client
            .request(self.subjects.fetch.clone(), request.into())
            .await
            .context("Failed to fetch current snapshot")?;

        serde_json::from_slice(&reply.payload).context("Failed to parse snapshot reply")
    }
}

#[async_trait::async_trait]
impl RemoteLog for NatsLog {
    async fn subscribe(&self, limit: usize) -> Result<mpsc::Receiver<Snapshot>> {
        // Subscribe before fetching so no append between the two is missed
        let mut subscriber = self
            .client
            .subscribe(self.subjects.snapshot.clone())
            .await
            .context("Failed to subscribe to snapshots")?;

        info!("Subscribed to {}", self.subjects.snapshot);

        let initial = self.fetch_snapshot(limit).await?;

        let (tx, rx) = mpsc::channel(64);
        tx.send(initial.tail(limit)).await?;

        tokio::spawn(async move {
            while let Some(msg) = subscriber.next().await {
                match serde_json::from_slice::<Snapshot>(&msg.payload) {
                    Ok(snapshot) => {
                        if tx.send(snapshot.tail(limit)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Failed to parse snapshot message: {}", e);
                    }
                }
            }

            info!("Snapshot subscription ended");
        });

        Ok(rx)
    }

    async fn append(&self, record: MessageRecord) -> Result<()> {
        let payload = serde_json::to_vec(&record)?;

        self.client
            .publish(self.subjects.append.clone(), payload.into())
            .await
            .context("Failed to publish message record")?;

        info!(
            "Published message record to {} (user={})",
            self.subjects.append, record.username
        );

        Ok(())
    }

    fn name(&self) -> &str {
        "nats"
    }
}
