use anyhow::Result;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use super::messages::{log_id, MessageRecord, Snapshot};

/// Buffered snapshots per subscriber
const SUBSCRIBER_CAPACITY: usize = 64;

/// Remote ordered message log
///
/// Implementations:
/// - NATS: `NatsLog`, backed by a `LogServer`
/// - In-process: `MemoryLog`
#[async_trait::async_trait]
pub trait RemoteLog: Send + Sync {
    /// Subscribe to snapshots of the `limit` most recent records
    ///
    /// The current snapshot is delivered first, then a full snapshot after
    /// every change. The channel closes when the subscription is lost.
    async fn subscribe(&self, limit: usize) -> Result<mpsc::Receiver<Snapshot>>;

    /// Append one record; the log assigns its id and position
    async fn append(&self, record: MessageRecord) -> Result<()>;

    /// Log name for logging
    fn name(&self) -> &str;
}

struct Subscriber {
    limit: usize,
    tx: mpsc::Sender<Snapshot>,
}

struct LogInner {
    next_sequence: u64,
    records: VecDeque<(String, MessageRecord)>,
    retain: usize,
    subscribers: Vec<Subscriber>,
}

impl LogInner {
    fn snapshot(&self, limit: usize) -> Snapshot {
        let skip = self.records.len().saturating_sub(limit);
        Snapshot {
            records: self.records.iter().skip(skip).cloned().collect(),
        }
    }
}

/// In-process message log
///
/// Keeps at most `retain` records and pushes a snapshot to every subscriber on
/// each append, in append order. A subscriber whose buffer is full is
/// dropped, which closes its stream.
#[derive(Clone)]
pub struct MemoryLog {
    inner: Arc<Mutex<LogInner>>,
}

impl MemoryLog {
    pub fn new(retain: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LogInner {
                next_sequence: 1,
                records: VecDeque::new(),
                retain: retain.max(1),
                subscribers: Vec::new(),
            })),
        }
    }

    /// Append a record and return its assigned id
    pub async fn push(&self, record: MessageRecord) -> String {
        let mut inner = self.inner.lock().await;

        let id = log_id(inner.next_sequence);
        inner.next_sequence += 1;
        inner.records.push_back((id.clone(), record));
        while inner.records.len() > inner.retain {
            inner.records.pop_front();
        }

        // Delivered while holding the lock so subscribers see appends in order;
        // never awaits, so a stalled subscriber cannot block the log
        let mut open = Vec::with_capacity(inner.subscribers.len());
        for subscriber in std::mem::take(&mut inner.subscribers) {
            let snapshot = inner.snapshot(subscriber.limit);
            match subscriber.tx.try_send(snapshot) {
                Ok(()) => open.push(subscriber),
                Err(TrySendError::Full(_)) => {
                    warn!(
                        "Dropping snapshot subscriber that fell {} snapshots behind",
                        SUBSCRIBER_CAPACITY
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("Dropping closed snapshot subscriber");
                }
            }
        }
        inner.subscribers = open;

        debug!("Appended record {} ({} retained)", id, inner.records.len());
        id
    }

    /// Current snapshot of the `limit` most recent records
    pub async fn snapshot(&self, limit: usize) -> Snapshot {
        self.inner.lock().await.snapshot(limit)
    }

    pub async fn subscriber_count(&self) -> usize {
        self.inner.lock().await.subscribers.len()
    }
}

impl Default for MemoryLog {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[async_trait::async_trait]
impl RemoteLog for MemoryLog {
    async fn subscribe(&self, limit: usize) -> Result<mpsc::Receiver<Snapshot>> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CAPACITY);

        let mut inner = self.inner.lock().await;
        tx.send(inner.snapshot(limit)).await?;
        inner.subscribers.push(Subscriber { limit, tx });

        info!("Subscribed to memory log (limit={})", limit);
        Ok(rx)
    }

    async fn append(&self, record: MessageRecord) -> Result<()> {
        self.push(record).await;
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(username: &str, text: &str, timestamp: i64) -> MessageRecord {
        MessageRecord {
            username: username.to_string(),
            text: Some(text.to_string()),
            timestamp,
            media: None,
            media_type: None,
        }
    }

    #[tokio::test]
    async fn test_ids_follow_append_order() {
        let log = MemoryLog::new(10);
        let first = log.push(record("alice", "one", 1)).await;
        let second = log.push(record("bob", "two", 2)).await;

        assert!(first < second);
        let ids: Vec<_> = log.snapshot(10).await.records.into_keys().collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[tokio::test]
    async fn test_retain_bounds_history() {
        let log = MemoryLog::new(3);
        for i in 0..5 {
            log.push(record("alice", &format!("m{}", i), i)).await;
        }

        let texts: Vec<_> = log
            .snapshot(10)
            .await
            .into_messages()
            .into_iter()
            .filter_map(|m| m.text)
            .collect();
        assert_eq!(texts, vec!["m2", "m3", "m4"]);
    }

    #[tokio::test]
    async fn test_closed_subscribers_are_dropped() {
        let log = MemoryLog::new(10);
        let rx = log.subscribe(5).await.unwrap();
        assert_eq!(log.subscriber_count().await, 1);

        drop(rx);
        log.push(record("alice", "hi", 1)).await;
        assert_eq!(log.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn test_stalled_subscriber_does_not_block_appends() {
        let log = MemoryLog::new(10);
        let mut idle = log.subscribe(5).await.unwrap();

        let pushes = async {
            for i in 0..(SUBSCRIBER_CAPACITY as i64 * 2) {
                log.push(record("alice", "spam", i)).await;
            }
        };
        tokio::time::timeout(std::time::Duration::from_secs(1), pushes)
            .await
            .expect("appends blocked on a stalled subscriber");

        assert_eq!(log.subscriber_count().await, 0);
        assert_eq!(log.snapshot(10).await.len(), 10);

        // The buffered snapshots are still readable, then the stream ends
        let mut received = 0;
        while idle.recv().await.is_some() {
            received += 1;
        }
        assert_eq!(received, SUBSCRIBER_CAPACITY);
    }
}
