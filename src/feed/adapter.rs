use serde::Deserialize;
use std::collections::HashSet;
use tracing::debug;

use super::messages::{Message, Snapshot};
use crate::speech::AnnouncementTask;

/// How newly arrived messages are detected between snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Detection {
    /// The last message is new when the list grew strictly longer than a
    /// previous non-empty list.
    ///
    /// Misses messages while the snapshot is at its size cap, and can treat a
    /// re-delivered snapshot after reconnect as new.
    #[default]
    Length,
    /// Every id absent from the previous snapshot is new (in log order)
    Ids,
}

/// Result of reconciling one snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct FeedUpdate {
    /// Replacement for the local message list
    pub messages: Vec<Message>,
    /// Announcements to submit, in order
    pub announcements: Vec<AnnouncementTask>,
}

/// Converts snapshots into the local message list
#[derive(Debug)]
pub struct FeedAdapter {
    detection: Detection,
    /// Whether any snapshot has been applied
    primed: bool,
    previous_len: usize,
    seen_ids: HashSet<String>,
}

impl FeedAdapter {
    pub fn new(detection: Detection) -> Self {
        Self {
            detection,
            primed: false,
            previous_len: 0,
            seen_ids: HashSet::new(),
        }
    }

    /// Decode `snapshot`, work out which messages are new, and return the
    /// replacement list plus announcements for messages from other users.
    pub fn reconcile(&mut self, snapshot: Snapshot, local_username: &str) -> FeedUpdate {
        let messages = snapshot.into_messages();

        let fresh: Vec<&Message> = match self.detection {
            Detection::Length => {
                if self.previous_len > 0 && messages.len() > self.previous_len {
                    messages.last().into_iter().collect()
                } else {
                    Vec::new()
                }
            }
            Detection::Ids => {
                if self.primed {
                    messages
                        .iter()
                        .filter(|m| !self.seen_ids.contains(&m.id))
                        .collect()
                } else {
                    Vec::new()
                }
            }
        };

        let announcements: Vec<AnnouncementTask> = fresh
            .into_iter()
            .filter(|m| m.username != local_username)
            .filter_map(|m| {
                m.text()
                    .map(|text| AnnouncementTask::new(text, m.username.as_str()))
            })
            .collect();

        debug!(
            "Reconciled snapshot: {} -> {} messages, {} announcements",
            self.previous_len,
            messages.len(),
            announcements.len()
        );

        self.primed = true;
        self.previous_len = messages.len();
        if self.detection == Detection::Ids {
            self.seen_ids = messages.iter().map(|m| m.id.clone()).collect();
        }

        FeedUpdate {
            messages,
            announcements,
        }
    }
}
