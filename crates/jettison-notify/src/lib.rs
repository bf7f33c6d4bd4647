//! Notification channel for the Jettison client.
//!
//! The channel provides a typed notice payload, sequential identifiers, and a
//! bounded in-memory queue of recent notices so presentation layers can render
//! whatever is currently live. Notices auto-expire after a fixed duration
//! unless dismissed earlier. Internally it uses `tokio::broadcast` for live
//! fan-out; when the channel overflows, the oldest notices are dropped.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::broadcast;
use tokio::sync::broadcast::{Receiver, Sender};

/// Identifier assigned to each notice posted on the channel.
pub type NoticeId = u64;

/// Default queue size for the in-memory notice buffer.
const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Default lifetime of a notice before it expires on its own.
const DEFAULT_TTL_SECONDS: i64 = 6;

/// Outcome class of a notice, driving presentation only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// An operation completed successfully.
    Success,
    /// An operation failed.
    Error,
    /// Neutral information for the user.
    Info,
}

/// Optional deep link attached to a notice.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NoticeLink {
    /// Short label for the link action.
    pub label: String,
    /// Absolute URL to open.
    pub url: String,
}

/// User-facing notice payload.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Notice {
    /// Outcome class of the notice.
    pub kind: NoticeKind,
    /// Human-readable message.
    pub message: String,
    /// Optional deep link rendered alongside the message.
    pub link: Option<NoticeLink>,
}

impl Notice {
    /// Convenience constructor for success notices.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
            link: None,
        }
    }

    /// Convenience constructor for error notices.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
            link: None,
        }
    }

    /// Convenience constructor for informational notices.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            message: message.into(),
            link: None,
        }
    }

    /// Attach a deep link to the notice.
    #[must_use]
    pub fn with_link(mut self, label: impl Into<String>, url: impl Into<String>) -> Self {
        self.link = Some(NoticeLink {
            label: label.into(),
            url: url.into(),
        });
        self
    }
}

/// Metadata wrapper around notices. Each envelope tracks the notice id, the
/// posting timestamp, and the instant the notice stops being live.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NoticeEnvelope {
    /// Sequential identifier assigned at post time.
    pub id: NoticeId,
    /// Instant the notice was posted.
    pub posted_at: DateTime<Utc>,
    /// Instant after which the notice is no longer live.
    pub expires_at: DateTime<Utc>,
    /// The notice payload.
    pub notice: Notice,
}

impl NoticeEnvelope {
    /// Whether the notice is still live at the given instant.
    #[must_use]
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Shared notification channel built on top of `tokio::broadcast`.
#[derive(Clone)]
pub struct NotificationChannel {
    sender: Sender<NoticeEnvelope>,
    queue: Arc<Mutex<VecDeque<NoticeEnvelope>>>,
    next_id: Arc<std::sync::atomic::AtomicU64>,
    queue_capacity: usize,
    ttl: TimeDelta,
}

impl NotificationChannel {
    /// Construct a new channel with the provided queue capacity and notice
    /// lifetime.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize, ttl: TimeDelta) -> Self {
        assert!(capacity > 0, "notification queue capacity must be positive");
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            queue: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            next_id: Arc::new(std::sync::atomic::AtomicU64::new(1)),
            queue_capacity: capacity,
            ttl,
        }
    }

    /// Construct a channel with the default queue size and lifetime.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(
            DEFAULT_QUEUE_CAPACITY,
            TimeDelta::seconds(DEFAULT_TTL_SECONDS),
        )
    }

    /// Post a new notice, assigning it a sequential identifier.
    ///
    /// # Panics
    ///
    /// Panics if the queue mutex has been poisoned.
    pub fn post(&self, notice: Notice) -> NoticeId {
        let id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let posted_at = Utc::now();
        let envelope = NoticeEnvelope {
            id,
            posted_at,
            expires_at: posted_at + self.ttl,
            notice,
        };

        {
            let mut queue = self.queue.lock().expect("notice queue mutex poisoned");
            if queue.len() == self.queue_capacity {
                queue.pop_front();
            }
            queue.push_back(envelope.clone());
        }

        let _ = self.sender.send(envelope);
        id
    }

    /// Dismiss a notice before its lifetime elapses.
    ///
    /// Dismissing an unknown (or already expired and pruned) identifier is a
    /// no-op.
    ///
    /// # Panics
    ///
    /// Panics if the queue mutex has been poisoned.
    pub fn dismiss(&self, id: NoticeId) {
        let mut queue = self.queue.lock().expect("notice queue mutex poisoned");
        queue.retain(|envelope| envelope.id != id);
    }

    /// Snapshot the notices that are live right now, oldest first.
    ///
    /// # Panics
    ///
    /// Panics if the queue mutex has been poisoned.
    #[must_use]
    pub fn live(&self) -> Vec<NoticeEnvelope> {
        self.live_at(Utc::now())
    }

    /// Snapshot the notices that are live at the given instant, oldest first.
    ///
    /// # Panics
    ///
    /// Panics if the queue mutex has been poisoned.
    #[must_use]
    pub fn live_at(&self, now: DateTime<Utc>) -> Vec<NoticeEnvelope> {
        let queue = self.queue.lock().expect("notice queue mutex poisoned");
        queue
            .iter()
            .filter(|envelope| envelope.is_live_at(now))
            .cloned()
            .collect()
    }

    /// Subscribe to the channel, replaying any queued notices newer than
    /// `since_id`.
    ///
    /// # Panics
    ///
    /// Panics if the queue mutex has been poisoned.
    #[must_use]
    pub fn subscribe(&self, since_id: Option<NoticeId>) -> NoticeStream {
        let mut backlog = VecDeque::new();
        if let Some(since) = since_id {
            let queue = self.queue.lock().expect("notice queue mutex poisoned");
            for item in queue.iter() {
                if item.id > since {
                    backlog.push_back(item.clone());
                }
            }
        }

        let receiver = self.sender.subscribe();
        NoticeStream { backlog, receiver }
    }

    /// Returns the last assigned identifier, if any notices have been posted.
    ///
    /// # Panics
    ///
    /// Panics if the queue mutex has been poisoned.
    #[must_use]
    pub fn last_notice_id(&self) -> Option<NoticeId> {
        let queue = self.queue.lock().expect("notice queue mutex poisoned");
        queue.back().map(|envelope| envelope.id)
    }
}

impl Default for NotificationChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream wrapper that yields notices either from the replay backlog or from
/// the live broadcast channel.
pub struct NoticeStream {
    backlog: VecDeque<NoticeEnvelope>,
    receiver: Receiver<NoticeEnvelope>,
}

impl NoticeStream {
    /// Receive the next notice, respecting the replay backlog first.
    pub async fn next(&mut self) -> Option<NoticeEnvelope> {
        if let Some(notice) = self.backlog.pop_front() {
            return Some(notice);
        }

        match self.receiver.recv().await {
            Ok(notice) => Some(notice),
            Err(broadcast::error::RecvError::Lagged(_)) => self.receiver.recv().await.ok(),
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }
}
