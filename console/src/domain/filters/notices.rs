//! User-facing notices
//!
//! Messages are kept per channel for a fixed time-to-live; readers see the
//! most recent live message. Expiry is evaluated on access.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeChannel {
    /// Save pipeline and general messages
    Main,
    /// Drop and switch rejections on the canvas
    Filter,
    /// Custom criteria block form
    Criteria,
}

#[derive(Debug, Clone)]
struct Notice {
    message: String,
    posted_at: Instant,
}

#[derive(Debug, Clone)]
pub struct NoticeBoard {
    ttl: Duration,
    notices: HashMap<NoticeChannel, Vec<Notice>>,
}

impl NoticeBoard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            notices: HashMap::new(),
        }
    }

    pub fn post(&mut self, channel: NoticeChannel, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(channel = ?channel, message = %message, "Notice posted");
        let now = Instant::now();
        let ttl = self.ttl;
        let entries = self.notices.entry(channel).or_default();
        entries.retain(|n| now.duration_since(n.posted_at) < ttl);
        entries.push(Notice {
            message,
            posted_at: now,
        });
    }

    pub fn post_all<I, S>(&mut self, channel: NoticeChannel, messages: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for message in messages {
            self.post(channel, message);
        }
    }

    /// Live messages on a channel, oldest first
    pub fn messages(&self, channel: NoticeChannel) -> Vec<&str> {
        let now = Instant::now();
        self.notices
            .get(&channel)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|n| now.duration_since(n.posted_at) < self.ttl)
                    .map(|n| n.message.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Message currently displayed on a channel
    pub fn latest(&self, channel: NoticeChannel) -> Option<&str> {
        self.messages(channel).last().copied()
    }

    pub fn clear(&mut self, channel: NoticeChannel) {
        self.notices.remove(&channel);
    }
}
