use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// Maximum number of simultaneously held notices; the oldest is dropped first.
pub const MAX_NOTICES: usize = 4;

/// Category of a short-lived on-screen notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeKind {
    FlagPulled,
    FirstDown,
    Turnover,
    Touchdown,
    SpotPending,
    GameOver,
    Info,
}

/// A notice that stays visible until `expires_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
    pub expires_at: Timestamp,
}

/// Expiring notices the presentation layer polls instead of scheduling timers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedbackBoard {
    notices: Vec<Notice>,
}

impl FeedbackBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: NoticeKind, text: impl Into<String>, now: Timestamp, ttl: f32) {
        if self.notices.len() >= MAX_NOTICES {
            self.notices.remove(0);
        }
        self.notices.push(Notice {
            kind,
            text: text.into(),
            expires_at: now.after(ttl),
        });
    }

    /// Notices still visible at `now`, oldest first.
    pub fn active(&self, now: Timestamp) -> impl Iterator<Item = &Notice> {
        self.notices.iter().filter(move |n| n.expires_at > now)
    }

    /// Drop every notice that has expired by `now`.
    pub fn prune(&mut self, now: Timestamp) {
        self.notices.retain(|n| n.expires_at > now);
    }

    pub fn clear(&mut self) {
        self.notices.clear();
    }

    pub fn len(&self) -> usize {
        self.notices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }
}
