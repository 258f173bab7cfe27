use std::collections::VecDeque;
use std::time::{Duration, Instant};

pub const NOTICE_TTL: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub level: Level,
    pub message: String,
    expires_at: Instant,
}

/// Transient on-screen messages, newest last.
#[derive(Debug)]
pub struct Notifications {
    items: VecDeque<Notice>,
    ttl: Duration,
}

impl Default for Notifications {
    fn default() -> Self {
        Self::new(NOTICE_TTL)
    }
}

impl Notifications {
    const MAX_VISIBLE: usize = 3;

    pub fn new(ttl: Duration) -> Self {
        Self {
            items: VecDeque::new(),
            ttl,
        }
    }

    pub fn push_at(&mut self, level: Level, message: impl Into<String>, now: Instant) {
        self.items.push_back(Notice {
            level,
            message: message.into(),
            expires_at: now + self.ttl,
        });
        while self.items.len() > Self::MAX_VISIBLE {
            self.items.pop_front();
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push_at(Level::Info, message, Instant::now());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push_at(Level::Error, message, Instant::now());
    }

    pub fn prune(&mut self, now: Instant) {
        self.items.retain(|n| n.expires_at > now);
    }

    pub fn visible(&self) -> impl Iterator<Item = &Notice> {
        self.items.iter()
    }

    pub fn latest(&self) -> Option<&Notice> {
        self.items.back()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_notices_are_pruned() {
        let start = Instant::now();
        let mut notes = Notifications::new(Duration::from_secs(2));
        notes.push_at(Level::Error, "first", start);
        notes.push_at(Level::Info, "second", start + Duration::from_secs(1));

        notes.prune(start + Duration::from_millis(2500));
        let left: Vec<_> = notes.visible().map(|n| n.message.as_str()).collect();
        assert_eq!(left, vec!["second"]);

        notes.prune(start + Duration::from_secs(5));
        assert!(notes.latest().is_none());
    }

    #[test]
    fn only_recent_notices_are_kept() {
        let now = Instant::now();
        let mut notes = Notifications::default();
        for i in 0..5 {
            notes.push_at(Level::Info, format!("n{i}"), now);
        }
        assert_eq!(notes.visible().count(), 3);
        assert_eq!(notes.latest().map(|n| n.message.as_str()), Some("n4"));
    }
}
