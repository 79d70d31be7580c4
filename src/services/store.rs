//! Chat store — message log, presence set and per-author inactivity eviction.
//!
//! DESIGN
//! ======
//! All mutable state sits behind one `std::sync::Mutex`. Every operation is
//! synchronous and in-memory, so the lock is never held across an await.
//! Eviction timers are Tokio tasks that sleep until their deadline and then
//! take the same lock before touching the log.
//!
//! Each author owns at most one timer. Re-arming aborts the previous task and
//! bumps a generation counter; a task only evicts if its generation is still
//! the current one, so a task that woke up while a re-arm or clear held the
//! lock does nothing.
//!
//! TRADE-OFFS
//! ==========
//! `last_active_at` is kept per message and bulk-touched on every activity
//! signal for that author. This is an O(n) scan over at most `retention_cap`
//! messages per signal.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use time::OffsetDateTime;
use time::macros::format_description;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::StoreConfig;

// =============================================================================
// TYPES
// =============================================================================

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Strictly increasing identifier, seeded from wall-clock milliseconds.
    pub id: u64,
    pub text: String,
    /// Display name of the sender. Also the only user identifier.
    #[serde(rename = "user")]
    pub author: String,
    /// Opaque client-side user id, stored verbatim when supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// `HH:MM` at creation time (UTC).
    #[serde(rename = "time")]
    pub sent_at: String,
    /// Most recent activity signal seen from `author`.
    #[serde(with = "time::serde::rfc3339")]
    pub last_active_at: OffsetDateTime,
}

/// Consistent view of messages and presence taken under a single lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSnapshot {
    pub messages: Vec<Message>,
    pub online_users: Vec<String>,
}

/// Derived per-author lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorState {
    /// No timer running.
    Absent,
    /// Timer armed by an activity signal.
    Active,
    /// Timer armed by going offline.
    Grace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    Activity,
    Grace,
}

struct ActivityTimer {
    generation: u64,
    kind: TimerKind,
    handle: JoinHandle<()>,
}

struct StoreInner {
    messages: Vec<Message>,
    /// Online authors in join order.
    online: Vec<String>,
    timers: HashMap<String, ActivityTimer>,
    last_id: u64,
    next_generation: u64,
}

// =============================================================================
// STORE
// =============================================================================

/// Process-wide chat state. Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct ChatStore {
    inner: Arc<Mutex<StoreInner>>,
    config: StoreConfig,
}

impl ChatStore {
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreInner {
                messages: Vec::new(),
                online: Vec::new(),
                timers: HashMap::new(),
                last_id: 0,
                next_generation: 0,
            })),
            config: config.normalized(),
        }
    }

    #[must_use]
    pub fn config(&self) -> StoreConfig {
        self.config
    }

    /// Append a message and reset the author's inactivity timer.
    ///
    /// Trims the log back to `retention_keep` once it grows past
    /// `retention_cap`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime (timer tasks are spawned).
    pub fn append_message(&self, author: &str, text: &str, user_id: Option<String>) -> Message {
        let now = OffsetDateTime::now_utc();
        let mut inner = self.lock();

        let id = inner.issue_id(unix_millis());
        let message = Message {
            id,
            text: text.to_owned(),
            author: author.to_owned(),
            user_id,
            sent_at: format_sent_at(now),
            last_active_at: now,
        };
        inner.messages.push(message.clone());
        inner.touch_author(author, now);

        let len = inner.messages.len();
        if len > self.config.retention_cap {
            let drop_count = len - self.config.retention_keep;
            inner.messages.drain(..drop_count);
            debug!(dropped = drop_count, kept = inner.messages.len(), "trimmed message log");
        }

        self.arm_timer(&mut inner, author, TimerKind::Activity);
        debug!(id, author, "message appended");
        message
    }

    /// The most recent `recent_limit` messages, oldest first.
    #[must_use]
    pub fn list_recent_messages(&self) -> Vec<Message> {
        let inner = self.lock();
        inner.recent(self.config.recent_limit)
    }

    /// Recent messages and the online set, read under one lock.
    #[must_use]
    pub fn snapshot(&self) -> ChatSnapshot {
        let inner = self.lock();
        ChatSnapshot { messages: inner.recent(self.config.recent_limit), online_users: inner.online.clone() }
    }

    /// Mark `author` present. Counts as an activity signal.
    ///
    /// Returns the online set after the change.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn mark_online(&self, author: &str) -> Vec<String> {
        let mut inner = self.lock();
        if !inner.online.iter().any(|u| u == author) {
            inner.online.push(author.to_owned());
        }
        inner.touch_author(author, OffsetDateTime::now_utc());
        self.arm_timer(&mut inner, author, TimerKind::Activity);
        debug!(author, online = inner.online.len(), "user online");
        inner.online.clone()
    }

    /// Mark `author` absent and start the grace countdown to eviction.
    ///
    /// Returns the online set after the change.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn mark_offline(&self, author: &str) -> Vec<String> {
        let mut inner = self.lock();
        inner.online.retain(|u| u != author);
        self.arm_timer(&mut inner, author, TimerKind::Grace);
        debug!(author, online = inner.online.len(), "user offline");
        inner.online.clone()
    }

    /// Reset `author`'s inactivity timer and touch their messages.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn record_activity(&self, author: &str) {
        let mut inner = self.lock();
        inner.touch_author(author, OffsetDateTime::now_utc());
        self.arm_timer(&mut inner, author, TimerKind::Activity);
        debug!(author, "activity recorded");
    }

    /// Drop every message and cancel every timer. Returns the previous
    /// message count. Presence is left untouched.
    pub fn clear_all(&self) -> usize {
        let mut inner = self.lock();
        let cleared = inner.messages.len();
        inner.messages.clear();
        let timers = inner.timers.len();
        for (_, timer) in inner.timers.drain() {
            timer.handle.abort();
        }
        info!(cleared, timers, "chat cleared");
        cleared
    }

    #[must_use]
    pub fn online_users(&self) -> Vec<String> {
        self.lock().online.clone()
    }

    #[must_use]
    pub fn message_count(&self) -> usize {
        self.lock().messages.len()
    }

    /// Number of authors with an armed eviction timer.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.lock().timers.len()
    }

    #[must_use]
    pub fn author_state(&self, author: &str) -> AuthorState {
        match self.lock().timers.get(author).map(|t| t.kind) {
            None => AuthorState::Absent,
            Some(TimerKind::Activity) => AuthorState::Active,
            Some(TimerKind::Grace) => AuthorState::Grace,
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cancel any timer for `author` and schedule a fresh one.
    fn arm_timer(&self, inner: &mut StoreInner, author: &str, kind: TimerKind) {
        inner.next_generation += 1;
        let generation = inner.next_generation;
        let handle = spawn_eviction(Arc::downgrade(&self.inner), author.to_owned(), generation, self.config.inactivity);

        let timer = ActivityTimer { generation, kind, handle };
        if let Some(previous) = inner.timers.insert(author.to_owned(), timer) {
            previous.handle.abort();
        }
    }
}

impl Default for ChatStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl StoreInner {
    /// Next id: wall-clock millis, bumped past the previous id on collision.
    fn issue_id(&mut self, now_millis: u64) -> u64 {
        let id = now_millis.max(self.last_id.saturating_add(1));
        self.last_id = id;
        id
    }

    fn recent(&self, limit: usize) -> Vec<Message> {
        let start = self.messages.len().saturating_sub(limit);
        self.messages[start..].to_vec()
    }

    fn touch_author(&mut self, author: &str, at: OffsetDateTime) {
        for message in self.messages.iter_mut().filter(|m| m.author == author) {
            message.last_active_at = at;
        }
    }

    /// Evict `author` if `generation` is still their live timer. Returns the
    /// number of messages removed.
    fn expire(&mut self, author: &str, generation: u64) -> usize {
        // EDGE: a re-arm or clear may have won the lock after this timer woke.
        if self.timers.get(author).map(|t| t.generation) != Some(generation) {
            return 0;
        }
        self.timers.remove(author);

        let before = self.messages.len();
        self.messages.retain(|m| m.author != author);
        let evicted = before - self.messages.len();
        info!(author, evicted, "evicted messages of inactive author");
        evicted
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn spawn_eviction(inner: Weak<Mutex<StoreInner>>, author: String, generation: u64, delay: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let Some(inner) = inner.upgrade() else {
            return;
        };
        let mut guard = inner.lock().unwrap_or_else(PoisonError::into_inner);
        guard.expire(&author, generation);
    })
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

fn format_sent_at(at: OffsetDateTime) -> String {
    at.format(format_description!("[hour]:[minute]")).unwrap_or_default()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
