//! Time-ordered task queue for the Looper
//!
//! Entries are keyed by `(deadline, sequence)`: the earliest deadline runs
//! first, and entries with equal deadlines run in insertion order.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use crate::runtime::shared::Shared;
use crate::runtime::task::Runnable;

/// Identifies one queued post.
///
/// Returned by `Looper::post`; pass it to `Looper::cancel` to withdraw the task
/// before it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PostToken {
    deadline: Instant,
    seq: u64,
    looper: u64,
}

impl PostToken {
    /// Absolute time the task becomes due.
    #[inline]
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Insertion sequence number within the owning Looper.
    #[inline]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Id of the Looper the task was posted to.
    #[inline]
    pub fn looper_id(&self) -> u64 {
        self.looper
    }
}

/// Deadline-ordered queue of runnables.
pub struct TimedQueue {
    /// Id stamped into every token.
    looper: u64,
    /// Entries ordered by (deadline, seq).
    entries: BTreeMap<PostToken, Shared<dyn Runnable>>,
    /// Next insertion sequence number.
    next_seq: u64,
}

impl TimedQueue {
    /// Create an empty queue for the given Looper id.
    #[inline]
    pub fn new(looper: u64) -> Self {
        Self {
            looper,
            entries: BTreeMap::new(),
            next_seq: 0,
        }
    }

    /// Insert a runnable due at `deadline`.
    pub fn push(
        &mut self,
        deadline: Instant,
        runnable: Shared<dyn Runnable>,
    ) -> PostToken {
        let token = PostToken {
            deadline,
            seq: self.next_seq,
            looper: self.looper,
        };
        self.next_seq += 1;
        self.entries.insert(token, runnable);
        token
    }

    /// Deadline of the earliest entry.
    #[inline]
    pub fn peek_deadline(&self) -> Option<Instant> {
        self.entries.first_key_value().map(|(token, _)| token.deadline)
    }

    /// Is `token` the earliest entry?
    #[inline]
    pub fn is_first(
        &self,
        token: &PostToken,
    ) -> bool {
        self.entries
            .first_key_value()
            .is_some_and(|(first, _)| first == token)
    }

    /// Remove the earliest entry if it is due at `now`.
    pub fn pop_due(
        &mut self,
        now: Instant,
    ) -> Option<(PostToken, Shared<dyn Runnable>)> {
        match self.peek_deadline() {
            Some(deadline) if deadline <= now => self.entries.pop_first(),
            _ => None,
        }
    }

    /// Remove a specific entry.
    #[inline]
    pub fn remove(
        &mut self,
        token: &PostToken,
    ) -> Option<Shared<dyn Runnable>> {
        if token.looper != self.looper {
            return None;
        }
        self.entries.remove(token)
    }

    /// Take every entry out, in execution order.
    pub fn drain(&mut self) -> Vec<(PostToken, Shared<dyn Runnable>)> {
        std::mem::take(&mut self.entries).into_iter().collect()
    }

    /// Number of queued entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the queue is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for TimedQueue {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("TimedQueue")
            .field("looper", &self.looper)
            .field("len", &self.entries.len())
            .field("next_deadline", &self.peek_deadline())
            .finish()
    }
}
