//! # Task group with keyed outcomes.
//!
//! [`TaskGroup`] is a [`JoinSet`] that remembers which key each task was spawned
//! for, so completions can be attributed to a unit even when the task panicked or
//! was aborted.
//!
//! ```text
//! spawn(key, fut) ──► JoinSet ──► join_next() ──► (key, Joined::{Finished, Panicked, Aborted})
//!        │                            ▲
//!        └──► keys[task::Id] ─────────┘
//! ```
//!
//! Panics never escape: they surface as [`Joined::Panicked`] for the owning key.

use std::collections::HashMap;
use std::future::Future;

use tokio::task::{self, AbortHandle, JoinSet};

use crate::error::UnitError;

/// How a grouped task ended.
#[derive(Debug)]
pub(crate) enum Joined {
    /// The future ran to completion.
    Finished(Result<(), UnitError>),
    /// The future panicked.
    Panicked,
    /// The task was aborted before completion.
    Aborted,
}

/// Set of concurrently running tasks, each tagged with a key.
pub(crate) struct TaskGroup<K> {
    set: JoinSet<Result<(), UnitError>>,
    keys: HashMap<task::Id, K>,
}

impl<K: Clone> TaskGroup<K> {
    pub(crate) fn new() -> Self {
        Self {
            set: JoinSet::new(),
            keys: HashMap::new(),
        }
    }

    /// Spawns `fut` on the current runtime under `key`.
    ///
    /// # Panics
    /// Panics if called outside of a Tokio runtime.
    pub(crate) fn spawn<F>(&mut self, key: K, fut: F) -> AbortHandle
    where
        F: Future<Output = Result<(), UnitError>> + Send + 'static,
    {
        let handle = self.set.spawn(fut);
        self.keys.insert(handle.id(), key);
        handle
    }

    /// Waits for the next task to end. Returns `None` when the group is empty.
    pub(crate) async fn join_next(&mut self) -> Option<(K, Joined)> {
        loop {
            let (id, joined) = match self.set.join_next_with_id().await? {
                Ok((id, res)) => (id, Joined::Finished(res)),
                Err(err) if err.is_panic() => (err.id(), Joined::Panicked),
                Err(err) => (err.id(), Joined::Aborted),
            };
            if let Some(key) = self.keys.remove(&id) {
                return Some((key, joined));
            }
        }
    }

    /// Keys of tasks that have not been joined yet.
    pub(crate) fn pending(&self) -> Vec<K> {
        self.keys.values().cloned().collect()
    }

    /// Requests abort of every remaining task. Their completions still surface via `join_next`.
    pub(crate) fn abort_all(&mut self) {
        self.set.abort_all();
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.set.len()
    }
}
