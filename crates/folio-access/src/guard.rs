//! Request sequencing for views that are recomputed while inputs change.
//!
//! Every request for a key gets a ticket with a fresh generation. Starting
//! a newer request for the same key cancels the older one's token, and a
//! result whose ticket is no longer current is discarded instead of being
//! applied. Results are matched by generation, never by arrival order.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};

use folio_core::error::FolioResult;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::AccessError;

#[derive(Debug, Clone)]
pub struct Ticket<K> {
    key: K,
    generation: u64,
    token: CancellationToken,
}

impl<K> Ticket<K> {
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Cancelled as soon as a newer request for the same key begins.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

struct Slot {
    generation: u64,
    token: CancellationToken,
}

struct Inner<K> {
    next: u64,
    slots: HashMap<K, Slot>,
}

pub struct ConsistencyGuard<K> {
    inner: Mutex<Inner<K>>,
}

impl<K> Default for ConsistencyGuard<K> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next: 0,
                slots: HashMap::new(),
            }),
        }
    }
}

impl<K: Eq + Hash + Clone> ConsistencyGuard<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request for `key`, superseding any request in flight for it.
    pub fn begin(&self, key: K) -> Ticket<K> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.next += 1;
        let generation = inner.next;
        let token = CancellationToken::new();
        let previous = inner.slots.insert(
            key.clone(),
            Slot {
                generation,
                token: token.clone(),
            },
        );
        if let Some(previous) = previous {
            debug!(
                superseded = previous.generation,
                by = generation,
                "Cancelling superseded request"
            );
            previous.token.cancel();
        }
        Ticket {
            key,
            generation,
            token,
        }
    }

    pub fn is_current(&self, ticket: &Ticket<K>) -> bool {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Self::current_in(&inner, ticket)
    }

    fn current_in(inner: &Inner<K>, ticket: &Ticket<K>) -> bool {
        inner
            .slots
            .get(&ticket.key)
            .is_some_and(|slot| slot.generation == ticket.generation)
    }

    /// Drive `fut` until it finishes or the ticket is superseded. A result
    /// that arrives after supersession is dropped.
    pub async fn run<F: Future>(&self, ticket: &Ticket<K>, fut: F) -> FolioResult<F::Output> {
        tokio::select! {
            biased;
            _ = ticket.token.cancelled() => Err(AccessError::Superseded.into()),
            output = fut => {
                if self.is_current(ticket) {
                    Ok(output)
                } else {
                    Err(AccessError::Superseded.into())
                }
            }
        }
    }

    /// Run `apply` only if the ticket is still current, atomically with
    /// respect to [`begin`](Self::begin).
    pub fn apply<T>(&self, ticket: &Ticket<K>, apply: impl FnOnce() -> T) -> FolioResult<T> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if Self::current_in(&inner, ticket) {
            Ok(apply())
        } else {
            Err(AccessError::Superseded.into())
        }
    }

    /// Release the slot if this ticket still holds it.
    pub fn finish(&self, ticket: &Ticket<K>) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if Self::current_in(&inner, ticket) {
            inner.slots.remove(&ticket.key);
        }
    }

    /// Run `fetch` as the current request for `key`. Fails with
    /// `Superseded` when a newer request for the same key begins before
    /// the answer is handed back. The slot is released either way.
    pub async fn guarded<T, F>(&self, key: K, fetch: F) -> FolioResult<T>
    where
        F: Future<Output = FolioResult<T>>,
    {
        let ticket = self.begin(key);
        let outcome = self
            .run(&ticket, fetch)
            .await
            .and_then(|result| result)
            .and_then(|value| self.apply(&ticket, || value));
        self.finish(&ticket);
        outcome
    }

    /// Number of keys with a request in flight.
    pub fn in_flight(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .slots
            .len()
    }
}
