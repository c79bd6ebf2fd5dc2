//! Async result correlator.
//!
//! A keyed table of pending results. A producer reserves a slot when it
//! starts work whose result arrives later, resolves it through the returned
//! token, and a consumer takes the resolved payload out on the same or a
//! later tick. A sequence reset invalidates every slot and every token.
//!
//! # Example
//!
//! ```
//! use scheduler::{AsyncCorrelator, FrameKey};
//!
//! let mut correlator: AsyncCorrelator<FrameKey, u32> = AsyncCorrelator::new();
//! let token = correlator.reserve(FrameKey::new(7)).unwrap();
//! assert_eq!(correlator.take_resolved(&FrameKey::new(7)), None);
//!
//! correlator.resolve(token, 42).unwrap();
//! assert_eq!(correlator.take_resolved(&FrameKey::new(7)), Some(42));
//! assert_eq!(correlator.take_resolved(&FrameKey::new(7)), None);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use contracts::Ident;
use metrics::counter;
use slab::Slab;
use tracing::debug;

use crate::error::{InvalidTokenReason, Result, SchedulerError};

/// Correlator key used by the scheduler state
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameKey {
    pub frame_index: u64,
    /// Producer-defined qualifier, e.g. the sensor that requested the work
    pub sub_key: Option<Ident>,
}

impl FrameKey {
    pub fn new(frame_index: u64) -> Self {
        Self {
            frame_index,
            sub_key: None,
        }
    }

    pub fn with_sub_key(mut self, sub_key: impl Into<Ident>) -> Self {
        self.sub_key = Some(sub_key.into());
        self
    }
}

impl From<u64> for FrameKey {
    fn from(frame_index: u64) -> Self {
        Self::new(frame_index)
    }
}

impl fmt::Display for FrameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sub_key {
            Some(sub_key) => write!(f, "frame {}/{}", self.frame_index, sub_key),
            None => write!(f, "frame {}", self.frame_index),
        }
    }
}

/// Proof of a reservation, redeemed by [`AsyncCorrelator::resolve`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationToken {
    slot: usize,
    serial: u64,
    epoch: u64,
}

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    serial: u64,
    payload: Option<V>,
}

/// Pending-work table keyed by `K`
#[derive(Debug)]
pub struct AsyncCorrelator<K, V> {
    entries: Slab<Entry<K, V>>,
    index: HashMap<K, usize>,
    /// Never reused, so stale tokens cannot hit a recycled slot
    next_serial: u64,
    /// Bumped by `invalidate_all`
    epoch: u64,
}

impl<K, V> Default for AsyncCorrelator<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> AsyncCorrelator<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    pub fn new() -> Self {
        Self {
            entries: Slab::new(),
            index: HashMap::new(),
            next_serial: 0,
            epoch: 0,
        }
    }

    /// Reserve the slot for `key`.
    ///
    /// Fails with `Conflict` while any entry exists for the key, pending or
    /// resolved but not yet taken. An untaken payload is never overwritten.
    pub fn reserve(&mut self, key: K) -> Result<ReservationToken> {
        if let Some(&slot) = self.index.get(&key) {
            let resolved = self.entries[slot].payload.is_some();
            counter!("capture_scheduler_correlator_conflicts_total").increment(1);
            debug!(key = ?key, resolved, "reservation conflict");
            return Err(SchedulerError::Conflict {
                key: format!("{key:?}"),
            });
        }

        let serial = self.next_serial;
        self.next_serial += 1;
        let slot = self.entries.insert(Entry {
            key: key.clone(),
            serial,
            payload: None,
        });
        self.index.insert(key, slot);

        Ok(ReservationToken {
            slot,
            serial,
            epoch: self.epoch,
        })
    }

    /// Attach the payload to a reserved entry.
    pub fn resolve(&mut self, token: ReservationToken, payload: V) -> Result<()> {
        if token.epoch > self.epoch || token.serial >= self.next_serial {
            return Err(SchedulerError::invalid_token(InvalidTokenReason::Unknown));
        }
        if token.epoch < self.epoch {
            return Err(SchedulerError::invalid_token(
                InvalidTokenReason::Invalidated,
            ));
        }

        // A current-epoch entry only disappears after it was resolved
        match self
            .entries
            .get_mut(token.slot)
            .filter(|entry| entry.serial == token.serial)
        {
            Some(entry) if entry.payload.is_none() => {
                entry.payload = Some(payload);
                Ok(())
            }
            _ => Err(SchedulerError::invalid_token(
                InvalidTokenReason::AlreadyResolved,
            )),
        }
    }

    /// Resolve the pending entry for `key` without its token.
    pub fn resolve_key(&mut self, key: &K, payload: V) -> Result<()> {
        let slot = self
            .index
            .get(key)
            .copied()
            .ok_or(SchedulerError::invalid_token(InvalidTokenReason::Unknown))?;
        let entry = &mut self.entries[slot];
        if entry.payload.is_some() {
            return Err(SchedulerError::invalid_token(
                InvalidTokenReason::AlreadyResolved,
            ));
        }
        entry.payload = Some(payload);
        Ok(())
    }

    /// Remove and return the payload for `key` once it is resolved.
    ///
    /// `None` when the key was never reserved or its work is still pending.
    pub fn take_resolved(&mut self, key: &K) -> Option<V> {
        let slot = *self.index.get(key)?;
        self.entries[slot].payload.as_ref()?;
        self.index.remove(key);
        self.entries.remove(slot).payload
    }

    /// Drop every entry and void all outstanding tokens.
    pub fn invalidate_all(&mut self) -> usize {
        let dropped = self.entries.len();
        let pending = self.pending_count();
        self.entries.clear();
        self.index.clear();
        self.epoch += 1;
        if dropped > 0 {
            debug!(dropped, pending, epoch = self.epoch, "correlator entries invalidated");
        }
        dropped
    }

    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    pub fn is_resolved(&self, key: &K) -> bool {
        self.index
            .get(key)
            .is_some_and(|&slot| self.entries[slot].payload.is_some())
    }

    /// Keys still waiting for a payload
    pub fn pending_keys(&self) -> impl Iterator<Item = &K> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.payload.is_none())
            .map(|(_, entry)| &entry.key)
    }

    pub fn pending_count(&self) -> usize {
        self.pending_keys().count()
    }

    pub fn resolved_count(&self) -> usize {
        self.len() - self.pending_count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
