//! Registry of canonical keys currently being resolved.
//!
//! Registration is a compare-and-insert on a sharded map, so at most one
//! caller per key is elected to call the oracle. Everyone else attaches to
//! the elected caller's outcome through a watch channel.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use mixit_domain::{CanonicalKey, Element};
use tokio::sync::watch;

use super::error::ResolutionError;

/// Final outcome of one resolution, shared with every attached caller.
#[derive(Debug, Clone)]
pub struct Settled {
    pub element: Element,
    /// False when the element came from a row another writer stored first.
    pub synthesized: bool,
}

pub type Outcome = Result<Settled, ResolutionError>;

type Slot = watch::Receiver<Option<Outcome>>;

#[derive(Default)]
pub struct InFlightRegistry {
    entries: DashMap<CanonicalKey, Slot>,
}

/// Result of trying to register a key.
pub enum Registration {
    /// The caller owns the resolution and must complete the election.
    Elected(Election, Waiter),
    /// Someone else owns it; wait for their outcome.
    Attached(Waiter),
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(self: &Arc<Self>, key: CanonicalKey) -> Registration {
        match self.entries.entry(key) {
            Entry::Occupied(slot) => Registration::Attached(Waiter {
                receiver: slot.get().clone(),
            }),
            Entry::Vacant(slot) => {
                let (sender, receiver) = watch::channel(None);
                slot.insert(receiver.clone());
                Registration::Elected(
                    Election {
                        key,
                        registry: Arc::clone(self),
                        sender,
                        completed: false,
                    },
                    Waiter { receiver },
                )
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: CanonicalKey) -> bool {
        self.entries.contains_key(&key)
    }
}

/// Ownership of an in-flight key.
///
/// Completing (or dropping) the election removes the key from the registry
/// before the outcome is published, so a later caller never attaches to a
/// finished resolution.
pub struct Election {
    key: CanonicalKey,
    registry: Arc<InFlightRegistry>,
    sender: watch::Sender<Option<Outcome>>,
    completed: bool,
}

impl Election {
    pub fn key(&self) -> CanonicalKey {
        self.key
    }

    pub fn complete(mut self, outcome: Outcome) {
        self.publish(outcome);
    }

    fn publish(&mut self, outcome: Outcome) {
        self.completed = true;
        self.registry.entries.remove(&self.key);
        self.sender.send_replace(Some(outcome));
    }
}

impl Drop for Election {
    fn drop(&mut self) {
        if !self.completed {
            tracing::error!(key = %self.key, "Resolution ended without an outcome");
            self.publish(Err(ResolutionError::internal(format!(
                "resolution of {} was aborted",
                self.key
            ))));
        }
    }
}

/// Handle for awaiting the outcome of an in-flight resolution.
///
/// Dropping it only stops this caller from waiting.
pub struct Waiter {
    receiver: Slot,
}

impl Waiter {
    pub async fn outcome(mut self) -> Outcome {
        match self.receiver.wait_for(Option::is_some).await {
            Ok(value) => value
                .clone()
                .unwrap_or_else(|| Err(ResolutionError::internal("empty resolution outcome"))),
            Err(_) => Err(ResolutionError::internal("resolution dropped without outcome")),
        }
    }
}
