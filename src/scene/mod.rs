//! Host scene handles and tracing.
//!
//! Rooms and emitters refer back to the host actors they are attached to
//! without owning them. The host keeps an [`ActorHandle`] alive for as long as
//! the actor exists and hands out [`ActorRef`]s, which can be checked for
//! liveness before use.

pub mod ray_tracer;

pub use ray_tracer::{RayHit, RayTracer, TraceQuery};

use std::sync::{Arc, Weak};

/// Host-side identity of an actor
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(pub u64);

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ActorId({})", self.0)
    }
}

/// Owning handle held by the host for the lifetime of an actor.
///
/// Dropping it invalidates every [`ActorRef`] created from it.
#[derive(Debug)]
pub struct ActorHandle {
    id: ActorId,
    name: String,
    alive: Arc<()>,
}

impl ActorHandle {
    pub fn new(id: ActorId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            alive: Arc::new(()),
        }
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn downgrade(&self) -> ActorRef {
        ActorRef {
            id: self.id,
            name: self.name.clone(),
            alive: Arc::downgrade(&self.alive),
        }
    }
}

/// Non-owning reference to a host actor
#[derive(Debug, Clone)]
pub struct ActorRef {
    id: ActorId,
    name: String,
    alive: Weak<()>,
}

impl ActorRef {
    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_alive(&self) -> bool {
        self.alive.strong_count() > 0
    }

    /// The actor id, if the actor still exists
    pub fn live_id(&self) -> Option<ActorId> {
        self.is_alive().then_some(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_dies_with_handle() {
        let handle = ActorHandle::new(ActorId(3), "Lobby");
        let reference = handle.downgrade();
        assert_eq!(reference.live_id(), Some(ActorId(3)));
        assert_eq!(reference.name(), "Lobby");

        drop(handle);
        assert!(!reference.is_alive());
        assert_eq!(reference.live_id(), None);
    }
}
