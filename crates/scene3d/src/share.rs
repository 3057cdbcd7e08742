//! Explicit registry of contexts sharing one GPU object namespace.
//!
//! A context being initialised takes the registry lock through
//! [`SharedContextRegistry::begin_init`], reads which context it should
//! share objects with, and registers itself before the lock is released.
//! Registration ends when the returned [`SharedContextLease`] drops.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

/// Identity of a registered context.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShareHandle(pub usize);

#[derive(Debug, Default)]
struct RegistryState {
    next: usize,
    live: Vec<ShareHandle>,
}

/// Reference-counted; clones refer to the same registry.
#[derive(Debug, Clone, Default)]
pub struct SharedContextRegistry {
    inner: Arc<Mutex<RegistryState>>,
}

impl SharedContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the registry for the duration of one context's initialisation.
    pub fn begin_init(&self) -> ShareHandoff<'_> {
        ShareHandoff {
            registry: self,
            state: self.inner.lock(),
        }
    }

    pub fn live_contexts(&self) -> usize {
        self.inner.lock().live.len()
    }

    /// The context new contexts share objects with: the oldest live one.
    pub fn share_source(&self) -> Option<ShareHandle> {
        self.inner.lock().live.first().copied()
    }
}

/// Registry lock held while a context initialises.
pub struct ShareHandoff<'a> {
    registry: &'a SharedContextRegistry,
    state: MutexGuard<'a, RegistryState>,
}

impl ShareHandoff<'_> {
    pub fn share_source(&self) -> Option<ShareHandle> {
        self.state.live.first().copied()
    }

    /// Registers the new context and releases the lock.
    pub fn complete(mut self) -> SharedContextLease {
        let handle = ShareHandle(self.state.next);
        self.state.next += 1;
        self.state.live.push(handle);
        debug!(
            handle = handle.0,
            live = self.state.live.len(),
            "context joined share group"
        );
        SharedContextLease {
            registry: self.registry.clone(),
            handle,
        }
    }
}

/// Membership of one context in a [`SharedContextRegistry`].
#[derive(Debug)]
pub struct SharedContextLease {
    registry: SharedContextRegistry,
    handle: ShareHandle,
}

impl SharedContextLease {
    pub fn handle(&self) -> ShareHandle {
        self.handle
    }

    pub fn registry(&self) -> &SharedContextRegistry {
        &self.registry
    }
}

impl Drop for SharedContextLease {
    fn drop(&mut self) {
        let mut state = self.registry.inner.lock();
        state.live.retain(|h| *h != self.handle);
        debug!(handle = self.handle.0, live = state.live.len(), "context left share group");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_live_context_is_the_share_source() {
        let registry = SharedContextRegistry::new();
        let first = registry.begin_init();
        assert_eq!(first.share_source(), None);
        let a = first.complete();

        let handoff = registry.begin_init();
        assert_eq!(handoff.share_source(), Some(a.handle()));
        let b = handoff.complete();
        assert_eq!(registry.live_contexts(), 2);

        drop(a);
        assert_eq!(registry.share_source(), Some(b.handle()));
        drop(b);
        assert_eq!(registry.live_contexts(), 0);
    }
}
