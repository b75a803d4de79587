use crate::*;
use std::sync::RwLock;

/// Read-only port the ballot store validates votes through.
///
/// Keeping the store behind this trait instead of a concrete registry type
/// lets tests substitute a fake registry, and lets deployments share one
/// registry between the admin surface and the store.
pub trait ElectionLookup: Send + Sync {
    /// Snapshot of the election, or `ElectionNotFound`.
    fn election_view(&self, id: ElectionId) -> Result<ElectionView, ValidationError>;
}

impl ElectionLookup for ElectionRegistry {
    fn election_view(&self, id: ElectionId) -> Result<ElectionView, ValidationError> {
        self.get_election(id).map(Election::view)
    }
}

/// A registry shared between writers and the ballot store.
impl ElectionLookup for RwLock<ElectionRegistry> {
    fn election_view(&self, id: ElectionId) -> Result<ElectionView, ValidationError> {
        // A poisoned lock means a registry writer panicked mid-update and the
        // shared state can no longer be trusted. Propagating the panic here is
        // deliberate: no vote may be validated against a half-written registry.
        let registry = self.read().expect("registry lock poisoned");
        registry.get_election(id).map(Election::view)
    }
}
