//! Direct-pairs view cache
//!
//! The list of pairs with an active relationship is read far more often than
//! it changes, so it is computed lazily and cached until the next mutation.
//!
//! ```text
//! writer:  mutate pair ──► invalidate()  (generation += 1)
//! reader:  get_or_compute()
//!            ├─ cached.generation == generation ──► return cached
//!            └─ otherwise compute, store tagged with the generation read
//!               *before* computing, return fresh
//! ```
//!
//! If a writer invalidates while a reader is computing, the stored value is
//! tagged with the older generation and the next read recomputes. A reader
//! may see the view from just before the latest mutation, never one that
//! stays stale past the next read.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::types::PairHandle;

struct CachedView {
    generation: u64,
    pairs: Arc<Vec<PairHandle>>,
}

/// Lazily recomputed, invalidate-on-write list of direct pairs
pub struct DirectPairsView {
    generation: AtomicU64,
    cached: RwLock<Option<CachedView>>,
    recomputes: AtomicU64,
}

impl DirectPairsView {
    pub fn new() -> Self {
        Self {
            generation: AtomicU64::new(0),
            cached: RwLock::new(None),
            recomputes: AtomicU64::new(0),
        }
    }

    /// The single invalidation point for every mutating operation
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Cached view, recomputing with `compute` if it was invalidated
    pub fn get_or_compute<F>(&self, compute: F) -> Arc<Vec<PairHandle>>
    where
        F: FnOnce() -> Vec<PairHandle>,
    {
        let generation = self.generation.load(Ordering::Acquire);
        if let Some(cached) = self.cached.read().as_ref() {
            if cached.generation == generation {
                return Arc::clone(&cached.pairs);
            }
        }

        let fresh = Arc::new(compute());
        self.recomputes.fetch_add(1, Ordering::Relaxed);

        let mut slot = self.cached.write();
        let newer_stored = matches!(slot.as_ref(), Some(c) if c.generation > generation);
        if !newer_stored {
            *slot = Some(CachedView {
                generation,
                pairs: Arc::clone(&fresh),
            });
        }
        fresh
    }

    /// Whether the next read will recompute
    pub fn is_dirty(&self) -> bool {
        let generation = self.generation.load(Ordering::Acquire);
        !matches!(self.cached.read().as_ref(), Some(c) if c.generation == generation)
    }

    /// How many times the view has been recomputed
    pub fn recompute_count(&self) -> u64 {
        self.recomputes.load(Ordering::Relaxed)
    }
}

impl Default for DirectPairsView {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;
    use crate::types::{Pair, PairPermissionSets, RelationshipStatus};

    fn handle(uid: &str) -> PairHandle {
        PairHandle::new(Pair::new(
            Identity::new(uid),
            RelationshipStatus::Bidirectional,
            PairPermissionSets::default(),
        ))
    }

    #[test]
    fn test_cached_until_invalidated() {
        let view = DirectPairsView::new();
        let source = vec![handle("a")];

        let first = view.get_or_compute(|| source.clone());
        let second = view.get_or_compute(|| panic!("should be cached"));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(view.recompute_count(), 1);
        assert!(!view.is_dirty());

        view.invalidate();
        assert!(view.is_dirty());
        let third = view.get_or_compute(|| vec![handle("a"), handle("b")]);
        assert_eq!(third.len(), 2);
        assert_eq!(view.recompute_count(), 2);
    }

    #[test]
    fn test_invalidate_during_compute_forces_recompute() {
        let view = DirectPairsView::new();

        let stale = view.get_or_compute(|| {
            // A writer lands while this reader is computing
            view.invalidate();
            vec![handle("old")]
        });
        assert_eq!(stale.len(), 1);
        assert!(view.is_dirty());

        let fresh = view.get_or_compute(|| vec![handle("old"), handle("new")]);
        assert_eq!(fresh.len(), 2);
    }
}
