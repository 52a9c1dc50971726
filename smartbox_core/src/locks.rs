//! Per-box mutual exclusion for reorder evaluation.
//!
//! Evaluations for different boxes run freely in parallel; two evaluations of
//! the same box must not interleave, or both could pass the outstanding-
//! trigger check. A single registry of in-flight box ids gives each box its
//! own exclusion scope without a global lock around the work itself.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use smartbox_traits::model::BoxId;

#[derive(Debug, Default)]
pub(crate) struct BoxLocks {
    in_flight: Mutex<HashSet<BoxId>>,
}

impl BoxLocks {
    /// Claim the evaluation slot for a box. `None` when another evaluation is
    /// already in flight; the caller maps that to `ConcurrencyConflict`.
    pub(crate) fn try_acquire(&self, id: BoxId) -> Option<EvalGuard<'_>> {
        let mut set = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if set.insert(id) {
            Some(EvalGuard { locks: self, id })
        } else {
            None
        }
    }
}

/// Releases the box's evaluation slot on drop, panic included.
pub(crate) struct EvalGuard<'a> {
    locks: &'a BoxLocks,
    id: BoxId,
}

impl Drop for EvalGuard<'_> {
    fn drop(&mut self) {
        self.locks
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_is_refused_until_release() {
        let locks = BoxLocks::default();
        let id = BoxId::new();
        let guard = locks.try_acquire(id).unwrap();
        assert!(locks.try_acquire(id).is_none());
        drop(guard);
        assert!(locks.try_acquire(id).is_some());
    }

    #[test]
    fn different_boxes_are_independent() {
        let locks = BoxLocks::default();
        let _a = locks.try_acquire(BoxId::new()).unwrap();
        assert!(locks.try_acquire(BoxId::new()).is_some());
    }
}
