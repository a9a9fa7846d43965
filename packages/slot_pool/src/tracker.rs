use std::collections::TryReserveError;

use crate::FreeMap;

/// Records which referee holds each tracked slot of a relocating pool.
///
/// Referees hold handles rather than addresses, so growth never has to rewrite them. What the
/// tracker keeps is the referee's name, which lets a pool report who is still holding on to a
/// slot and lets a growth event confirm that every tracked slot is still occupied afterwards.
#[derive(Debug, Default)]
pub(crate) struct ReferenceTracker {
    referees: Vec<Option<&'static str>>,
}

impl ReferenceTracker {
    #[must_use]
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            referees: vec![None; capacity],
        }
    }

    /// Associates the slot with a referee, replacing any previous association.
    ///
    /// Passing `None` clears the entry, which is what an untracked acquire into a slot that was
    /// previously tracked must do.
    pub(crate) fn record(&mut self, index: usize, referee: Option<&'static str>) {
        *self
            .referees
            .get_mut(index)
            .expect("tracker covers every slot of the pool") = referee;
    }

    /// Removes the entry for the slot, returning the referee that held it.
    pub(crate) fn forget(&mut self, index: usize) -> Option<&'static str> {
        self.referees
            .get_mut(index)
            .expect("tracker covers every slot of the pool")
            .take()
    }

    #[must_use]
    pub(crate) fn referee(&self, index: usize) -> Option<&'static str> {
        self.referees.get(index).copied().flatten()
    }

    #[must_use]
    pub(crate) fn live_count(&self) -> usize {
        self.referees.iter().filter(|entry| entry.is_some()).count()
    }

    pub(crate) fn try_reserve_for(&mut self, new_len: usize) -> Result<(), TryReserveError> {
        let additional = new_len.saturating_sub(self.referees.len());
        self.referees.try_reserve_exact(additional)
    }

    /// Extends the tracker to cover a grown pool. Existing entries keep their index.
    pub(crate) fn grow_to(&mut self, new_len: usize) {
        self.referees.resize(new_len, None);
    }

    /// Asserts that every tracked slot is occupied and that the tracker covers the whole pool.
    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    pub(crate) fn verify(&self, free_map: &FreeMap) {
        assert_eq!(
            self.referees.len(),
            free_map.len(),
            "reference tracker does not cover the same slots as the free map"
        );

        for (index, referee) in self.referees.iter().enumerate() {
            if let Some(referee) = referee {
                assert!(
                    free_map.is_occupied(index),
                    "referee '{referee}' tracks slot {index} which is vacant"
                );
            }
        }

        assert!(
            self.live_count() <= free_map.count_occupied(),
            "more tracked referees than occupied slots"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_forget_roundtrip() {
        let mut tracker = ReferenceTracker::new(4);

        tracker.record(2, Some("title"));
        assert_eq!(tracker.referee(2), Some("title"));
        assert_eq!(tracker.live_count(), 1);

        assert_eq!(tracker.forget(2), Some("title"));
        assert_eq!(tracker.referee(2), None);
        assert_eq!(tracker.live_count(), 0);
    }

    #[test]
    fn untracked_record_clears_previous() {
        let mut tracker = ReferenceTracker::new(2);

        tracker.record(0, Some("old"));
        tracker.record(0, None);

        assert_eq!(tracker.referee(0), None);
    }

    #[test]
    fn grow_keeps_entries() {
        let mut tracker = ReferenceTracker::new(2);
        tracker.record(1, Some("kept"));

        tracker.try_reserve_for(4).unwrap();
        tracker.grow_to(4);

        assert_eq!(tracker.referee(1), Some("kept"));
        assert_eq!(tracker.referee(3), None);
    }

    #[test]
    #[should_panic]
    fn verify_catches_vacant_tracked_slot() {
        let mut tracker = ReferenceTracker::new(2);
        tracker.record(0, Some("dangling"));

        tracker.verify(&FreeMap::new(2));
    }
}
