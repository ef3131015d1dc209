//! Swapchain image → frame slot tracking
//!
//! Image acquisition order need not follow presentation order, and there may
//! be more or fewer images than frame slots. Each image therefore remembers
//! which slot last submitted work against it, so a new frame can wait on
//! that slot's fence before touching the image again.

/// Maps each swapchain image index to the frame slot whose fence guards it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImagesInFlight {
    owners: Vec<Option<usize>>,
}

impl ImagesInFlight {
    /// Tracker for `image_count` images, none in flight
    pub fn new(image_count: usize) -> Self {
        Self {
            owners: vec![None; image_count],
        }
    }

    /// Forget every association and resize for a new swapchain
    pub fn reset(&mut self, image_count: usize) {
        self.owners.clear();
        self.owners.resize(image_count, None);
    }

    /// Number of tracked images
    pub fn image_count(&self) -> usize {
        self.owners.len()
    }

    /// Slot currently guarding `image_index`, if any
    pub fn owner(&self, image_index: u32) -> Option<usize> {
        self.owners.get(image_index as usize).copied().flatten()
    }

    /// Slot other than `slot` that must be waited on before `image_index` is reused
    pub fn conflicting_slot(&self, image_index: u32, slot: usize) -> Option<usize> {
        self.owner(image_index).filter(|&owner| owner != slot)
    }

    /// Record that `slot` is about to submit work against `image_index`
    ///
    /// Any other image still pointing at `slot` is cleared: the slot's fence
    /// is about to be reset and will no longer describe that older work.
    pub fn assign(&mut self, image_index: u32, slot: usize) {
        let index = image_index as usize;
        if index >= self.owners.len() {
            self.owners.resize(index + 1, None);
        }

        for owner in &mut self.owners {
            if *owner == Some(slot) {
                *owner = None;
            }
        }
        self.owners[index] = Some(slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tracker_has_no_owners() {
        let tracker = ImagesInFlight::new(3);
        assert_eq!(tracker.image_count(), 3);
        assert!((0..3).all(|i| tracker.owner(i).is_none()));
        assert!(tracker.owner(7).is_none());
    }

    #[test]
    fn test_conflict_only_for_other_slot() {
        let mut tracker = ImagesInFlight::new(2);
        tracker.assign(0, 0);

        assert_eq!(tracker.conflicting_slot(0, 0), None);
        assert_eq!(tracker.conflicting_slot(0, 1), Some(0));
        assert_eq!(tracker.conflicting_slot(1, 1), None);
    }

    #[test]
    fn test_reassigning_slot_clears_previous_image() {
        let mut tracker = ImagesInFlight::new(3);
        tracker.assign(0, 0);
        tracker.assign(1, 1);
        tracker.assign(2, 0);

        assert_eq!(tracker.owner(0), None);
        assert_eq!(tracker.owner(1), Some(1));
        assert_eq!(tracker.owner(2), Some(0));
    }

    #[test]
    fn test_reset_resizes_and_clears() {
        let mut tracker = ImagesInFlight::new(2);
        tracker.assign(1, 1);
        tracker.reset(4);

        assert_eq!(tracker.image_count(), 4);
        assert!((0..4).all(|i| tracker.owner(i).is_none()));
    }
}
