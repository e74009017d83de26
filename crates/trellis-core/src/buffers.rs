//! The dual result buffer and its promotion rules.

use trellis_layout::SizeSpec;

use crate::result::LayoutRef;
use crate::root::RootId;

/// Outcome of [`BufferPair::resolve_active`]. The garbage reference, if any,
/// must be released by the caller AFTER dropping the tree lock.
pub(crate) struct Resolution {
    pub garbage: Option<LayoutRef>,
    pub active_changed: bool,
}

/// Active result (what the host surface shows) plus at most one pending
/// result waiting to be promoted.
#[derive(Default)]
pub(crate) struct BufferPair {
    active: Option<LayoutRef>,
    pending: Option<LayoutRef>,
}

impl BufferPair {
    pub fn active(&self) -> Option<&LayoutRef> {
        self.active.as_ref()
    }

    pub fn pending(&self) -> Option<&LayoutRef> {
        self.pending.as_ref()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The newest result available, pending first.
    pub fn most_recent(&self) -> Option<&LayoutRef> {
        self.pending.as_ref().or(self.active.as_ref())
    }

    /// Installs a result as active, returning the displaced one.
    pub fn set_active(&mut self, result: LayoutRef) -> Option<LayoutRef> {
        self.active.replace(result)
    }

    /// Empties the active slot for release.
    pub fn take_active(&mut self) -> Option<LayoutRef> {
        self.active.take()
    }

    /// Parks a result as pending, returning the displaced one.
    pub fn replace_pending(&mut self, result: LayoutRef) -> Option<LayoutRef> {
        self.pending.replace(result)
    }

    /// Empties both slots for release.
    pub fn take_both(&mut self) -> (Option<LayoutRef>, Option<LayoutRef>) {
        (self.active.take(), self.pending.take())
    }

    /// Decides which buffered result should be active for the given root and
    /// spec pair.
    ///
    /// Rule 1: if the active result already satisfies the full request (root,
    /// specs, accessibility), it stays and the pending one becomes garbage.
    ///
    /// Rule 2: if the pending result is spec-compatible, or the active one is
    /// not, the pending result is promoted and the old active becomes
    /// garbage. Promoting an empty pending slot clears the active slot.
    ///
    /// Rule 3: otherwise the active result is spec-compatible but for the
    /// wrong root, and the pending one fits nothing. The active result stays
    /// and the pending one becomes garbage: a newer computation is on its
    /// way, and swapping now would force an extra visible relayout.
    pub fn resolve_active(
        &mut self,
        root_id: Option<RootId>,
        width_spec: SizeSpec,
        height_spec: SizeSpec,
        accessibility_enabled: bool,
    ) -> Resolution {
        let spec_ok = |result: &LayoutRef| {
            result.is_compatible_spec(width_spec, height_spec)
                && result.is_compatible_accessibility(accessibility_enabled)
        };

        let active_best = if self
            .active
            .as_ref()
            .is_some_and(|a| root_id.is_some_and(|id| a.is_for_root(id)) && spec_ok(a))
        {
            true
        } else {
            !self.pending.as_ref().is_some_and(&spec_ok)
                && self.active.as_ref().is_some_and(&spec_ok)
        };

        if active_best {
            Resolution {
                garbage: self.pending.take(),
                active_changed: false,
            }
        } else {
            let garbage = self.active.take();
            self.active = self.pending.take();
            Resolution {
                active_changed: garbage.is_some() || self.active.is_some(),
                garbage,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_for(root_id: RootId, width: i32, height: i32) -> LayoutRef {
        LayoutRef::new(
            root_id,
            SizeSpec::exactly(width),
            SizeSpec::exactly(height),
            width,
            height,
            false,
            None,
            None,
        )
    }

    fn resolve(
        pair: &mut BufferPair,
        root_id: RootId,
        width: i32,
        height: i32,
    ) -> Resolution {
        pair.resolve_active(
            Some(root_id),
            SizeSpec::exactly(width),
            SizeSpec::exactly(height),
            false,
        )
    }

    #[test]
    fn compatible_active_discards_pending() {
        let mut pair = BufferPair::default();
        let active = result_for(RootId(1), 100, 50);
        let pending = result_for(RootId(1), 200, 50);
        pair.set_active(active.clone());
        pair.replace_pending(pending.clone());

        let resolution = resolve(&mut pair, RootId(1), 100, 50);
        assert!(!resolution.active_changed);
        assert!(resolution.garbage.as_ref().is_some_and(|g| g.ptr_eq(&pending)));
        assert!(pair.active().is_some_and(|a| a.ptr_eq(&active)));

        resolution.garbage.unwrap().release_ref();
        pair.take_both().0.unwrap().release_ref();
    }

    #[test]
    fn compatible_pending_is_promoted() {
        let mut pair = BufferPair::default();
        let active = result_for(RootId(1), 100, 50);
        let pending = result_for(RootId(1), 200, 50);
        pair.set_active(active.clone());
        pair.replace_pending(pending.clone());

        let resolution = resolve(&mut pair, RootId(1), 200, 50);
        assert!(resolution.active_changed);
        assert!(resolution.garbage.as_ref().is_some_and(|g| g.ptr_eq(&active)));
        assert!(pair.active().is_some_and(|a| a.ptr_eq(&pending)));

        resolution.garbage.unwrap().release_ref();
        pair.take_both().0.unwrap().release_ref();
    }

    #[test]
    fn incompatible_active_without_pending_is_cleared() {
        let mut pair = BufferPair::default();
        let active = result_for(RootId(1), 100, 50);
        pair.set_active(active.clone());

        let resolution = resolve(&mut pair, RootId(1), 300, 50);
        assert!(resolution.active_changed);
        assert!(resolution.garbage.as_ref().is_some_and(|g| g.ptr_eq(&active)));
        assert!(pair.active().is_none());

        resolution.garbage.unwrap().release_ref();
    }

    #[test]
    fn spec_compatible_active_for_stale_root_outlives_useless_pending() {
        // The active result fits the current specs but was computed for a
        // previous root; the pending result fits nothing. Keeping the active
        // one avoids a visible relayout while the replacement computes.
        let mut pair = BufferPair::default();
        let active = result_for(RootId(1), 100, 50);
        let pending = result_for(RootId(2), 200, 50);
        pair.set_active(active.clone());
        pair.replace_pending(pending.clone());

        let resolution = resolve(&mut pair, RootId(2), 100, 50);
        assert!(!resolution.active_changed);
        assert!(resolution.garbage.as_ref().is_some_and(|g| g.ptr_eq(&pending)));
        assert!(pair.active().is_some_and(|a| a.ptr_eq(&active)));

        resolution.garbage.unwrap().release_ref();
        pair.take_both().0.unwrap().release_ref();
    }

    #[test]
    fn neither_spec_compatible_prefers_newer_pending() {
        let mut pair = BufferPair::default();
        let active = result_for(RootId(1), 100, 50);
        let pending = result_for(RootId(1), 200, 50);
        pair.set_active(active.clone());
        pair.replace_pending(pending.clone());

        let resolution = resolve(&mut pair, RootId(1), 300, 50);
        assert!(resolution.active_changed);
        assert!(resolution.garbage.as_ref().is_some_and(|g| g.ptr_eq(&active)));
        assert!(pair.active().is_some_and(|a| a.ptr_eq(&pending)));

        resolution.garbage.unwrap().release_ref();
        pair.take_both().0.unwrap().release_ref();
    }

    #[test]
    fn spec_compatible_pending_for_new_root_is_promoted() {
        let mut pair = BufferPair::default();
        let active = result_for(RootId(1), 100, 50);
        let pending = result_for(RootId(2), 100, 50);
        pair.set_active(active.clone());
        pair.replace_pending(pending.clone());

        let resolution = resolve(&mut pair, RootId(2), 100, 50);
        assert!(resolution.active_changed);
        assert!(pair.active().is_some_and(|a| a.ptr_eq(&pending)));

        resolution.garbage.unwrap().release_ref();
        pair.take_both().0.unwrap().release_ref();
    }

    #[test]
    fn accessibility_mismatch_forces_promotion() {
        let mut pair = BufferPair::default();
        let active = result_for(RootId(1), 100, 50);
        let pending = LayoutRef::new(
            RootId(1),
            SizeSpec::exactly(100),
            SizeSpec::exactly(50),
            100,
            50,
            true,
            None,
            None,
        );
        pair.set_active(active.clone());
        pair.replace_pending(pending.clone());

        let resolution = pair.resolve_active(
            Some(RootId(1)),
            SizeSpec::exactly(100),
            SizeSpec::exactly(50),
            true,
        );
        assert!(resolution.active_changed);
        assert!(pair.active().is_some_and(|a| a.ptr_eq(&pending)));

        resolution.garbage.unwrap().release_ref();
        pair.take_both().0.unwrap().release_ref();
    }
}
