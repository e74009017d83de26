//! Reference-counted layout results.
//!
//! A computed layout can be held by the tree's buffers, by a host surface in
//! the middle of drawing, and by an in-flight computation using it as a diff
//! hint, all at once. Each holder owns one reference and must release it
//! when done; the count reaching zero disposes the result exactly once.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use trellis_layout::{is_measure_spec_compatible, SizeSpec};

use crate::root::RootId;
use crate::state::StateHandler;

struct ResultCore {
    root_id: RootId,
    width_spec: SizeSpec,
    height_spec: SizeSpec,
    width: i32,
    height: i32,
    accessibility_enabled: bool,
    refs: AtomicUsize,
    disposed: AtomicBool,
    state_delta: Mutex<Option<StateHandler>>,
    diff_hint: Mutex<Option<LayoutRef>>,
}

/// One counted reference to a layout result.
///
/// Cloning the handle does NOT take a reference; call
/// [`acquire_ref`](Self::acquire_ref) to add a holder and
/// [`release_ref`](Self::release_ref) when that holder is done.
#[derive(Clone)]
pub struct LayoutRef {
    core: Arc<ResultCore>,
}

impl LayoutRef {
    /// Wraps a freshly computed result. The caller holds the initial
    /// reference.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        root_id: RootId,
        width_spec: SizeSpec,
        height_spec: SizeSpec,
        width: i32,
        height: i32,
        accessibility_enabled: bool,
        state_delta: Option<StateHandler>,
        diff_hint: Option<LayoutRef>,
    ) -> Self {
        Self {
            core: Arc::new(ResultCore {
                root_id,
                width_spec,
                height_spec,
                width,
                height,
                accessibility_enabled,
                refs: AtomicUsize::new(1),
                disposed: AtomicBool::new(false),
                state_delta: Mutex::new(state_delta),
                diff_hint: Mutex::new(diff_hint),
            }),
        }
    }

    /// Registers a new holder and returns a handle for it.
    pub fn acquire_ref(&self) -> LayoutRef {
        let prev = self.core.refs.fetch_add(1, Ordering::AcqRel);
        assert!(
            prev > 0,
            "acquire_ref on a disposed layout result for {}",
            self.core.root_id
        );
        LayoutRef {
            core: Arc::clone(&self.core),
        }
    }

    /// Drops one holder. The last release disposes the result.
    ///
    /// Panics if the count is already zero: that is always a double-release
    /// bug in the caller.
    pub fn release_ref(&self) {
        let mut current = self.core.refs.load(Ordering::Acquire);
        loop {
            assert!(
                current > 0,
                "release_ref but the reference count is already zero for {}",
                self.core.root_id
            );
            match self.core.refs.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
        if current == 1 {
            self.dispose();
        }
    }

    fn dispose(&self) {
        if self.core.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let hint = self
            .core
            .diff_hint
            .lock()
            .expect("layout result diff hint lock poisoned")
            .take();
        if let Some(hint) = hint {
            hint.release_ref();
        }
    }

    #[inline]
    pub fn root_id(&self) -> RootId {
        self.core.root_id
    }

    #[inline]
    pub fn is_for_root(&self, root_id: RootId) -> bool {
        self.core.root_id == root_id
    }

    /// True if this result, measured under its stored specs, still satisfies
    /// the given spec pair without re-measuring.
    pub fn is_compatible_spec(&self, width_spec: SizeSpec, height_spec: SizeSpec) -> bool {
        is_measure_spec_compatible(self.core.width_spec, width_spec, self.core.width)
            && is_measure_spec_compatible(self.core.height_spec, height_spec, self.core.height)
    }

    /// True if the measured size matches exactly.
    pub fn is_compatible_size(&self, width: i32, height: i32) -> bool {
        self.core.width == width && self.core.height == height
    }

    #[inline]
    pub fn is_compatible_accessibility(&self, enabled: bool) -> bool {
        self.core.accessibility_enabled == enabled
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.core.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.core.height
    }

    #[inline]
    pub fn width_spec(&self) -> SizeSpec {
        self.core.width_spec
    }

    #[inline]
    pub fn height_spec(&self) -> SizeSpec {
        self.core.height_spec
    }

    /// Takes the state snapshot this result was computed against. Returns
    /// `None` after the first call.
    pub fn take_state_delta(&self) -> Option<StateHandler> {
        self.core
            .state_delta
            .lock()
            .expect("layout result state delta lock poisoned")
            .take()
    }

    #[inline]
    pub fn ref_count(&self) -> usize {
        self.core.refs.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.core.disposed.load(Ordering::Acquire)
    }

    /// True if both handles point at the same underlying result.
    pub fn ptr_eq(&self, other: &LayoutRef) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }
}

impl std::fmt::Debug for LayoutRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutRef")
            .field("root_id", &self.core.root_id)
            .field("width", &self.core.width)
            .field("height", &self.core.height)
            .field("refs", &self.ref_count())
            .finish()
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

    #[test]
    fn last_release_disposes() {
        let result = result_for(RootId(1), 100, 50);
        let second = result.acquire_ref();
        assert_eq!(result.ref_count(), 2);

        second.release_ref();
        assert!(!result.is_disposed());

        result.release_ref();
        assert!(result.is_disposed());
    }

    #[test]
    fn disposing_releases_diff_hint() {
        let hint = result_for(RootId(1), 100, 50);
        let holder = LayoutRef::new(
            RootId(1),
            SizeSpec::exactly(100),
            SizeSpec::exactly(50),
            100,
            50,
            false,
            None,
            Some(hint.acquire_ref()),
        );
        assert_eq!(hint.ref_count(), 2);

        holder.release_ref();
        assert_eq!(hint.ref_count(), 1);
        assert!(!hint.is_disposed());
        hint.release_ref();
        assert!(hint.is_disposed());
    }

    #[test]
    #[should_panic(expected = "already zero")]
    fn double_release_panics() {
        let result = result_for(RootId(1), 10, 10);
        result.release_ref();
        result.release_ref();
    }

    #[test]
    #[should_panic(expected = "disposed layout result")]
    fn acquire_after_dispose_panics() {
        let result = result_for(RootId(1), 10, 10);
        let stale = result.clone();
        result.release_ref();
        let _ = stale.acquire_ref();
    }

    #[test]
    fn state_delta_is_taken_once() {
        let result = LayoutRef::new(
            RootId(2),
            SizeSpec::exactly(10),
            SizeSpec::exactly(10),
            10,
            10,
            false,
            Some(StateHandler::new()),
            None,
        );
        assert!(result.take_state_delta().is_some());
        assert!(result.take_state_delta().is_none());
        result.release_ref();
    }

    #[test]
    fn spec_compatibility_uses_measured_size() {
        let result = LayoutRef::new(
            RootId(3),
            SizeSpec::at_most(200),
            SizeSpec::at_most(200),
            120,
            80,
            false,
            None,
            None,
        );
        assert!(result.is_compatible_spec(SizeSpec::exactly(120), SizeSpec::exactly(80)));
        assert!(!result.is_compatible_spec(SizeSpec::exactly(130), SizeSpec::exactly(80)));
        result.release_ref();
    }
}
