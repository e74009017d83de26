//! The layout tree: scheduling, dual-buffer hand-off and lifecycle.
//!
//! One mutex guards the whole mutable baseline (root, specs, buffers, state
//! queue, scheduling intent). Layout computation never runs with the lock
//! held; a finished result is re-validated under the lock before being
//! accepted, and superseded references are always released after unlocking.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use trellis_layout::{compatible_under_resize, Size, SizeSpec};

use crate::buffers::BufferPair;
use crate::calc::{CalculateContext, HostSurface, LayoutCalculator};
use crate::owner::{OwnerQueue, OwnerToken};
use crate::result::LayoutRef;
use crate::root::{Root, RootId};
use crate::state::{StateHandler, StateUpdate};
use crate::worker::{JobHandle, LayoutWorker};

static NEXT_TREE_ID: AtomicU32 = AtomicU32::new(1);

/// Recompute request recorded while a measure pass is in progress, replayed
/// once it exits. Sync dominates and is never downgraded.
#[derive(Clone, Copy, PartialEq, Eq)]
enum ScheduleIntent {
    None,
    Async,
    Sync,
}

struct TreeState {
    root: Option<Root>,
    width_spec: SizeSpec,
    height_spec: SizeSpec,
    buffers: BufferPair,
    state_handler: StateHandler,
    attached: bool,
    has_host_specs: bool,
    is_measuring: bool,
    intent: ScheduleIntent,
    host: Option<Arc<dyn HostSurface>>,
    pending_job: Option<JobHandle>,
    released: bool,
}

struct TreeInner {
    id: u32,
    calculator: Arc<dyn LayoutCalculator>,
    queue: OwnerQueue,
    worker: LayoutWorker,
    diffing_enabled: bool,
    accessibility_enabled: bool,
    async_state_updates: bool,
    last_animate: AtomicBool,
    state: Mutex<TreeState>,
}

/// Owns the active and pending layout results for one root description and
/// decides when, and on which thread, a new one is computed.
#[derive(Clone)]
pub struct LayoutTree {
    inner: Arc<TreeInner>,
}

impl LayoutTree {
    pub fn builder(root: Root, calculator: Arc<dyn LayoutCalculator>) -> LayoutTreeBuilder {
        LayoutTreeBuilder::new(root, calculator)
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.inner.id
    }

    /// The queue the owner thread must drain for deferred hand-off work.
    pub fn owner_queue(&self) -> &OwnerQueue {
        &self.inner.queue
    }

    /// Replaces the root, computing the new layout on the calling thread.
    pub fn set_root(&self, root: Root) {
        self.set_root_animated(root, false);
    }

    pub fn set_root_animated(&self, root: Root, animate: bool) {
        self.inner.set_root_and_size_spec_internal(
            Some(root),
            SizeSpec::UNINITIALIZED,
            SizeSpec::UNINITIALIZED,
            false,
            animate,
            None,
        );
    }

    /// Replaces the root, deferring computation to the background worker.
    pub fn set_root_async(&self, root: Root) {
        self.set_root_async_animated(root, false);
    }

    pub fn set_root_async_animated(&self, root: Root, animate: bool) {
        self.inner.set_root_and_size_spec_internal(
            Some(root),
            SizeSpec::UNINITIALIZED,
            SizeSpec::UNINITIALIZED,
            true,
            animate,
            None,
        );
    }

    /// Updates the size specs. Ignored while a measured host surface owns
    /// them.
    pub fn set_size_spec(&self, width_spec: SizeSpec, height_spec: SizeSpec) {
        self.inner.set_root_and_size_spec_internal(
            None, width_spec, height_spec, false, false, None,
        );
    }

    /// Like [`set_size_spec`](Self::set_size_spec), also reporting the
    /// resulting size. `None` if the request was ignored or no result exists.
    pub fn set_size_spec_with_output(
        &self,
        width_spec: SizeSpec,
        height_spec: SizeSpec,
    ) -> Option<Size> {
        let mut output = Size::new(-1, -1);
        self.inner.set_root_and_size_spec_internal(
            None,
            width_spec,
            height_spec,
            false,
            false,
            Some(&mut output),
        );
        (output.width >= 0).then_some(output)
    }

    pub fn set_size_spec_async(&self, width_spec: SizeSpec, height_spec: SizeSpec) {
        self.inner.set_root_and_size_spec_internal(
            None, width_spec, height_spec, true, false, None,
        );
    }

    pub fn set_root_and_size_spec(&self, root: Root, width_spec: SizeSpec, height_spec: SizeSpec) {
        self.set_root_and_size_spec_animated(root, width_spec, height_spec, false);
    }

    pub fn set_root_and_size_spec_animated(
        &self,
        root: Root,
        width_spec: SizeSpec,
        height_spec: SizeSpec,
        animate: bool,
    ) {
        self.inner.set_root_and_size_spec_internal(
            Some(root),
            width_spec,
            height_spec,
            false,
            animate,
            None,
        );
    }

    pub fn set_root_and_size_spec_with_output(
        &self,
        root: Root,
        width_spec: SizeSpec,
        height_spec: SizeSpec,
    ) -> Option<Size> {
        let mut output = Size::new(-1, -1);
        self.inner.set_root_and_size_spec_internal(
            Some(root),
            width_spec,
            height_spec,
            false,
            false,
            Some(&mut output),
        );
        (output.width >= 0).then_some(output)
    }

    pub fn set_root_and_size_spec_async(
        &self,
        root: Root,
        width_spec: SizeSpec,
        height_spec: SizeSpec,
    ) {
        self.set_root_and_size_spec_async_animated(root, width_spec, height_spec, false);
    }

    pub fn set_root_and_size_spec_async_animated(
        &self,
        root: Root,
        width_spec: SizeSpec,
        height_spec: SizeSpec,
        animate: bool,
    ) {
        self.inner.set_root_and_size_spec_internal(
            Some(root),
            width_spec,
            height_spec,
            true,
            animate,
            None,
        );
    }

    /// Queues a state update and recomputes synchronously. Off the owner
    /// thread the computation is rescheduled onto the background worker.
    pub fn update_state(&self, key: impl Into<String>, update: Arc<dyn StateUpdate>) {
        if !self.inner.queue_state_update(key, update) {
            return;
        }
        if self.inner.queue.is_owner_thread() {
            self.inner.update_state_internal(false);
        } else {
            log::warn!(
                "tree {}: synchronous state update requested off the owner thread, \
                 scheduling on the background layout worker instead",
                self.inner.id
            );
            self.inner.update_state_internal(true);
        }
    }

    /// Queues a state update and recomputes on the background worker.
    ///
    /// Panics if async state updates were disabled at build time.
    pub fn update_state_async(&self, key: impl Into<String>, update: Arc<dyn StateUpdate>) {
        assert!(
            self.inner.async_state_updates,
            "async state updates are disabled for tree {}, use update_state",
            self.inner.id
        );
        if !self.inner.queue_state_update(key, update) {
            return;
        }
        self.inner.update_state_internal(true);
    }

    /// Queues a state update without scheduling a recompute. The update is
    /// picked up by whatever computation runs next.
    pub fn update_state_lazy(&self, key: impl Into<String>, update: Arc<dyn StateUpdate>) {
        self.inner.queue_state_update(key, update);
    }

    /// Associates a host surface. The tree must be detached.
    pub fn set_host(&self, _token: &OwnerToken, host: Arc<dyn HostSurface>) {
        let mut st = self.inner.lock_state();
        assert!(
            !st.attached,
            "replacing the host surface while tree {} is attached",
            self.inner.id
        );
        st.host = Some(host);
    }

    /// Drops the host surface association. The tree must be detached.
    pub fn clear_host(&self, _token: &OwnerToken) {
        let mut st = self.inner.lock_state();
        assert!(
            !st.attached,
            "clearing the host surface while tree {} is attached",
            self.inner.id
        );
        st.host = None;
    }

    /// Marks the tree attached and publishes the best buffered result to the
    /// host surface.
    pub fn attach(&self, _token: &OwnerToken) {
        let inner = &self.inner;
        let (garbage, changed, publish) = {
            let mut st = inner.lock_state();
            assert!(
                st.host.is_some(),
                "attaching tree {} without a host surface",
                inner.id
            );
            assert!(!st.released, "attaching released tree {}", inner.id);
            st.attached = true;

            let root_id = st.root.as_ref().map(Root::id);
            let (width_spec, height_spec) = (st.width_spec, st.height_spec);
            let resolution = st.buffers.resolve_active(
                root_id,
                width_spec,
                height_spec,
                inner.accessibility_enabled,
            );
            let active = st.buffers.active().map(LayoutRef::acquire_ref);
            let host = st.host.clone().expect("host checked above");
            (
                resolution.garbage,
                resolution.active_changed,
                (host, root_id, active),
            )
        };
        if let Some(garbage) = garbage {
            garbage.release_ref();
        }

        let (host, root_id, active) = publish;
        if changed {
            host.set_dirty();
        }

        // Without measured dimensions everything waits for measure.
        let measured = host.measured_size();
        if measured == Size::ZERO {
            if let Some(active) = active {
                active.release_ref();
            }
            return;
        }

        let needs_layout = !active.as_ref().is_some_and(|a| {
            root_id.is_some_and(|id| a.is_for_root(id))
                && a.is_compatible_size(measured.width, measured.height)
                && a.is_compatible_accessibility(inner.accessibility_enabled)
        });
        if needs_layout || host.is_dirty() {
            host.request_layout();
        } else {
            host.rebind();
        }
        if let Some(active) = active {
            active.release_ref();
        }
    }

    /// Marks the tree detached. Background computations keep running; their
    /// results are published on the next attach.
    pub fn detach(&self, _token: &OwnerToken) {
        let mut st = self.inner.lock_state();
        st.attached = false;
        st.has_host_specs = false;
    }

    /// Measures against the given specs, computing inline on a cache miss.
    /// The specs stay fixed until the next detach.
    pub fn measure(
        &self,
        _token: &OwnerToken,
        width_spec: SizeSpec,
        height_spec: SizeSpec,
        force_layout: bool,
    ) -> Size {
        let inner = &self.inner;
        let (garbage, changed, host, compute_root) = {
            let mut st = inner.lock_state();
            assert!(!st.released, "measuring released tree {}", inner.id);
            assert!(
                st.host.is_some(),
                "measuring tree {} without a host surface",
                inner.id
            );
            st.is_measuring = true;
            st.width_spec = width_spec;
            st.height_spec = height_spec;
            st.has_host_specs = true;

            let root_id = st.root.as_ref().map(Root::id);
            let resolution = st.buffers.resolve_active(
                root_id,
                width_spec,
                height_spec,
                inner.accessibility_enabled,
            );

            let active_ok = st.buffers.active().is_some_and(|a| {
                root_id.is_some_and(|id| a.is_for_root(id))
                    && a.is_compatible_spec(width_spec, height_spec)
                    && a.is_compatible_accessibility(inner.accessibility_enabled)
            });
            let compute_root = if force_layout || !active_ok {
                Some(st.root.clone().expect("tree always has a root").shallow_copy())
            } else {
                None
            };
            let host = st.host.clone().expect("host checked above");
            (resolution.garbage, resolution.active_changed, host, compute_root)
        };
        if let Some(garbage) = garbage {
            garbage.release_ref();
        }
        if changed {
            host.set_dirty();
        }

        if let Some(root) = compute_root {
            // Dropping the superseded result first lets its resources go
            // before the replacement is built.
            let old_active = {
                let mut st = inner.lock_state();
                st.buffers.take_active()
            };
            if let Some(old) = old_active {
                old.release_ref();
            }

            let state = {
                let st = inner.lock_state();
                st.state_handler.copy_for_layout()
            };
            let ctx = CalculateContext {
                tree_id: inner.id,
                root,
                width_spec,
                height_spec,
                diffing_enabled: inner.diffing_enabled,
                animate_transitions: inner.last_animate.load(Ordering::Acquire),
                accessibility_enabled: inner.accessibility_enabled,
                state,
                diff_hint: None,
            };
            let result = inner.calculator.calculate(ctx);

            let displaced = {
                let mut st = inner.lock_state();
                if let Some(delta) = result.take_state_delta() {
                    if !st.released {
                        st.state_handler.commit(delta);
                    }
                }
                st.buffers.set_active(result)
            };
            if let Some(displaced) = displaced {
                displaced.release_ref();
            }
            host.set_dirty();
        }

        let output = {
            let st = inner.lock_state();
            let active = st
                .buffers
                .active()
                .expect("measure finished without an active layout result");
            Size::new(active.width(), active.height())
        };

        let intent = {
            let mut st = inner.lock_state();
            st.is_measuring = false;
            std::mem::replace(&mut st.intent, ScheduleIntent::None)
        };
        if intent != ScheduleIntent::None {
            let root = {
                let st = inner.lock_state();
                st.root.clone().map(|r| r.shallow_copy())
            };
            // Replay of a state-update request, so transitions animate.
            inner.set_root_and_size_spec_internal(
                root,
                SizeSpec::UNINITIALIZED,
                SizeSpec::UNINITIALIZED,
                intent == ScheduleIntent::Async,
                true,
                None,
            );
        }

        output
    }

    /// Releases the tree. Irreversible; both buffered results are released
    /// and any queued background computation is cancelled.
    pub fn release(&self, _token: &OwnerToken) {
        let inner = &self.inner;
        let (active, pending) = {
            let mut st = inner.lock_state();
            assert!(!st.released, "tree {} released twice", inner.id);
            st.released = true;
            st.root = None;
            st.host = None;
            st.attached = false;
            st.state_handler = StateHandler::new();
            if let Some(job) = st.pending_job.take() {
                job.cancel();
            }
            st.buffers.take_both()
        };
        if let Some(active) = active {
            active.release_ref();
        }
        if let Some(pending) = pending {
            pending.release_ref();
        }
    }

    pub fn is_released(&self) -> bool {
        self.inner.lock_state().released
    }

    /// Copy of the queued state updates, e.g. to seed a replacement tree.
    pub fn state_handler_snapshot(&self) -> StateHandler {
        self.inner.lock_state().state_handler.copy_for_layout()
    }

    /// The current active result, with a reference the caller must release.
    pub fn active_result(&self) -> Option<LayoutRef> {
        self.inner
            .lock_state()
            .buffers
            .active()
            .map(LayoutRef::acquire_ref)
    }

    pub fn has_pending_result(&self) -> bool {
        self.inner.lock_state().buffers.has_pending()
    }

    pub fn root_id(&self) -> Option<RootId> {
        self.inner.lock_state().root.as_ref().map(Root::id)
    }
}

impl TreeInner {
    fn lock_state(&self) -> MutexGuard<'_, TreeState> {
        self.state.lock().expect("layout tree state lock poisoned")
    }

    /// Queues one state update. Returns false if the tree is released.
    fn queue_state_update(&self, key: impl Into<String>, update: Arc<dyn StateUpdate>) -> bool {
        let mut st = self.lock_state();
        if st.released || st.root.is_none() {
            return false;
        }
        st.state_handler.queue_update(key, update);
        true
    }

    fn update_state_internal(self: &Arc<Self>, is_async: bool) {
        let root = {
            let mut st = self.lock_state();
            if st.released || st.root.is_none() {
                return;
            }
            if st.is_measuring {
                // Sync is never downgraded once recorded.
                if st.intent != ScheduleIntent::Sync {
                    st.intent = if is_async {
                        ScheduleIntent::Async
                    } else {
                        ScheduleIntent::Sync
                    };
                }
                return;
            }
            st.root.clone().map(|r| r.shallow_copy())
        };
        self.set_root_and_size_spec_internal(
            root,
            SizeSpec::UNINITIALIZED,
            SizeSpec::UNINITIALIZED,
            is_async,
            true,
            None,
        );
    }

    fn set_root_and_size_spec_internal(
        self: &Arc<Self>,
        root: Option<Root>,
        width_spec: SizeSpec,
        height_spec: SizeSpec,
        is_async: bool,
        animate: bool,
        output: Option<&mut Size>,
    ) {
        assert!(
            !(is_async && output.is_some()),
            "the resulting size cannot be read back from an asynchronous request"
        );

        {
            let mut st = self.lock_state();
            assert!(
                !st.released,
                "setting root or size specs on released tree {}",
                self.id
            );
            self.last_animate.store(animate, Ordering::Release);

            // Queued updates must not be attributed to results computed for
            // the old root, so the new root gets a fresh identity.
            let root = if st.state_handler.has_pending_updates() {
                root.map(|r| r.shallow_copy_with_new_id())
            } else {
                root
            };

            let root_initialized = root.is_some();
            let width_initialized = width_spec.is_initialized();
            let height_initialized = height_spec.is_initialized();

            if st.has_host_specs && !root_initialized {
                // The measured host surface owns the specs. A bare spec
                // update racing against measure is dropped rather than
                // treated as an error.
                log::debug!(
                    "tree {}: ignoring size spec update while the host surface owns the specs",
                    self.id
                );
                return;
            }

            let width_unchanged = !width_initialized || width_spec == st.width_spec;
            let height_unchanged = !height_initialized || height_spec == st.height_spec;
            let specs_unchanged = width_unchanged && height_unchanged;
            let all_specs_initialized = width_initialized
                && height_initialized
                && st.width_spec.is_initialized()
                && st.height_spec.is_initialized();
            let specs_compatible = specs_unchanged
                || (all_specs_initialized
                    && st.buffers.most_recent().is_some_and(|recent| {
                        compatible_under_resize(
                            st.width_spec,
                            st.height_spec,
                            width_spec,
                            height_spec,
                            recent.width(),
                            recent.height(),
                        )
                    }));
            let root_unchanged = match (&root, &st.root) {
                (None, _) => true,
                (Some(new), Some(current)) => new.id() == current.id(),
                (Some(_), None) => false,
            };

            if root_unchanged && specs_compatible {
                // Either a matching result exists or one is already being
                // computed; nothing to schedule.
                if let (Some(output), Some(recent)) = (output, st.buffers.most_recent()) {
                    output.width = recent.width();
                    output.height = recent.height();
                }
                return;
            }

            if width_initialized {
                st.width_spec = width_spec;
            }
            if height_initialized {
                st.height_spec = height_spec;
            }
            if root_initialized {
                st.root = root;
            }
        }

        if is_async {
            self.schedule_background_layout(animate);
        } else {
            self.calculate_layout(output, animate);
        }
    }

    /// Queues a background computation, replacing any not-yet-started one.
    fn schedule_background_layout(self: &Arc<Self>, animate: bool) {
        let weak = Arc::downgrade(self);
        let handle = self.worker.submit(move || {
            if let Some(inner) = weak.upgrade() {
                inner.calculate_layout(None, animate);
            }
        });
        let old = {
            let mut st = self.lock_state();
            st.pending_job.replace(handle)
        };
        if let Some(old) = old {
            old.cancel();
        }
    }

    fn calculate_layout(self: &Arc<Self>, output: Option<&mut Size>, animate: bool) {
        let (root, width_spec, height_spec, state, diff_hint) = {
            let mut st = self.lock_state();

            // A fresh computation supersedes whatever is still queued.
            if let Some(job) = st.pending_job.take() {
                job.cancel();
            }

            if st.root.is_none() || !st.width_spec.is_initialized() || !st.height_spec.is_initialized()
            {
                return;
            }

            if self.has_compatible_layout(&st) {
                if let (Some(output), Some(recent)) = (output, st.buffers.most_recent()) {
                    output.width = recent.width();
                    output.height = recent.height();
                }
                return;
            }

            let root = st.root.clone().expect("checked above").shallow_copy();
            let diff_hint = if self.diffing_enabled {
                st.buffers.active().map(LayoutRef::acquire_ref)
            } else {
                None
            };
            (
                root,
                st.width_spec,
                st.height_spec,
                st.state_handler.copy_for_layout(),
                diff_hint,
            )
        };

        let computed_for = root.id();
        let ctx = CalculateContext {
            tree_id: self.id,
            root,
            width_spec,
            height_spec,
            diffing_enabled: self.diffing_enabled,
            animate_transitions: animate,
            accessibility_enabled: self.accessibility_enabled,
            state,
            diff_hint: diff_hint.as_ref(),
        };
        let result = self.calculator.calculate(ctx);

        if let Some(output) = output {
            output.width = result.width();
            output.height = result.height();
        }
        if let Some(hint) = diff_hint {
            hint.release_ref();
        }

        let (garbage, promoted) = {
            let mut st = self.lock_state();
            // Another thread may have produced a compatible result in the
            // meantime, or the baseline may have moved on. A result for a
            // stale root or stale specs is discarded.
            let still_wanted = !self.has_compatible_layout(&st)
                && st.root.as_ref().is_some_and(|r| result.is_for_root(r.id()))
                && result.is_compatible_spec(st.width_spec, st.height_spec);
            if still_wanted {
                if let Some(delta) = result.take_state_delta() {
                    if !st.released {
                        st.state_handler.commit(delta);
                    }
                }
                (st.buffers.replace_pending(result), true)
            } else {
                log::debug!(
                    "tree {}: discarding superseded layout result for {}",
                    self.id,
                    computed_for
                );
                (Some(result), false)
            }
        };
        if let Some(garbage) = garbage {
            garbage.release_ref();
        }

        if promoted {
            self.post_background_updated();
        }
    }

    /// Hands the new pending result to the owner thread, inline when already
    /// there. Both paths run the identical resolve-and-publish logic.
    fn post_background_updated(self: &Arc<Self>) {
        if self.queue.is_owner_thread() {
            self.background_updated(&self.queue.token());
        } else {
            let weak = Arc::downgrade(self);
            self.queue.post(move |token| {
                if let Some(inner) = weak.upgrade() {
                    inner.background_updated(token);
                }
            });
        }
    }

    fn background_updated(&self, _token: &OwnerToken) {
        let (garbage, changed, publish) = {
            let mut st = self.lock_state();
            // Detached or released trees keep the baseline up to date but
            // publish nothing until the next attach.
            if !st.attached || st.released || st.root.is_none() {
                return;
            }
            let root_id = st.root.as_ref().map(Root::id);
            let (width_spec, height_spec) = (st.width_spec, st.height_spec);
            let resolution = st.buffers.resolve_active(
                root_id,
                width_spec,
                height_spec,
                self.accessibility_enabled,
            );
            let active = st.buffers.active().map(LayoutRef::acquire_ref);
            let host = st.host.clone();
            (resolution.garbage, resolution.active_changed, (host, root_id, active))
        };
        if let Some(garbage) = garbage {
            garbage.release_ref();
        }

        let (host, root_id, active) = publish;
        let release_active = |active: Option<LayoutRef>| {
            if let Some(active) = active {
                active.release_ref();
            }
        };
        if !changed {
            release_active(active);
            return;
        }
        let Some(host) = host else {
            release_active(active);
            return;
        };
        host.set_dirty();

        let measured = host.measured_size();
        if measured == Size::ZERO {
            // The host surface has not been measured yet; measure will pick
            // the result up.
            release_active(active);
            return;
        }

        let needs_layout = !active.as_ref().is_some_and(|a| {
            root_id.is_some_and(|id| a.is_for_root(id))
                && a.is_compatible_size(measured.width, measured.height)
                && a.is_compatible_accessibility(self.accessibility_enabled)
        });
        release_active(active);

        if needs_layout {
            host.request_layout();
        } else {
            host.mount_if_dirty();
        }
    }

    /// True if either buffered result satisfies the current baseline.
    fn has_compatible_layout(&self, st: &TreeState) -> bool {
        let Some(root_id) = st.root.as_ref().map(Root::id) else {
            return false;
        };
        let satisfies = |result: &LayoutRef| {
            result.is_for_root(root_id)
                && result.is_compatible_spec(st.width_spec, st.height_spec)
                && result.is_compatible_accessibility(self.accessibility_enabled)
        };
        st.buffers.active().is_some_and(satisfies) || st.buffers.pending().is_some_and(satisfies)
    }
}

/// Builder for [`LayoutTree`]. The calling thread becomes the owner thread
/// unless an explicit [`OwnerQueue`] is supplied.
pub struct LayoutTreeBuilder {
    root: Root,
    calculator: Arc<dyn LayoutCalculator>,
    diffing_enabled: bool,
    accessibility_enabled: bool,
    async_state_updates: bool,
    worker: Option<LayoutWorker>,
    queue: Option<OwnerQueue>,
    state_handler: Option<StateHandler>,
    override_tree_id: Option<u32>,
}

impl LayoutTreeBuilder {
    fn new(root: Root, calculator: Arc<dyn LayoutCalculator>) -> Self {
        Self {
            root,
            calculator,
            diffing_enabled: true,
            accessibility_enabled: false,
            async_state_updates: true,
            worker: None,
            queue: None,
            state_handler: None,
            override_tree_id: None,
        }
    }

    pub fn layout_diffing(mut self, enabled: bool) -> Self {
        self.diffing_enabled = enabled;
        self
    }

    pub fn accessibility(mut self, enabled: bool) -> Self {
        self.accessibility_enabled = enabled;
        self
    }

    pub fn async_state_updates(mut self, enabled: bool) -> Self {
        self.async_state_updates = enabled;
        self
    }

    /// Dedicated worker instead of the process-wide one.
    pub fn layout_worker(mut self, worker: LayoutWorker) -> Self {
        self.worker = Some(worker);
        self
    }

    pub fn owner_queue(mut self, queue: OwnerQueue) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Seeds the state queue, e.g. from a replaced tree's snapshot.
    pub fn state_handler(mut self, handler: StateHandler) -> Self {
        self.state_handler = Some(handler);
        self
    }

    pub fn override_tree_id(mut self, id: u32) -> Self {
        self.override_tree_id = Some(id);
        self
    }

    pub fn build(self) -> LayoutTree {
        let id = self
            .override_tree_id
            .unwrap_or_else(|| NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed));
        LayoutTree {
            inner: Arc::new(TreeInner {
                id,
                calculator: self.calculator,
                queue: self.queue.unwrap_or_default(),
                worker: self
                    .worker
                    .unwrap_or_else(|| LayoutWorker::shared().clone()),
                diffing_enabled: self.diffing_enabled,
                accessibility_enabled: self.accessibility_enabled,
                async_state_updates: self.async_state_updates,
                last_animate: AtomicBool::new(false),
                state: Mutex::new(TreeState {
                    root: Some(self.root),
                    width_spec: SizeSpec::UNINITIALIZED,
                    height_spec: SizeSpec::UNINITIALIZED,
                    buffers: BufferPair::default(),
                    state_handler: self.state_handler.unwrap_or_default(),
                    attached: false,
                    has_host_specs: false,
                    is_measuring: false,
                    intent: ScheduleIntent::None,
                    host: None,
                    pending_job: None,
                    released: false,
                }),
            }),
        }
    }
}

#[cfg(test)]
#[path = "tests/tree_tests.rs"]
mod tests;
