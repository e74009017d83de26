//! The calculation and host-surface seams.

use trellis_layout::{Size, SizeSpec};

use crate::result::LayoutRef;
use crate::root::Root;
use crate::state::StateHandler;

/// Everything a calculator needs to produce one layout result.
pub struct CalculateContext<'a> {
    pub tree_id: u32,
    pub root: Root,
    pub width_spec: SizeSpec,
    pub height_spec: SizeSpec,
    pub diffing_enabled: bool,
    pub animate_transitions: bool,
    pub accessibility_enabled: bool,
    /// Snapshot of the tree's queued state updates, already applied order.
    pub state: StateHandler,
    /// Previous result to diff against, when diffing is enabled and one
    /// exists. The runtime owns its reference.
    pub diff_hint: Option<&'a LayoutRef>,
}

impl CalculateContext<'_> {
    /// Wraps a measured size into a result carrying the context's identity,
    /// specs and state snapshot. The diff hint is not retained; results do
    /// not keep history alive.
    pub fn into_result(self, width: i32, height: i32) -> LayoutRef {
        LayoutRef::new(
            self.root.id(),
            self.width_spec,
            self.height_spec,
            width,
            height,
            self.accessibility_enabled,
            Some(self.state),
            None,
        )
    }
}

/// Produces layout results. Implementations must be callable from both the
/// owner thread and the background worker.
pub trait LayoutCalculator: Send + Sync {
    fn calculate(&self, ctx: CalculateContext<'_>) -> LayoutRef;
}

/// The surface a tree renders into.
///
/// All methods are invoked on the owner thread only.
pub trait HostSurface: Send + Sync {
    /// Marks the mounted content stale so the next mount pass rebuilds it.
    fn set_dirty(&self);

    fn is_dirty(&self) -> bool;

    /// Asks the host to schedule a full measure/layout pass.
    fn request_layout(&self);

    /// Refreshes bindings without remeasuring.
    fn rebind(&self);

    /// Mounts the active result if the surface is dirty. Returns true if a
    /// mount happened.
    fn mount_if_dirty(&self) -> bool;

    /// Last measured size of the surface, zero before the first measure.
    fn measured_size(&self) -> Size;
}
