//! Layout-state scheduling and hand-off for Trellis component trees.
//!
//! A [`LayoutTree`] owns two reference-counted layout results: the active
//! one a host surface renders against and a pending one produced in the
//! background. Requests (new root, new size specs, state updates) either
//! hit a cached result or trigger a computation, inline or on the shared
//! [`LayoutWorker`]; finished results are handed back to the owner thread
//! through an [`OwnerQueue`] and promoted by a fixed arbitration rule.

mod buffers;
mod calc;
mod owner;
mod result;
mod root;
mod state;
mod tree;
mod worker;

pub use calc::{CalculateContext, HostSurface, LayoutCalculator};
pub use owner::{OwnerQueue, OwnerToken};
pub use result::LayoutRef;
pub use root::{Root, RootId, RootSpec};
pub use state::{StateHandler, StateUpdate};
pub use tree::{LayoutTree, LayoutTreeBuilder};
pub use worker::{JobHandle, LayoutWorker};

pub mod prelude {
    pub use crate::calc::{HostSurface, LayoutCalculator};
    pub use crate::root::{Root, RootSpec};
    pub use crate::tree::LayoutTree;
    pub use trellis_layout::prelude::*;
}
