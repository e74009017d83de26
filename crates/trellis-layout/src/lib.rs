//! Size-spec contracts for Trellis

mod spec;

pub use spec::*;

pub mod prelude {
    pub use crate::spec::{Size, SizeSpec, SpecMode};
}
