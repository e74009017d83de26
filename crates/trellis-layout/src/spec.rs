//! Host measure-spec system

/// How a host surface constrains one axis during measurement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpecMode {
    /// The axis must be exactly the given size.
    Exactly,
    /// The axis may be any size up to the given bound.
    AtMost,
    /// The axis is unconstrained.
    Unspecified,
}

/// A single-axis measurement constraint handed down by the host surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SizeSpec {
    pub mode: SpecMode,
    pub size: i32,
}

impl SizeSpec {
    /// Sentinel for "no spec has been supplied yet".
    pub const UNINITIALIZED: Self = Self {
        mode: SpecMode::Unspecified,
        size: -1,
    };

    /// Creates a spec requiring exactly the given size.
    pub fn exactly(size: i32) -> Self {
        Self {
            mode: SpecMode::Exactly,
            size,
        }
    }

    /// Creates a spec allowing any size up to the given bound.
    pub fn at_most(size: i32) -> Self {
        Self {
            mode: SpecMode::AtMost,
            size,
        }
    }

    /// Creates an unconstrained spec.
    pub fn unspecified() -> Self {
        Self {
            mode: SpecMode::Unspecified,
            size: 0,
        }
    }

    /// Returns true once a real spec has been supplied.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        *self != Self::UNINITIALIZED
    }

    /// Resolves a desired size against this spec.
    pub fn resolve(&self, desired: i32) -> i32 {
        match self.mode {
            SpecMode::Exactly => self.size,
            SpecMode::AtMost => desired.min(self.size),
            SpecMode::Unspecified => desired,
        }
    }
}

/// A measured width/height pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const ZERO: Self = Self {
        width: 0,
        height: 0,
    };

    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// Returns true if a size measured under `old` still satisfies `new`.
///
/// A new spec is satisfied without re-measuring when:
/// - the specs are identical;
/// - both axes are unconstrained;
/// - the new spec demands exactly the size that was already measured;
/// - the old spec was unconstrained and the measured size fits the new bound;
/// - both specs are upper bounds, the new bound is stricter, and the measured
///   size still fits under it.
pub fn is_measure_spec_compatible(old: SizeSpec, new: SizeSpec, old_measured: i32) -> bool {
    if old == new {
        return true;
    }

    match (old.mode, new.mode) {
        (SpecMode::Unspecified, SpecMode::Unspecified) => true,
        (_, SpecMode::Exactly) => new.size == old_measured,
        (SpecMode::Unspecified, SpecMode::AtMost) => new.size >= old_measured,
        (SpecMode::AtMost, SpecMode::AtMost) => {
            old.size > new.size && old_measured <= new.size
        }
        _ => false,
    }
}

/// The no-op fast-path predicate: a result measured under the old spec pair
/// is reusable for the new pair when both axes remain compatible.
pub fn compatible_under_resize(
    old_width: SizeSpec,
    old_height: SizeSpec,
    new_width: SizeSpec,
    new_height: SizeSpec,
    result_width: i32,
    result_height: i32,
) -> bool {
    is_measure_spec_compatible(old_width, new_width, result_width)
        && is_measure_spec_compatible(old_height, new_height, result_height)
}

#[cfg(test)]
#[path = "tests/spec_tests.rs"]
mod tests;
