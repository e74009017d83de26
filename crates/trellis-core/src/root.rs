//! Root descriptions and their identity.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

static NEXT_ROOT_ID: AtomicU32 = AtomicU32::new(1);

/// Identity of a root description. Copies produced by [`Root::shallow_copy`]
/// keep the id; [`Root::shallow_copy_with_new_id`] mints a fresh one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RootId(pub u32);

impl RootId {
    fn next() -> Self {
        RootId(NEXT_ROOT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "root#{}", self.0)
    }
}

/// User-supplied description of what a tree should lay out.
///
/// The runtime never inspects the description itself; calculators downcast
/// through [`RootSpec::as_any`].
pub trait RootSpec: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

/// A root description paired with its identity.
#[derive(Clone)]
pub struct Root {
    id: RootId,
    spec: Arc<dyn RootSpec>,
}

impl Root {
    pub fn new(spec: Arc<dyn RootSpec>) -> Self {
        Self {
            id: RootId::next(),
            spec,
        }
    }

    #[inline]
    pub fn id(&self) -> RootId {
        self.id
    }

    #[inline]
    pub fn spec(&self) -> &Arc<dyn RootSpec> {
        &self.spec
    }

    /// Copy sharing the identity of the original.
    pub fn shallow_copy(&self) -> Self {
        self.clone()
    }

    /// Copy under a fresh identity. Used when queued state updates must not
    /// be attributed to results computed for the old root.
    pub fn shallow_copy_with_new_id(&self) -> Self {
        Self {
            id: RootId::next(),
            spec: Arc::clone(&self.spec),
        }
    }
}

impl fmt::Debug for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Root").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Label(&'static str);

    impl RootSpec for Label {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn shallow_copy_keeps_id() {
        let root = Root::new(Arc::new(Label("a")));
        assert_eq!(root.shallow_copy().id(), root.id());
    }

    #[test]
    fn shallow_copy_with_new_id_mints_fresh_id() {
        let root = Root::new(Arc::new(Label("a")));
        let copy = root.shallow_copy_with_new_id();
        assert_ne!(copy.id(), root.id());
        assert!(Arc::ptr_eq(copy.spec(), root.spec()));
    }

    #[test]
    fn spec_downcasts_through_any() {
        let root = Root::new(Arc::new(Label("hello")));
        let label = root
            .spec()
            .as_any()
            .downcast_ref::<Label>()
            .expect("downcast");
        assert_eq!(label.0, "hello");
    }
}
