//! Arena index newtypes.
//!
//! Per the Design Notes redesign ("raw-pointer scene graph with cyclic
//! references...maps cleanly to arena + index"), every scene entity is
//! stored in a flat `Vec` and referenced by one of these `u32` handles
//! instead of a pointer or reference. They live in their own module because
//! both [`crate::math::Hit`] and every `crate::scene` type need them, and
//! `math` must not depend on `scene`.

use std::fmt;

macro_rules! define_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, Copy, Eq, Hash, PartialEq, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            #[inline]
            pub fn from_index(index: usize) -> Self {
                Self(u32::try_from(index).expect("arena index exceeds u32::MAX"))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

define_id!(VertexId, "Index into [`crate::scene::Scene::vertices`].");
define_id!(MaterialId, "Index into [`crate::scene::Scene::materials`].");
define_id!(FaceId, "Index into [`crate::scene::Scene::faces`].");
define_id!(SphereId, "Index into [`crate::scene::Scene::spheres`].");
define_id!(PortalId, "Index into [`crate::scene::Scene::portals`]. The side is `index % 2`.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_index() {
        let id = FaceId::from_index(7);
        assert_eq!(id.index(), 7);
    }
}
