//! Densely numbered entity references.
//!
//! The SSA construction engine refers to variables, definitions, blocks, and
//! instructions constantly, and needs to do so without pointers so that the
//! structures holding them stay trivially movable and cheap to copy. This
//! crate gives every such reference a newtype wrapping a `u32` index into a
//! table owned elsewhere, plus the two map types (`PrimaryMap`, `SecondaryMap`)
//! that use that index as a plain vector offset instead of hashing.
//!
//! The pattern (and most of the API) comes from `cranelift-entity`: the
//! `EntityRef` trait, the `entity_impl!` macro that stamps out `Display`,
//! `Debug`, and conversions for a new reference type, and the `Primary`/
//! `Secondary` map split.

mod keys;
mod map;
mod set;

pub use keys::Keys;
pub use map::{Iter, IterMut, PrimaryMap, SecondaryMap};
pub use set::EntitySet;

/// A type that can be used as a dense index into one of this crate's maps.
///
/// An `EntityRef` is a small `Copy` value that stands in for a pointer: it
/// names a slot in some `PrimaryMap<Self, _>` without borrowing it.
pub trait EntityRef: Copy + Eq {
    /// Create a new reference from its dense index.
    fn new(index: usize) -> Self;

    /// Return the dense index this reference wraps.
    fn index(self) -> usize;
}

/// Generate the boilerplate implementations (`Display`, `Debug`, `EntityRef`)
/// for a newtype wrapping a `u32`, the way every reference type in
/// `cranelift_codegen::ir::entities` is defined.
///
/// ```ignore
/// pub struct Inst(u32);
/// entity_impl!(Inst, "inst");
/// ```
#[macro_export]
macro_rules! entity_impl {
    ($entity:ident, $display_prefix:expr) => {
        impl $crate::EntityRef for $entity {
            #[inline]
            fn new(index: usize) -> Self {
                debug_assert!(index < (u32::MAX as usize));
                $entity(index as u32)
            }

            #[inline]
            fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl $entity {
            /// Returns `None` when the raw index cannot represent a valid
            /// entity (the crate reserves `u32::MAX` as a tombstone value).
            #[allow(dead_code)]
            pub fn from_u32(index: u32) -> Option<Self> {
                if index == u32::MAX {
                    None
                } else {
                    Some($entity(index))
                }
            }

            #[allow(dead_code)]
            pub fn as_u32(self) -> u32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $entity {
            fn fmt(&self, f: &mut ::core::fmt::Formatter) -> ::core::fmt::Result {
                write!(f, concat!($display_prefix, "{}"), self.0)
            }
        }

        impl ::core::fmt::Debug for $entity {
            fn fmt(&self, f: &mut ::core::fmt::Formatter) -> ::core::fmt::Result {
                (self as &dyn ::core::fmt::Display).fmt(f)
            }
        }
    };
    ($entity:ident) => {
        entity_impl!($entity, "");
    };
}

#[cfg(test)]
mod tests {
    use super::EntityRef;

    #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct E(u32);
    entity_impl!(E, "e");

    #[test]
    fn roundtrip() {
        let e = E::new(12);
        assert_eq!(e.index(), 12);
        assert_eq!(e.to_string(), "e12");
        assert_eq!(format!("{:?}", e), "e12");
    }

    #[test]
    fn tombstone() {
        assert!(E::from_u32(u32::MAX).is_none());
        assert_eq!(E::from_u32(3).unwrap().index(), 3);
    }
}
