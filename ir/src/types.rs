//! The type lattice (C1): a finite DAG of primitive and pointer types rooted
//! at `any`, with `void` as the unit non-descendant, and a `meet` operator
//! that computes the lowest common ancestor.
//!
//! The depth-equalizing walk in [`TypeTable::meet`] is a direct port of the
//! `lca` recursion in `ir-type.hpp`: raise whichever side is deeper until
//! the depths match, then raise both together until they agree or one runs
//! out of ancestors, in which case the meet fails to `void`.

use ssagen_entity::{entity_impl, PrimaryMap};
use std::collections::HashMap;

/// An opaque reference to an entry in a [`TypeTable`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Type(u32);
entity_impl!(Type, "t");

#[derive(Clone, Debug)]
struct TypeData {
    name: String,
    base: Option<Type>,
    pointer_base: Option<Type>,
    size: usize,
    integral: bool,
}

/// The finite type DAG plus a cache of pointer types created on demand.
///
/// One `TypeTable` is shared by every function compiled in a process: types
/// never need to be duplicated across functions, only referenced by the
/// dense `Type` handle.
pub struct TypeTable {
    table: PrimaryMap<Type, TypeData>,
    pointer_cache: HashMap<Type, Type>,
    void: Type,
    any: Type,
    bool_: Type,
    i8: Type,
    i16: Type,
    i32: Type,
    i64: Type,
    u8: Type,
    u16: Type,
    u32: Type,
    u64: Type,
    f32: Type,
    f64: Type,
    char8: Type,
    char16: Type,
    char32: Type,
}

impl TypeTable {
    /// Build the table with the fixed primitive set named in §3: `void`,
    /// `any`, the signed/unsigned integer widths, the two floating widths,
    /// `bool`, and the character widths. Every primitive other than `void`
    /// is an immediate child of `any` in the lattice.
    pub fn new() -> Self {
        let mut table = PrimaryMap::new();
        let void = table.push(TypeData {
            name: "void".to_string(),
            base: None,
            pointer_base: None,
            size: 0,
            integral: false,
        });
        let any = table.push(TypeData {
            name: "any".to_string(),
            base: None,
            pointer_base: None,
            size: 8,
            integral: false,
        });

        let mut push = |name: &str, size: usize, integral: bool| {
            table.push(TypeData {
                name: name.to_string(),
                base: Some(any),
                pointer_base: None,
                size,
                integral,
            })
        };

        let bool_ = push("bool", 1, true);
        let i8 = push("i8", 1, true);
        let i16 = push("i16", 2, true);
        let i32 = push("i32", 4, true);
        let i64 = push("i64", 8, true);
        let u8 = push("u8", 1, true);
        let u16 = push("u16", 2, true);
        let u32 = push("u32", 4, true);
        let u64 = push("u64", 8, true);
        let f32 = push("f32", 4, false);
        let f64 = push("f64", 8, false);
        let char8 = push("char8", 1, true);
        let char16 = push("char16", 2, true);
        let char32 = push("char32", 4, true);

        Self {
            table,
            pointer_cache: HashMap::new(),
            void,
            any,
            bool_,
            i8,
            i16,
            i32,
            i64,
            u8,
            u16,
            u32,
            u64,
            f32,
            f64,
            char8,
            char16,
            char32,
        }
    }

    pub fn void(&self) -> Type {
        self.void
    }

    pub fn any(&self) -> Type {
        self.any
    }

    pub fn bool_(&self) -> Type {
        self.bool_
    }

    pub fn i8(&self) -> Type {
        self.i8
    }
    pub fn i16(&self) -> Type {
        self.i16
    }
    pub fn i32(&self) -> Type {
        self.i32
    }
    pub fn i64(&self) -> Type {
        self.i64
    }
    pub fn u8(&self) -> Type {
        self.u8
    }
    pub fn u16(&self) -> Type {
        self.u16
    }
    pub fn u32(&self) -> Type {
        self.u32
    }
    pub fn u64(&self) -> Type {
        self.u64
    }
    pub fn f32(&self) -> Type {
        self.f32
    }
    pub fn f64(&self) -> Type {
        self.f64
    }
    pub fn char8(&self) -> Type {
        self.char8
    }
    pub fn char16(&self) -> Type {
        self.char16
    }
    pub fn char32(&self) -> Type {
        self.char32
    }

    /// Look up a primitive by its §3 surface name, used when a frontend or
    /// the text-format CLI parses a type annotation.
    pub fn by_name(&self, name: &str) -> Option<Type> {
        match name {
            "void" => Some(self.void),
            "any" => Some(self.any),
            "bool" => Some(self.bool_),
            "i8" => Some(self.i8),
            "i16" => Some(self.i16),
            "i32" => Some(self.i32),
            "i64" => Some(self.i64),
            "u8" => Some(self.u8),
            "u16" => Some(self.u16),
            "u32" => Some(self.u32),
            "u64" => Some(self.u64),
            "f32" => Some(self.f32),
            "f64" => Some(self.f64),
            "char8" => Some(self.char8),
            "char16" => Some(self.char16),
            "char32" => Some(self.char32),
            _ => None,
        }
    }

    pub fn name(&self, ty: Type) -> &str {
        &self.table[ty].name
    }

    pub fn size(&self, ty: Type) -> usize {
        self.table[ty].size
    }

    pub fn is_integral(&self, ty: Type) -> bool {
        self.table[ty].integral
    }

    pub fn base(&self, ty: Type) -> Option<Type> {
        self.table[ty].base
    }

    pub fn pointer_base(&self, ty: Type) -> Option<Type> {
        self.table[ty].pointer_base
    }

    pub fn is_pointer(&self, ty: Type) -> bool {
        self.table[ty].pointer_base.is_some()
    }

    /// Return the pointer-to-`base` type, interning a fresh one the first
    /// time a given base is pointed to.
    pub fn pointer_to(&mut self, base: Type) -> Type {
        if let Some(&existing) = self.pointer_cache.get(&base) {
            return existing;
        }
        let any = self.any;
        let name = format!("{}*", self.table[base].name);
        let ptr = self.table.push(TypeData {
            name,
            base: Some(any),
            pointer_base: Some(base),
            size: 8,
            integral: false,
        });
        self.pointer_cache.insert(base, ptr);
        ptr
    }

    fn depth(&self, mut ty: Type) -> usize {
        let mut d = 0;
        while let Some(b) = self.table[ty].base {
            d += 1;
            ty = b;
        }
        d
    }

    /// The meet (lowest common ancestor, `∧`): commutative, associative,
    /// idempotent, with `void` absorbing any failed meet.
    pub fn meet(&self, a: Type, b: Type) -> Type {
        if a == b {
            return a;
        }
        let (da, db) = (self.depth(a), self.depth(b));
        if da < db {
            if let Some(base_b) = self.table[b].base {
                return self.meet(a, base_b);
            }
            return self.void;
        }
        if da > db {
            if let Some(base_a) = self.table[a].base {
                return self.meet(base_a, b);
            }
            return self.void;
        }
        match (self.table[a].base, self.table[b].base) {
            (Some(base_a), Some(base_b)) => self.meet(base_a, base_b),
            _ => self.void,
        }
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meet_of_equal_types_is_identity() {
        let t = TypeTable::new();
        assert_eq!(t.meet(t.i32(), t.i32()), t.i32());
    }

    #[test]
    fn meet_of_unrelated_primitives_is_any() {
        let t = TypeTable::new();
        assert_eq!(t.meet(t.i32(), t.f64()), t.any());
    }

    #[test]
    fn meet_with_void_is_void() {
        let t = TypeTable::new();
        assert_eq!(t.meet(t.i32(), t.void()), t.void());
    }

    #[test]
    fn pointer_types_are_interned() {
        let mut t = TypeTable::new();
        let p1 = t.pointer_to(t.i32());
        let p2 = t.pointer_to(t.i32());
        assert_eq!(p1, p2);
        assert!(t.is_pointer(p1));
        assert_eq!(t.pointer_base(p1), Some(t.i32()));
    }

    #[test]
    fn meet_of_pointer_and_primitive_is_any() {
        let mut t = TypeTable::new();
        let p = t.pointer_to(t.i32());
        assert_eq!(t.meet(p, t.f32()), t.any());
    }

    #[test]
    fn meet_of_two_pointers_to_different_bases_is_any() {
        let mut t = TypeTable::new();
        let p_i32 = t.pointer_to(t.i32());
        let p_f64 = t.pointer_to(t.f64());
        assert_eq!(t.meet(p_i32, p_f64), t.any());
    }

    #[test]
    fn by_name_resolves_primitives() {
        let t = TypeTable::new();
        assert_eq!(t.by_name("i64"), Some(t.i64()));
        assert_eq!(t.by_name("nonsense"), None);
    }
}
