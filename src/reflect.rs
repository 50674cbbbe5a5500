//! The compile-time reflection oracle (spec §6).
//!
//! The storage core does not care how field layout is produced -- only that
//! it can be queried. [`Reflect`] is that query surface: one impl per user
//! type, normally generated by a derive macro (out of scope for this crate,
//! same as the math/reflection macros spec.md places outside the storage
//! core) or hand-written for leaf/tag types.
//!
//! A blanket impl is provided for `()`, standing in for zero-field tag
//! components -- any type that carries no data can reuse it by delegating.

use crate::vtable::ComponentVtable;

/// Runtime classification of a reflected type, gating archetype membership.
///
/// Only `Data`, `Tag`, and `Shared` may participate in an archetype; `None`
/// is reserved for types that are reflectable (e.g. nested field types) but
/// are never themselves attached to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentTag {
    None,
    Data,
    Tag,
    Shared,
}

/// Static description of one field, as the oracle would hand it back.
#[derive(Debug, Clone, Copy)]
pub struct FieldInfo {
    pub name: &'static str,
    pub offset: usize,
}

/// The compile-time oracle every reflectable type must implement.
///
/// `field_count`/`field_offset`/`field_name` describe *direct* fields only;
/// the type registry resolves each field's own `Reflect::TYPE_NAME` to a
/// full `TypeDescriptor` recursively (spec §4.2's "construction is
/// bottom-up").
pub trait Reflect: Sized + 'static {
    /// Canonical, stable name used as the registry's hashing key.
    const TYPE_NAME: &'static str;

    /// The component classification of this type (spec §3,
    /// `classification`). Types used only as fields of other types, never
    /// attached directly, should return `ComponentTag::None`.
    const COMPONENT_TAG: ComponentTag = ComponentTag::None;

    /// Number of direct fields. `0` for tag components and scalar leaves.
    fn field_count() -> usize {
        0
    }

    /// Static metadata for field `index`. Panics if `index >= field_count()`.
    fn field_info(_index: usize) -> FieldInfo {
        unreachable!("field_info called with no fields declared")
    }

    /// Resolve field `index`'s own descriptor into the given registry,
    /// returning its `name_hash`. Implemented per-field by the derive site
    /// (or by hand) since each field has a distinct concrete type that this
    /// trait, being object-safe-free, cannot express generically.
    fn field_type_hash(_index: usize, _registry: &crate::type_registry::TypeRegistry) -> u32 {
        unreachable!("field_type_hash called with no fields declared")
    }

    /// Build this type's vtable. The default is appropriate for any
    /// `Copy`-like trivial type; non-trivial types must override it.
    fn vtable() -> ComponentVtable {
        ComponentVtable::trivial()
    }
}

/// Blanket reflection for the unit type, used by zero-field tag components
/// that have no more specific impl of their own.
impl Reflect for () {
    const TYPE_NAME: &'static str = "()";
    const COMPONENT_TAG: ComponentTag = ComponentTag::Tag;
}
