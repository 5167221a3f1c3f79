//! Tag registry for polymorphic slots.
//!
//! A polymorphic slot (`Box<dyn Trait>`) carries no type name on the wire;
//! a numeric tag prefixes the value and is the sole discriminator. Both
//! sides of a stream must register the same tag/type associations, per
//! codec instance, before the slot can round-trip.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use crate::codec::FromValue;
use crate::error::CborError;
use crate::value::{Tag, TaggedValue};

/// Encode-side table: concrete type -> wire tag.
#[derive(Debug, Default)]
pub struct TagTable {
    by_type: HashMap<TypeId, Tag>,
}

impl TagTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate wire tag `tag` with concrete type `C`.
    pub fn register<C: Any>(&mut self, tag: Tag) {
        self.by_type.insert(TypeId::of::<C>(), tag);
    }

    /// Tag registered for the concrete type behind `type_id`, if any.
    pub fn tag_for(&self, type_id: TypeId) -> Option<Tag> {
        self.by_type.get(&type_id).copied()
    }
}

type PromoteFn<T> = Box<dyn Fn(&TaggedValue, &Registries) -> Result<Box<T>, CborError>>;

struct PolyTable<T: ?Sized> {
    by_tag: HashMap<u64, PromoteFn<T>>,
}

impl<T: ?Sized> PolyTable<T> {
    fn new() -> Self {
        Self {
            by_tag: HashMap::new(),
        }
    }
}

/// Decode-side registries: one tag table per slot trait.
///
/// Entries live for the owning decoder's lifetime and are never persisted;
/// a fresh decoder needs fresh registrations.
#[derive(Default)]
pub struct Registries {
    tables: HashMap<TypeId, Box<dyn Any>>,
}

impl Registries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate `tag` with concrete type `C` for polymorphic slots of type
    /// `Box<T>`. `promote` captures the concrete-to-slot coercion:
    ///
    /// ```ignore
    /// registries.register(Tag(1), |v: Circle| -> Box<dyn Shape> { Box::new(v) });
    /// ```
    pub fn register<T, C>(&mut self, tag: Tag, promote: fn(C) -> Box<T>)
    where
        T: ?Sized + Any,
        C: FromValue + 'static,
    {
        let entry = self
            .tables
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(PolyTable::<T>::new()));
        if let Some(table) = entry.downcast_mut::<PolyTable<T>>() {
            table.by_tag.insert(
                tag.0,
                Box::new(move |v, reg| Ok(promote(C::from_value(v, reg)?))),
            );
        }
    }

    /// Resolve `tag` for slot trait `T` and build the registered concrete
    /// value from the decoded element. A missing entry is fatal for the
    /// value; there is no skip-unknown policy.
    pub fn resolve<T: ?Sized + Any>(
        &self,
        tag: Tag,
        v: &TaggedValue,
    ) -> Result<Box<T>, CborError> {
        let table = self
            .tables
            .get(&TypeId::of::<T>())
            .and_then(|t| t.downcast_ref::<PolyTable<T>>())
            .ok_or(CborError::UnregisteredTag(tag.0))?;
        let promote = table
            .by_tag
            .get(&tag.0)
            .ok_or(CborError::UnregisteredTag(tag.0))?;
        promote(v, self)
    }
}
