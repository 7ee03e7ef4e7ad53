// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::any::{type_name, TypeId};
use std::ops::{Deref, DerefMut};

use crate::identifier;

/// A value tagged with the identifier of the task parameter it belongs to.
///
/// Slots appear in task signatures, both as inputs and outputs:
///
/// ```
/// use the_conduit::identifier::id;
/// use the_conduit::slots::Slot;
///
/// type Count = Slot<u32, { id("count") }>;
///
/// let count = Count::new(3);
/// assert_eq!(*count, 3);
/// assert_eq!(count.into_inner(), 3);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot<V, const ID: u64> {
    pub value: V,
}

impl<V, const ID: u64> Slot<V, ID> {
    pub const ID: u64 = ID;

    pub fn new(value: V) -> Self {
        Self { value }
    }

    pub fn into_inner(self) -> V {
        self.value
    }
}

impl<V, const ID: u64> From<V> for Slot<V, ID> {
    fn from(value: V) -> Self {
        Self::new(value)
    }
}

impl<V, const ID: u64> Deref for Slot<V, ID> {
    type Target = V;

    fn deref(&self) -> &V {
        &self.value
    }
}

impl<V, const ID: u64> DerefMut for Slot<V, ID> {
    fn deref_mut(&mut self) -> &mut V {
        &mut self.value
    }
}

/// Compile-time view of a slot type: its value type and identifier.
///
/// Values moving through the graph must be `Clone` so an output can feed more
/// than one consumer.
pub trait SlotType: Send + 'static {
    type Value: Clone + Send + 'static;
    const ID: u64;

    fn from_value(value: Self::Value) -> Self;
    fn into_value(self) -> Self::Value;

    fn descriptor() -> SlotDescriptor {
        SlotDescriptor::of::<Self::Value>(Self::ID)
    }
}

impl<V, const ID: u64> SlotType for Slot<V, ID>
where
    V: Clone + Send + 'static,
{
    type Value = V;
    const ID: u64 = ID;

    fn from_value(value: V) -> Self {
        Self::new(value)
    }

    fn into_value(self) -> V {
        self.value
    }
}

/// Runtime description of one declared slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotDescriptor {
    pub id: u64,
    pub type_id: TypeId,
    pub type_name: &'static str,
}

impl SlotDescriptor {
    pub fn of<V: 'static>(id: u64) -> Self {
        Self {
            id,
            type_id: TypeId::of::<V>(),
            type_name: type_name::<V>(),
        }
    }

    /// Display name of the slot identifier.
    pub fn name(&self) -> String {
        identifier::describe(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::id;

    type Left = Slot<Vec<i32>, { id("left") }>;

    #[test]
    fn test_slot_exposes_id_and_value() {
        assert_eq!(Left::ID, id("left"));
        assert_eq!(<Left as SlotType>::ID, id("left"));

        let mut left = Left::new(vec![3, 1]);
        left.push(2);
        assert_eq!(left.into_value(), vec![3, 1, 2]);
    }

    #[test]
    fn test_descriptor_records_type() {
        let descriptor = Left::descriptor();
        assert_eq!(descriptor.id, id("left"));
        assert_eq!(descriptor.type_id, TypeId::of::<Vec<i32>>());
        assert_eq!(descriptor.name(), "LEFT");
    }

    #[test]
    fn test_numeric_ids_are_allowed() {
        let value: Slot<i32, 0> = 42.into();
        assert_eq!(value.value, 42);
        assert_eq!(<Slot<i32, 0> as SlotType>::descriptor().name(), "#0");
    }
}
