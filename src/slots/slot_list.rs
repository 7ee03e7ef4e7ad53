// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Heterogeneous slot lists.
//!
//! A task declares its inputs and outputs as a `SlotList`: `()` for nothing,
//! a single [`Slot`](super::Slot), or a tuple of up to eight slots. The list
//! knows how to create typed queues and ports for its slots, how to take one
//! value from every queue and how to push every value to its port.

use std::any::type_name;
use std::sync::Arc;

use super::slot::{Slot, SlotDescriptor, SlotType};
use crate::engine::queue::{ErasedPort, ErasedQueue, OutputPort, SlotQueue};
use crate::errors::PipelineError;

pub trait SlotList: Sized + Send + 'static {
    /// Identifiers in declaration order.
    const IDS: &'static [u64];

    /// Typed input queues, one per slot.
    type Queues: Send;

    /// Typed output ports, one per slot.
    type Ports: Send;

    fn descriptors() -> Vec<SlotDescriptor>;

    fn queues() -> Self::Queues;

    fn erased_queues(queues: &Self::Queues) -> Vec<Arc<dyn ErasedQueue>>;

    /// Takes the front value of every queue. Returns `None`, and leaves every
    /// queue untouched, if any queue is empty. Queues have a single reader.
    fn pop(queues: &Self::Queues) -> Option<Self>;

    fn ports() -> Vec<Box<dyn ErasedPort>>;

    /// Recovers the typed ports from the list built by [`SlotList::ports`].
    fn seal(ports: Vec<Box<dyn ErasedPort>>) -> Result<Self::Ports, PipelineError>;

    fn emit(self, ports: &Self::Ports);

    fn len() -> usize {
        Self::IDS.len()
    }

    fn position_of(id: u64) -> Option<usize> {
        Self::IDS.iter().position(|&candidate| candidate == id)
    }
}

/// True if any identifier appears twice.
pub const fn has_duplicate_ids(ids: &[u64]) -> bool {
    let mut i = 0;
    while i < ids.len() {
        let mut j = i + 1;
        while j < ids.len() {
            if ids[i] == ids[j] {
                return true;
            }
            j += 1;
        }
        i += 1;
    }
    false
}

/// True if `id` is one of `ids`.
pub const fn contains_id(ids: &[u64], id: u64) -> bool {
    let mut i = 0;
    while i < ids.len() {
        if ids[i] == id {
            return true;
        }
        i += 1;
    }
    false
}

fn seal_port<V: Send + 'static>(
    port: Option<Box<dyn ErasedPort>>,
) -> Result<OutputPort<V>, PipelineError> {
    let port = port.ok_or(PipelineError::ConsumerTypeMismatch {
        expected: type_name::<V>(),
        found: "nothing",
    })?;
    let found = port.value_type();
    port.into_any()
        .downcast::<OutputPort<V>>()
        .map(|port| *port)
        .map_err(|_| PipelineError::ConsumerTypeMismatch {
            expected: type_name::<V>(),
            found,
        })
}

impl SlotList for () {
    const IDS: &'static [u64] = &[];
    type Queues = ();
    type Ports = ();

    fn descriptors() -> Vec<SlotDescriptor> {
        Vec::new()
    }

    fn queues() -> Self::Queues {}

    fn erased_queues(_queues: &Self::Queues) -> Vec<Arc<dyn ErasedQueue>> {
        Vec::new()
    }

    fn pop(_queues: &Self::Queues) -> Option<Self> {
        Some(())
    }

    fn ports() -> Vec<Box<dyn ErasedPort>> {
        Vec::new()
    }

    fn seal(_ports: Vec<Box<dyn ErasedPort>>) -> Result<Self::Ports, PipelineError> {
        Ok(())
    }

    fn emit(self, _ports: &Self::Ports) {}
}

impl<V, const ID: u64> SlotList for Slot<V, ID>
where
    V: Clone + Send + 'static,
{
    const IDS: &'static [u64] = &[ID];
    type Queues = Arc<SlotQueue<V>>;
    type Ports = OutputPort<V>;

    fn descriptors() -> Vec<SlotDescriptor> {
        vec![<Self as SlotType>::descriptor()]
    }

    fn queues() -> Self::Queues {
        Arc::new(SlotQueue::new())
    }

    fn erased_queues(queues: &Self::Queues) -> Vec<Arc<dyn ErasedQueue>> {
        vec![queues.clone() as Arc<dyn ErasedQueue>]
    }

    fn pop(queues: &Self::Queues) -> Option<Self> {
        queues.pop().map(Slot::new)
    }

    fn ports() -> Vec<Box<dyn ErasedPort>> {
        vec![Box::new(OutputPort::<V>::new())]
    }

    fn seal(ports: Vec<Box<dyn ErasedPort>>) -> Result<Self::Ports, PipelineError> {
        seal_port::<V>(ports.into_iter().next())
    }

    fn emit(self, ports: &Self::Ports) {
        ports.emit(self.value);
    }
}

macro_rules! slot_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: SlotType),+> SlotList for ($($name,)+) {
            const IDS: &'static [u64] = &[$(<$name as SlotType>::ID),+];
            type Queues = ($(Arc<SlotQueue<$name::Value>>,)+);
            type Ports = ($(OutputPort<$name::Value>,)+);

            fn descriptors() -> Vec<SlotDescriptor> {
                vec![$($name::descriptor()),+]
            }

            fn queues() -> Self::Queues {
                ($(Arc::new(SlotQueue::<$name::Value>::new()),)+)
            }

            fn erased_queues(queues: &Self::Queues) -> Vec<Arc<dyn ErasedQueue>> {
                vec![$(queues.$idx.clone() as Arc<dyn ErasedQueue>),+]
            }

            fn pop(queues: &Self::Queues) -> Option<Self> {
                // Check first so a partial pop never drops values.
                if $(queues.$idx.is_empty())||+ {
                    return None;
                }
                Some(($($name::from_value(queues.$idx.pop()?),)+))
            }

            fn ports() -> Vec<Box<dyn ErasedPort>> {
                vec![$(Box::new(OutputPort::<$name::Value>::new()) as Box<dyn ErasedPort>),+]
            }

            fn seal(ports: Vec<Box<dyn ErasedPort>>) -> Result<Self::Ports, PipelineError> {
                let mut ports = ports.into_iter();
                Ok(($(seal_port::<$name::Value>(ports.next())?,)+))
            }

            fn emit(self, ports: &Self::Ports) {
                $(ports.$idx.emit(self.$idx.into_value());)+
            }
        }
    };
}

slot_tuple!(A: 0);
slot_tuple!(A: 0, B: 1);
slot_tuple!(A: 0, B: 1, C: 2);
slot_tuple!(A: 0, B: 1, C: 2, D: 3);
slot_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4);
slot_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
slot_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
slot_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::id;

    type Left = Slot<Vec<i32>, { id("left") }>;
    type Right = Slot<Vec<i32>, { id("right") }>;
    type Label = Slot<String, { id("label") }>;

    #[test]
    fn test_ids_follow_declaration_order() {
        assert_eq!(<() as SlotList>::IDS, &[] as &[u64]);
        assert_eq!(<Left as SlotList>::IDS, &[id("left")]);
        assert_eq!(
            <(Left, Right, Label) as SlotList>::IDS,
            &[id("left"), id("right"), id("label")]
        );
        assert_eq!(<(Left, Right, Label)>::position_of(id("label")), Some(2));
        assert_eq!(<(Left, Right)>::position_of(id("label")), None);
    }

    #[test]
    fn test_duplicate_ids_are_detected() {
        assert!(!has_duplicate_ids(&[]));
        assert!(!has_duplicate_ids(&[id("a"), id("b"), id("c")]));
        assert!(has_duplicate_ids(&[id("a"), id("b"), id("A")]));
        assert!(has_duplicate_ids(&[0, 0]));

        const CLEAN: bool = has_duplicate_ids(<(Left, Right) as SlotList>::IDS);
        assert!(!CLEAN);
    }

    #[test]
    fn test_contains_id() {
        assert!(!contains_id(&[], id("left")));
        assert!(contains_id(<(Left, Right) as SlotList>::IDS, id("right")));
        assert!(!contains_id(<(Left, Right) as SlotList>::IDS, id("label")));

        const DECLARED: bool = contains_id(<(Left, Right, Label) as SlotList>::IDS, id("label"));
        assert!(DECLARED);
    }

    #[test]
    fn test_pop_takes_one_value_per_queue() {
        let queues = <(Left, Label)>::queues();
        queues.0.push(vec![1]);
        assert!(<(Left, Label)>::pop(&queues).is_none());

        queues.1.push("first".to_string());
        queues.1.push("second".to_string());

        let erased = <(Left, Label)>::erased_queues(&queues);
        assert_eq!(erased.len(), 2);
        assert_eq!(erased[1].len(), 2);

        let (left, label) = <(Left, Label)>::pop(&queues).unwrap();
        assert_eq!(left.into_value(), vec![1]);
        assert_eq!(label.into_value(), "first");
        assert_eq!(erased[1].len(), 1);
    }

    #[test]
    fn test_emit_reaches_typed_ports() {
        let left_queue = Arc::new(SlotQueue::<Vec<i32>>::new());
        let label_queue = Arc::new(SlotQueue::<String>::new());

        let mut ports = <(Left, Label)>::ports();
        ports[0].bind(left_queue.clone().consumer()).unwrap();
        ports[1].bind(label_queue.clone().consumer()).unwrap();
        let ports = <(Left, Label)>::seal(ports).unwrap();

        (Left::new(vec![4, 5]), Label::new("done".to_string())).emit(&ports);

        assert_eq!(left_queue.pop(), Some(vec![4, 5]));
        assert_eq!(label_queue.pop(), Some("done".to_string()));
    }

    #[test]
    fn test_seal_rejects_foreign_ports() {
        let ports = <Label as SlotList>::ports();
        let result = <Left as SlotList>::seal(ports);
        assert!(matches!(
            result,
            Err(PipelineError::ConsumerTypeMismatch { .. })
        ));
    }
}
