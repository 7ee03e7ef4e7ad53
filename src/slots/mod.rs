// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Slot type machinery: typed slots, slot lists and the connectors built
//! from them.

pub mod connector;
pub mod slot;
pub mod slot_list;

pub use connector::{ConnectorId, Direction, InputConnector, OutputConnector};
pub use slot::{Slot, SlotDescriptor, SlotType};
pub use slot_list::{contains_id, has_duplicate_ids, SlotList};
