// SPDX-License-Identifier: MIT OR Apache-2.0
//! Named graph inputs and outputs, used to move data in and out of a graph
//! without addressing individual nodes.

use crate::graph::Graph;
use crate::slot::SlotType;
use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A named global value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalSlot {
    /// Declared type
    #[serde(rename = "type")]
    pub slot_type: SlotType,
    /// Current value
    pub value: Value,
}

impl GlobalSlot {
    /// Create a global slot
    pub fn new(slot_type: SlotType, value: Value) -> Self {
        Self { slot_type, value }
    }
}

fn rename_entry(map: &mut IndexMap<String, GlobalSlot>, old_name: &str, new_name: &str) -> bool {
    if map.contains_key(new_name) {
        return false;
    }
    let Some((index, _, slot)) = map.shift_remove_full(old_name) else {
        return false;
    };
    map.shift_insert(index, new_name.to_string(), slot);
    true
}

impl Graph {
    /// Register a global input. Returns false if the name is taken.
    pub fn add_global_input(&mut self, name: impl Into<String>, slot_type: SlotType, value: Value) -> bool {
        let name = name.into();
        if self.globals_in.contains_key(&name) {
            return false;
        }
        tracing::debug!(%name, %slot_type, "Global input added");
        self.globals_in.insert(name, GlobalSlot::new(slot_type, value));
        self.mark_changed();
        true
    }

    /// Register a global output. Returns false if the name is taken.
    pub fn add_global_output(&mut self, name: impl Into<String>, slot_type: SlotType, value: Value) -> bool {
        let name = name.into();
        if self.globals_out.contains_key(&name) {
            return false;
        }
        tracing::debug!(%name, %slot_type, "Global output added");
        self.globals_out.insert(name, GlobalSlot::new(slot_type, value));
        self.mark_changed();
        true
    }

    /// Rename a global input, keeping its position.
    /// Returns false without changes if `old_name` is missing or `new_name` is taken.
    pub fn rename_global_input(&mut self, old_name: &str, new_name: &str) -> bool {
        let renamed = rename_entry(&mut self.globals_in, old_name, new_name);
        if renamed {
            self.mark_changed();
        }
        renamed
    }

    /// Rename a global output, keeping its position.
    /// Returns false without changes if `old_name` is missing or `new_name` is taken.
    pub fn rename_global_output(&mut self, old_name: &str, new_name: &str) -> bool {
        let renamed = rename_entry(&mut self.globals_out, old_name, new_name);
        if renamed {
            self.mark_changed();
        }
        renamed
    }

    /// Remove a global input. Returns false if it does not exist.
    pub fn remove_global_input(&mut self, name: &str) -> bool {
        let removed = self.globals_in.shift_remove(name).is_some();
        if removed {
            self.mark_changed();
        }
        removed
    }

    /// Remove a global output. Returns false if it does not exist.
    pub fn remove_global_output(&mut self, name: &str) -> bool {
        let removed = self.globals_out.shift_remove(name).is_some();
        if removed {
            self.mark_changed();
        }
        removed
    }

    /// Change the declared type of a global input
    pub fn change_global_input_type(&mut self, name: &str, slot_type: SlotType) -> bool {
        match self.globals_in.get_mut(name) {
            Some(slot) => {
                slot.slot_type = slot_type;
                true
            }
            None => false,
        }
    }

    /// Set the value of a global input. Returns false if it does not exist.
    pub fn set_global_input(&mut self, name: &str, value: Value) -> bool {
        match self.globals_in.get_mut(name) {
            Some(slot) => {
                slot.value = value;
                true
            }
            None => false,
        }
    }

    /// Set the value of a global output. Returns false if it does not exist.
    pub fn set_global_output(&mut self, name: &str, value: Value) -> bool {
        match self.globals_out.get_mut(name) {
            Some(slot) => {
                slot.value = value;
                true
            }
            None => false,
        }
    }

    /// Get a global input
    pub fn global_input(&self, name: &str) -> Option<&GlobalSlot> {
        self.globals_in.get(name)
    }

    /// Get a global output
    pub fn global_output(&self, name: &str) -> Option<&GlobalSlot> {
        self.globals_out.get(name)
    }

    /// All global inputs in registration order
    pub fn global_inputs(&self) -> impl Iterator<Item = (&str, &GlobalSlot)> {
        self.globals_in.iter().map(|(name, slot)| (name.as_str(), slot))
    }

    /// All global outputs in registration order
    pub fn global_outputs(&self) -> impl Iterator<Item = (&str, &GlobalSlot)> {
        self.globals_out.iter().map(|(name, slot)| (name.as_str(), slot))
    }
}
