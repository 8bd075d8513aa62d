// Copyright 2025 the Feature Studio Authors
// SPDX-License-Identifier: Apache-2.0

//! A device capability slot and its function associations.
//!
//! A slot owns an alphabetically sorted list of (function, variable-setup
//! override) bindings and tracks which function is currently selected.
//! The function records themselves are shared with every other slot of
//! the same parameter signature through the catalog; the slot only owns
//! the association.

use std::sync::Arc;

use serde::{Deserialize, Serialize, Serializer};

use super::{FunctionId, FunctionRef, ParamSig, read_record, same_record, write_record};
use crate::api::{ApiError, FunctionApi};
use crate::model::FeatureType;
use crate::sorted::sorted_insert;

/// Which function a slot currently has selected.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    Unselected,
    Selected {
        id: FunctionId,
        name: String,
    },
}

/// A selection request against a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectAction {
    /// Clear the selection entirely.
    Clear,
    /// Select the association with this id, falling back to cleared when
    /// the slot has no such association.
    Choose(FunctionId),
    /// Keep the current selection if one exists, else stay cleared. Used
    /// when a picklist is re-rendered without an explicit user choice.
    KeepCurrent,
}

/// One slot-to-function association.
#[derive(Debug, Clone)]
pub struct FunctionBinding {
    /// Slot-local variable-setup override.
    pub var_setup: String,
    pub record: FunctionRef,
}

/// Persisted form of one association.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotFunctionEntry {
    pub id: Option<FunctionId>,
    pub var_setup: String,
    pub selected: bool,
}

/// Persisted form of a slot: `{name, params, functions}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotPayload {
    pub name: String,
    pub params: ParamSig,
    pub functions: Vec<SlotFunctionEntry>,
}

/// A named device capability requiring one bound function.
#[derive(Debug)]
pub struct FeatureSlot {
    pub name: String,
    pub feature_type: FeatureType,
    pub params: ParamSig,
    pub selection: Selection,
    /// Variable setup of the selected function, blanked when the
    /// selection is removed.
    pub var_setup: String,
    bindings: Vec<FunctionBinding>,
}

impl FeatureSlot {
    pub fn new(name: impl Into<String>, feature_type: FeatureType, params: ParamSig) -> Self {
        Self {
            name: name.into(),
            feature_type,
            params,
            selection: Selection::Unselected,
            var_setup: String::new(),
            bindings: Vec::new(),
        }
    }

    pub fn bindings(&self) -> &[FunctionBinding] {
        &self.bindings
    }

    /// Id of the currently selected function, if any.
    pub fn current(&self) -> Option<FunctionId> {
        match &self.selection {
            Selection::Unselected => None,
            Selection::Selected { id, .. } => Some(*id),
        }
    }

    /// Name of the currently selected function, empty when unselected.
    pub fn selected_name(&self) -> &str {
        match &self.selection {
            Selection::Unselected => "",
            Selection::Selected { name, .. } => name,
        }
    }

    /// Whether a real function is currently selected.
    pub fn is_function_selected(&self) -> bool {
        self.current().is_some()
    }

    /// Apply a selection request.
    pub fn set_selected(&mut self, action: SelectAction) {
        match action {
            SelectAction::Clear => self.selection = Selection::Unselected,
            SelectAction::Choose(id) => {
                let name = self.bindings.iter().find_map(|binding| {
                    let record = read_record(&binding.record);
                    (record.id == Some(id)).then(|| record.name.clone())
                });
                self.selection = match name {
                    Some(name) => Selection::Selected { id, name },
                    // Not associated with this slot: fall back to cleared.
                    None => Selection::Unselected,
                };
            }
            SelectAction::KeepCurrent => {}
        }
    }

    /// Whether `record` is associated with this slot.
    pub fn has_function(&self, record: &FunctionRef) -> bool {
        self.bindings
            .iter()
            .any(|binding| same_record(&binding.record, record))
    }

    /// Associate `record` with this slot, keeping the binding list sorted
    /// by function name. Without an override the record's own stored
    /// variable setup is used, fetching it if needed. The record is also
    /// inserted into the slot's same-signature catalog group when absent.
    ///
    /// A record already associated is not associated twice.
    pub fn add_function(
        &mut self,
        record: FunctionRef,
        var_setup: Option<String>,
        catalog_group: &mut Vec<FunctionRef>,
        api: &dyn FunctionApi,
    ) -> Result<(), ApiError> {
        let var_setup = match var_setup {
            Some(value) => value,
            None => write_record(&record).fetch_content(api)?.var_setup,
        };

        if !self.has_function(&record) {
            sorted_insert(
                &mut self.bindings,
                FunctionBinding {
                    var_setup,
                    record: Arc::clone(&record),
                },
                |a, b| read_record(&a.record).name.cmp(&read_record(&b.record).name),
            );
        }

        let id = read_record(&record).id;
        let in_catalog = catalog_group
            .iter()
            .any(|existing| read_record(existing).id == id);
        if !in_catalog {
            sorted_insert(catalog_group, record, |a, b| {
                read_record(a).name.cmp(&read_record(b).name)
            });
        }
        Ok(())
    }

    /// Remove the association with `record`. Removing the current
    /// selection clears it and blanks the slot's variable-setup cache.
    ///
    /// Catalog entries are immortal for the page session; removal only
    /// detaches this slot's association.
    pub fn remove_function(&mut self, record: &FunctionRef) {
        let Some(at) = self
            .bindings
            .iter()
            .position(|binding| same_record(&binding.record, record))
        else {
            return;
        };
        let removed_id = read_record(record).id;
        if removed_id.is_some() && self.current() == removed_id {
            self.selection = Selection::Unselected;
            self.var_setup.clear();
        }
        self.bindings.remove(at);
    }

    /// Drop every association and reset the selection.
    pub fn clear_functions(&mut self) {
        self.bindings.clear();
        self.selection = Selection::Unselected;
        self.var_setup.clear();
    }

    /// The variable-setup override stored for `record`, if associated.
    pub fn binding_var_setup(&self, record: &FunctionRef) -> Option<&str> {
        self.bindings
            .iter()
            .find(|binding| same_record(&binding.record, record))
            .map(|binding| binding.var_setup.as_str())
    }

    /// Replace the stored variable-setup override for `record`. Returns
    /// false when the record is not associated.
    pub fn set_binding_var_setup(&mut self, record: &FunctionRef, var_setup: &str) -> bool {
        match self
            .bindings
            .iter_mut()
            .find(|binding| same_record(&binding.record, record))
        {
            Some(binding) => {
                binding.var_setup = var_setup.to_string();
                true
            }
            None => false,
        }
    }

    /// The persisted form of this slot.
    pub fn to_payload(&self) -> SlotPayload {
        let current = self.current();
        SlotPayload {
            name: self.name.clone(),
            params: self.params.clone(),
            functions: self
                .bindings
                .iter()
                .map(|binding| {
                    let id = read_record(&binding.record).id;
                    SlotFunctionEntry {
                        id,
                        var_setup: binding.var_setup.clone(),
                        selected: id.is_some() && id == current,
                    }
                })
                .collect(),
        }
    }
}

impl Serialize for FeatureSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_payload().serialize(serializer)
    }
}
