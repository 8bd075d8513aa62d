// Copyright 2025 the Feature Studio Authors
// SPDX-License-Identifier: Apache-2.0

//! Explicit per-page session state.
//!
//! One `SessionState` owns everything the page shares between panels: the
//! feature slots of the open device, the per-direction function catalogs,
//! the library listing, and the global variable setup. Panels and the
//! editor controller borrow from it instead of reaching into globals.

use serde::Serialize;
use thiserror::Error;

use crate::api::{
    ApiError, DeviceFunctions, FunctionApi, FunctionOverview, GlobalSetup, Library,
};
use crate::model::{
    FeatureSlot, FeatureType, FunctionCatalog, FunctionRef, ParamSig, SelectAction, SlotPayload,
    refresh_library_visibility,
};

/// The device payload cannot be assembled yet.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("feature \"{name}\" has no function selected")]
    UnboundSlot { name: String },
}

/// Everything one open device page knows.
#[derive(Debug)]
pub struct SessionState {
    pub language: String,
    pub platform: String,
    input_slots: Vec<FeatureSlot>,
    output_slots: Vec<FeatureSlot>,
    input_catalog: FunctionCatalog,
    output_catalog: FunctionCatalog,
    pub libraries: Vec<Library>,
    pub selected_library_ids: Vec<i64>,
    pub global_setup: GlobalSetup,
    /// Set while a device is registered; editing is view-only then.
    edit_locked: bool,
}

impl SessionState {
    pub fn new(language: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            platform: platform.into(),
            input_slots: Vec::new(),
            output_slots: Vec::new(),
            input_catalog: FunctionCatalog::new(),
            output_catalog: FunctionCatalog::new(),
            libraries: Vec::new(),
            selected_library_ids: Vec::new(),
            global_setup: GlobalSetup::default(),
            edit_locked: false,
        }
    }

    /// Declare a device feature slot, registering its signature with the
    /// matching catalog.
    pub fn register_slot(
        &mut self,
        name: impl Into<String>,
        feature_type: FeatureType,
        params: ParamSig,
    ) {
        self.catalog_mut(feature_type).seed_signature(params.clone());
        let slot = FeatureSlot::new(name, feature_type, params);
        match feature_type {
            FeatureType::Input => self.input_slots.push(slot),
            FeatureType::Output => self.output_slots.push(slot),
        }
    }

    pub fn slots(&self, feature_type: FeatureType) -> &[FeatureSlot] {
        match feature_type {
            FeatureType::Input => &self.input_slots,
            FeatureType::Output => &self.output_slots,
        }
    }

    pub fn slots_mut(&mut self, feature_type: FeatureType) -> &mut [FeatureSlot] {
        match feature_type {
            FeatureType::Input => &mut self.input_slots,
            FeatureType::Output => &mut self.output_slots,
        }
    }

    pub fn slot(&self, feature_type: FeatureType, name: &str) -> Option<&FeatureSlot> {
        self.slots(feature_type).iter().find(|slot| slot.name == name)
    }

    pub fn slot_mut(&mut self, feature_type: FeatureType, name: &str) -> Option<&mut FeatureSlot> {
        self.slots_mut(feature_type)
            .iter_mut()
            .find(|slot| slot.name == name)
    }

    pub fn catalog(&self, feature_type: FeatureType) -> &FunctionCatalog {
        match feature_type {
            FeatureType::Input => &self.input_catalog,
            FeatureType::Output => &self.output_catalog,
        }
    }

    pub fn catalog_mut(&mut self, feature_type: FeatureType) -> &mut FunctionCatalog {
        match feature_type {
            FeatureType::Input => &mut self.input_catalog,
            FeatureType::Output => &mut self.output_catalog,
        }
    }

    /// A slot together with its catalog signature group, borrowed at once.
    pub fn slot_with_group(
        &mut self,
        feature_type: FeatureType,
        name: &str,
    ) -> Option<(&mut FeatureSlot, &mut Vec<FunctionRef>)> {
        let Self {
            input_slots,
            output_slots,
            input_catalog,
            output_catalog,
            ..
        } = self;
        let (slots, catalog) = match feature_type {
            FeatureType::Input => (input_slots, input_catalog),
            FeatureType::Output => (output_slots, output_catalog),
        };
        let slot = slots.iter_mut().find(|slot| slot.name == name)?;
        let group = catalog.group_mut(&slot.params.clone());
        Some((slot, group))
    }

    /// Recompute library visibility against one catalog signature group.
    pub fn refresh_libraries(&mut self, feature_type: FeatureType, params: &ParamSig) {
        let Self {
            input_catalog,
            output_catalog,
            libraries,
            ..
        } = self;
        let catalog = match feature_type {
            FeatureType::Input => input_catalog,
            FeatureType::Output => output_catalog,
        };
        refresh_library_visibility(libraries, catalog.group(params));
    }

    pub fn edit_locked(&self) -> bool {
        self.edit_locked
    }

    pub fn set_edit_locked(&mut self, locked: bool) {
        self.edit_locked = locked;
    }

    /// Replace the page's shared state from a server listing: catalogs are
    /// rebuilt, saved slot associations are re-applied, libraries and the
    /// global setup are replaced.
    ///
    /// With `keep_selection` each slot re-resolves the selection it had
    /// before the refresh instead of adopting the persisted one; this is
    /// the path taken after a save, where the user's current picks win.
    pub fn refresh_from_overview(
        &mut self,
        overview: FunctionOverview,
        keep_selection: bool,
        api: &dyn FunctionApi,
    ) -> Result<(), ApiError> {
        let (inputs, outputs): (Vec<_>, Vec<_>) = overview
            .functions
            .into_iter()
            .partition(|summary| summary.feature_type == FeatureType::Input);
        self.input_catalog.rebuild(inputs);
        self.output_catalog.rebuild(outputs);
        self.apply_slot_bindings(overview.slot_functions, keep_selection, api)?;
        self.libraries = overview.libraries;
        self.global_setup = overview.global_var_setup;
        Ok(())
    }

    /// Re-apply persisted slot associations against the current catalogs.
    pub fn apply_slot_bindings(
        &mut self,
        functions: DeviceFunctions,
        keep_selection: bool,
        api: &dyn FunctionApi,
    ) -> Result<(), ApiError> {
        let Self {
            input_slots,
            output_slots,
            input_catalog,
            output_catalog,
            ..
        } = self;
        apply_bindings(input_slots, input_catalog, functions.idfs, keep_selection, api)?;
        apply_bindings(output_slots, output_catalog, functions.odfs, keep_selection, api)
    }

    /// Assemble the associations to persist with the device. Every slot
    /// must have a selected function.
    pub fn device_payload(&self) -> Result<DevicePayload, PayloadError> {
        for slot in self.input_slots.iter().chain(&self.output_slots) {
            if !slot.is_function_selected() {
                return Err(PayloadError::UnboundSlot {
                    name: slot.name.clone(),
                });
            }
        }
        Ok(DevicePayload {
            idfs: self.input_slots.iter().map(FeatureSlot::to_payload).collect(),
            odfs: self.output_slots.iter().map(FeatureSlot::to_payload).collect(),
        })
    }
}

/// The slot associations persisted with a device registration.
#[derive(Debug, Serialize)]
pub struct DevicePayload {
    pub idfs: Vec<SlotPayload>,
    pub odfs: Vec<SlotPayload>,
}

fn apply_bindings(
    slots: &mut [FeatureSlot],
    catalog: &mut FunctionCatalog,
    payloads: Vec<SlotPayload>,
    keep_selection: bool,
    api: &dyn FunctionApi,
) -> Result<(), ApiError> {
    for payload in payloads {
        let Some(slot) = slots.iter_mut().find(|slot| slot.name == payload.name) else {
            continue;
        };
        let previous = slot.current();
        slot.clear_functions();

        let mut persisted_selection = None;
        for entry in payload.functions {
            // Unsaved entries cannot be resolved against the catalog.
            let Some(id) = entry.id else { continue };
            let Some(record) = catalog.find(&slot.params, id) else {
                tracing::warn!(
                    "slot {} references unknown function {}; dropping",
                    slot.name,
                    id
                );
                continue;
            };
            if entry.selected {
                persisted_selection = Some((id, entry.var_setup.clone()));
            }
            slot.add_function(
                record,
                Some(entry.var_setup),
                catalog.group_mut(&slot.params),
                api,
            )?;
        }

        if keep_selection {
            slot.set_selected(match previous {
                Some(id) => SelectAction::Choose(id),
                None => SelectAction::Clear,
            });
        } else {
            match persisted_selection {
                Some((id, var_setup)) => {
                    slot.set_selected(SelectAction::Choose(id));
                    slot.var_setup = var_setup;
                }
                None => slot.set_selected(SelectAction::Clear),
            }
        }
    }
    Ok(())
}
