// Copyright 2025 the Feature Studio Authors
// SPDX-License-Identifier: Apache-2.0

//! The function editor overlay.
//!
//! One controller drives the four buffers of the overlay: the code
//! editor, its variable-setup side panel, and the two views of the
//! device's global variable setup. It tracks what is open (a fresh
//! skeleton, a persisted function, or a view-only library function) and
//! owns the save and delete workflows against the page state.

use std::sync::Arc;

use thiserror::Error;

use crate::api::{ApiError, FunctionApi, FunctionContent, GlobalSetup};
use crate::editor::{
    BufferLoad, BufferSnapshot, EditRejected, EditorBuffer, EditorOption, Pos, ReadOnlyMode,
};
use crate::model::{
    FeatureType, FunctionId, FunctionRecord, FunctionRef, SelectAction, read_record, same_record,
    share_record, write_record,
};
use crate::settings::{self, placeholder};
use crate::state::SessionState;

/// What the overlay currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorState {
    #[default]
    Idle,
    /// A fresh skeleton that has never been saved.
    NewFunction,
    /// A persisted function open for editing.
    EditFunction,
    /// A library function, shown read-only until imported by saving.
    LibraryFunction,
}

/// What to open the overlay with.
#[derive(Debug, Clone, Copy)]
pub enum OpenChoice {
    CreateNew,
    Function(FunctionId),
    Library { library: i64, function: FunctionId },
}

#[derive(Debug, Error)]
pub enum OpenError {
    #[error("device is registered; function editing is locked")]
    Locked,
    #[error("no feature slot named \"{name}\"")]
    UnknownSlot { name: String },
    #[error("unknown function {0}")]
    UnknownFunction(FunctionId),
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("device is registered; function editing is locked")]
    Locked,
    #[error("no feature slot is open")]
    NoSlot,
    #[error("function name cannot be empty")]
    EmptyName,
    #[error("function name \"{name}\" already exists")]
    DuplicateName { name: String },
    #[error("function is also selected by feature \"{slot}\"; rename to save the changed code")]
    SharedCodeConflict { slot: String },
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Error)]
pub enum DeleteError {
    #[error("no persisted function is open")]
    NothingBound,
    #[error("function is still associated with feature \"{slot}\"")]
    InUse { slot: String },
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Controller for the function editor overlay.
pub struct FunctionEditorController {
    state: EditorState,
    code: EditorBuffer,
    var_setup: EditorBuffer,
    global_setup: EditorBuffer,
    /// Read-only copy of the global setup shown inside the overlay.
    global_setup_overlay: EditorBuffer,
    pub function_name: String,
    /// Library entry the open content was derived from, if any.
    library_ref: Option<FunctionId>,
    /// The persisted record open for editing.
    bound: Option<FunctionRef>,
    /// The slot whose picker opened the overlay.
    open_slot: Option<(FeatureType, String)>,
}

impl Default for FunctionEditorController {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionEditorController {
    pub fn new() -> Self {
        let mut code = EditorBuffer::new();
        for rule in settings::code_autotext_rules() {
            code.add_rule(rule);
        }
        let mut global_setup_overlay = EditorBuffer::new();
        global_setup_overlay.set_option(EditorOption::ReadOnly(ReadOnlyMode::NoCursor));
        Self {
            state: EditorState::Idle,
            code,
            var_setup: EditorBuffer::new(),
            global_setup: EditorBuffer::new(),
            global_setup_overlay,
            function_name: String::new(),
            library_ref: None,
            bound: None,
            open_slot: None,
        }
    }

    pub fn editor_state(&self) -> EditorState {
        self.state
    }

    pub fn open_slot(&self) -> Option<(FeatureType, &str)> {
        self.open_slot
            .as_ref()
            .map(|(feature_type, name)| (*feature_type, name.as_str()))
    }

    pub fn code(&self) -> &EditorBuffer {
        &self.code
    }

    pub fn var_setup(&self) -> &EditorBuffer {
        &self.var_setup
    }

    pub fn global_setup_overlay(&self) -> &EditorBuffer {
        &self.global_setup_overlay
    }

    /// Open the overlay for a slot's picker choice.
    pub fn open_for_slot(
        &mut self,
        state: &mut SessionState,
        feature_type: FeatureType,
        slot_name: &str,
        choice: OpenChoice,
        api: &dyn FunctionApi,
    ) -> Result<(), OpenError> {
        let slot = state
            .slot(feature_type, slot_name)
            .ok_or_else(|| OpenError::UnknownSlot {
                name: slot_name.to_string(),
            })?;
        let params = slot.params.clone();
        self.open_slot = Some((feature_type, slot_name.to_string()));

        let mode = settings::syntax_mode_for(&state.language);
        for buffer in [
            &mut self.code,
            &mut self.var_setup,
            &mut self.global_setup_overlay,
        ] {
            buffer.set_option(EditorOption::Mode(mode.to_string()));
        }
        self.load_global_overlay(&state.global_setup.clone());

        match choice {
            OpenChoice::CreateNew => {
                if state.edit_locked() {
                    return Err(OpenError::Locked);
                }
                let content =
                    api.function_skeleton(&state.language, &state.platform, feature_type, &params)?;
                self.show_skeleton(content, slot_name);
            }
            OpenChoice::Function(id) => {
                let record = state
                    .catalog(feature_type)
                    .find(&params, id)
                    .ok_or(OpenError::UnknownFunction(id))?;
                let content = write_record(&record).fetch_content(api)?;
                self.show_function(record, content, slot_name);
            }
            OpenChoice::Library { library, function } => {
                let name = library_display_name(state, library, function)
                    .ok_or(OpenError::UnknownFunction(function))?;
                let content = api.library_function_content(function, feature_type, &params)?;
                self.show_library_function(function, content, &name, slot_name);
            }
        }

        // A registered device can still be inspected, never edited.
        if state.edit_locked() {
            self.set_view_only();
        }
        Ok(())
    }

    fn show_skeleton(&mut self, content: FunctionContent, slot_name: &str) {
        self.state = EditorState::NewFunction;
        self.bound = None;
        self.library_ref = None;
        self.function_name.clear();
        self.set_editable();
        self.load_editors(content, slot_name);
    }

    fn show_function(&mut self, record: FunctionRef, content: FunctionContent, slot_name: &str) {
        self.state = EditorState::EditFunction;
        self.function_name = read_record(&record).name.clone();
        self.library_ref = content.library_ref;
        self.bound = Some(record);
        self.set_editable();
        self.load_editors(content, slot_name);
    }

    fn show_library_function(
        &mut self,
        function: FunctionId,
        content: FunctionContent,
        name: &str,
        slot_name: &str,
    ) {
        self.state = EditorState::LibraryFunction;
        self.bound = None;
        self.library_ref = Some(function);
        self.function_name = name.to_string();
        self.set_view_only();
        self.load_editors(content, slot_name);
    }

    fn set_editable(&mut self) {
        for buffer in [&mut self.code, &mut self.var_setup] {
            buffer.set_option(EditorOption::Theme(
                settings::editor::THEME_DEFAULT.to_string(),
            ));
            buffer.set_option(EditorOption::ReadOnly(ReadOnlyMode::Editable));
        }
    }

    fn set_view_only(&mut self) {
        for buffer in [&mut self.code, &mut self.var_setup] {
            buffer.set_option(EditorOption::Theme(
                settings::editor::THEME_READ_ONLY.to_string(),
            ));
            buffer.set_option(EditorOption::ReadOnly(ReadOnlyMode::NoCursor));
        }
    }

    /// Load both function buffers from `content`, substituting the slot's
    /// identifier form for the name placeholder.
    fn load_editors(&mut self, content: FunctionContent, slot_name: &str) {
        let df_name = slot_name.replacen('-', "_", 1);
        self.code.set_text(BufferLoad {
            content: content.code,
            read_only_lines: content.read_only_lines,
            templates: [
                (
                    placeholder::VARIABLE_SETUP.to_string(),
                    content.var_setup.clone(),
                ),
                (placeholder::DF_NAME.to_string(), df_name),
            ]
            .into(),
        });
        self.var_setup.set_text(BufferLoad {
            content: content.var_setup,
            ..BufferLoad::default()
        });
    }

    /// Edit the code buffer through its read-only guard.
    pub fn edit_code(&mut self, text: &str, from: Pos, to: Pos) -> Result<(), EditRejected> {
        self.code.user_edit(text, from, to)
    }

    /// Edit the variable-setup panel; the code buffer's setup region
    /// follows immediately.
    pub fn edit_var_setup(&mut self, text: &str, from: Pos, to: Pos) -> Result<(), EditRejected> {
        self.var_setup.user_edit(text, from, to)?;
        let value = self.var_setup.value();
        self.code
            .set_template_text(placeholder::VARIABLE_SETUP, &value);
        Ok(())
    }

    /// Make the open library function editable as a fresh, unsaved
    /// function. The loaded content and the library provenance stay;
    /// saving then creates a new record derived from the library entry.
    pub fn import_from_library(&mut self) {
        if self.state != EditorState::LibraryFunction {
            return;
        }
        self.state = EditorState::NewFunction;
        self.bound = None;
        self.set_editable();
    }

    /// Load both global-setup views.
    pub fn set_global_setup(&mut self, setup: &GlobalSetup) {
        self.global_setup.set_text(BufferLoad {
            content: setup.content.clone(),
            read_only_lines: setup.read_only_lines.clone(),
            ..BufferLoad::default()
        });
        self.load_global_overlay(setup);
    }

    fn load_global_overlay(&mut self, setup: &GlobalSetup) {
        self.global_setup_overlay.set_text(BufferLoad {
            content: setup.content.clone(),
            read_only_lines: setup.read_only_lines.clone(),
            ..BufferLoad::default()
        });
    }

    /// Edit the main global-setup panel; the overlay copy follows.
    pub fn edit_global_setup(&mut self, text: &str, from: Pos, to: Pos) -> Result<(), EditRejected> {
        self.global_setup.user_edit(text, from, to)?;
        let setup = self.global_setup_snapshot();
        self.load_global_overlay(&setup);
        Ok(())
    }

    /// The stored form of the global setup.
    pub fn global_setup_snapshot(&mut self) -> GlobalSetup {
        let BufferSnapshot {
            content,
            read_only_lines,
        } = self.global_setup.get_text();
        GlobalSetup {
            content,
            read_only_lines,
        }
    }

    /// Persist the open function and bind it to the open slot.
    ///
    /// A fresh skeleton, a library view, or an open function whose name
    /// was changed all save as a new record; only an unrenamed persisted
    /// function updates in place, and only when no other slot also has it
    /// selected with changed code.
    pub fn save(
        &mut self,
        state: &mut SessionState,
        api: &dyn FunctionApi,
    ) -> Result<FunctionId, SaveError> {
        if state.edit_locked() {
            return Err(SaveError::Locked);
        }
        let (feature_type, slot_name) = self.open_slot.clone().ok_or(SaveError::NoSlot)?;

        let name = self.function_name.trim().to_string();
        if name.is_empty() {
            return Err(SaveError::EmptyName);
        }
        if name_taken(state, &name, self.bound.as_ref()) {
            return Err(SaveError::DuplicateName { name });
        }

        let code = self.code.get_text();
        let var_setup = self.var_setup.get_text().content;
        let content = FunctionContent {
            code: code.content,
            var_setup: var_setup.clone(),
            read_only_lines: code.read_only_lines,
            library_ref: self.library_ref,
        };

        let renamed = self
            .bound
            .as_ref()
            .is_some_and(|record| read_record(record).name != name);
        let save_as_new = renamed || !matches!(self.state, EditorState::EditFunction);

        let record = if save_as_new {
            // The previously open record, if any, is left untouched.
            let params = state
                .slot(feature_type, &slot_name)
                .ok_or(SaveError::NoSlot)?
                .params
                .clone();
            share_record(FunctionRecord::new_unsaved(
                name.clone(),
                feature_type,
                params,
                self.library_ref,
            ))
        } else {
            let record = self.bound.clone().ok_or(SaveError::NoSlot)?;
            if !read_record(&record).code_unchanged(&content.code) {
                // Changed code must not silently rewrite a function some
                // other feature is running.
                if let Some(other) = other_slot_using(state, [feature_type], &slot_name, &record) {
                    return Err(SaveError::SharedCodeConflict { slot: other });
                }
            }
            record
        };

        let id = write_record(&record).update_content(api, content)?;

        let (slot, group) = state
            .slot_with_group(feature_type, &slot_name)
            .ok_or(SaveError::NoSlot)?;
        let params = slot.params.clone();
        slot.add_function(Arc::clone(&record), Some(var_setup.clone()), group, api)?;
        slot.set_binding_var_setup(&record, &var_setup);
        slot.set_selected(SelectAction::Choose(id));
        slot.var_setup = var_setup;

        state.refresh_libraries(feature_type, &params);

        self.state = EditorState::EditFunction;
        self.function_name = name;
        self.bound = Some(record);
        Ok(id)
    }

    /// Detach the open function from the open slot and show a fresh
    /// skeleton in its place. The record itself stays in the catalog.
    pub fn delete_current(
        &mut self,
        state: &mut SessionState,
        api: &dyn FunctionApi,
    ) -> Result<(), DeleteError> {
        let record = self.bound.clone().ok_or(DeleteError::NothingBound)?;
        let (feature_type, slot_name) = self.open_slot.clone().ok_or(DeleteError::NothingBound)?;

        // Mere association blocks deletion: another slot may still pick
        // the record even without currently selecting it.
        let everywhere = [FeatureType::Input, FeatureType::Output];
        if let Some(other) = other_slot_holding(state, everywhere, &slot_name, &record) {
            return Err(DeleteError::InUse { slot: other });
        }

        let params = {
            let (slot, _) = state
                .slot_with_group(feature_type, &slot_name)
                .ok_or(DeleteError::NothingBound)?;
            slot.remove_function(&record);
            slot.params.clone()
        };

        let content =
            api.function_skeleton(&state.language, &state.platform, feature_type, &params)?;
        self.show_skeleton(content, &slot_name);
        Ok(())
    }

    /// Close the overlay.
    pub fn close(&mut self) {
        self.state = EditorState::Idle;
        self.bound = None;
        self.open_slot = None;
        self.library_ref = None;
        self.function_name.clear();
    }
}

/// Whether any catalog record other than `bound` already uses `name`.
fn name_taken(state: &SessionState, name: &str, bound: Option<&FunctionRef>) -> bool {
    [FeatureType::Input, FeatureType::Output]
        .into_iter()
        .any(|feature_type| {
            state.catalog(feature_type).iter_all().any(|record| {
                read_record(record).name == name
                    && bound.is_none_or(|bound| !same_record(bound, record))
            })
        })
}

/// The first slot other than `slot_name`, in any of the given feature
/// directions, that has `record` among its associations.
fn other_slot_holding(
    state: &SessionState,
    feature_types: impl IntoIterator<Item = FeatureType>,
    slot_name: &str,
    record: &FunctionRef,
) -> Option<String> {
    feature_types
        .into_iter()
        .flat_map(|feature_type| state.slots(feature_type))
        .find(|slot| slot.name != slot_name && slot.has_function(record))
        .map(|slot| slot.name.clone())
}

/// The first slot other than `slot_name`, in any of the given feature
/// directions, that currently has `record` selected.
fn other_slot_using(
    state: &SessionState,
    feature_types: impl IntoIterator<Item = FeatureType>,
    slot_name: &str,
    record: &FunctionRef,
) -> Option<String> {
    let id = read_record(record).id?;
    feature_types
        .into_iter()
        .flat_map(|feature_type| state.slots(feature_type))
        .find(|slot| slot.name != slot_name && slot.current() == Some(id))
        .map(|slot| slot.name.clone())
}

/// Display name for a library function: the entry's name qualified by the
/// library's base name (the part before the first underscore).
fn library_display_name(state: &SessionState, library: i64, function: FunctionId) -> Option<String> {
    let library = state.libraries.iter().find(|lib| lib.id == library)?;
    let entry = library.functions.iter().find(|func| func.id == function)?;
    let base = library.name.split('_').next().unwrap_or(&library.name);
    Some(format!("{}_{}", entry.name, base))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::FakeApi;
    use crate::api::{FunctionSummary, Library, LibraryFunction};
    use crate::model::ParamSig;

    const SKELETON: &str = "def {*df_name*}(value):\n    {*variable_setup*}\n    pass";

    fn skeleton_content() -> FunctionContent {
        FunctionContent {
            code: SKELETON.to_string(),
            var_setup: String::new(),
            read_only_lines: vec![0],
            library_ref: None,
        }
    }

    fn state_with_slots() -> SessionState {
        let mut state = SessionState::new("python", "raspberrypi");
        state.register_slot("push-button", FeatureType::Input, ParamSig::new(["int"]));
        state.register_slot("dial", FeatureType::Input, ParamSig::new(["int"]));
        state
    }

    fn summary(id: i64, name: &str) -> FunctionSummary {
        FunctionSummary {
            id: FunctionId(id),
            name: name.to_string(),
            feature_type: FeatureType::Input,
            params: ParamSig::new(["int"]),
            library_ref: None,
        }
    }

    fn open_new(
        controller: &mut FunctionEditorController,
        state: &mut SessionState,
        api: &FakeApi,
    ) {
        controller
            .open_for_slot(state, FeatureType::Input, "push-button", OpenChoice::CreateNew, api)
            .unwrap();
    }

    #[test]
    fn test_create_new_loads_skeleton_with_slot_identifier() {
        let api = FakeApi::new().with_skeleton(skeleton_content());
        let mut state = state_with_slots();
        let mut controller = FunctionEditorController::new();

        open_new(&mut controller, &mut state, &api);
        assert_eq!(controller.editor_state(), EditorState::NewFunction);
        // Only the first hyphen becomes an underscore.
        assert_eq!(
            controller.code().value(),
            "def push_button(value):\n    \n    pass"
        );
        assert_eq!(controller.code().mode(), "text/x-python");
    }

    #[test]
    fn test_save_new_function_binds_and_selects() {
        let api = FakeApi::new().with_skeleton(skeleton_content());
        let mut state = state_with_slots();
        let mut controller = FunctionEditorController::new();
        open_new(&mut controller, &mut state, &api);

        controller.function_name = "read_button".to_string();
        let id = controller.save(&mut state, &api).unwrap();

        let slot = state.slot(FeatureType::Input, "push-button").unwrap();
        assert_eq!(slot.current(), Some(id));
        assert_eq!(slot.selected_name(), "read_button");
        assert!(state.catalog(FeatureType::Input).find(&ParamSig::new(["int"]), id).is_some());
        // The stored code keeps its placeholder markers.
        assert_eq!(api.saves.borrow()[0].code, SKELETON);
        assert_eq!(controller.editor_state(), EditorState::EditFunction);
    }

    #[test]
    fn test_save_requires_a_name() {
        let api = FakeApi::new().with_skeleton(skeleton_content());
        let mut state = state_with_slots();
        let mut controller = FunctionEditorController::new();
        open_new(&mut controller, &mut state, &api);

        controller.function_name = "   ".to_string();
        assert!(matches!(
            controller.save(&mut state, &api),
            Err(SaveError::EmptyName)
        ));
        assert_eq!(api.save_count(), 0);
    }

    #[test]
    fn test_save_rejects_duplicate_name() {
        let api = FakeApi::new().with_skeleton(skeleton_content());
        let mut state = state_with_slots();
        state
            .catalog_mut(FeatureType::Input)
            .rebuild(vec![summary(1, "taken")]);
        let mut controller = FunctionEditorController::new();
        open_new(&mut controller, &mut state, &api);

        controller.function_name = "taken".to_string();
        assert!(matches!(
            controller.save(&mut state, &api),
            Err(SaveError::DuplicateName { .. })
        ));
        assert_eq!(api.save_count(), 0);
    }

    #[test]
    fn test_rename_saves_as_new_leaving_original_untouched() {
        let api = FakeApi::new()
            .with_skeleton(skeleton_content())
            .with_content(
                FunctionId(1),
                FunctionContent {
                    code: "original body".to_string(),
                    var_setup: String::new(),
                    read_only_lines: Vec::new(),
                    library_ref: None,
                },
            );
        let mut state = state_with_slots();
        state
            .catalog_mut(FeatureType::Input)
            .rebuild(vec![summary(1, "read_button")]);
        let mut controller = FunctionEditorController::new();
        controller
            .open_for_slot(
                &mut state,
                FeatureType::Input,
                "push-button",
                OpenChoice::Function(FunctionId(1)),
                &api,
            )
            .unwrap();

        controller.function_name = "read_button_v2".to_string();
        let new_id = controller.save(&mut state, &api).unwrap();
        assert_ne!(new_id, FunctionId(1));
        assert_eq!(api.saves.borrow()[0].id, None);

        // The original record kept its name and id.
        let original = state
            .catalog(FeatureType::Input)
            .find(&ParamSig::new(["int"]), FunctionId(1))
            .unwrap();
        assert_eq!(read_record(&original).name, "read_button");
    }

    #[test]
    fn test_changed_code_on_shared_function_is_rejected() {
        let api = FakeApi::new().with_content(
            FunctionId(1),
            FunctionContent {
                code: "body\nline".to_string(),
                var_setup: String::new(),
                read_only_lines: Vec::new(),
                library_ref: None,
            },
        );
        let mut state = state_with_slots();
        state
            .catalog_mut(FeatureType::Input)
            .rebuild(vec![summary(1, "shared")]);

        // Both slots select the same record.
        for name in ["push-button", "dial"] {
            let record = state
                .catalog(FeatureType::Input)
                .find(&ParamSig::new(["int"]), FunctionId(1))
                .unwrap();
            let (slot, group) = state.slot_with_group(FeatureType::Input, name).unwrap();
            slot.add_function(record, Some(String::new()), group, &api).unwrap();
            slot.set_selected(SelectAction::Choose(FunctionId(1)));
        }

        let mut controller = FunctionEditorController::new();
        controller
            .open_for_slot(
                &mut state,
                FeatureType::Input,
                "push-button",
                OpenChoice::Function(FunctionId(1)),
                &api,
            )
            .unwrap();
        controller
            .edit_code("changed ", Pos::new(0, 0), Pos::new(0, 0))
            .unwrap();

        let before = api.save_count();
        assert!(matches!(
            controller.save(&mut state, &api),
            Err(SaveError::SharedCodeConflict { slot }) if slot == "dial"
        ));
        assert_eq!(api.save_count(), before);
    }

    #[test]
    fn test_unchanged_code_on_shared_function_saves() {
        let api = FakeApi::new().with_content(
            FunctionId(1),
            FunctionContent {
                code: "body".to_string(),
                var_setup: String::new(),
                read_only_lines: Vec::new(),
                library_ref: None,
            },
        );
        let mut state = state_with_slots();
        state
            .catalog_mut(FeatureType::Input)
            .rebuild(vec![summary(1, "shared")]);
        for name in ["push-button", "dial"] {
            let record = state
                .catalog(FeatureType::Input)
                .find(&ParamSig::new(["int"]), FunctionId(1))
                .unwrap();
            let (slot, group) = state.slot_with_group(FeatureType::Input, name).unwrap();
            slot.add_function(record, Some(String::new()), group, &api).unwrap();
            slot.set_selected(SelectAction::Choose(FunctionId(1)));
        }

        let mut controller = FunctionEditorController::new();
        controller
            .open_for_slot(
                &mut state,
                FeatureType::Input,
                "push-button",
                OpenChoice::Function(FunctionId(1)),
                &api,
            )
            .unwrap();
        // Only the variable setup changes; the shared code is untouched,
        // and unchanged code does not even issue a request.
        controller
            .edit_var_setup("pin = 4", Pos::new(0, 0), Pos::new(0, 0))
            .unwrap();
        assert_eq!(controller.save(&mut state, &api).unwrap(), FunctionId(1));
        assert_eq!(api.save_count(), 0);
        let slot = state.slot(FeatureType::Input, "push-button").unwrap();
        assert_eq!(slot.var_setup, "pin = 4");
    }

    #[test]
    fn test_var_setup_edits_flow_into_code_region() {
        let api = FakeApi::new().with_skeleton(skeleton_content());
        let mut state = state_with_slots();
        let mut controller = FunctionEditorController::new();
        open_new(&mut controller, &mut state, &api);

        controller
            .edit_var_setup("rate = 2", Pos::new(0, 0), Pos::new(0, 0))
            .unwrap();
        assert_eq!(
            controller.code().value(),
            "def push_button(value):\n    rate = 2\n    pass"
        );
    }

    #[test]
    fn test_library_function_opens_view_only() {
        let api = FakeApi::new().with_skeleton(skeleton_content());
        api.library_contents.borrow_mut().insert(
            FunctionId(10),
            FunctionContent {
                code: "lib body".to_string(),
                var_setup: String::new(),
                read_only_lines: Vec::new(),
                library_ref: Some(FunctionId(10)),
            },
        );
        let mut state = state_with_slots();
        state.libraries = vec![Library {
            id: 3,
            name: "gpio_rpi_v2".to_string(),
            functions: vec![LibraryFunction {
                id: FunctionId(10),
                name: "toggle".to_string(),
                referenced: false,
            }],
            hidden: false,
        }];

        let mut controller = FunctionEditorController::new();
        controller
            .open_for_slot(
                &mut state,
                FeatureType::Input,
                "push-button",
                OpenChoice::Library {
                    library: 3,
                    function: FunctionId(10),
                },
                &api,
            )
            .unwrap();

        assert_eq!(controller.editor_state(), EditorState::LibraryFunction);
        assert_eq!(controller.function_name, "toggle_gpio");
        assert_eq!(controller.code().theme(), "ro");
        assert_eq!(controller.code().read_only(), ReadOnlyMode::NoCursor);
        // Saving imports it as a fresh record carrying the provenance.
        controller.function_name = "toggle_gpio".to_string();
        controller.save(&mut state, &api).unwrap();
        let record = state
            .catalog(FeatureType::Input)
            .find_by_name("toggle_gpio")
            .unwrap();
        assert_eq!(read_record(&record).library_ref, Some(FunctionId(10)));
        // The library entry is now referenced and its library hidden.
        assert!(state.libraries[0].functions[0].referenced);
        assert!(state.libraries[0].hidden);
    }

    #[test]
    fn test_import_makes_library_function_editable() {
        let api = FakeApi::new();
        api.library_contents.borrow_mut().insert(
            FunctionId(10),
            FunctionContent {
                code: "lib body".to_string(),
                var_setup: String::new(),
                read_only_lines: Vec::new(),
                library_ref: Some(FunctionId(10)),
            },
        );
        let mut state = state_with_slots();
        state.libraries = vec![Library {
            id: 3,
            name: "gpio_rpi_v2".to_string(),
            functions: vec![LibraryFunction {
                id: FunctionId(10),
                name: "toggle".to_string(),
                referenced: false,
            }],
            hidden: false,
        }];

        let mut controller = FunctionEditorController::new();
        controller
            .open_for_slot(
                &mut state,
                FeatureType::Input,
                "push-button",
                OpenChoice::Library {
                    library: 3,
                    function: FunctionId(10),
                },
                &api,
            )
            .unwrap();
        assert!(
            controller
                .edit_code("x", Pos::new(0, 0), Pos::new(0, 0))
                .is_err()
        );

        controller.import_from_library();
        assert_eq!(controller.editor_state(), EditorState::NewFunction);
        assert_eq!(controller.code().read_only(), ReadOnlyMode::Editable);
        assert_eq!(controller.code().theme(), "func_mgr");
        // The copied content survives the transition and can now be edited
        // before saving.
        assert_eq!(controller.code().value(), "lib body");
        controller
            .edit_code("tweaked ", Pos::new(0, 0), Pos::new(0, 0))
            .unwrap();

        controller.function_name = "toggle_gpio".to_string();
        controller.save(&mut state, &api).unwrap();
        assert_eq!(api.saves.borrow()[0].code, "tweaked lib body");
        let record = state
            .catalog(FeatureType::Input)
            .find_by_name("toggle_gpio")
            .unwrap();
        assert_eq!(read_record(&record).library_ref, Some(FunctionId(10)));
    }

    #[test]
    fn test_delete_detaches_and_reloads_skeleton() {
        let api = FakeApi::new()
            .with_skeleton(skeleton_content())
            .with_content(
                FunctionId(1),
                FunctionContent {
                    code: "body".to_string(),
                    var_setup: String::new(),
                    read_only_lines: Vec::new(),
                    library_ref: None,
                },
            );
        let mut state = state_with_slots();
        state
            .catalog_mut(FeatureType::Input)
            .rebuild(vec![summary(1, "read_button")]);
        {
            let record = state
                .catalog(FeatureType::Input)
                .find(&ParamSig::new(["int"]), FunctionId(1))
                .unwrap();
            let (slot, group) = state
                .slot_with_group(FeatureType::Input, "push-button")
                .unwrap();
            slot.add_function(record, Some(String::new()), group, &api).unwrap();
            slot.set_selected(SelectAction::Choose(FunctionId(1)));
        }

        let mut controller = FunctionEditorController::new();
        controller
            .open_for_slot(
                &mut state,
                FeatureType::Input,
                "push-button",
                OpenChoice::Function(FunctionId(1)),
                &api,
            )
            .unwrap();
        controller.delete_current(&mut state, &api).unwrap();

        let slot = state.slot(FeatureType::Input, "push-button").unwrap();
        assert!(slot.bindings().is_empty());
        assert!(!slot.is_function_selected());
        // The catalog keeps the record for re-association.
        assert!(
            state
                .catalog(FeatureType::Input)
                .find(&ParamSig::new(["int"]), FunctionId(1))
                .is_some()
        );
        assert_eq!(controller.editor_state(), EditorState::NewFunction);
    }

    #[test]
    fn test_delete_blocked_while_another_slot_selects_it() {
        let api = FakeApi::new().with_content(
            FunctionId(1),
            FunctionContent {
                code: "body".to_string(),
                var_setup: String::new(),
                read_only_lines: Vec::new(),
                library_ref: None,
            },
        );
        let mut state = state_with_slots();
        state
            .catalog_mut(FeatureType::Input)
            .rebuild(vec![summary(1, "shared")]);
        for name in ["push-button", "dial"] {
            let record = state
                .catalog(FeatureType::Input)
                .find(&ParamSig::new(["int"]), FunctionId(1))
                .unwrap();
            let (slot, group) = state.slot_with_group(FeatureType::Input, name).unwrap();
            slot.add_function(record, Some(String::new()), group, &api).unwrap();
            slot.set_selected(SelectAction::Choose(FunctionId(1)));
        }

        let mut controller = FunctionEditorController::new();
        controller
            .open_for_slot(
                &mut state,
                FeatureType::Input,
                "push-button",
                OpenChoice::Function(FunctionId(1)),
                &api,
            )
            .unwrap();
        assert!(matches!(
            controller.delete_current(&mut state, &api),
            Err(DeleteError::InUse { slot }) if slot == "dial"
        ));
    }

    #[test]
    fn test_delete_blocked_by_unselected_association() {
        let api = FakeApi::new().with_content(
            FunctionId(1),
            FunctionContent {
                code: "body".to_string(),
                var_setup: String::new(),
                read_only_lines: Vec::new(),
                library_ref: None,
            },
        );
        let mut state = state_with_slots();
        state
            .catalog_mut(FeatureType::Input)
            .rebuild(vec![summary(1, "shared")]);
        // "dial" associates the record without selecting it.
        for (name, select) in [("push-button", true), ("dial", false)] {
            let record = state
                .catalog(FeatureType::Input)
                .find(&ParamSig::new(["int"]), FunctionId(1))
                .unwrap();
            let (slot, group) = state.slot_with_group(FeatureType::Input, name).unwrap();
            slot.add_function(record, Some(String::new()), group, &api).unwrap();
            if select {
                slot.set_selected(SelectAction::Choose(FunctionId(1)));
            }
        }

        let mut controller = FunctionEditorController::new();
        controller
            .open_for_slot(
                &mut state,
                FeatureType::Input,
                "push-button",
                OpenChoice::Function(FunctionId(1)),
                &api,
            )
            .unwrap();
        assert!(matches!(
            controller.delete_current(&mut state, &api),
            Err(DeleteError::InUse { slot }) if slot == "dial"
        ));
        // The association in "push-button" is untouched.
        let slot = state.slot(FeatureType::Input, "push-button").unwrap();
        assert_eq!(slot.bindings().len(), 1);
    }

    #[test]
    fn test_locked_session_rejects_create_and_save() {
        let api = FakeApi::new().with_skeleton(skeleton_content());
        let mut state = state_with_slots();
        state.set_edit_locked(true);

        let mut controller = FunctionEditorController::new();
        assert!(matches!(
            controller.open_for_slot(
                &mut state,
                FeatureType::Input,
                "push-button",
                OpenChoice::CreateNew,
                &api
            ),
            Err(OpenError::Locked)
        ));

        state.set_edit_locked(false);
        open_new(&mut controller, &mut state, &api);
        controller.function_name = "read_button".to_string();
        state.set_edit_locked(true);
        assert!(matches!(
            controller.save(&mut state, &api),
            Err(SaveError::Locked)
        ));
    }

    #[test]
    fn test_global_setup_mirror_follows_edits() {
        let mut controller = FunctionEditorController::new();
        controller.set_global_setup(&GlobalSetup {
            content: "import machine\n".to_string(),
            read_only_lines: vec![0],
        });
        controller
            .edit_global_setup("counter = 0", Pos::new(1, 0), Pos::new(1, 0))
            .unwrap();

        assert_eq!(
            controller.global_setup_overlay().value(),
            "import machine\ncounter = 0"
        );
        let snapshot = controller.global_setup_snapshot();
        assert_eq!(snapshot.read_only_lines, vec![0]);
    }
}
