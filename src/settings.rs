// Copyright 2025 the Feature Studio Authors
// SPDX-License-Identifier: Apache-2.0

//! Application settings and configuration constants.
//!
//! This module holds the editor defaults, the code-template placeholder
//! markers, and the on-disk settings file. Per-session state belongs in
//! `state.rs`.

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::editor::AutoTextRule;

// ============================================================================
// TEMPLATE PLACEHOLDERS
// ============================================================================
// Markers embedded in server-side code templates. Each becomes a managed
// region when the editor loads the template.

/// Expands to the variable-setup block of the open function.
const PLACEHOLDER_VARIABLE_SETUP: &str = "{*variable_setup*}";

/// Expands to the feature-qualified function name.
const PLACEHOLDER_DF_NAME: &str = "{*df_name*}";

/// Expands to nothing; reserves an editable line in the template.
const PLACEHOLDER_NEW_LINE: &str = "{*new_line*}";

// ============================================================================
// EDITOR SETTINGS
// ============================================================================
/// Column width of one tab stop
const TAB_SIZE: usize = 4;

/// Spaces inserted per indent level
const INDENT_UNIT: usize = 4;

/// Theme for editable function buffers
const THEME_DEFAULT: &str = "func_mgr";

/// Theme for view-only library function buffers
const THEME_READ_ONLY: &str = "ro";

// ============================================================================
// PUBLIC API - Don't edit below this line unless you know what you're doing
// ============================================================================

/// Template placeholder markers
pub mod placeholder {
    /// Variable-setup placeholder
    pub const VARIABLE_SETUP: &str = super::PLACEHOLDER_VARIABLE_SETUP;

    /// Function-name placeholder
    pub const DF_NAME: &str = super::PLACEHOLDER_DF_NAME;

    /// Blank-line placeholder
    pub const NEW_LINE: &str = super::PLACEHOLDER_NEW_LINE;
}

/// Editor defaults (indentation, themes)
pub mod editor {
    /// Column width of one tab stop
    pub const TAB_SIZE: usize = super::TAB_SIZE;

    /// Spaces inserted per indent level
    pub const INDENT_UNIT: usize = super::INDENT_UNIT;

    /// Theme for editable buffers
    pub const THEME_DEFAULT: &str = super::THEME_DEFAULT;

    /// Theme for view-only buffers
    pub const THEME_READ_ONLY: &str = super::THEME_READ_ONLY;
}

/// The placeholder rules applied to every code buffer.
///
/// Variable setup and function name render read-only and are restored to
/// their markers when the buffer's stored form is read back; the
/// blank-line marker is a one-shot substitution.
pub fn code_autotext_rules() -> Vec<AutoTextRule> {
    vec![
        AutoTextRule::new(PLACEHOLDER_VARIABLE_SETUP, true, true),
        AutoTextRule::new(PLACEHOLDER_DF_NAME, true, true),
        AutoTextRule::new(PLACEHOLDER_NEW_LINE, false, false),
    ]
}

/// The syntax highlighting mode for a device language.
pub fn syntax_mode_for(language: &str) -> &'static str {
    match language.to_ascii_lowercase().as_str() {
        "python" | "micropython" => "text/x-python",
        "c" | "cpp" | "c++" | "arduino" => "text/x-c++src",
        _ => "text",
    }
}

/// On-disk settings: where the backend lives and who we are.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server_url: String,
    pub account: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8000".to_string(),
            account: String::new(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse settings file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_flags_per_placeholder() {
        let rules = code_autotext_rules();
        assert_eq!(rules.len(), 3);

        let var_setup = &rules[0];
        assert!(var_setup.read_only);
        assert!(var_setup.recoverable);

        let new_line = &rules[2];
        assert_eq!(new_line.template, placeholder::NEW_LINE);
        assert!(!new_line.read_only);
        assert!(!new_line.recoverable);
    }

    #[test]
    fn test_syntax_mode_mapping() {
        assert_eq!(syntax_mode_for("Python"), "text/x-python");
        assert_eq!(syntax_mode_for("arduino"), "text/x-c++src");
        assert_eq!(syntax_mode_for("unknown"), "text");
    }

    #[test]
    fn test_settings_parse() {
        let settings: Settings =
            toml::from_str("server_url = \"https://studio.example\"\naccount = \"alice\"\n")
                .unwrap();
        assert_eq!(settings.server_url, "https://studio.example");
        assert_eq!(settings.account, "alice");
    }
}
