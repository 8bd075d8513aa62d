// Copyright 2025 the Feature Studio Authors
// SPDX-License-Identifier: Apache-2.0

//! One editor buffer: a text surface plus its placeholder rules and the
//! regions the last reload produced.
//!
//! `set_text` is the full-reload path: it rebuilds the read-only tagging
//! and rescans every rule against every line. `get_text` is the
//! serialization path: it captures the stored form (literal markers, plus
//! the read-only line set) without visibly altering the live buffer.

use std::collections::HashMap;

use super::autotext::{AutoTextRegion, AutoTextRule};
use super::surface::{EditRejected, Pos, READ_ONLY_TAG, ReadOnlyMode, TextSurface};

/// Payload for a full buffer reload.
#[derive(Debug, Clone, Default)]
pub struct BufferLoad {
    pub content: String,
    pub read_only_lines: Vec<usize>,
    /// Initial substitution values keyed by marker literal. Markers found
    /// in the content but absent here substitute to the empty string.
    pub templates: HashMap<String, String>,
}

/// The stored form of a buffer: content with literal markers, plus the
/// indices of read-only lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferSnapshot {
    pub content: String,
    pub read_only_lines: Vec<usize>,
}

/// Pass-through configuration for the underlying widget.
#[derive(Debug, Clone)]
pub enum EditorOption {
    /// Syntax-highlighting mode, e.g. `text/x-python`.
    Mode(String),
    Theme(String),
    ReadOnly(ReadOnlyMode),
}

/// A text surface with placeholder management layered on top.
#[derive(Debug, Default)]
pub struct EditorBuffer {
    surface: TextSurface,
    rules: Vec<AutoTextRule>,
    regions: Vec<AutoTextRegion>,
}

impl EditorBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a placeholder rule. Rules are scanned in registration
    /// order on every reload.
    pub fn add_rule(&mut self, rule: AutoTextRule) {
        self.rules.push(rule);
    }

    pub fn set_option(&mut self, option: EditorOption) {
        match option {
            EditorOption::Mode(mode) => self.surface.set_mode(&mode),
            EditorOption::Theme(theme) => self.surface.set_theme(&theme),
            EditorOption::ReadOnly(mode) => self.surface.set_read_only(mode),
        }
    }

    /// Full reload: discard all regions and read-only tagging, install the
    /// new content, re-tag, and rescan every rule. Undo history is cleared
    /// so undo cannot cross reloads.
    pub fn set_text(&mut self, load: BufferLoad) {
        // Drop old regions with their visual tagging first; line slots are
        // reused by set_value, so stale tags would survive otherwise.
        let old_regions = std::mem::take(&mut self.regions);
        for region in &old_regions {
            region.remove_anchor_tag(&mut self.surface);
        }
        self.surface.clear_tag(READ_ONLY_TAG);

        self.surface.set_value(&load.content);
        self.surface.clear_history();

        for line in &load.read_only_lines {
            self.surface.add_line_tag(*line, READ_ONLY_TAG);
        }

        // Scan line by line. Substituted content may grow the buffer while
        // the scan runs, so the line count is re-read each iteration. The
        // line text is captured once per line: all rules test the text as
        // it was before any of them substituted into it.
        let mut anchor_seq = 0usize;
        let mut line = 0;
        while line < self.surface.line_count() {
            let Some(line_text) = self.surface.line_text(line).map(str::to_string) else {
                break;
            };
            for rule in &self.rules {
                let tag = format!("autotext-{anchor_seq}");
                if let Some(mut region) = rule.scan(&mut self.surface, line, &line_text, &tag) {
                    let value = load
                        .templates
                        .get(&rule.template)
                        .map_or("", String::as_str);
                    region.set_inner_text(&mut self.surface, value);
                    anchor_seq += 1;
                    if region.recoverable() {
                        self.regions.push(region);
                    } else {
                        // One-shot substitution leaves no trace behind.
                        region.remove_anchor_tag(&mut self.surface);
                    }
                }
            }
            line += 1;
        }
    }

    /// Serialize the buffer: every retained region is reset to its literal
    /// marker, the content and read-only line set are captured, and the
    /// live content is restored. The visible buffer is left unchanged.
    pub fn get_text(&mut self) -> BufferSnapshot {
        for region in &mut self.regions {
            region.reset_to_template(&mut self.surface);
        }
        let content = self.surface.value();
        let read_only_lines = self.surface.tagged_lines(READ_ONLY_TAG);
        for region in &mut self.regions {
            region.restore_saved_text(&mut self.surface);
        }
        BufferSnapshot {
            content,
            read_only_lines,
        }
    }

    /// Push `text` into every retained region whose marker equals
    /// `template`.
    pub fn set_template_text(&mut self, template: &str, text: &str) {
        for region in &mut self.regions {
            if region.matches_template(template) {
                region.set_inner_text(&mut self.surface, text);
            }
        }
    }

    /// Apply a user-initiated edit through the read-only guard.
    pub fn user_edit(&mut self, text: &str, from: Pos, to: Pos) -> Result<(), EditRejected> {
        self.surface.apply_user_edit(text, from, to)
    }

    /// The live (visible) content.
    pub fn value(&self) -> String {
        self.surface.value()
    }

    pub fn can_undo(&self) -> bool {
        self.surface.can_undo()
    }

    pub fn undo(&mut self) -> bool {
        self.surface.undo()
    }

    pub fn mode(&self) -> &str {
        self.surface.mode()
    }

    pub fn theme(&self) -> &str {
        self.surface.theme()
    }

    pub fn read_only(&self) -> ReadOnlyMode {
        self.surface.read_only()
    }

    /// Number of regions retained by the last reload.
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }
}
