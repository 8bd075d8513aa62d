// Copyright 2025 the Feature Studio Authors
// SPDX-License-Identifier: Apache-2.0

//! Template placeholders managed inside an editing surface.
//!
//! A placeholder is a literal marker string (for example
//! `{*variable_setup*}`) that the stored form of a snippet must contain
//! verbatim, so the server-side code generator can find and substitute it.
//! While the snippet is being edited, the marker is replaced inline with
//! live content. `AutoTextRegion` tracks one such substituted span;
//! `AutoTextRule` declares a marker pattern and creates regions when a
//! buffer reload finds the marker in a line.
//!
//! The reset/restore pair on the region brackets serialization: reset puts
//! the literal marker back so `get_text` captures it, restore re-applies
//! the live content so the visible buffer is unchanged.

use super::surface::{LineId, Pos, READ_ONLY_TAG, Span, TextSurface};

/// Prefix continuation lines (every line but the first) with `indent`
/// spaces so multi-line content lines up under the region's origin column.
fn pad_continuation_lines(text: &str, indent: usize) -> String {
    if indent == 0 || !text.contains('\n') {
        return text.to_string();
    }
    let pad = " ".repeat(indent);
    let parts: Vec<&str> = text.split('\n').collect();
    let mut padded = Vec::with_capacity(parts.len());
    padded.push(parts[0].to_string());
    for part in &parts[1..] {
        padded.push(format!("{pad}{part}"));
    }
    padded.join("\n")
}

/// One managed placeholder span inside a surface.
///
/// The start position always refers to the first character of the region's
/// current content; after any mutation the span is recomputed from the new
/// content so subsequent line/column math stays correct.
#[derive(Debug)]
pub struct AutoTextRegion {
    /// Handle of the line the region starts on.
    anchor: LineId,
    /// Tag marking the anchor line, unique per region within a buffer.
    anchor_tag: String,
    /// Column of the region's first character. Continuation lines of
    /// substituted content are padded to this column.
    start_col: usize,
    template: String,
    /// The live substituted content (the template itself right after
    /// creation).
    current: String,
    /// Extent of the content currently present in the surface.
    delta: Span,
    read_only: bool,
    recoverable: bool,
}

impl AutoTextRegion {
    /// Whether the region survives creation for later get/reset/restore
    /// cycles, or is a one-shot substitution.
    pub fn recoverable(&self) -> bool {
        self.recoverable
    }

    /// Exact equality against the rule's literal marker; used to route
    /// template updates to the right region.
    pub fn matches_template(&self, text: &str) -> bool {
        self.template == text
    }

    /// The live content currently substituted into the surface.
    pub fn current_text(&self) -> &str {
        &self.current
    }

    /// Current start position of the region.
    ///
    /// Retained regions sit on read-only lines, so the anchor survives
    /// user edits; a vanished anchor resolves to the top of the buffer.
    fn start_pos(&self, surface: &TextSurface) -> Pos {
        let line = surface.line_no(self.anchor).unwrap_or(0);
        Pos::new(line, self.start_col)
    }

    /// Replace the region's span with `text`, padding continuation lines
    /// to the origin column, then retag the lines the region now covers.
    pub fn set_inner_text(&mut self, surface: &mut TextSurface, text: &str) {
        self.current = text.to_string();
        let padded = pad_continuation_lines(text, self.start_col);
        let new_delta = Span::of_text(&padded);

        let start = self.start_pos(surface);
        let end = self.delta.end_from(start);
        surface.replace_range(&padded, start, end);
        self.delta = new_delta;

        if self.read_only {
            // The anchor line keeps whatever tag the reload gave it; only
            // continuation lines are tagged here.
            for i in 1..=self.delta.lines {
                surface.add_line_tag(start.line + i, READ_ONLY_TAG);
            }
        } else {
            for i in 0..=self.delta.lines {
                surface.remove_line_tag(start.line + i, READ_ONLY_TAG);
            }
        }
    }

    /// Put the literal marker back into the surface while remembering the
    /// live content. Brackets serialization together with
    /// [`restore_saved_text`](Self::restore_saved_text).
    pub fn reset_to_template(&mut self, surface: &mut TextSurface) {
        let live = std::mem::take(&mut self.current);
        let template = self.template.clone();
        self.set_inner_text(surface, &template);
        self.current = live;
    }

    /// Re-apply the live content remembered by the previous reset.
    pub fn restore_saved_text(&mut self, surface: &mut TextSurface) {
        let live = self.current.clone();
        self.set_inner_text(surface, &live);
    }

    /// Drop the region's anchor tag from the surface.
    pub fn remove_anchor_tag(&self, surface: &mut TextSurface) {
        if let Some(line) = surface.line_no(self.anchor) {
            surface.remove_line_tag(line, &self.anchor_tag);
        }
    }
}

/// Declarative placeholder pattern, scanned for on buffer reload.
///
/// Matching is a verbatim substring test per line; there is no escaping
/// and no nested-placeholder support.
#[derive(Debug, Clone)]
pub struct AutoTextRule {
    pub template: String,
    pub read_only: bool,
    pub recoverable: bool,
}

impl AutoTextRule {
    pub fn new(template: &str, read_only: bool, recoverable: bool) -> Self {
        Self {
            template: template.to_string(),
            read_only,
            recoverable,
        }
    }

    /// If `line_text` contains the rule's marker, anchor a region at the
    /// marker's column and return it. No match creates nothing and
    /// mutates nothing.
    pub fn scan(
        &self,
        surface: &mut TextSurface,
        line: usize,
        line_text: &str,
        anchor_tag: &str,
    ) -> Option<AutoTextRegion> {
        let byte = line_text.find(&self.template)?;
        let col = line_text[..byte].chars().count();
        let anchor = surface.add_line_tag(line, anchor_tag)?;
        Some(AutoTextRegion {
            anchor,
            anchor_tag: anchor_tag.to_string(),
            start_col: col,
            template: self.template.clone(),
            current: self.template.clone(),
            delta: Span::of_text(&self.template),
            read_only: self.read_only,
            recoverable: self.recoverable,
        })
    }
}
