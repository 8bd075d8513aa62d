// Copyright 2025 the Feature Studio Authors
// SPDX-License-Identifier: Apache-2.0

//! Plain-text editing surface with line tags, the widget stand-in that
//! `EditorBuffer` drives.
//!
//! The surface models the parts of a code-editor widget the core logic
//! depends on: lines of text with stable identities, per-line string tags
//! (the read-only marking mechanism), range replacement with line/column
//! coordinates, a small option store (syntax mode, theme, read-only mode),
//! and an undo history that reloads are required to clear. User edits go
//! through `apply_user_edit`, which enforces the read-only tagging; the
//! template machinery uses `replace_range` directly and is not subject to
//! the guard.

use std::collections::HashSet;

use thiserror::Error;

/// Line tag marking a line the user cannot edit.
pub const READ_ONLY_TAG: &str = "readonly";

/// A line/column position. Columns count characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Pos {
    pub line: usize,
    pub col: usize,
}

impl Pos {
    pub const fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

/// The line/column extent of a piece of text.
///
/// `lines` is the number of line breaks; `cols` is the character length of
/// the final line (the full length for single-line text).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub lines: usize,
    pub cols: usize,
}

impl Span {
    /// Measure `text`.
    pub fn of_text(text: &str) -> Self {
        let mut parts = text.split('\n');
        let mut lines: usize = 0;
        let mut last_len = 0;
        for part in &mut parts {
            last_len = part.chars().count();
            lines += 1;
        }
        Self {
            lines: lines.saturating_sub(1),
            cols: last_len,
        }
    }

    /// The end position of text with this span starting at `start`.
    ///
    /// For multi-line spans the final line starts at column zero, so the
    /// start column does not carry over.
    pub fn end_from(self, start: Pos) -> Pos {
        if self.lines == 0 {
            Pos::new(start.line, start.col + self.cols)
        } else {
            Pos::new(start.line + self.lines, self.cols)
        }
    }
}

/// Stable identity for a line, tracking it as lines above are added or
/// removed (the line-handle mechanism of the underlying widget).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineId(u64);

/// Whole-buffer read-only mode (`setOption("readOnly", ...)` equivalent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadOnlyMode {
    #[default]
    Editable,
    /// Fully read-only, no caret shown.
    NoCursor,
}

/// Why a user edit was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditRejected {
    #[error("the buffer is read-only")]
    ReadOnlyBuffer,
    #[error("line {0} is read-only")]
    ReadOnlyLine(usize),
}

#[derive(Debug, Clone)]
struct Line {
    id: LineId,
    text: String,
    tags: HashSet<String>,
}

/// The editing surface.
#[derive(Debug)]
pub struct TextSurface {
    lines: Vec<Line>,
    next_line_id: u64,
    mode: String,
    theme: String,
    read_only: ReadOnlyMode,
    /// Undo snapshots of past user edits. Cleared on reload so undo
    /// cannot cross reloads.
    history: Vec<Vec<Line>>,
}

impl TextSurface {
    /// Create an empty surface holding a single empty line, the way text
    /// widgets always expose at least one line.
    pub fn new() -> Self {
        let mut surface = Self {
            lines: Vec::new(),
            next_line_id: 0,
            mode: String::new(),
            theme: String::new(),
            read_only: ReadOnlyMode::default(),
            history: Vec::new(),
        };
        let line = surface.fresh_line("");
        surface.lines.push(line);
        surface
    }

    fn fresh_line(&mut self, text: &str) -> Line {
        let id = LineId(self.next_line_id);
        self.next_line_id += 1;
        Line {
            id,
            text: text.to_string(),
            tags: HashSet::new(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn line_text(&self, line: usize) -> Option<&str> {
        self.lines.get(line).map(|l| l.text.as_str())
    }

    /// The full buffer content.
    pub fn value(&self) -> String {
        let texts: Vec<&str> = self.lines.iter().map(|l| l.text.as_str()).collect();
        texts.join("\n")
    }

    /// Replace the whole content in place.
    ///
    /// Line slots are reused: line `i` of the new content keeps the
    /// identity and tags of the old line `i`. Callers that reload content
    /// wholesale must clear stale tags themselves first; `EditorBuffer`
    /// does exactly that.
    pub fn set_value(&mut self, text: &str) {
        let texts: Vec<&str> = text.split('\n').collect();
        for (i, t) in texts.iter().enumerate() {
            if i < self.lines.len() {
                self.lines[i].text = (*t).to_string();
            } else {
                let line = self.fresh_line(t);
                self.lines.push(line);
            }
        }
        self.lines.truncate(texts.len());
    }

    fn clamp(&self, pos: Pos) -> Pos {
        let line = pos.line.min(self.lines.len().saturating_sub(1));
        let col = pos.col.min(self.lines[line].text.chars().count());
        Pos::new(line, col)
    }

    fn split_at_col(text: &str, col: usize) -> (String, String) {
        let at = text
            .char_indices()
            .nth(col)
            .map_or(text.len(), |(byte, _)| byte);
        (text[..at].to_string(), text[at..].to_string())
    }

    /// Replace the range `[from, to)` with `text`.
    ///
    /// The first affected line keeps its identity and tags; lines fully
    /// consumed by the range are dropped, and lines introduced by the new
    /// text are fresh and untagged. This is the programmatic edit path
    /// (template substitution); it bypasses the read-only guard.
    pub fn replace_range(&mut self, text: &str, from: Pos, to: Pos) {
        let from = self.clamp(from);
        let to = self.clamp(to).max(from);

        let (prefix, _) = Self::split_at_col(&self.lines[from.line].text, from.col);
        let (_, suffix) = Self::split_at_col(&self.lines[to.line].text, to.col);

        let combined = format!("{prefix}{text}{suffix}");
        let parts: Vec<&str> = combined.split('\n').collect();

        self.lines[from.line].text = parts[0].to_string();
        let tail: Vec<Line> = parts[1..].iter().map(|t| self.fresh_line(t)).collect();
        self.lines.splice(from.line + 1..to.line + 1, tail);
    }

    /// Apply a user-initiated edit, honoring the whole-buffer read-only
    /// mode and the per-line read-only tags. An edit touching any
    /// read-only-tagged line in its range is rejected wholesale.
    pub fn apply_user_edit(&mut self, text: &str, from: Pos, to: Pos) -> Result<(), EditRejected> {
        if self.read_only == ReadOnlyMode::NoCursor {
            return Err(EditRejected::ReadOnlyBuffer);
        }
        let from = self.clamp(from);
        let to = self.clamp(to).max(from);
        for line in from.line..=to.line {
            if self.line_has_tag(line, READ_ONLY_TAG) {
                return Err(EditRejected::ReadOnlyLine(line));
            }
        }
        self.history.push(self.lines.clone());
        self.replace_range(text, from, to);
        Ok(())
    }

    // ---- line tags -------------------------------------------------------

    /// Tag a line, returning its identity for later tracking.
    pub fn add_line_tag(&mut self, line: usize, tag: &str) -> Option<LineId> {
        let entry = self.lines.get_mut(line)?;
        entry.tags.insert(tag.to_string());
        Some(entry.id)
    }

    pub fn remove_line_tag(&mut self, line: usize, tag: &str) {
        if let Some(entry) = self.lines.get_mut(line) {
            entry.tags.remove(tag);
        }
    }

    pub fn line_has_tag(&self, line: usize, tag: &str) -> bool {
        self.lines
            .get(line)
            .is_some_and(|entry| entry.tags.contains(tag))
    }

    /// Indices of every line carrying `tag`, in order.
    pub fn tagged_lines(&self, tag: &str) -> Vec<usize> {
        self.lines
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.tags.contains(tag))
            .map(|(i, _)| i)
            .collect()
    }

    /// Remove `tag` from every line.
    pub fn clear_tag(&mut self, tag: &str) {
        for entry in &mut self.lines {
            entry.tags.remove(tag);
        }
    }

    /// Current index of the line with identity `id`, if it still exists.
    pub fn line_no(&self, id: LineId) -> Option<usize> {
        self.lines.iter().position(|entry| entry.id == id)
    }

    // ---- history ---------------------------------------------------------

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    /// Revert the last user edit. Returns false when there is nothing to
    /// undo.
    pub fn undo(&mut self) -> bool {
        match self.history.pop() {
            Some(lines) => {
                self.lines = lines;
                true
            }
            None => false,
        }
    }

    // ---- options ---------------------------------------------------------

    pub fn set_mode(&mut self, mode: &str) {
        self.mode = mode.to_string();
    }

    pub fn mode(&self) -> &str {
        &self.mode
    }

    pub fn set_theme(&mut self, theme: &str) {
        self.theme = theme.to_string();
    }

    pub fn theme(&self) -> &str {
        &self.theme
    }

    pub fn set_read_only(&mut self, mode: ReadOnlyMode) {
        self.read_only = mode;
    }

    pub fn read_only(&self) -> ReadOnlyMode {
        self.read_only
    }
}

impl Default for TextSurface {
    fn default() -> Self {
        Self::new()
    }
}
