// Copyright 2025 the Feature Studio Authors
// SPDX-License-Identifier: Apache-2.0

//! The templated code-editor overlay: text surfaces, placeholder regions,
//! and the buffers that tie them together.

mod autotext;
mod buffer;
mod surface;

pub use autotext::{AutoTextRegion, AutoTextRule};
pub use buffer::{BufferLoad, BufferSnapshot, EditorBuffer, EditorOption};
pub use surface::{EditRejected, LineId, Pos, READ_ONLY_TAG, ReadOnlyMode, Span, TextSurface};
