// Copyright 2025 the Feature Studio Authors
// SPDX-License-Identifier: Apache-2.0

//! Backend collaborator contract.
//!
//! The server owns the wire format; this layer pins down the request and
//! response shapes the model needs and classifies failures. Everything
//! upstream talks to the server through the [`FunctionApi`] trait so the
//! model and controller are testable against an in-memory fake; the
//! blocking HTTP implementation lives in [`http`].

pub mod http;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{FeatureType, FunctionId, ParamSig, SlotPayload};

/// How a backend request failed.
///
/// Validation rejections (HTTP 400/404) carry a human-readable reason from
/// the server; server faults are generic; a connection-level failure on a
/// read means the session is no longer authenticated.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request rejected: {reason}")]
    Rejected { reason: String },
    #[error("internal server error (status {status})")]
    Server { status: u16 },
    #[error("not authenticated; refresh the session and log in again")]
    Unauthorized,
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed response envelope: {0}")]
    Envelope(String),
}

/// Full content of a function, as stored by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionContent {
    pub code: String,
    pub var_setup: String,
    #[serde(rename = "readonly_line")]
    pub read_only_lines: Vec<usize>,
    #[serde(default)]
    pub library_ref: Option<FunctionId>,
}

/// Metadata-only view of a persisted function, as listed by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSummary {
    pub id: FunctionId,
    pub name: String,
    #[serde(rename = "dftype")]
    pub feature_type: FeatureType,
    pub params: ParamSig,
    #[serde(default)]
    pub library_ref: Option<FunctionId>,
}

/// Create/update request body for a function.
#[derive(Debug, Clone, Serialize)]
pub struct SaveFunction {
    #[serde(rename = "func_name")]
    pub name: String,
    #[serde(rename = "dftype")]
    pub feature_type: FeatureType,
    pub params: ParamSig,
    pub code: String,
    pub var_setup: String,
    #[serde(rename = "readonly_line")]
    pub read_only_lines: Vec<usize>,
    pub library_ref: Option<FunctionId>,
}

/// One function inside a platform library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryFunction {
    pub id: FunctionId,
    pub name: String,
    /// Whether some catalog function of the open signature group was
    /// derived from this entry. Recomputed client-side.
    #[serde(default)]
    pub referenced: bool,
}

/// A platform library with its functions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Library {
    pub id: i64,
    pub name: String,
    pub functions: Vec<LibraryFunction>,
    /// A library is hidden when every one of its functions is referenced.
    /// Recomputed client-side.
    #[serde(default)]
    pub hidden: bool,
}

/// The shared global variable-setup block of a device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalSetup {
    pub content: String,
    #[serde(rename = "readonly_lines")]
    pub read_only_lines: Vec<usize>,
}

/// Per-slot function associations, both as stored and as persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceFunctions {
    pub idfs: Vec<SlotPayload>,
    pub odfs: Vec<SlotPayload>,
}

/// Everything the server reports about functions available to a device
/// for the currently selected libraries.
#[derive(Debug, Clone, Deserialize)]
pub struct FunctionOverview {
    #[serde(rename = "safunction_list")]
    pub functions: Vec<FunctionSummary>,
    #[serde(rename = "df_safuncs")]
    pub slot_functions: DeviceFunctions,
    #[serde(rename = "libfunction_list")]
    pub libraries: Vec<Library>,
    pub global_var_setup: GlobalSetup,
}

/// Blocking request interface to the backend.
pub trait FunctionApi {
    /// Read a user function's content by id.
    fn function_content(&self, id: FunctionId) -> Result<FunctionContent, ApiError>;

    /// Read a library function's content, specialized for the requesting
    /// slot's feature type and signature.
    fn library_function_content(
        &self,
        id: FunctionId,
        feature_type: FeatureType,
        params: &ParamSig,
    ) -> Result<FunctionContent, ApiError>;

    /// Fetch the blank-function skeleton for a language/platform pair.
    fn function_skeleton(
        &self,
        language: &str,
        platform: &str,
        feature_type: FeatureType,
        params: &ParamSig,
    ) -> Result<FunctionContent, ApiError>;

    /// Create (`id` is `None`) or update a function, returning the
    /// assigned id.
    fn save_function(
        &self,
        id: Option<FunctionId>,
        function: &SaveFunction,
    ) -> Result<FunctionId, ApiError>;

    /// List catalog and library functions for the selected libraries.
    fn function_overview(&self, libraries: &[i64]) -> Result<FunctionOverview, ApiError>;

    /// List the platform libraries available for a language/platform pair.
    fn library_catalog(&self, language: &str, platform: &str) -> Result<Vec<Library>, ApiError>;
}
