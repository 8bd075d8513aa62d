// Copyright 2025 the Feature Studio Authors
// SPDX-License-Identifier: Apache-2.0

//! A persisted code snippet bound to device features.
//!
//! Records start as metadata-only summaries; the full content (code,
//! variable setup, read-only lines) is fetched lazily on first use and
//! cached for the rest of the page session. Writes are avoided when the
//! proposed code matches the cached code, so re-saving an untouched
//! function costs nothing.

use super::{FeatureType, FunctionId, ParamSig};
use crate::api::{ApiError, FunctionApi, FunctionContent, FunctionSummary, SaveFunction};

/// A named, persisted code snippet (an "SA function").
#[derive(Debug)]
pub struct FunctionRecord {
    /// Server id; `None` until the first successful save.
    pub id: Option<FunctionId>,
    pub name: String,
    pub feature_type: FeatureType,
    pub params: ParamSig,
    /// The library function this record was derived from, if any.
    pub library_ref: Option<FunctionId>,
    /// Full content, present once fetched or saved.
    content: Option<FunctionContent>,
}

impl FunctionRecord {
    /// Build a metadata-only record from a server listing.
    pub fn from_summary(summary: FunctionSummary) -> Self {
        Self {
            id: Some(summary.id),
            name: summary.name,
            feature_type: summary.feature_type,
            params: summary.params,
            library_ref: summary.library_ref,
            content: None,
        }
    }

    /// Build a record that has never been saved.
    pub fn new_unsaved(
        name: impl Into<String>,
        feature_type: FeatureType,
        params: ParamSig,
        library_ref: Option<FunctionId>,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            feature_type,
            params,
            library_ref,
            content: None,
        }
    }

    /// Whether the full content is known (fetched or saved).
    pub fn is_initialized(&self) -> bool {
        self.content.is_some()
    }

    pub fn cached(&self) -> Option<&FunctionContent> {
        self.content.as_ref()
    }

    /// Whether `code` matches the cached code. False when nothing is
    /// cached yet.
    pub fn code_unchanged(&self, code: &str) -> bool {
        self.content.as_ref().is_some_and(|c| c.code == code)
    }

    /// The content, from cache when initialized, otherwise fetched by id
    /// and cached.
    ///
    /// Under blocking calls at most one request per record is issued per
    /// session.
    pub fn fetch_content(&mut self, api: &dyn FunctionApi) -> Result<FunctionContent, ApiError> {
        if let Some(content) = &self.content {
            return Ok(content.clone());
        }
        // Unsaved records always carry content from their save; only
        // summaries reach this path.
        let id = self.id.expect("content fetch requires a persisted record");
        let content = api.function_content(id)?;
        self.library_ref = content.library_ref;
        self.content = Some(content.clone());
        tracing::debug!("fetched content for function {} ({})", id, self.name);
        Ok(content)
    }

    /// Persist `content`, creating the record when it has no id yet.
    ///
    /// When the record already has an id and the proposed code equals the
    /// cached code, no request is issued and the current id is returned:
    /// changes to variable setup or read-only lines alone do not trigger
    /// a write.
    pub fn update_content(
        &mut self,
        api: &dyn FunctionApi,
        content: FunctionContent,
    ) -> Result<FunctionId, ApiError> {
        if let Some(id) = self.id
            && self.code_unchanged(&content.code)
        {
            return Ok(id);
        }

        let request = SaveFunction {
            name: self.name.clone(),
            feature_type: self.feature_type,
            params: self.params.clone(),
            code: content.code.clone(),
            var_setup: content.var_setup.clone(),
            read_only_lines: content.read_only_lines.clone(),
            library_ref: content.library_ref,
        };
        let id = api.save_function(self.id, &request)?;

        self.id = Some(id);
        self.library_ref = content.library_ref;
        self.content = Some(content);
        tracing::info!("saved function {} as id {}", self.name, id);
        Ok(id)
    }
}
