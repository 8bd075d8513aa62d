// Copyright 2025 the Feature Studio Authors
// SPDX-License-Identifier: Apache-2.0

//! Shared function records, grouped by parameter signature.
//!
//! Each signature group is the single source of truth for the records of
//! that signature: every slot binding and every editor view points at the
//! group's `FunctionRef`s, so renames and saves are visible everywhere at
//! once. Groups only exist for signatures a slot has registered; records
//! whose signature no slot uses are not tracked.

use std::collections::HashMap;
use std::sync::Arc;

use crate::api::{FunctionSummary, Library};
use crate::sorted::sorted_insert;

use super::{FunctionId, FunctionRecord, FunctionRef, ParamSig, read_record, share_record};

/// All known function records, one group per registered signature.
#[derive(Debug, Default)]
pub struct FunctionCatalog {
    groups: HashMap<ParamSig, Vec<FunctionRef>>,
}

impl FunctionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a signature so listings of it are tracked.
    pub fn seed_signature(&mut self, params: ParamSig) {
        self.groups.entry(params).or_default();
    }

    /// Replace every group's contents from a server listing. Registered
    /// signatures stay registered even when the listing has no function
    /// for them; summaries for unregistered signatures are dropped.
    pub fn rebuild(&mut self, summaries: Vec<FunctionSummary>) {
        for group in self.groups.values_mut() {
            group.clear();
        }
        for summary in summaries {
            if let Some(group) = self.groups.get_mut(&summary.params) {
                sorted_insert(group, share_record(FunctionRecord::from_summary(summary)), |a, b| {
                    read_record(a).name.cmp(&read_record(b).name)
                });
            }
        }
    }

    pub fn group(&self, params: &ParamSig) -> &[FunctionRef] {
        self.groups.get(params).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Mutable group for a signature, registering it on first use.
    pub fn group_mut(&mut self, params: &ParamSig) -> &mut Vec<FunctionRef> {
        self.groups.entry(params.clone()).or_default()
    }

    /// Find a persisted record by signature and id.
    pub fn find(&self, params: &ParamSig, id: FunctionId) -> Option<FunctionRef> {
        self.group(params)
            .iter()
            .find(|record| read_record(record).id == Some(id))
            .map(Arc::clone)
    }

    /// Find a record by name across every group.
    pub fn find_by_name(&self, name: &str) -> Option<FunctionRef> {
        self.iter_all()
            .find(|record| read_record(record).name == name)
            .map(Arc::clone)
    }

    pub fn iter_all(&self) -> impl Iterator<Item = &FunctionRef> {
        self.groups.values().flatten()
    }

    /// Ids of every persisted record in the catalog.
    pub fn saved_ids(&self) -> Vec<FunctionId> {
        self.iter_all()
            .filter_map(|record| read_record(record).id)
            .collect()
    }
}

/// Recompute which library entries are referenced by a catalog group, and
/// hide libraries whose every function already has a derived record.
pub fn refresh_library_visibility(libraries: &mut [Library], group: &[FunctionRef]) {
    for library in libraries {
        for function in &mut library.functions {
            function.referenced = group
                .iter()
                .any(|record| read_record(record).library_ref == Some(function.id));
        }
        library.hidden = library.functions.iter().all(|function| function.referenced);
    }
}
