// Copyright 2025 the Feature Studio Authors
// SPDX-License-Identifier: Apache-2.0

//! Domain model: device features, the functions bound to them, and the
//! catalogs that share function records between feature slots.
//!
//! Function records are shared: every slot with the same parameter
//! signature sees the same record through a `FunctionRef`
//! (`Arc<RwLock<FunctionRecord>>`). The `read_record` / `write_record`
//! helpers acquire the lock with poison recovery.

mod catalog;
mod feature;
mod function;

pub use catalog::{FunctionCatalog, refresh_library_visibility};
pub use feature::{
    FeatureSlot, FunctionBinding, SelectAction, Selection, SlotFunctionEntry, SlotPayload,
};
pub use function::FunctionRecord;

use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

/// Server-assigned identity of a persisted function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FunctionId(pub i64);

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The two kinds of device feature a function can implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureType {
    /// Input device feature (sensor side).
    #[serde(rename = "idf")]
    Input,
    /// Output device feature (actuator side).
    #[serde(rename = "odf")]
    Output,
}

impl FeatureType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Input => "idf",
            Self::Output => "odf",
        }
    }

    /// The opposite feature type.
    pub fn other(self) -> Self {
        match self {
            Self::Input => Self::Output,
            Self::Output => Self::Input,
        }
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameter signature of a feature or function, compared structurally.
///
/// Slots and functions with equal signatures share one catalog group; the
/// signature is opaque to this layer beyond equality and hashing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ParamSig(pub Vec<String>);

impl ParamSig {
    pub fn new<I, S>(params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(params.into_iter().map(Into::into).collect())
    }
}

/// Shared handle to a function record.
pub type FunctionRef = Arc<RwLock<FunctionRecord>>;

/// Wrap a record for sharing.
pub fn share_record(record: FunctionRecord) -> FunctionRef {
    Arc::new(RwLock::new(record))
}

/// Acquire a read lock on a record, recovering from poisoning.
pub fn read_record(record: &FunctionRef) -> RwLockReadGuard<'_, FunctionRecord> {
    match record.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Acquire a write lock on a record, recovering from poisoning.
pub fn write_record(record: &FunctionRef) -> RwLockWriteGuard<'_, FunctionRecord> {
    match record.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Whether two handles refer to the same shared record.
pub fn same_record(a: &FunctionRef, b: &FunctionRef) -> bool {
    Arc::ptr_eq(a, b)
}
