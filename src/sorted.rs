// Copyright 2025 the Feature Studio Authors
// SPDX-License-Identifier: Apache-2.0

//! Stable ordered insertion for the small sorted lists the UI maintains.
//!
//! Every list that must stay alphabetical (a slot's function bindings, a
//! catalog group, the device-name picklist) goes through `sorted_insert`
//! rather than re-sorting the whole list on each change.

use std::cmp::Ordering;

/// Insert `element` into `items` immediately before the first entry that
/// compares strictly greater, appending when no such entry exists.
///
/// The scan is linear, which is fine at UI scale (tens of items). The
/// insertion is stable: equal-ranked elements keep their prior relative
/// order because the scan stops at the first strictly-greater entry.
pub fn sorted_insert<T, F>(items: &mut Vec<T>, element: T, mut cmp: F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    let at = items
        .iter()
        .position(|existing| cmp(existing, &element) == Ordering::Greater)
        .unwrap_or(items.len());
    items.insert(at, element);
}
