// Copyright 2025 the Feature Studio Authors
// SPDX-License-Identifier: Apache-2.0

//! Feature Studio: a function manager for device features.

fn main() -> anyhow::Result<()> {
    feature_studio::run()
}
