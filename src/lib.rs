// Copyright 2025 the Feature Studio Authors
// SPDX-License-Identifier: Apache-2.0

//! Feature Studio: a function manager for device features.
//!
//! A device exposes a set of feature slots; each slot is implemented by a
//! saved function. This crate holds the page's state model (slots,
//! function catalogs, libraries), the templated code editor used to write
//! the functions, and the blocking client for the backend that persists
//! them.

use std::path::PathBuf;

use anyhow::Context;

pub mod api;
pub mod controller;
pub mod editor;
pub mod model;
pub mod settings;
pub mod sorted;
pub mod state;

use api::FunctionApi;
use api::http::HttpApi;
use settings::Settings;

/// Entry point for the Feature Studio session.
pub fn run() -> anyhow::Result<()> {
    // Initialize tracing subscriber (can be controlled via RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("feature_studio=info".parse().unwrap()),
        )
        .init();

    let settings = load_settings()?;
    tracing::info!("connecting to {}", settings.server_url);
    let api = HttpApi::new(&settings.server_url, &settings.account);

    // Probe the session by listing the available libraries.
    let libraries = api
        .library_catalog("python", "raspberrypi")
        .context("failed to list platform libraries")?;
    tracing::info!("{} libraries available", libraries.len());
    for library in &libraries {
        tracing::info!("  {} ({} functions)", library.name, library.functions.len());
    }
    Ok(())
}

/// Load settings from the path given on the command line, falling back to
/// `feature-studio.toml` next to the binary, then to defaults.
fn load_settings() -> anyhow::Result<Settings> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        return Settings::load(&PathBuf::from(&args[1]));
    }
    let default_path = PathBuf::from("feature-studio.toml");
    if default_path.exists() {
        Settings::load(&default_path)
    } else {
        tracing::info!("no settings file found, using defaults");
        Ok(Settings::default())
    }
}
