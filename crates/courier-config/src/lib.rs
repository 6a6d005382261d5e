// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Courier coordination layer.
//!
//! Layered TOML files plus `COURIER_*` environment overrides, strict
//! `deny_unknown_fields` parsing, semantic validation, and miette
//! diagnostics for anything that fails.
//!
//! # Usage
//!
//! ```no_run
//! use courier_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("call timeout: {}s", config.calls.timeout_secs);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::{Path, PathBuf};

pub use diagnostic::{ConfigError, ConfigSource, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::CourierConfig;

/// Load from the standard locations and validate.
///
/// Returns either a valid `CourierConfig` or every diagnostic that was found.
pub fn load_and_validate() -> Result<CourierConfig, Vec<ConfigError>> {
    validated(loader::load_config(), standard_sources)
}

/// Load one explicit file (plus env overrides) and validate.
pub fn load_and_validate_path(path: &Path) -> Result<CourierConfig, Vec<ConfigError>> {
    validated(loader::load_config_from_path(path), || {
        ConfigSource::read(path).into_iter().collect()
    })
}

/// Load a TOML string (no files, no env) and validate.
pub fn load_and_validate_str(toml_content: &str) -> Result<CourierConfig, Vec<ConfigError>> {
    validated(loader::load_config_from_str(toml_content), || {
        vec![ConfigSource::inline(toml_content)]
    })
}

/// Sources are only read when a parse error needs spans.
fn validated(
    loaded: Result<CourierConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<ConfigSource>,
) -> Result<CourierConfig, Vec<ConfigError>> {
    let config = loaded.map_err(|err| diagnostic::from_figment(err, &sources()))?;
    validation::validate_config(&config)?;
    Ok(config)
}

fn standard_sources() -> Vec<ConfigSource> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join("courier.toml"));
    }
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("courier").join("courier.toml"));
    }
    candidates.push(PathBuf::from("/etc/courier/courier.toml"));

    candidates
        .iter()
        .filter_map(|path| ConfigSource::read(path))
        .collect()
}
