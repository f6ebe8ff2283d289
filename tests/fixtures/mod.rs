//! Shared fixtures for integration tests
//!
//! - `properties/`: sample `local.properties` files
//! - `project/`: sample `buildcfg.toml` files

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use mobile_buildcfg::{ConfigResolver, ResolvedBuildConfig, RawProperties};

/// Path to a properties fixture
pub fn properties_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/properties")
        .join(name)
}

/// Path to a project config fixture
pub fn project_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/project")
        .join(name)
}

/// Load a properties fixture, panicking on failure
pub fn load_properties(name: &str) -> RawProperties {
    buildcfg_properties::load(&properties_path(name))
        .unwrap_or_else(|e| panic!("fixture {} failed to load: {}", name, e))
}

/// Resolve in-memory pairs against the built-in defaults
pub fn resolve_pairs(pairs: &[(&str, &str)]) -> Result<ResolvedBuildConfig, mobile_buildcfg::BuildConfigError> {
    ConfigResolver::default().resolve(&RawProperties::from_pairs(pairs.iter().copied()))
}
