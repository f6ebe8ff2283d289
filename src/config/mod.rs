//! Layered build configuration
//!
//! Resolution precedence, lowest first:
//! 1. Compiled-in defaults (optionally replaced by `buildcfg.toml`)
//! 2. `local.properties`
//! 3. Explicit `-P key=value` overrides

mod defaults;
mod layers;
mod project;
mod resolved;
mod resolver;

pub use defaults::{
    DefaultValue, DefaultsTable, FallbackTypeMismatch, Param, TypedValue, ValueType, TABLE_VERSION,
};
pub use layers::{parse_override, ConfigSource, Hit, LayerStack, ValueOrigin};
pub use project::{ProjectConfig, ProjectConfigError, SigningConfig, PROJECT_CONFIG_FILE};
pub use resolved::{is_identifier, ResolvedBuildConfig, MAX_VERSION_CODE};
pub use resolver::{ConfigResolver, Resolution};
