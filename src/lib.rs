//! Mobile build configuration resolver
//!
//! Derives the effective build parameters for an app target (application
//! id, version code/name, platform levels, signing profile, desugaring and
//! multidex toggles) from compiled-in defaults, an optional
//! `local.properties` file and explicit overrides, then selects a build
//! type and publishes one consistent, read-only configuration for the
//! platform build.

pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod publish;
pub mod variant;

pub use buildcfg_properties::{MalformedReason, PropertiesError, RawProperties};
pub use config::{
    ConfigResolver, DefaultsTable, LayerStack, Param, ProjectConfig, Resolution,
    ResolvedBuildConfig, ValueOrigin, ValueType,
};
pub use error::{BuildConfigError, BuildConfigResult, Invariant};
pub use pipeline::{Pipeline, PipelineInputs, Stage};
pub use publish::{ConfigPublisher, JsonFilePublisher, PublishedConfig, SessionSnapshot};
pub use variant::{BuildType, ReleaseFallback, VariantRule, VariantSelector};
