//! Top-level error type for build configuration resolution.
//!
//! Every variant is terminal for the current build. Resolution is
//! deterministic, so nothing here is retried.

use std::fmt;

use buildcfg_properties::PropertiesError;
use thiserror::Error;

use crate::config::{ProjectConfigError, ValueType};
use crate::pipeline::Stage;
use crate::publish::PublishError;

/// Cross-field rules checked after every field has a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invariant {
    ApplicationIdSyntax,
    NamespaceSyntax,
    VersionCodeRange,
    VersionNameNonEmpty,
    PlatformLevelPositive,
    PlatformLevelOrder,
    SigningProfileKnown,
}

impl fmt::Display for Invariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = match self {
            Self::ApplicationIdSyntax => "applicationId must be dot-separated identifier segments",
            Self::NamespaceSyntax => "namespace must be dot-separated identifier segments",
            Self::VersionCodeRange => "versionCode must be in (0, 2100000000]",
            Self::VersionNameNonEmpty => "versionName must not be empty",
            Self::PlatformLevelPositive => "platform levels must be positive",
            Self::PlatformLevelOrder => {
                "minPlatformLevel <= targetPlatformLevel <= compilePlatformLevel"
            }
            Self::SigningProfileKnown => "signingProfile must name a configured profile",
        };
        f.write_str(rule)
    }
}

/// Build configuration errors
#[derive(Debug, Error)]
pub enum BuildConfigError {
    /// Properties file unreadable or unparseable
    #[error(transparent)]
    Properties(#[from] PropertiesError),

    /// A present key whose value does not parse as its declared type
    #[error("invalid value for '{key}': '{raw_value}' is not a valid {expected_type}")]
    InvalidValue {
        key: String,
        raw_value: String,
        expected_type: ValueType,
    },

    #[error("invariant violated ({rule}): {detail}")]
    InvariantViolation { rule: Invariant, detail: String },

    #[error("unknown build type '{build_type}' (expected one of: debug, profile, release)")]
    UnknownVariant { build_type: String },

    #[error("project configuration error: {0}")]
    ProjectConfig(#[from] ProjectConfigError),

    #[error("publish failed: {0}")]
    Publish(#[from] PublishError),

    #[error("resolution pipeline already ran (stage: {stage})")]
    Reentry { stage: Stage },
}

impl BuildConfigError {
    pub(crate) fn invariant(rule: Invariant, detail: impl Into<String>) -> Self {
        Self::InvariantViolation {
            rule,
            detail: detail.into(),
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildConfigError::Properties(PropertiesError::Malformed { .. }) => 2,
            BuildConfigError::Properties(PropertiesError::Io { .. }) => 1,
            BuildConfigError::InvalidValue { .. } => 3,
            BuildConfigError::InvariantViolation { .. } => 4,
            BuildConfigError::UnknownVariant { .. } => 5,
            BuildConfigError::ProjectConfig(_) => 6,
            BuildConfigError::Publish(_) => 7,
            BuildConfigError::Reentry { .. } => 1,
        }
    }
}

/// Result type for resolution operations
pub type BuildConfigResult<T> = Result<T, BuildConfigError>;
