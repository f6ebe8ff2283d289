//! The resolved, immutable build configuration.

use serde::{Deserialize, Serialize};

use super::defaults::Param;
use crate::error::{BuildConfigError, BuildConfigResult, Invariant};

/// Highest versionCode the platform accepts
pub const MAX_VERSION_CODE: u32 = 2_100_000_000;

/// Fully-populated build parameters handed to the build pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedBuildConfig {
    pub application_id: String,
    pub namespace: String,
    pub version_code: u32,
    pub version_name: String,
    pub min_platform_level: u32,
    pub target_platform_level: u32,
    pub compile_platform_level: u32,
    pub ndk_version: String,
    pub jvm_target: String,

    /// Name of the signing profile; never the credential itself
    pub signing_profile: String,

    pub desugaring_enabled: bool,
    pub multi_dex_enabled: bool,
}

impl ResolvedBuildConfig {
    /// Check the cross-field rules.
    ///
    /// Signing profile membership is checked by the variant selector, which
    /// knows the configured profiles.
    pub fn validate(&self) -> BuildConfigResult<()> {
        if self.version_code == 0 || self.version_code > MAX_VERSION_CODE {
            return Err(BuildConfigError::invariant(
                Invariant::VersionCodeRange,
                format!("versionCode = {}", self.version_code),
            ));
        }

        if self.version_name.trim().is_empty() {
            return Err(BuildConfigError::invariant(
                Invariant::VersionNameNonEmpty,
                format!("versionName = '{}'", self.version_name),
            ));
        }

        if !is_identifier(&self.application_id) {
            return Err(BuildConfigError::invariant(
                Invariant::ApplicationIdSyntax,
                format!("applicationId = '{}'", self.application_id),
            ));
        }

        if !is_identifier(&self.namespace) {
            return Err(BuildConfigError::invariant(
                Invariant::NamespaceSyntax,
                format!("namespace = '{}'", self.namespace),
            ));
        }

        let levels = [
            ("minPlatformLevel", self.min_platform_level),
            ("targetPlatformLevel", self.target_platform_level),
            ("compilePlatformLevel", self.compile_platform_level),
        ];
        if let Some((name, level)) = levels.iter().find(|(_, level)| *level == 0) {
            return Err(BuildConfigError::invariant(
                Invariant::PlatformLevelPositive,
                format!("{} = {}", name, level),
            ));
        }

        if self.min_platform_level > self.target_platform_level
            || self.target_platform_level > self.compile_platform_level
        {
            return Err(BuildConfigError::invariant(
                Invariant::PlatformLevelOrder,
                format!(
                    "min {} / target {} / compile {}",
                    self.min_platform_level, self.target_platform_level, self.compile_platform_level
                ),
            ));
        }

        Ok(())
    }

    /// Flat `key=value` view, in parameter order, for logging and
    /// properties-style output
    pub fn to_key_values(&self) -> Vec<(&'static str, String)> {
        Param::ALL
            .into_iter()
            .map(|param| {
                let value = match param {
                    Param::ApplicationId => self.application_id.clone(),
                    Param::Namespace => self.namespace.clone(),
                    Param::VersionCode => self.version_code.to_string(),
                    Param::VersionName => self.version_name.clone(),
                    Param::MinPlatformLevel => self.min_platform_level.to_string(),
                    Param::TargetPlatformLevel => self.target_platform_level.to_string(),
                    Param::CompilePlatformLevel => self.compile_platform_level.to_string(),
                    Param::NdkVersion => self.ndk_version.clone(),
                    Param::JvmTarget => self.jvm_target.clone(),
                    Param::SigningProfile => self.signing_profile.clone(),
                    Param::Desugaring => self.desugaring_enabled.to_string(),
                    Param::MultiDex => self.multi_dex_enabled.to_string(),
                };
                (param.key(), value)
            })
            .collect()
    }
}

/// Dot-separated identifier with at least two segments, each
/// `[A-Za-z][A-Za-z0-9_]*`.
pub fn is_identifier(s: &str) -> bool {
    let mut segments = 0;
    for segment in s.split('.') {
        let mut chars = segment.chars();
        let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
        if !starts_with_letter || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return false;
        }
        segments += 1;
    }
    segments >= 2
}
