//! Build-type selection
//!
//! Maps a build type (`debug`, `profile`, `release`) onto a signing
//! profile and feature toggles, producing a new config from a resolved one.
//!
//! Release signing policy: when no `release` signing profile is
//! configured, a release build is signed with the `debug` profile. This
//! keeps `flutter build apk --release` working on machines without the
//! upload keystore, but the resulting artifact must not be distributed.
//! The fallback is logged at WARN and can be turned off with
//! `release_fallback = "deny"`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ResolvedBuildConfig;
use crate::error::{BuildConfigError, BuildConfigResult, Invariant};

/// Signing profile every project has
pub const DEBUG_PROFILE: &str = "debug";

/// Signing profile release builds ask for by default
pub const RELEASE_PROFILE: &str = "release";

/// Recognized build types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildType {
    Debug,
    Profile,
    Release,
}

impl BuildType {
    pub const ALL: [BuildType; 3] = [BuildType::Debug, BuildType::Profile, BuildType::Release];

    pub fn as_str(self) -> &'static str {
        match self {
            BuildType::Debug => "debug",
            BuildType::Profile => "profile",
            BuildType::Release => "release",
        }
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildType {
    type Err = BuildConfigError;

    /// Exact, case-sensitive match
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BuildType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| BuildConfigError::UnknownVariant {
                build_type: s.to_string(),
            })
    }
}

/// What a release build does when no release profile is configured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseFallback {
    /// Sign with the debug profile and warn
    #[default]
    Debug,
    /// Fail resolution
    Deny,
}

/// Per-build-type overrides from `[build_types.<name>]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariantRule {
    /// Signing profile name for this build type
    pub signing_profile: Option<String>,

    /// Force desugaring on or off
    pub desugaring: Option<bool>,

    /// Force multidex on or off
    pub multi_dex: Option<bool>,
}

/// Attaches signing profile and toggles for a build type
#[derive(Debug, Clone)]
pub struct VariantSelector {
    profiles: BTreeSet<String>,
    rules: BTreeMap<BuildType, VariantRule>,
    release_fallback: ReleaseFallback,
}

impl Default for VariantSelector {
    fn default() -> Self {
        Self::new(std::iter::empty::<String>(), ReleaseFallback::default())
    }
}

impl VariantSelector {
    /// Selector knowing `profiles` in addition to `debug`
    pub fn new<I, S>(profiles: I, release_fallback: ReleaseFallback) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut profiles: BTreeSet<String> = profiles.into_iter().map(Into::into).collect();
        profiles.insert(DEBUG_PROFILE.to_string());
        Self {
            profiles,
            rules: BTreeMap::new(),
            release_fallback,
        }
    }

    pub fn with_rule(mut self, build_type: BuildType, rule: VariantRule) -> Self {
        self.rules.insert(build_type, rule);
        self
    }

    /// Configured signing profile names, sorted
    pub fn profiles(&self) -> impl Iterator<Item = &str> {
        self.profiles.iter().map(String::as_str)
    }

    pub fn release_fallback(&self) -> ReleaseFallback {
        self.release_fallback
    }

    /// Select by build-type name
    pub fn select(
        &self,
        build_type: &str,
        config: &ResolvedBuildConfig,
    ) -> BuildConfigResult<ResolvedBuildConfig> {
        self.select_type(build_type.parse()?, config)
    }

    /// Return a copy of `config` with the build type's profile and toggles
    pub fn select_type(
        &self,
        build_type: BuildType,
        config: &ResolvedBuildConfig,
    ) -> BuildConfigResult<ResolvedBuildConfig> {
        let rule = self.rules.get(&build_type);
        let signing_profile = self.signing_profile_for(build_type, rule, config)?;

        let mut selected = config.clone();
        selected.signing_profile = signing_profile;
        if let Some(rule) = rule {
            if let Some(desugaring) = rule.desugaring {
                selected.desugaring_enabled = desugaring;
            }
            if let Some(multi_dex) = rule.multi_dex {
                selected.multi_dex_enabled = multi_dex;
            }
        }

        tracing::debug!(
            %build_type,
            signing_profile = %selected.signing_profile,
            desugaring = selected.desugaring_enabled,
            multi_dex = selected.multi_dex_enabled,
            "variant selected"
        );
        Ok(selected)
    }

    fn signing_profile_for(
        &self,
        build_type: BuildType,
        rule: Option<&VariantRule>,
        config: &ResolvedBuildConfig,
    ) -> BuildConfigResult<String> {
        let explicit = rule.and_then(|r| r.signing_profile.as_deref());
        let requested = match (explicit, build_type) {
            (Some(name), _) => name,
            (None, BuildType::Debug | BuildType::Profile) => config.signing_profile.as_str(),
            (None, BuildType::Release) => RELEASE_PROFILE,
        };

        if self.profiles.contains(requested) {
            return Ok(requested.to_string());
        }

        if build_type == BuildType::Release
            && explicit.is_none()
            && self.release_fallback == ReleaseFallback::Debug
        {
            tracing::warn!(
                requested,
                fallback = DEBUG_PROFILE,
                "no release signing profile configured; release build will be signed with the debug profile and must not be distributed"
            );
            return Ok(DEBUG_PROFILE.to_string());
        }

        Err(BuildConfigError::invariant(
            Invariant::SigningProfileKnown,
            format!(
                "{} build requests signing profile '{}' (configured: {})",
                build_type,
                requested,
                self.profiles().collect::<Vec<_>>().join(", ")
            ),
        ))
    }
}
