//! Project configuration (`buildcfg.toml`)
//!
//! Optional, checked into the app repository next to the Gradle files:
//!
//! ```toml
//! [defaults]
//! "app.applicationId" = "com.example.gassight_mobile"
//! "app.namespace" = "com.example.gassight_mobile"
//! "app.minPlatformLevel" = 23
//!
//! [signing]
//! profiles = ["upload"]
//! release_fallback = "debug"   # or "deny"
//!
//! [build_types.release]
//! signing_profile = "upload"
//! desugaring = true
//! ```
//!
//! `[defaults]` replaces compiled-in fallbacks; it never overrides a value
//! present in `local.properties`.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::defaults::{DefaultsTable, FallbackTypeMismatch, Param, TypedValue};
use crate::variant::{BuildType, ReleaseFallback, VariantRule, VariantSelector};

/// Default project config file name
pub const PROJECT_CONFIG_FILE: &str = "buildcfg.toml";

/// Error types for project config operations
#[derive(Debug, thiserror::Error)]
pub enum ProjectConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown parameter '{0}' in [defaults]")]
    UnknownKey(String),

    #[error(transparent)]
    DefaultType(#[from] FallbackTypeMismatch),

    #[error("unsupported value for '{key}' in [defaults]: {kind} values are not allowed")]
    UnsupportedValue { key: String, kind: &'static str },

    #[error("unknown build type '{0}' in [build_types]")]
    UnknownBuildType(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Signing section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SigningConfig {
    /// Signing profiles available besides `debug`
    #[serde(default)]
    pub profiles: Vec<String>,

    #[serde(default)]
    pub release_fallback: ReleaseFallback,
}

/// Contents of `buildcfg.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Parameter key → replacement fallback
    #[serde(default)]
    pub defaults: BTreeMap<String, toml::Value>,

    #[serde(default)]
    pub signing: SigningConfig,

    /// Build type name → overrides
    #[serde(default)]
    pub build_types: BTreeMap<String, VariantRule>,
}

impl ProjectConfig {
    /// Load `path`, or the empty config if it does not exist
    pub fn load_optional(path: &Path) -> Result<Self, ProjectConfigError> {
        match fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no project config, using built-in policy");
                Ok(Self::default())
            }
            Err(source) => Err(ProjectConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Load and parse config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ProjectConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ProjectConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    /// Parse config from a TOML string
    pub fn parse(s: &str) -> Result<Self, ProjectConfigError> {
        let config: ProjectConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ProjectConfigError> {
        // Rule: every default replaces a known parameter with a value of its type
        self.defaults_table()?;

        // Rule: profile names are non-empty and unique
        let mut seen = std::collections::BTreeSet::new();
        for profile in &self.signing.profiles {
            if profile.trim().is_empty() {
                return Err(ProjectConfigError::ValidationError(
                    "signing profile names must not be empty".to_string(),
                ));
            }
            if !seen.insert(profile.as_str()) {
                return Err(ProjectConfigError::ValidationError(format!(
                    "signing profile '{}' declared twice",
                    profile
                )));
            }
        }

        // Rule: build type rules name known build types and declared profiles
        for (name, rule) in &self.build_types {
            if name.parse::<BuildType>().is_err() {
                return Err(ProjectConfigError::UnknownBuildType(name.clone()));
            }
            if let Some(ref profile) = rule.signing_profile {
                let declared = profile == crate::variant::DEBUG_PROFILE
                    || self.signing.profiles.iter().any(|p| p == profile);
                if !declared {
                    return Err(ProjectConfigError::ValidationError(format!(
                        "build type '{}' uses signing profile '{}' which is not in [signing].profiles",
                        name, profile
                    )));
                }
            }
        }

        Ok(())
    }

    /// Built-in defaults with `[defaults]` applied
    pub fn defaults_table(&self) -> Result<DefaultsTable, ProjectConfigError> {
        let mut table = DefaultsTable::builtin();
        let mut set_by: BTreeMap<Param, &str> = BTreeMap::new();
        for (key, value) in &self.defaults {
            let param =
                Param::from_key(key).ok_or_else(|| ProjectConfigError::UnknownKey(key.clone()))?;
            // A key and its alias would otherwise race in map order
            if let Some(first) = set_by.insert(param, key) {
                return Err(ProjectConfigError::ValidationError(format!(
                    "[defaults] sets '{}' twice (as '{}' and '{}')",
                    param.key(),
                    first,
                    key
                )));
            }
            table = table.with_fallback(param, toml_to_typed(key, value)?)?;
        }
        Ok(table)
    }

    /// Variant selector for the `[signing]` and `[build_types]` sections
    pub fn variant_selector(&self) -> Result<VariantSelector, ProjectConfigError> {
        let mut selector =
            VariantSelector::new(self.signing.profiles.iter().cloned(), self.signing.release_fallback);
        for (name, rule) in &self.build_types {
            let build_type = name
                .parse::<BuildType>()
                .map_err(|_| ProjectConfigError::UnknownBuildType(name.clone()))?;
            selector = selector.with_rule(build_type, rule.clone());
        }
        Ok(selector)
    }
}

fn toml_to_typed(key: &str, value: &toml::Value) -> Result<TypedValue, ProjectConfigError> {
    let unsupported = |kind| ProjectConfigError::UnsupportedValue {
        key: key.to_string(),
        kind,
    };
    match value {
        toml::Value::Integer(i) => Ok(TypedValue::Integer(*i)),
        toml::Value::String(s) => Ok(TypedValue::Text(s.clone().into())),
        toml::Value::Boolean(b) => Ok(TypedValue::Boolean(*b)),
        toml::Value::Float(_) => Err(unsupported("float")),
        toml::Value::Datetime(_) => Err(unsupported("datetime")),
        toml::Value::Array(_) => Err(unsupported("array")),
        toml::Value::Table(_) => Err(unsupported("table")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValueType;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_empty_config() {
        let config = ProjectConfig::parse("").unwrap();
        assert!(config.defaults.is_empty());
        assert_eq!(config.signing.release_fallback, ReleaseFallback::Debug);
        assert_eq!(config.defaults_table().unwrap(), DefaultsTable::builtin());
    }

    #[test]
    fn test_defaults_section() {
        let config = ProjectConfig::parse(
            r#"
[defaults]
"app.applicationId" = "com.example.gassight_mobile"
"flutter.minSdkVersion" = 23
"app.desugaring" = true
"#,
        )
        .unwrap();
        let table = config.defaults_table().unwrap();
        assert_eq!(
            table.get(Param::ApplicationId).fallback.to_string(),
            "com.example.gassight_mobile"
        );
        assert_eq!(table.get(Param::MinPlatformLevel).fallback, TypedValue::Integer(23));
        assert_eq!(table.get(Param::Desugaring).fallback, TypedValue::Boolean(true));
    }

    #[test]
    fn test_unknown_default_key() {
        let err = ProjectConfig::parse("[defaults]\n\"app.flavor\" = \"free\"\n").unwrap_err();
        assert!(matches!(err, ProjectConfigError::UnknownKey(ref k) if k == "app.flavor"));
    }

    #[test]
    fn test_default_type_mismatch() {
        let err = ProjectConfig::parse("[defaults]\n\"app.versionCode\" = \"12\"\n").unwrap_err();
        match err {
            ProjectConfigError::DefaultType(mismatch) => {
                assert_eq!(mismatch.expected, ValueType::Integer);
                assert_eq!(mismatch.found, ValueType::String);
            }
            other => panic!("expected type mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_key_and_alias_both_set_rejected() {
        let err = ProjectConfig::parse(
            r#"
[defaults]
"app.minPlatformLevel" = 24
"flutter.minSdkVersion" = 23
"#,
        )
        .unwrap_err();
        match err {
            ProjectConfigError::ValidationError(msg) => {
                assert!(msg.contains("app.minPlatformLevel"));
                assert!(msg.contains("flutter.minSdkVersion"));
            }
            other => panic!("expected ValidationError, got {:?}", other),
        }
    }

    #[test]
    fn test_float_default_rejected() {
        let err = ProjectConfig::parse("[defaults]\n\"app.jvmTarget\" = 1.8\n").unwrap_err();
        assert!(err.to_string().contains("float"));
    }

    #[test]
    fn test_signing_and_build_types() {
        let config = ProjectConfig::parse(
            r#"
[signing]
profiles = ["upload"]
release_fallback = "deny"

[build_types.release]
signing_profile = "upload"
multi_dex = true
"#,
        )
        .unwrap();
        let selector = config.variant_selector().unwrap();
        assert_eq!(selector.release_fallback(), ReleaseFallback::Deny);
        assert_eq!(selector.profiles().collect::<Vec<_>>(), vec!["debug", "upload"]);
    }

    #[test]
    fn test_unknown_build_type_section() {
        let err = ProjectConfig::parse("[build_types.staging]\ndesugaring = true\n").unwrap_err();
        assert!(matches!(err, ProjectConfigError::UnknownBuildType(ref t) if t == "staging"));
    }

    #[test]
    fn test_undeclared_profile_in_rule() {
        let err = ProjectConfig::parse("[build_types.release]\nsigning_profile = \"upload\"\n")
            .unwrap_err();
        assert!(err.to_string().contains("upload"));
    }

    #[test]
    fn test_duplicate_profile() {
        let err = ProjectConfig::parse("[signing]\nprofiles = [\"a\", \"a\"]\n").unwrap_err();
        assert!(err.to_string().contains("declared twice"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(ProjectConfig::parse("[signing]\nkeystore = \"x.jks\"\n").is_err());
    }

    #[test]
    fn test_load_optional_missing() {
        let dir = TempDir::new().unwrap();
        let config = ProjectConfig::load_optional(&dir.path().join(PROJECT_CONFIG_FILE)).unwrap();
        assert!(config.signing.profiles.is_empty());
    }

    #[test]
    fn test_from_file() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "[signing]").unwrap();
        writeln!(temp, "profiles = [\"release\"]").unwrap();

        let config = ProjectConfig::from_file(temp.path()).unwrap();
        assert_eq!(config.signing.profiles, vec!["release".to_string()]);
    }
}
