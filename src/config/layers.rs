//! Layered lookup over properties sources
//!
//! Precedence, lowest first:
//! 1. Compiled-in defaults (see [`DefaultsTable`](super::DefaultsTable))
//! 2. Properties file (`local.properties`)
//! 3. Explicit overrides (`-P key=value`)
//!
//! Lookup walks the stack from the top; within a layer the primary key
//! is tried before any alias.

use buildcfg_properties::RawProperties;
use serde::{Deserialize, Serialize};

use super::defaults::Param;

/// Where a resolved value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueOrigin {
    Default,
    PropertiesFile,
    Override,
}

/// A contributing source with provenance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ValueOrigin,

    /// File path (None for defaults and overrides)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// One properties layer
#[derive(Debug, Clone, Copy)]
struct Layer<'a> {
    origin: ValueOrigin,
    properties: &'a RawProperties,
}

/// A value found in the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit<'a> {
    /// The key actually present (primary or alias)
    pub key: &'a str,
    pub value: &'a str,
    pub origin: ValueOrigin,
}

/// Ordered properties layers, lowest precedence first
#[derive(Debug, Clone, Default)]
pub struct LayerStack<'a> {
    layers: Vec<Layer<'a>>,
}

impl<'a> LayerStack<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stack with a single properties-file layer
    pub fn from_properties(properties: &'a RawProperties) -> Self {
        Self::new().with_properties(properties)
    }

    pub fn with_properties(mut self, properties: &'a RawProperties) -> Self {
        self.layers.push(Layer {
            origin: ValueOrigin::PropertiesFile,
            properties,
        });
        self
    }

    pub fn with_overrides(mut self, properties: &'a RawProperties) -> Self {
        self.layers.push(Layer {
            origin: ValueOrigin::Override,
            properties,
        });
        self
    }

    /// Highest-precedence value for `param`, if any layer sets it
    pub fn lookup(&self, param: Param) -> Option<Hit<'a>> {
        self.layers.iter().rev().find_map(|layer| {
            std::iter::once(param.key())
                .chain(param.aliases().iter().copied())
                .find_map(|key| {
                    layer.properties.get(key).map(|value| Hit {
                        key,
                        value,
                        origin: layer.origin,
                    })
                })
        })
    }

    /// Keys set in any layer that no parameter reads
    pub fn unrecognized_keys(&self) -> Vec<&'a str> {
        let mut keys: Vec<&'a str> = self
            .layers
            .iter()
            .flat_map(|layer| layer.properties.iter().map(|(k, _)| k))
            .filter(|k| Param::from_key(k).is_none())
            .collect();
        keys.sort_unstable();
        keys.dedup();
        keys
    }

    /// Contributing sources in precedence order, defaults first
    pub fn sources(&self) -> Vec<ConfigSource> {
        let mut sources = vec![ConfigSource {
            origin: ValueOrigin::Default,
            path: None,
            digest: None,
        }];
        sources.extend(self.layers.iter().map(|layer| ConfigSource {
            origin: layer.origin,
            path: layer
                .properties
                .source()
                .map(|p| p.to_string_lossy().to_string()),
            digest: layer.properties.digest().map(str::to_string),
        }));
        sources
    }
}

/// Parse a `KEY=VALUE` override argument
///
/// Unlike the properties file, an override must name a known parameter
/// key or alias.
pub fn parse_override(arg: &str) -> Result<(String, String), String> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", arg))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in override '{}'", arg));
    }
    if Param::from_key(key).is_none() {
        return Err(format!("unknown parameter '{}' in override '{}'", key, arg));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_absent() {
        let file = RawProperties::from_pairs([("sdk.dir", "/opt/sdk")]);
        let stack = LayerStack::from_properties(&file);
        assert!(stack.lookup(Param::VersionCode).is_none());
    }

    #[test]
    fn test_override_layer_wins() {
        let file = RawProperties::from_pairs([("app.versionCode", "5")]);
        let cli = RawProperties::from_pairs([("app.versionCode", "9")]);
        let stack = LayerStack::new().with_properties(&file).with_overrides(&cli);

        let hit = stack.lookup(Param::VersionCode).unwrap();
        assert_eq!(hit.value, "9");
        assert_eq!(hit.origin, ValueOrigin::Override);
    }

    #[test]
    fn test_lower_layer_shows_through() {
        let file = RawProperties::from_pairs([("app.versionName", "3.1")]);
        let cli = RawProperties::from_pairs([("app.versionCode", "9")]);
        let stack = LayerStack::new().with_properties(&file).with_overrides(&cli);

        let hit = stack.lookup(Param::VersionName).unwrap();
        assert_eq!(hit.value, "3.1");
        assert_eq!(hit.origin, ValueOrigin::PropertiesFile);
    }

    #[test]
    fn test_primary_key_beats_alias_in_same_layer() {
        let file = RawProperties::from_pairs([
            ("flutter.versionCode", "3"),
            ("app.versionCode", "4"),
        ]);
        let stack = LayerStack::from_properties(&file);
        let hit = stack.lookup(Param::VersionCode).unwrap();
        assert_eq!(hit.key, "app.versionCode");
        assert_eq!(hit.value, "4");
    }

    #[test]
    fn test_alias_in_higher_layer_beats_primary_below() {
        let file = RawProperties::from_pairs([("app.versionCode", "4")]);
        let cli = RawProperties::from_pairs([("flutter.versionCode", "8")]);
        let stack = LayerStack::new().with_properties(&file).with_overrides(&cli);

        let hit = stack.lookup(Param::VersionCode).unwrap();
        assert_eq!(hit.key, "flutter.versionCode");
        assert_eq!(hit.value, "8");
    }

    #[test]
    fn test_unrecognized_keys() {
        let file = RawProperties::from_pairs([
            ("sdk.dir", "/opt/sdk"),
            ("flutter.sdk", "/opt/flutter"),
            ("flutter.versionCode", "2"),
        ]);
        let cli = RawProperties::from_pairs([("sdk.dir", "/other")]);
        let stack = LayerStack::new().with_properties(&file).with_overrides(&cli);

        assert_eq!(stack.unrecognized_keys(), vec!["flutter.sdk", "sdk.dir"]);
    }

    #[test]
    fn test_sources_tracked() {
        let file = RawProperties::new();
        let stack = LayerStack::from_properties(&file);
        let sources = stack.sources();

        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].origin, ValueOrigin::Default);
        assert_eq!(sources[1].origin, ValueOrigin::PropertiesFile);
        assert!(sources[1].digest.is_none());
    }

    #[test]
    fn test_parse_override() {
        assert_eq!(
            parse_override("app.versionCode=12").unwrap(),
            ("app.versionCode".to_string(), "12".to_string())
        );
        assert_eq!(
            parse_override("app.versionName=1.0=rc").unwrap().1,
            "1.0=rc"
        );
        assert!(parse_override("app.versionCode").is_err());
        assert!(parse_override("=1").is_err());
    }

    #[test]
    fn test_parse_override_rejects_unknown_key() {
        let err = parse_override("app.versioncode=5").unwrap_err();
        assert!(err.contains("app.versioncode"));
        assert!(parse_override("sdk.dir=/opt/sdk").is_err());
        assert_eq!(
            parse_override("flutter.versionCode=5").unwrap().0,
            "flutter.versionCode"
        );
    }
}
