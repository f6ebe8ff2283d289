//! Per-field resolution over the layer stack
//!
//! For each parameter, the highest layer that sets it wins; a present
//! value must parse as the parameter's declared type or resolution fails.
//! Only an absent key falls back to the defaults table. Cross-field rules
//! run once every field has a value.

use std::collections::BTreeMap;

use buildcfg_properties::RawProperties;
use serde::{Deserialize, Serialize};

use super::defaults::{DefaultsTable, Param, TypedValue};
use super::layers::{LayerStack, ValueOrigin};
use super::resolved::ResolvedBuildConfig;
use crate::error::{BuildConfigError, BuildConfigResult, Invariant};

/// A resolved config plus the origin of every field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub config: ResolvedBuildConfig,

    /// Parameter key → layer that supplied it
    pub origins: BTreeMap<String, ValueOrigin>,
}

/// Merges properties layers over a defaults table
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    defaults: DefaultsTable,
}

impl ConfigResolver {
    pub fn new(defaults: DefaultsTable) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &DefaultsTable {
        &self.defaults
    }

    /// Resolve a single properties layer over the defaults
    pub fn resolve(&self, raw: &RawProperties) -> BuildConfigResult<ResolvedBuildConfig> {
        self.resolve_layers(&LayerStack::from_properties(raw))
            .map(|resolution| resolution.config)
    }

    /// Resolve an ordered stack of layers over the defaults
    pub fn resolve_layers(&self, stack: &LayerStack<'_>) -> BuildConfigResult<Resolution> {
        let mut fields = FieldReader {
            defaults: &self.defaults,
            stack,
            origins: BTreeMap::new(),
        };

        let application_id = fields.text(Param::ApplicationId)?;
        let namespace = fields.text(Param::Namespace)?;
        let version_code = fields.integer(Param::VersionCode)?;
        let version_name = fields.text(Param::VersionName)?;
        let min_platform_level = fields.integer(Param::MinPlatformLevel)?;
        let target_platform_level = fields.integer(Param::TargetPlatformLevel)?;
        let compile_platform_level = fields.integer(Param::CompilePlatformLevel)?;
        let ndk_version = fields.text(Param::NdkVersion)?;
        let jvm_target = fields.text(Param::JvmTarget)?;
        let signing_profile = fields.text(Param::SigningProfile)?;
        let desugaring_enabled = fields.boolean(Param::Desugaring)?;
        let multi_dex_enabled = fields.boolean(Param::MultiDex)?;

        let config = ResolvedBuildConfig {
            application_id,
            namespace,
            version_code: to_u32(Param::VersionCode, version_code, Invariant::VersionCodeRange)?,
            version_name,
            min_platform_level: to_u32(
                Param::MinPlatformLevel,
                min_platform_level,
                Invariant::PlatformLevelPositive,
            )?,
            target_platform_level: to_u32(
                Param::TargetPlatformLevel,
                target_platform_level,
                Invariant::PlatformLevelPositive,
            )?,
            compile_platform_level: to_u32(
                Param::CompilePlatformLevel,
                compile_platform_level,
                Invariant::PlatformLevelPositive,
            )?,
            ndk_version,
            jvm_target,
            signing_profile,
            desugaring_enabled,
            multi_dex_enabled,
        };
        config.validate()?;

        let unrecognized = stack.unrecognized_keys();
        if !unrecognized.is_empty() {
            tracing::debug!(keys = ?unrecognized, "ignoring keys no parameter reads");
        }

        Ok(Resolution {
            config,
            origins: fields.origins,
        })
    }
}

struct FieldReader<'r, 'a> {
    defaults: &'r DefaultsTable,
    stack: &'r LayerStack<'a>,
    origins: BTreeMap<String, ValueOrigin>,
}

impl FieldReader<'_, '_> {
    fn read(&mut self, param: Param) -> BuildConfigResult<TypedValue> {
        let default = self.defaults.get(param);

        let (value, origin) = match self.stack.lookup(param) {
            Some(hit) => {
                let value = default
                    .parse(hit.value)
                    .ok_or_else(|| BuildConfigError::InvalidValue {
                        key: hit.key.to_string(),
                        raw_value: hit.value.to_string(),
                        expected_type: param.value_type(),
                    })?;
                tracing::debug!(key = param.key(), from = hit.key, origin = ?hit.origin, %value, "resolved");
                (value, hit.origin)
            }
            None => {
                tracing::debug!(key = param.key(), value = %default.fallback, "using default");
                (default.fallback, ValueOrigin::Default)
            }
        };

        self.origins.insert(param.key().to_string(), origin);
        Ok(value)
    }

    fn integer(&mut self, param: Param) -> BuildConfigResult<i64> {
        match self.read(param)? {
            TypedValue::Integer(i) => Ok(i),
            other => Err(mistyped(param, &other)),
        }
    }

    fn text(&mut self, param: Param) -> BuildConfigResult<String> {
        match self.read(param)? {
            TypedValue::Text(s) => Ok(s.into_owned()),
            other => Err(mistyped(param, &other)),
        }
    }

    fn boolean(&mut self, param: Param) -> BuildConfigResult<bool> {
        match self.read(param)? {
            TypedValue::Boolean(b) => Ok(b),
            other => Err(mistyped(param, &other)),
        }
    }
}

fn mistyped(param: Param, value: &TypedValue) -> BuildConfigError {
    BuildConfigError::InvalidValue {
        key: param.key().to_string(),
        raw_value: value.to_string(),
        expected_type: param.value_type(),
    }
}

/// Narrow to u32; negative or oversized values break `rule`
fn to_u32(param: Param, value: i64, rule: Invariant) -> BuildConfigResult<u32> {
    u32::try_from(value)
        .map_err(|_| BuildConfigError::invariant(rule, format!("{} = {}", param.key(), value)))
}
