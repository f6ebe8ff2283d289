//! Compiled-in defaults (lowest-precedence layer)
//!
//! Every parameter the resolver reads has an entry here, so a lookup
//! cannot fail. Projects may replace individual fallbacks through
//! `[defaults]` in `buildcfg.toml`; within one resolution pass the table
//! is fixed.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Version of the built-in table; bump when a fallback changes
pub const TABLE_VERSION: u32 = 1;

/// Declared type of a build parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Integer,
    String,
    Boolean,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "integer"),
            Self::String => write!(f, "string"),
            Self::Boolean => write!(f, "boolean"),
        }
    }
}

impl ValueType {
    /// Parse a raw properties value as this type.
    ///
    /// Integers and booleans ignore surrounding whitespace; strings are
    /// taken verbatim.
    pub fn parse(self, raw: &str) -> Option<TypedValue> {
        match self {
            ValueType::Integer => raw.trim().parse::<i64>().ok().map(TypedValue::Integer),
            ValueType::String => Some(TypedValue::Text(Cow::Owned(raw.to_string()))),
            ValueType::Boolean => {
                let trimmed = raw.trim();
                if trimmed.eq_ignore_ascii_case("true") {
                    Some(TypedValue::Boolean(true))
                } else if trimmed.eq_ignore_ascii_case("false") {
                    Some(TypedValue::Boolean(false))
                } else {
                    None
                }
            }
        }
    }
}

/// A parsed or fallback parameter value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TypedValue {
    Integer(i64),
    Text(Cow<'static, str>),
    Boolean(bool),
}

impl TypedValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            TypedValue::Integer(_) => ValueType::Integer,
            TypedValue::Text(_) => ValueType::String,
            TypedValue::Boolean(_) => ValueType::Boolean,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Integer(i) => write!(f, "{}", i),
            TypedValue::Text(s) => f.write_str(s),
            TypedValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// Build parameters understood by the resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Param {
    ApplicationId,
    Namespace,
    VersionCode,
    VersionName,
    MinPlatformLevel,
    TargetPlatformLevel,
    CompilePlatformLevel,
    NdkVersion,
    JvmTarget,
    SigningProfile,
    Desugaring,
    MultiDex,
}

impl Param {
    pub const COUNT: usize = 12;

    /// All parameters in resolution order
    pub const ALL: [Param; Param::COUNT] = [
        Param::ApplicationId,
        Param::Namespace,
        Param::VersionCode,
        Param::VersionName,
        Param::MinPlatformLevel,
        Param::TargetPlatformLevel,
        Param::CompilePlatformLevel,
        Param::NdkVersion,
        Param::JvmTarget,
        Param::SigningProfile,
        Param::Desugaring,
        Param::MultiDex,
    ];

    /// Properties key for this parameter
    pub fn key(self) -> &'static str {
        match self {
            Param::ApplicationId => "app.applicationId",
            Param::Namespace => "app.namespace",
            Param::VersionCode => "app.versionCode",
            Param::VersionName => "app.versionName",
            Param::MinPlatformLevel => "app.minPlatformLevel",
            Param::TargetPlatformLevel => "app.targetPlatformLevel",
            Param::CompilePlatformLevel => "app.compilePlatformLevel",
            Param::NdkVersion => "app.ndkVersion",
            Param::JvmTarget => "app.jvmTarget",
            Param::SigningProfile => "app.signingProfile",
            Param::Desugaring => "app.desugaring",
            Param::MultiDex => "app.multiDex",
        }
    }

    /// Legacy keys written by the Flutter tooling into `local.properties`.
    ///
    /// Consulted after the primary key within the same layer.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Param::VersionCode => &["flutter.versionCode"],
            Param::VersionName => &["flutter.versionName"],
            Param::MinPlatformLevel => &["flutter.minSdkVersion"],
            Param::TargetPlatformLevel => &["flutter.targetSdkVersion"],
            Param::CompilePlatformLevel => &["flutter.compileSdkVersion"],
            Param::NdkVersion => &["flutter.ndkVersion"],
            _ => &[],
        }
    }

    pub fn value_type(self) -> ValueType {
        match self {
            Param::VersionCode
            | Param::MinPlatformLevel
            | Param::TargetPlatformLevel
            | Param::CompilePlatformLevel => ValueType::Integer,
            Param::Desugaring | Param::MultiDex => ValueType::Boolean,
            _ => ValueType::String,
        }
    }

    /// Find the parameter for a primary or alias key
    pub fn from_key(key: &str) -> Option<Param> {
        Param::ALL
            .into_iter()
            .find(|p| p.key() == key || p.aliases().contains(&key))
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One row of the defaults table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultValue {
    pub param: Param,
    pub fallback: TypedValue,
}

impl DefaultValue {
    pub fn key(&self) -> &'static str {
        self.param.key()
    }

    pub fn value_type(&self) -> ValueType {
        self.param.value_type()
    }

    /// Parse a raw value with this parameter's declared type
    pub fn parse(&self, raw: &str) -> Option<TypedValue> {
        self.value_type().parse(raw)
    }
}

/// A fallback whose type does not match the parameter's declared type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("default for '{key}' must be a {expected}, got a {found}")]
pub struct FallbackTypeMismatch {
    pub key: String,
    pub expected: ValueType,
    pub found: ValueType,
}

/// Parameter name → fallback value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultsTable {
    fallbacks: [TypedValue; Param::COUNT],
}

impl Default for DefaultsTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl DefaultsTable {
    /// The compiled-in table
    pub fn builtin() -> Self {
        Self {
            fallbacks: Param::ALL.map(builtin_fallback),
        }
    }

    /// Default for `param`
    pub fn get(&self, param: Param) -> DefaultValue {
        DefaultValue {
            param,
            fallback: self.fallbacks[param.index()].clone(),
        }
    }

    /// Default for a key, if the key names a known parameter
    pub fn lookup(&self, key: &str) -> Option<DefaultValue> {
        Param::from_key(key).map(|param| self.get(param))
    }

    /// All rows in resolution order
    pub fn entries(&self) -> impl Iterator<Item = DefaultValue> + '_ {
        Param::ALL.into_iter().map(move |param| self.get(param))
    }

    /// Replace one fallback, keeping the declared type
    pub fn with_fallback(
        mut self,
        param: Param,
        fallback: TypedValue,
    ) -> Result<Self, FallbackTypeMismatch> {
        if fallback.value_type() != param.value_type() {
            return Err(FallbackTypeMismatch {
                key: param.key().to_string(),
                expected: param.value_type(),
                found: fallback.value_type(),
            });
        }
        self.fallbacks[param.index()] = fallback;
        Ok(self)
    }
}

fn builtin_fallback(param: Param) -> TypedValue {
    match param {
        Param::ApplicationId => TypedValue::Text(Cow::Borrowed("com.example.app")),
        Param::Namespace => TypedValue::Text(Cow::Borrowed("com.example.app")),
        Param::VersionCode => TypedValue::Integer(1),
        Param::VersionName => TypedValue::Text(Cow::Borrowed("1.0")),
        Param::MinPlatformLevel => TypedValue::Integer(21),
        Param::TargetPlatformLevel => TypedValue::Integer(35),
        Param::CompilePlatformLevel => TypedValue::Integer(35),
        Param::NdkVersion => TypedValue::Text(Cow::Borrowed("26.3.11579264")),
        Param::JvmTarget => TypedValue::Text(Cow::Borrowed("1.8")),
        Param::SigningProfile => TypedValue::Text(Cow::Borrowed("debug")),
        Param::Desugaring => TypedValue::Boolean(false),
        Param::MultiDex => TypedValue::Boolean(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_defaults() {
        let table = DefaultsTable::builtin();
        assert_eq!(table.get(Param::VersionCode).fallback, TypedValue::Integer(1));
        assert_eq!(
            table.get(Param::VersionName).fallback,
            TypedValue::Text(Cow::Borrowed("1.0"))
        );
        assert_eq!(
            table.get(Param::SigningProfile).fallback.to_string(),
            "debug"
        );
        assert_eq!(table.get(Param::Desugaring).fallback, TypedValue::Boolean(false));
    }

    #[test]
    fn test_fallback_types_match_declared_types() {
        let table = DefaultsTable::builtin();
        for row in table.entries() {
            assert_eq!(row.fallback.value_type(), row.value_type(), "{}", row.key());
        }
    }

    #[test]
    fn test_param_index_matches_order() {
        for (i, param) in Param::ALL.into_iter().enumerate() {
            assert_eq!(param.index(), i);
        }
    }

    #[test]
    fn test_lookup_by_alias() {
        let table = DefaultsTable::builtin();
        let row = table.lookup("flutter.versionCode").unwrap();
        assert_eq!(row.param, Param::VersionCode);
        assert!(table.lookup("sdk.dir").is_none());
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(ValueType::Integer.parse(" 42 "), Some(TypedValue::Integer(42)));
        assert_eq!(ValueType::Integer.parse("-3"), Some(TypedValue::Integer(-3)));
        assert_eq!(ValueType::Integer.parse("abc"), None);
        assert_eq!(ValueType::Integer.parse(""), None);
        assert_eq!(ValueType::Integer.parse("4.2"), None);
    }

    #[test]
    fn test_parse_boolean() {
        assert_eq!(ValueType::Boolean.parse("TRUE"), Some(TypedValue::Boolean(true)));
        assert_eq!(ValueType::Boolean.parse("false "), Some(TypedValue::Boolean(false)));
        assert_eq!(ValueType::Boolean.parse("yes"), None);
    }

    #[test]
    fn test_parse_string_is_verbatim() {
        assert_eq!(
            ValueType::String.parse(" 2.3.1 "),
            Some(TypedValue::Text(Cow::Owned(" 2.3.1 ".to_string())))
        );
    }

    #[test]
    fn test_with_fallback() {
        let table = DefaultsTable::builtin()
            .with_fallback(Param::MinPlatformLevel, TypedValue::Integer(24))
            .unwrap();
        assert_eq!(table.get(Param::MinPlatformLevel).fallback, TypedValue::Integer(24));

        let err = DefaultsTable::builtin()
            .with_fallback(Param::VersionCode, TypedValue::Boolean(true))
            .unwrap_err();
        assert_eq!(err.expected, ValueType::Integer);
        assert_eq!(err.found, ValueType::Boolean);
    }
}
