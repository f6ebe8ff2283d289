//! Publishing the resolved configuration
//!
//! A published config is a read-only snapshot for the rest of the build
//! session. Publishing is not retried; any failure aborts the build.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{ConfigSource, ResolvedBuildConfig, ValueOrigin, TABLE_VERSION};
use crate::variant::BuildType;

/// Schema version for resolved_config.json
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "buildcfg/resolved_config@1";

/// Publish errors
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("configuration already published for this session")]
    AlreadyPublished,

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("JSON serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The snapshot handed to the build pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedConfig {
    pub schema_version: u32,
    pub schema_id: String,

    /// Version of the defaults table used
    pub defaults_version: u32,

    pub created_at: DateTime<Utc>,
    pub build_type: BuildType,
    pub config: ResolvedBuildConfig,

    /// Parameter key → layer that supplied it
    pub origins: BTreeMap<String, ValueOrigin>,

    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,
}

impl PublishedConfig {
    pub fn new(
        build_type: BuildType,
        config: ResolvedBuildConfig,
        origins: BTreeMap<String, ValueOrigin>,
        sources: Vec<ConfigSource>,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            defaults_version: TABLE_VERSION,
            created_at: Utc::now(),
            build_type,
            config,
            origins,
            sources,
        }
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// `key=value` lines, build type first
    pub fn to_properties(&self) -> String {
        let mut out = format!("buildType={}\n", self.build_type);
        for (key, value) in self.config.to_key_values() {
            out.push_str(key);
            out.push('=');
            out.push_str(&value);
            out.push('\n');
        }
        out
    }
}

/// Hands a resolved configuration to the build pipeline
pub trait ConfigPublisher {
    fn publish(&self, snapshot: &PublishedConfig) -> Result<(), PublishError>;
}

/// In-process, write-once snapshot
#[derive(Debug, Default)]
pub struct SessionSnapshot {
    cell: OnceLock<Arc<PublishedConfig>>,
}

impl SessionSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// The published snapshot, once available
    pub fn get(&self) -> Option<Arc<PublishedConfig>> {
        self.cell.get().cloned()
    }

    pub fn config(&self) -> Option<&ResolvedBuildConfig> {
        self.cell.get().map(|snapshot| &snapshot.config)
    }

    pub fn is_published(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl ConfigPublisher for SessionSnapshot {
    fn publish(&self, snapshot: &PublishedConfig) -> Result<(), PublishError> {
        self.cell
            .set(Arc::new(snapshot.clone()))
            .map_err(|_| PublishError::AlreadyPublished)
    }
}

/// Writes the snapshot as JSON.
///
/// The document is written to a sibling temp file and renamed into place,
/// so readers never observe a partial file.
#[derive(Debug, Clone)]
pub struct JsonFilePublisher {
    path: PathBuf,
}

impl JsonFilePublisher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigPublisher for JsonFilePublisher {
    fn publish(&self, snapshot: &PublishedConfig) -> Result<(), PublishError> {
        let json = snapshot.to_json()?;
        let io_err = |source| PublishError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(|source| {
            let _ = fs::remove_file(&tmp);
            io_err(source)
        })?;

        tracing::debug!(path = %self.path.display(), "wrote resolved config");
        Ok(())
    }
}
