//! Loader for `local.properties`-style key/value files.
//!
//! A missing file is not an error: it loads as an empty [`RawProperties`].
//! A file that exists but cannot be parsed fails with
//! [`PropertiesError::Malformed`], naming the file and the offending line.

mod error;
mod parser;

pub use error::{MalformedReason, PropertiesError};

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// Immutable string-to-string mapping loaded from a properties source.
///
/// Keys are unique; when a source defines a key more than once the last
/// definition wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawProperties {
    entries: BTreeMap<String, String>,

    source: Option<PathBuf>,

    /// SHA-256 of the raw file bytes
    digest: Option<String>,
}

impl RawProperties {
    /// Empty set of properties with no backing file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from in-memory pairs (last duplicate wins).
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            source: None,
            digest: None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// File the properties were loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Hex SHA-256 of the file bytes, if loaded from a file.
    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }
}

/// Load properties from `path`.
///
/// Returns empty properties when the file does not exist. The file handle
/// is dropped before parsing starts, so it is released on every path.
pub fn load(path: &Path) -> Result<RawProperties, PropertiesError> {
    let bytes = match read_file(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "properties file absent, using empty set");
            return Ok(RawProperties::default());
        }
        Err(source) => {
            return Err(PropertiesError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let digest = hex::encode(Sha256::digest(&bytes));

    let text = std::str::from_utf8(&bytes).map_err(|e| {
        let line = bytes[..e.valid_up_to()].iter().filter(|b| **b == b'\n').count() + 1;
        PropertiesError::Malformed {
            path: path.to_path_buf(),
            line,
            reason: MalformedReason::InvalidUtf8,
        }
    })?;

    let mut properties = parse_str(path, text)?;
    properties.digest = Some(digest);
    tracing::debug!(
        path = %path.display(),
        entries = properties.len(),
        "loaded properties file"
    );
    Ok(properties)
}

/// Parse properties text; `source` names the input in error messages.
pub fn parse_str(source: impl AsRef<Path>, text: &str) -> Result<RawProperties, PropertiesError> {
    let source = source.as_ref();
    let entries = parser::parse(text).map_err(|failure| failure.at(source))?;

    Ok(RawProperties {
        entries: entries.into_iter().collect(),
        source: Some(source.to_path_buf()),
        digest: None,
    })
}

fn read_file(path: &Path) -> io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let props = load(&dir.path().join("local.properties")).unwrap();
        assert!(props.is_empty());
        assert!(props.source().is_none());
        assert!(props.digest().is_none());
    }

    #[test]
    fn test_load_file() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "sdk.dir=/opt/android-sdk").unwrap();
        writeln!(temp, "flutter.versionCode=7").unwrap();

        let props = load(temp.path()).unwrap();
        assert_eq!(props.len(), 2);
        assert_eq!(props.get("flutter.versionCode"), Some("7"));
        assert_eq!(props.source(), Some(temp.path()));
        assert_eq!(props.digest().map(str::len), Some(64));
    }

    #[test]
    fn test_last_definition_wins() {
        let props = parse_str("local.properties", "a=1\nb=2\na=3\n").unwrap();
        assert_eq!(props.len(), 2);
        assert_eq!(props.get("a"), Some("3"));
    }

    #[test]
    fn test_malformed_names_file_and_line() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "a=1").unwrap();
        writeln!(temp, "garbage").unwrap();

        let err = load(temp.path()).unwrap_err();
        assert_eq!(err.line(), Some(2));
        assert_eq!(err.path(), temp.path());
        let message = err.to_string();
        assert!(message.contains("line 2"), "{}", message);
        assert!(message.contains(&temp.path().display().to_string()));
    }

    #[test]
    fn test_invalid_utf8_reports_line() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"a=1\nb=\xff\xfe\n").unwrap();

        let err = load(temp.path()).unwrap_err();
        match err {
            PropertiesError::Malformed { line, reason, .. } => {
                assert_eq!(line, 2);
                assert_eq!(reason, MalformedReason::InvalidUtf8);
            }
            other => panic!("expected malformed error, got {:?}", other),
        }
    }

    #[test]
    fn test_directory_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = load(dir.path()).unwrap_err();
        assert!(err.line().is_none());
    }

    #[test]
    fn test_digest_tracks_content() {
        let mut a = NamedTempFile::new().unwrap();
        let mut b = NamedTempFile::new().unwrap();
        writeln!(a, "x=1").unwrap();
        writeln!(b, "x=2").unwrap();

        let da = load(a.path()).unwrap();
        let db = load(b.path()).unwrap();
        assert_ne!(da.digest(), db.digest());
        assert_eq!(da.digest(), load(a.path()).unwrap().digest());
    }

    #[test]
    fn test_from_pairs() {
        let props = RawProperties::from_pairs([("k", "v"), ("k", "w")]);
        assert_eq!(props.get("k"), Some("w"));
        assert!(props.source().is_none());
    }
}
