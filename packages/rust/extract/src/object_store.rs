//! Object storage: the landing zone for raw extracts and stage outputs.
//!
//! [`ObjectStore`] is the seam where a managed bucket service plugs in;
//! [`LocalObjectStore`] keeps objects on the filesystem at
//! `<root>/<bucket>/<key>`.

use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use uuid::Uuid;

use mocktailverse_shared::{MocktailverseError, Result};

/// Bucket/key addressed blob storage.
pub trait ObjectStore: Send + Sync {
    /// Write (or overwrite) an object.
    fn put(&self, bucket: &str, key: &str, body: &[u8]) -> Result<()>;

    /// Read an object. Missing objects yield [`MocktailverseError::NotFound`].
    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    /// List keys under `prefix`, sorted.
    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>>;

    fn exists(&self, bucket: &str, key: &str) -> Result<bool>;

    /// Render an object's address, e.g. `s3://bucket/key`.
    fn location(&self, bucket: &str, key: &str) -> String {
        format!("s3://{bucket}/{key}")
    }
}

/// Reject keys that are empty, absolute, or escape the bucket.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(MocktailverseError::ObjectStore("object key is empty".into()));
    }
    let path = Path::new(key);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if escapes {
        return Err(MocktailverseError::ObjectStore(format!(
            "invalid object key '{key}': must be relative without '..'"
        )));
    }
    Ok(())
}

fn validate_bucket(bucket: &str) -> Result<()> {
    let valid = !bucket.is_empty()
        && bucket
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
        && !bucket.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(MocktailverseError::ObjectStore(format!(
            "invalid bucket name '{bucket}'"
        )))
    }
}

// ---------------------------------------------------------------------------
// LocalObjectStore
// ---------------------------------------------------------------------------

/// Filesystem-backed object store.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| MocktailverseError::io(&root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        validate_bucket(bucket)?;
        validate_key(key)?;
        Ok(self.root.join(bucket).join(key))
    }
}

impl ObjectStore for LocalObjectStore {
    fn put(&self, bucket: &str, key: &str, body: &[u8]) -> Result<()> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| MocktailverseError::io(parent, e))?;
        }

        // Write to a sibling temp file, then rename, so readers never see a partial object
        let tmp = path.with_extension(format!("tmp-{}", Uuid::now_v7()));
        std::fs::write(&tmp, body).map_err(|e| MocktailverseError::io(&tmp, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| MocktailverseError::io(&path, e))?;

        debug!(bucket, key, bytes = body.len(), "object written");
        Ok(())
    }

    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let path = self.object_path(bucket, key)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(
                MocktailverseError::NotFound(self.location(bucket, key)),
            ),
            Err(e) => Err(MocktailverseError::io(&path, e)),
        }
    }

    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        validate_bucket(bucket)?;
        let bucket_dir = self.root.join(bucket);
        if !bucket_dir.exists() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        collect_keys(&bucket_dir, &bucket_dir, &mut keys)?;
        keys.retain(|k| k.starts_with(prefix));
        keys.sort();
        Ok(keys)
    }

    fn exists(&self, bucket: &str, key: &str) -> Result<bool> {
        Ok(self.object_path(bucket, key)?.is_file())
    }
}

/// Recursively collect `/`-separated keys relative to `base`, skipping temp files.
fn collect_keys(base: &Path, dir: &Path, keys: &mut Vec<String>) -> Result<()> {
    let entries = std::fs::read_dir(dir).map_err(|e| MocktailverseError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| MocktailverseError::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            collect_keys(base, &path, keys)?;
            continue;
        }
        let is_tmp = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.starts_with("tmp-"));
        if is_tmp {
            continue;
        }
        if let Ok(rel) = path.strip_prefix(base) {
            let key = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            keys.push(key);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// JSON helpers
// ---------------------------------------------------------------------------

/// Read a JSON object as a list of records.
///
/// A document holding a single object (rather than an array) yields a
/// one-element list.
pub fn read_json_records<T: DeserializeOwned>(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
) -> Result<Vec<T>> {
    let bytes = store.get(bucket, key)?;
    let value: serde_json::Value = serde_json::from_slice(&bytes).map_err(|e| {
        MocktailverseError::parse(format!("{}: {e}", store.location(bucket, key)))
    })?;

    let items = match value {
        serde_json::Value::Array(items) => items,
        single => vec![single],
    };

    items
        .into_iter()
        .map(|item| {
            serde_json::from_value(item).map_err(|e| {
                MocktailverseError::parse(format!("{}: {e}", store.location(bucket, key)))
            })
        })
        .collect()
}

/// Write records as a pretty-printed JSON array. Returns the number of bytes written.
pub fn write_json_records<T: Serialize>(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    records: &[T],
) -> Result<usize> {
    let body = serde_json::to_vec_pretty(records)
        .map_err(|e| MocktailverseError::parse(format!("failed to serialize records: {e}")))?;
    store.put(bucket, key, &body)?;
    info!(location = %store.location(bucket, key), records = records.len(), "wrote records");
    Ok(body.len())
}
