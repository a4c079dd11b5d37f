//! Where raw cocktail records come from.

use std::path::{Path, PathBuf};

use tracing::info;

use mocktailverse_shared::{MocktailverseError, RawRecord, Result};

use crate::client::CocktailApiClient;

/// An ingestion source for the extract stage.
#[derive(Debug, Clone)]
pub enum RecordSource {
    /// Live cocktail API.
    Api(CocktailApiClient),
    /// A JSON file on disk.
    File(PathBuf),
    /// Records supplied in memory (bundled samples, tests).
    Inline(Vec<RawRecord>),
}

impl RecordSource {
    /// Short label for logs and run reports.
    pub fn describe(&self) -> String {
        match self {
            Self::Api(client) => format!("api:{}", client.options().base_url),
            Self::File(path) => format!("file:{}", path.display()),
            Self::Inline(records) => format!("inline:{}", records.len()),
        }
    }

    /// Pull every available raw record.
    pub async fn fetch(&self) -> Result<Vec<RawRecord>> {
        match self {
            Self::Api(client) => client.fetch_all().await,
            Self::File(path) => read_records_file(path),
            Self::Inline(records) => Ok(records.clone()),
        }
    }
}

/// Parse a records file.
///
/// Accepts a JSON array, an API-style envelope `{"drinks": [...]}`, or a
/// single object.
pub fn read_records_file(path: &Path) -> Result<Vec<RawRecord>> {
    let content = std::fs::read_to_string(path).map_err(|e| MocktailverseError::io(path, e))?;
    let records = parse_records(&content)
        .map_err(|e| MocktailverseError::parse(format!("{}: {e}", path.display())))?;
    info!(path = %path.display(), records = records.len(), "read records file");
    Ok(records)
}

/// Parse records from JSON text (see [`read_records_file`] for accepted shapes).
pub fn parse_records(content: &str) -> std::result::Result<Vec<RawRecord>, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(content)?;
    let records = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => match map.remove("drinks") {
            Some(serde_json::Value::Array(items)) => items,
            Some(serde_json::Value::Null) => Vec::new(),
            Some(other) => {
                map.insert("drinks".into(), other);
                vec![serde_json::Value::Object(map)]
            }
            None => vec![serde_json::Value::Object(map)],
        },
        other => vec![other],
    };
    Ok(records.into_iter().map(RawRecord).collect())
}
