//! Extract stage: ingestion sources and the object-store landing zone.
//!
//! This crate provides:
//! - [`ObjectStore`] / [`LocalObjectStore`]: bucket/key blob storage
//! - [`CocktailApiClient`]: concurrent fetcher for the cocktail API
//! - [`RecordSource`]: API, file, or in-memory raw records
//! - [`extract`]: lands one raw batch under its date partition

pub mod client;
pub mod keys;
pub mod object_store;
pub mod source;

use sha2::{Digest, Sha256};
use tracing::{info, instrument};

use mocktailverse_shared::{DatePartition, MocktailverseError, Result};

pub use client::{ApiClientOptions, CocktailApiClient};
pub use object_store::{
    LocalObjectStore, ObjectStore, read_json_records, validate_key, write_json_records,
};
pub use source::{RecordSource, parse_records, read_records_file};

/// Outcome of landing a raw batch.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExtractReport {
    /// Number of raw records landed.
    pub records: usize,
    /// Object address of the landed batch.
    pub location: String,
    /// SHA-256 of the landed bytes (hex).
    pub checksum: String,
    pub bytes: usize,
    /// Source description.
    pub source: String,
}

/// Fetch raw records from `source` and land them in `bucket`.
#[instrument(skip_all, fields(source = %source.describe(), bucket = %bucket, partition = %partition))]
pub async fn extract(
    source: &RecordSource,
    store: &dyn ObjectStore,
    bucket: &str,
    partition: &DatePartition,
) -> Result<ExtractReport> {
    let records = source.fetch().await?;

    let key = keys::raw_key(partition);
    let body = serde_json::to_vec_pretty(&records)
        .map_err(|e| MocktailverseError::parse(format!("failed to serialize raw batch: {e}")))?;
    store.put(bucket, &key, &body)?;

    let checksum = {
        let mut hasher = Sha256::new();
        hasher.update(&body);
        format!("{:x}", hasher.finalize())
    };

    let report = ExtractReport {
        records: records.len(),
        location: store.location(bucket, &key),
        checksum,
        bytes: body.len(),
        source: source.describe(),
    };

    info!(
        records = report.records,
        location = %report.location,
        bytes = report.bytes,
        "raw batch landed"
    );

    Ok(report)
}
