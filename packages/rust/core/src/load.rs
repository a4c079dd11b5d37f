//! Load stage: persist the enriched batch into the key-value table.

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument};

use mocktailverse_extract::{ObjectStore, keys, read_json_records};
use mocktailverse_shared::{DatePartition, EnrichedCocktail, Result, StoredCocktail};
use mocktailverse_storage::Storage;

#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    /// Records written (repeated ids count once per write).
    pub records: usize,
    /// Distinct cocktails in the table after the load.
    pub total_stored: u64,
}

/// Upsert every enriched record of `partition`, keyed by cocktail id.
#[instrument(skip_all, fields(bucket = %bucket, partition = %partition, run_id = %run_id))]
pub async fn load(
    store: &dyn ObjectStore,
    bucket: &str,
    partition: &DatePartition,
    storage: &Storage,
    run_id: &str,
) -> Result<LoadReport> {
    let records: Vec<EnrichedCocktail> =
        read_json_records(store, bucket, &keys::enriched_key(partition))?;

    let stored_at = Utc::now();
    for item in &records {
        let stored = StoredCocktail {
            key: item.cocktail.id.clone(),
            item: item.clone(),
            stored_at,
            run_id: run_id.to_string(),
        };
        storage.put_cocktail(&stored).await?;
    }

    let report = LoadReport {
        records: records.len(),
        total_stored: storage.count_cocktails().await?,
    };
    info!(
        records = report.records,
        total_stored = report.total_stored,
        "load complete"
    );
    Ok(report)
}
