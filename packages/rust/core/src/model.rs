//! Model stage: aggregate stored cocktails into the analytics views.
//!
//! Every run rebuilds all views from the full key-value table, replaces the
//! `model_rows` table in one transaction and exports each view as JSON.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, instrument};

use mocktailverse_extract::{ObjectStore, keys, write_json_records};
use mocktailverse_shared::{DatePartition, ModelRow, ModelView, Result, StoredCocktail};
use mocktailverse_storage::Storage;

use crate::enrich::complexity_level;

/// Dimension used for records without a category.
const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone, Serialize)]
pub struct ModelReport {
    /// Cocktails aggregated.
    pub cocktails: usize,
    /// Rows per view.
    pub views: BTreeMap<String, usize>,
    /// Exported object per view.
    pub exports: Vec<String>,
}

#[derive(Default)]
struct Accumulator {
    count: u64,
    complexity: f64,
    calories: f64,
    prep_time: f64,
}

fn dimension(view: ModelView, record: &StoredCocktail) -> String {
    match view {
        ModelView::BySpirit => record.item.spirit_type.as_str().to_string(),
        ModelView::ByCategory => {
            let category = record.item.cocktail.category.trim();
            if category.is_empty() {
                UNCATEGORIZED.to_string()
            } else {
                category.to_string()
            }
        }
        ModelView::ByComplexity => complexity_level(record.item.complexity_score).to_string(),
    }
}

/// Group `records` into rows for one view, ordered by dimension.
pub fn aggregate(view: ModelView, records: &[StoredCocktail]) -> Vec<ModelRow> {
    let mut groups: BTreeMap<String, Accumulator> = BTreeMap::new();
    for record in records {
        let acc = groups.entry(dimension(view, record)).or_default();
        acc.count += 1;
        acc.complexity += record.item.complexity_score;
        acc.calories += f64::from(record.item.estimated_calories);
        acc.prep_time += f64::from(record.item.estimated_prep_time);
    }

    groups
        .into_iter()
        .map(|(dimension, acc)| {
            let n = acc.count as f64;
            ModelRow {
                view,
                dimension,
                cocktail_count: acc.count,
                avg_complexity: round2(acc.complexity / n),
                avg_calories: round2(acc.calories / n),
                avg_prep_time: round2(acc.prep_time / n),
            }
        })
        .collect()
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Rebuild every view and export it under `partition`.
#[instrument(skip_all, fields(bucket = %bucket, partition = %partition))]
pub async fn build_model(
    storage: &Storage,
    store: &dyn ObjectStore,
    bucket: &str,
    partition: &DatePartition,
) -> Result<ModelReport> {
    let records = storage.list_cocktails().await?;

    let mut all_rows = Vec::new();
    let mut views = BTreeMap::new();
    let mut exports = Vec::new();

    for view in ModelView::ALL {
        let rows = aggregate(view, &records);
        let key = keys::modeled_key(partition, view);
        write_json_records(store, bucket, &key, &rows)?;
        exports.push(store.location(bucket, &key));
        views.insert(view.to_string(), rows.len());
        all_rows.extend(rows);
    }

    storage.replace_model_rows(&all_rows).await?;

    info!(cocktails = records.len(), rows = all_rows.len(), "model rebuilt");

    Ok(ModelReport {
        cocktails: records.len(),
        views,
        exports,
    })
}
