//! Object key layout shared by every stage.
//!
//! ```text
//! <raw bucket>/raw/YYYY/MM/DD/raw_cocktail_data.json
//! <processed bucket>/transformed/YYYY/MM/DD/transformed_cocktail_data.json
//! <processed bucket>/enriched/YYYY/MM/DD/enriched_cocktail_data.json
//! <processed bucket>/modeled/YYYY/MM/DD/<view>.json
//! ```

use mocktailverse_shared::{DatePartition, ModelView};

pub fn raw_key(partition: &DatePartition) -> String {
    format!("raw/{partition}/raw_cocktail_data.json")
}

pub fn transformed_key(partition: &DatePartition) -> String {
    format!("transformed/{partition}/transformed_cocktail_data.json")
}

pub fn enriched_key(partition: &DatePartition) -> String {
    format!("enriched/{partition}/enriched_cocktail_data.json")
}

pub fn modeled_key(partition: &DatePartition, view: ModelView) -> String {
    format!("modeled/{partition}/{view}.json")
}
