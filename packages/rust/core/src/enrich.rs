//! Enrich stage: a function-style handler that reads standardized records,
//! derives metadata for each one, writes the enriched batch back to the
//! object store and records a per-partition processing summary.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use mocktailverse_extract::{ObjectStore, keys, read_json_records, write_json_records};
use mocktailverse_shared::{
    Cocktail, DatePartition, EnrichedCocktail, Ingredient, ProcessingSummary, Result, SpiritType,
};
use mocktailverse_storage::Storage;

const SUCCESS_MESSAGE: &str = "Data enrichment completed successfully";

/// Invocation payload. Missing fields fall back to the processed bucket and
/// today's partition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_partition: Option<DatePartition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: EnrichResponseBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichResponseBody {
    pub message: String,
    pub records_processed: usize,
    pub output_location: String,
}

/// Handle one enrichment invocation.
#[instrument(skip_all, fields(partition))]
pub async fn handle(
    event: &EnrichEvent,
    default_bucket: &str,
    store: &dyn ObjectStore,
    storage: &Storage,
) -> Result<EnrichResponse> {
    let input_bucket = event.input_bucket.as_deref().unwrap_or(default_bucket);
    let output_bucket = event.output_bucket.as_deref().unwrap_or(default_bucket);
    let partition = event.date_partition.unwrap_or_else(DatePartition::today);
    tracing::Span::current().record("partition", tracing::field::display(&partition));

    info!(input_bucket, output_bucket, "starting enrichment");

    let cocktails: Vec<Cocktail> =
        read_json_records(store, input_bucket, &keys::transformed_key(&partition))?;

    let now = Utc::now();
    let enriched: Vec<EnrichedCocktail> = cocktails
        .into_iter()
        .map(|c| enrich_cocktail(c, now))
        .collect();

    let output_key = keys::enriched_key(&partition);
    write_json_records(store, output_bucket, &output_key, &enriched)?;

    let summary = summarize(&partition, &enriched, now);
    if let Err(e) = storage.put_processing_summary(&summary).await {
        warn!(error = %e, "could not write processing summary");
    }

    info!(records = enriched.len(), "enrichment complete");

    Ok(EnrichResponse {
        status_code: 200,
        body: EnrichResponseBody {
            message: SUCCESS_MESSAGE.to_string(),
            records_processed: enriched.len(),
            output_location: store.location(output_bucket, &output_key),
        },
    })
}

// ---------------------------------------------------------------------------
// Scoring rules
// ---------------------------------------------------------------------------

const SPECIALTY_INGREDIENTS: &[&str] = &["elderflower", "orgeat", "falernum", "amaro", "chartreuse"];
const FRESH_INDICATORS: &[&str] = &["juice", "mint", "lemon", "lime", "orange"];

/// Keyword lists, in detection priority order.
const SPIRIT_KEYWORDS: &[(SpiritType, &[&str])] = &[
    (SpiritType::Vodka, &["vodka", "absolut", "smirnoff"]),
    (SpiritType::Gin, &["gin", "hendrick", "tanqueray"]),
    (SpiritType::Rum, &["rum", "bacardi", "havana club"]),
    (SpiritType::Tequila, &["tequila", "patron", "reposado"]),
    (SpiritType::Whiskey, &["whiskey", "bourbon", "scotch", "rye"]),
    (SpiritType::Brandy, &["brandy", "cognac", "armagnac"]),
];

/// Calories per fluid ounce; the first matching key wins.
const CALORIES_PER_OZ: &[(&str, f64)] = &[
    ("rum", 97.0),
    ("vodka", 64.0),
    ("gin", 70.0),
    ("tequila", 69.0),
    ("whiskey", 70.0),
    ("brandy", 65.0),
    ("triple sec", 75.0),
    ("lime juice", 8.0),
    ("simple syrup", 53.0),
    ("soda", 0.0),
];

/// Derive every enrichment field. The standardized record is kept whole.
pub fn enrich_cocktail(cocktail: Cocktail, enriched_at: DateTime<Utc>) -> EnrichedCocktail {
    let complexity_score = complexity_score(&cocktail.ingredients);
    let spirit_type = detect_spirit(&cocktail.ingredients);
    let is_alcoholic = spirit_type != SpiritType::NonAlcoholic
        || cocktail
            .alcoholic_label
            .as_deref()
            .is_some_and(|l| l.eq_ignore_ascii_case("alcoholic"));

    EnrichedCocktail {
        enriched_at,
        ingredient_count: cocktail.ingredients.len(),
        complexity_score,
        instruction_word_count: cocktail.instructions.split_whitespace().count(),
        estimated_prep_time: estimate_prep_time(&cocktail.instructions),
        is_alcoholic,
        spirit_type,
        estimated_calories: estimate_calories(&cocktail.ingredients),
        tags: generate_tags(&cocktail, spirit_type, complexity_score),
        cocktail,
    }
}

fn lower_names(ingredients: &[Ingredient]) -> impl Iterator<Item = String> + '_ {
    ingredients.iter().map(|i| i.name.to_lowercase())
}

fn contains_any(name: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| name.contains(n))
}

/// Score between 0.0 and 10.0.
pub fn complexity_score(ingredients: &[Ingredient]) -> f64 {
    let base = (ingredients.len() as f64 * 0.5).min(3.0);
    let bonus: f64 = lower_names(ingredients)
        .map(|name| {
            let mut b = 0.0;
            if contains_any(&name, SPECIALTY_INGREDIENTS) {
                b += 1.0;
            }
            if contains_any(&name, FRESH_INDICATORS) {
                b += 0.5;
            }
            b
        })
        .sum();
    (base + bonus).min(10.0)
}

/// Minutes, capped at 15.
pub fn estimate_prep_time(instructions: &str) -> u32 {
    let lower = instructions.to_lowercase();
    let mut minutes: u32 = 3;
    if lower.contains("muddle") {
        minutes += 2;
    }
    if lower.contains("shake") {
        minutes += 1;
    }
    let steps = instructions.matches(['.', ';']).count() as u32;
    minutes += steps.saturating_sub(2);
    minutes.min(15)
}

pub fn detect_spirit(ingredients: &[Ingredient]) -> SpiritType {
    let names: Vec<String> = lower_names(ingredients).collect();
    SPIRIT_KEYWORDS
        .iter()
        .find(|(_, keywords)| names.iter().any(|name| contains_any(name, keywords)))
        .map(|(spirit, _)| *spirit)
        .unwrap_or(SpiritType::NonAlcoholic)
}

pub fn estimate_calories(ingredients: &[Ingredient]) -> u32 {
    ingredients
        .iter()
        .map(|ing| {
            let name = ing.name.to_lowercase();
            CALORIES_PER_OZ
                .iter()
                .find(|(key, _)| name.contains(key))
                .map(|(_, per_oz)| (per_oz * ing.amount).trunc().max(0.0) as u32)
                .unwrap_or(0)
        })
        .sum()
}

/// Complexity band used in tags and the `by_complexity` view.
pub fn complexity_level(score: f64) -> &'static str {
    if score < 3.0 {
        "simple"
    } else if score < 6.0 {
        "intermediate"
    } else {
        "complex"
    }
}

/// Deduplicated, sorted search tags.
pub fn generate_tags(cocktail: &Cocktail, spirit: SpiritType, complexity: f64) -> Vec<String> {
    let mut tags = BTreeSet::new();

    for field in [&cocktail.category, &cocktail.glass] {
        let lower = field.to_lowercase();
        if !lower.is_empty() {
            tags.insert(lower);
        }
    }

    if spirit != SpiritType::NonAlcoholic {
        tags.insert(spirit.as_str().to_string());
    }

    let instructions = cocktail.instructions.to_lowercase();
    for (needle, tag) in [("shake", "shaken"), ("stir", "stirred"), ("muddle", "muddled")] {
        if instructions.contains(needle) {
            tags.insert(tag.to_string());
        }
    }

    tags.insert(complexity_level(complexity).to_string());
    tags.into_iter().collect()
}

/// Batch summary. An empty batch averages to zero.
pub fn summarize(
    partition: &DatePartition,
    records: &[EnrichedCocktail],
    processed_at: DateTime<Utc>,
) -> ProcessingSummary {
    let total_complexity: f64 = records.iter().map(|r| r.complexity_score).sum();
    ProcessingSummary {
        date_partition: *partition,
        processed_at,
        record_count: records.len() as u64,
        total_ingredients: records.iter().map(|r| r.ingredient_count as u64).sum(),
        avg_complexity: if records.is_empty() {
            0.0
        } else {
            total_complexity / records.len() as f64
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mocktailverse_extract::LocalObjectStore;
    use uuid::Uuid;

    fn ing(name: &str, amount: f64) -> Ingredient {
        Ingredient {
            name: name.into(),
            measure: None,
            amount,
        }
    }

    fn mojito() -> Cocktail {
        Cocktail {
            id: "11000".into(),
            name: "Mojito".into(),
            category: "Cocktail".into(),
            glass: "Highball glass".into(),
            alcoholic_label: Some("Alcoholic".into()),
            instructions: "Muddle mint leaves with sugar and lime juice. Add a splash of soda water and fill the glass with cracked ice. Pour the rum and top with soda water. Garnish and serve with straw.".into(),
            ingredients: vec![
                ing("Light rum", 2.0),
                ing("Lime", 0.0),
                ing("Sugar", 0.0),
                ing("Mint", 0.0),
                ing("Soda water", 0.0),
            ],
            thumbnail_url: None,
            source_modified: None,
        }
    }

    #[test]
    fn complexity_counts_base_specialty_and_fresh() {
        // 5 * 0.5 = 2.5, lime + mint fresh = 1.0
        assert_eq!(complexity_score(&mojito().ingredients), 3.5);

        let fancy = vec![
            ing("Gin", 2.0),
            ing("Green Chartreuse", 0.75),
            ing("Maraschino", 0.75),
            ing("Lime juice", 0.75),
        ];
        // 2.0 + 1.0 + 0.5
        assert_eq!(complexity_score(&fancy), 3.5);

        let many: Vec<_> = (0..12).map(|_| ing("Elderflower cordial juice", 1.0)).collect();
        assert_eq!(complexity_score(&many), 10.0);
        assert_eq!(complexity_score(&[]), 0.0);
    }

    #[test]
    fn prep_time_rules() {
        assert_eq!(estimate_prep_time("Stir."), 3);
        assert_eq!(estimate_prep_time("Muddle. Shake. Strain. Serve."), 8);
        assert_eq!(estimate_prep_time(&".".repeat(40)), 15);
        assert_eq!(estimate_prep_time(""), 3);
    }

    #[test]
    fn spirit_detection_follows_priority() {
        assert_eq!(detect_spirit(&mojito().ingredients), SpiritType::Rum);
        assert_eq!(
            detect_spirit(&[ing("Dark rum", 1.0), ing("Absolut Citron", 1.0)]),
            SpiritType::Vodka
        );
        assert_eq!(detect_spirit(&[ing("Bourbon", 2.0)]), SpiritType::Whiskey);
        assert_eq!(
            detect_spirit(&[ing("Orange juice", 4.0), ing("Grenadine", 0.5)]),
            SpiritType::NonAlcoholic
        );
    }

    #[test]
    fn calories_truncate_per_ingredient() {
        let ings = vec![
            ing("Light rum", 1.5),      // 145.5 -> 145
            ing("Triple sec", 0.5),     // 37.5 -> 37
            ing("Lime juice", 1.0),     // 8
            ing("Club soda", 4.0),      // 0
            ing("Angostura bitters", 0.1),
        ];
        assert_eq!(estimate_calories(&ings), 190);
    }

    #[test]
    fn tags_are_sorted_and_deduplicated() {
        let c = mojito();
        let tags = generate_tags(&c, SpiritType::Rum, 3.5);
        assert_eq!(
            tags,
            vec!["cocktail", "highball glass", "intermediate", "muddled", "rum"]
        );

        let mut plain = mojito();
        plain.category = "Shot".into();
        plain.glass = "shot".into();
        plain.instructions = "Shake and stir.".into();
        let tags = generate_tags(&plain, SpiritType::NonAlcoholic, 1.0);
        assert_eq!(tags, vec!["shaken", "shot", "simple", "stirred"]);
    }

    #[test]
    fn enriched_record_keeps_every_standardized_field() {
        let base = mojito();
        let enriched = enrich_cocktail(base.clone(), Utc::now());
        assert_eq!(enriched.cocktail, base);
        assert_eq!(enriched.ingredient_count, 5);
        assert!(enriched.is_alcoholic);
        assert_eq!(enriched.estimated_calories, 194);

        let mut virgin = mojito();
        virgin.ingredients.remove(0);
        virgin.alcoholic_label = Some("Non alcoholic".into());
        let enriched = enrich_cocktail(virgin, Utc::now());
        assert!(!enriched.is_alcoholic);
        assert_eq!(enriched.spirit_type, SpiritType::NonAlcoholic);
    }

    #[test]
    fn empty_batch_summary_averages_to_zero() {
        let partition: DatePartition = "2024/06/01".parse().unwrap();
        let summary = summarize(&partition, &[], Utc::now());
        assert_eq!(summary.record_count, 0);
        assert_eq!(summary.avg_complexity, 0.0);
    }

    #[tokio::test]
    async fn handler_enriches_partition_and_reports_location() {
        let root = std::env::temp_dir().join(format!("mv_enrich_{}", Uuid::now_v7()));
        let store = LocalObjectStore::open(root.join("objects")).unwrap();
        let storage = Storage::open(&root.join("mv.db")).await.unwrap();
        let partition: DatePartition = "2024/06/01".parse().unwrap();

        write_json_records(
            &store,
            "processed",
            &keys::transformed_key(&partition),
            &[mojito()],
        )
        .unwrap();

        let event = EnrichEvent {
            date_partition: Some(partition),
            ..Default::default()
        };
        let response = handle(&event, "processed", &store, &storage).await.unwrap();

        assert_eq!(response.status_code, 200);
        assert_eq!(response.body.message, "Data enrichment completed successfully");
        assert_eq!(response.body.records_processed, 1);
        assert_eq!(
            response.body.output_location,
            "s3://processed/enriched/2024/06/01/enriched_cocktail_data.json"
        );

        let enriched: Vec<EnrichedCocktail> =
            read_json_records(&store, "processed", &keys::enriched_key(&partition)).unwrap();
        assert_eq!(enriched[0].spirit_type, SpiritType::Rum);

        let summary = storage
            .get_processing_summary(&partition)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(summary.total_ingredients, 5);
        assert_eq!(summary.avg_complexity, 3.5);
    }

    #[tokio::test]
    async fn summary_write_failure_does_not_fail_the_handler() {
        let root = std::env::temp_dir().join(format!("mv_enrich_ro_{}", Uuid::now_v7()));
        let store = LocalObjectStore::open(root.join("objects")).unwrap();
        let db_path = root.join("mv.db");
        Storage::open(&db_path).await.unwrap();
        let readonly = Storage::open_readonly(&db_path).await.unwrap();
        let partition: DatePartition = "2024/06/02".parse().unwrap();

        write_json_records(
            &store,
            "processed",
            &keys::transformed_key(&partition),
            &[mojito()],
        )
        .unwrap();

        let event = EnrichEvent {
            date_partition: Some(partition),
            ..Default::default()
        };
        let response = handle(&event, "processed", &store, &readonly).await.unwrap();
        assert_eq!(response.status_code, 200);
        assert_eq!(response.body.records_processed, 1);

        let enriched: Vec<EnrichedCocktail> =
            read_json_records(&store, "processed", &keys::enriched_key(&partition)).unwrap();
        assert_eq!(enriched.len(), 1);
        assert!(readonly.get_processing_summary(&partition).await.unwrap().is_none());
    }

    #[test]
    fn response_serializes_with_status_code_key() {
        let response = EnrichResponse {
            status_code: 200,
            body: EnrichResponseBody {
                message: SUCCESS_MESSAGE.into(),
                records_processed: 0,
                output_location: "s3://b/k".into(),
            },
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["statusCode"], 200);
        assert_eq!(json["body"]["records_processed"], 0);
    }
}
