//! Core domain types for the Mocktailverse pipeline.
//!
//! Records move through a strict derivation chain:
//! [`RawRecord`] → [`Cocktail`] → [`EnrichedCocktail`] → [`StoredCocktail`] → [`ModelRow`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MocktailverseError, Result};

/// Identifier of the production pipeline.
pub const PIPELINE_ID: &str = "mocktailverse_etl_pipeline";

/// Identifier of the bundled example pipeline (registered when examples are loaded).
pub const EXAMPLE_PIPELINE_ID: &str = "mocktailverse_example_pipeline";

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// One named unit of the five-step data flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extract,
    Transform,
    Enrich,
    Load,
    Model,
}

impl Stage {
    /// All stages in declared execution order.
    pub const ALL: [Stage; 5] = [
        Stage::Extract,
        Stage::Transform,
        Stage::Enrich,
        Stage::Load,
        Stage::Model,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extract => "extract",
            Self::Transform => "transform",
            Self::Enrich => "enrich",
            Self::Load => "load",
            Self::Model => "model",
        }
    }

    /// Position in the declared order (0-based).
    pub fn position(&self) -> usize {
        Self::ALL
            .iter()
            .position(|s| s == self)
            .unwrap_or(Self::ALL.len())
    }

    /// The stage that consumes this stage's output, if any.
    pub fn downstream(&self) -> Option<Stage> {
        Self::ALL.get(self.position() + 1).copied()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = MocktailverseError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| MocktailverseError::validation(format!("unknown stage '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for pipeline run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// DatePartition
// ---------------------------------------------------------------------------

/// A `YYYY/MM/DD` date bucket used in object keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatePartition(NaiveDate);

impl DatePartition {
    /// Partition for the current UTC date.
    pub fn today() -> Self {
        Self(Utc::now().date_naive())
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for DatePartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}/{:02}/{:02}",
            self.0.year(),
            self.0.month(),
            self.0.day()
        )
    }
}

/// Accepts `YYYY/MM/DD` as well as the ISO `YYYY-MM-DD` form used for execution dates.
impl FromStr for DatePartition {
    type Err = MocktailverseError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || {
            MocktailverseError::validation(format!(
                "invalid date partition '{s}': expected YYYY/MM/DD"
            ))
        };

        // Zero-padded only, so the text given is exactly the key prefix produced.
        let b = s.as_bytes();
        let padded = b.len() == 10
            && b[4] == b[7]
            && matches!(b[4], b'/' | b'-')
            && b.iter()
                .enumerate()
                .all(|(i, c)| i == 4 || i == 7 || c.is_ascii_digit());
        if !padded {
            return Err(invalid());
        }

        NaiveDate::parse_from_str(s, "%Y/%m/%d")
            .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
            .map(Self)
            .map_err(|_| invalid())
    }
}

impl Serialize for DatePartition {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DatePartition {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Opaque payload as landed by the extract stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(pub serde_json::Value);

/// One ingredient line of a standardized cocktail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    /// Ingredient name, trimmed.
    pub name: String,
    /// Original measure text (e.g. `1 1/2 oz`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measure: Option<String>,
    /// Volume in fluid ounces; `0.0` when the measure is not convertible.
    #[serde(default)]
    pub amount: f64,
}

/// A cleansed cocktail record with a fixed shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cocktail {
    /// Stable identifier from the source.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub glass: String,
    /// Source's own alcoholic label (`Alcoholic`, `Non alcoholic`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alcoholic_label: Option<String>,
    #[serde(default)]
    pub instructions: String,
    pub ingredients: Vec<Ingredient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Last modification timestamp as reported by the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_modified: Option<String>,
}

/// Primary spirit detected in a cocktail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpiritType {
    Vodka,
    Gin,
    Rum,
    Tequila,
    Whiskey,
    Brandy,
    NonAlcoholic,
}

impl SpiritType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vodka => "vodka",
            Self::Gin => "gin",
            Self::Rum => "rum",
            Self::Tequila => "tequila",
            Self::Whiskey => "whiskey",
            Self::Brandy => "brandy",
            Self::NonAlcoholic => "non-alcoholic",
        }
    }
}

impl fmt::Display for SpiritType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A standardized cocktail plus derived metadata.
///
/// The base record is embedded (and flattened on the wire), so enrichment can
/// only ever add fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedCocktail {
    #[serde(flatten)]
    pub cocktail: Cocktail,
    pub enriched_at: DateTime<Utc>,
    pub ingredient_count: usize,
    pub complexity_score: f64,
    pub instruction_word_count: usize,
    /// Minutes.
    pub estimated_prep_time: u32,
    pub is_alcoholic: bool,
    pub spirit_type: SpiritType,
    pub estimated_calories: u32,
    pub tags: Vec<String>,
}

/// An enriched cocktail as persisted in the key-value store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCocktail {
    /// Lookup key (the cocktail id).
    pub key: String,
    pub item: EnrichedCocktail,
    pub stored_at: DateTime<Utc>,
    /// Run that wrote this version.
    pub run_id: String,
}

// ---------------------------------------------------------------------------
// Model views
// ---------------------------------------------------------------------------

/// Analytics projections rebuilt by the model stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelView {
    BySpirit,
    ByCategory,
    ByComplexity,
}

impl ModelView {
    pub const ALL: [ModelView; 3] = [
        ModelView::BySpirit,
        ModelView::ByCategory,
        ModelView::ByComplexity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BySpirit => "by_spirit",
            Self::ByCategory => "by_category",
            Self::ByComplexity => "by_complexity",
        }
    }
}

impl fmt::Display for ModelView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelView {
    type Err = MocktailverseError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .find(|v| v.as_str() == s.trim())
            .copied()
            .ok_or_else(|| {
                MocktailverseError::validation(format!(
                    "unknown view '{s}': expected by_spirit, by_category or by_complexity"
                ))
            })
    }
}

/// One aggregated row of a model view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRow {
    pub view: ModelView,
    /// Grouping value (spirit, category, or complexity level).
    pub dimension: String,
    pub cocktail_count: u64,
    pub avg_complexity: f64,
    pub avg_calories: f64,
    pub avg_prep_time: f64,
}

// ---------------------------------------------------------------------------
// Bookkeeping records
// ---------------------------------------------------------------------------

/// Per-partition summary written by the enrich stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingSummary {
    pub date_partition: DatePartition,
    pub processed_at: DateTime<Utc>,
    pub record_count: u64,
    pub total_ingredients: u64,
    pub avg_complexity: f64,
}

/// A record quarantined by a stage instead of failing the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetter {
    pub run_id: String,
    pub stage: Stage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_key: Option<String>,
    pub reason: String,
    pub payload: serde_json::Value,
}

/// Lifecycle state of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Success,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = MocktailverseError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "running" => Ok(Self::Running),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            other => Err(MocktailverseError::parse(format!("unknown run status '{other}'"))),
        }
    }
}

/// Persisted record of one pipeline execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: String,
    pub pipeline_id: String,
    pub date_partition: DatePartition,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Per-stage report, as JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_cocktail() -> Cocktail {
        Cocktail {
            id: "11000".into(),
            name: "Mojito".into(),
            category: "Cocktail".into(),
            glass: "Highball glass".into(),
            alcoholic_label: Some("Alcoholic".into()),
            instructions: "Muddle mint leaves with sugar and lime juice.".into(),
            ingredients: vec![Ingredient {
                name: "Light rum".into(),
                measure: Some("2 oz".into()),
                amount: 2.0,
            }],
            thumbnail_url: None,
            source_modified: None,
        }
    }

    #[test]
    fn stage_order_is_declared_order() {
        let names: Vec<&str> = Stage::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(names, ["extract", "transform", "enrich", "load", "model"]);
        assert_eq!(Stage::Extract.downstream(), Some(Stage::Transform));
        assert_eq!(Stage::Model.downstream(), None);
        assert!(Stage::Enrich < Stage::Load);
    }

    #[test]
    fn stage_parses_case_insensitively() {
        assert_eq!("Enrich".parse::<Stage>().unwrap(), Stage::Enrich);
        assert!("publish".parse::<Stage>().is_err());
    }

    #[test]
    fn run_id_roundtrip() {
        let id = RunId::new();
        let parsed: RunId = id.to_string().parse().expect("parse RunId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn partition_formats_and_parses() {
        let p: DatePartition = "2024/03/07".parse().unwrap();
        assert_eq!(p.to_string(), "2024/03/07");

        let iso: DatePartition = "2024-03-07".parse().unwrap();
        assert_eq!(iso, p);

        assert!("2024/13/01".parse::<DatePartition>().is_err());
        assert!("yesterday".parse::<DatePartition>().is_err());
    }

    #[test]
    fn partition_requires_zero_padding() {
        assert!("2024/6/1".parse::<DatePartition>().is_err());
        assert!("2024-6-01".parse::<DatePartition>().is_err());
        assert!("2024/06-01".parse::<DatePartition>().is_err());
        assert!("24/06/01".parse::<DatePartition>().is_err());
        assert_eq!(
            " 2024/06/01 ".parse::<DatePartition>().unwrap().to_string(),
            "2024/06/01"
        );
    }

    #[test]
    fn partition_serializes_as_string() {
        let p: DatePartition = "2025/01/31".parse().unwrap();
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "\"2025/01/31\"");
        let back: DatePartition = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn enriched_record_is_superset_of_standardized() {
        let base = sample_cocktail();
        let enriched = EnrichedCocktail {
            cocktail: base.clone(),
            enriched_at: Utc::now(),
            ingredient_count: 1,
            complexity_score: 0.5,
            instruction_word_count: 8,
            estimated_prep_time: 5,
            is_alcoholic: true,
            spirit_type: SpiritType::Rum,
            estimated_calories: 194,
            tags: vec!["rum".into()],
        };

        let base_json = serde_json::to_value(&base).unwrap();
        let enriched_json = serde_json::to_value(&enriched).unwrap();
        for (field, value) in base_json.as_object().unwrap() {
            assert_eq!(enriched_json.get(field), Some(value), "field {field} lost");
        }
        assert_eq!(enriched_json["spirit_type"], "rum");

        let back: EnrichedCocktail = serde_json::from_value(enriched_json).unwrap();
        assert_eq!(back.cocktail, base);
    }

    #[test]
    fn non_alcoholic_spirit_serialization() {
        let json = serde_json::to_string(&SpiritType::NonAlcoholic).unwrap();
        assert_eq!(json, "\"non-alcoholic\"");
        assert_eq!(SpiritType::NonAlcoholic.to_string(), "non-alcoholic");
    }

    #[test]
    fn model_view_parses() {
        assert_eq!("by_spirit".parse::<ModelView>().unwrap(), ModelView::BySpirit);
        assert!("by_glass".parse::<ModelView>().is_err());
    }
}
