//! Transform stage: cleanse and standardize raw cocktail records.
//!
//! Two raw shapes are understood:
//! - the flat API shape (`idDrink`, `strDrink`, `strIngredient1..15`, ...)
//! - a nested shape (`id`, `name`, `ingredients: [{name, amount, measure}]`)
//!
//! Records that cannot be standardized are returned as [`Rejection`]s for
//! quarantine instead of failing the batch.

mod cleanup;
mod measure;

use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use mocktailverse_shared::{Cocktail, Ingredient, RawRecord};

pub use measure::parse_measure;

/// Number of ingredient slots in the flat API shape.
const MAX_INGREDIENT_SLOTS: usize = 15;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A raw record that could not be standardized.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    /// Record id, when one could be read.
    pub record_key: Option<String>,
    pub reason: String,
    /// The original payload, untouched.
    pub payload: Value,
}

/// Result of transforming a batch.
#[derive(Debug, Clone, Default)]
pub struct TransformOutput {
    pub records: Vec<Cocktail>,
    pub rejected: Vec<Rejection>,
}

// ---------------------------------------------------------------------------
// Standardization
// ---------------------------------------------------------------------------

/// Standardize a single raw record.
pub fn standardize(raw: &RawRecord) -> Result<Cocktail, Rejection> {
    let Value::Object(obj) = &raw.0 else {
        return Err(reject(None, "record is not a JSON object", raw));
    };

    let flat = obj.contains_key("idDrink") || obj.contains_key("strDrink");
    let field = |flat_name: &str, nested_name: &str| {
        cleanup::text(obj.get(if flat { flat_name } else { nested_name }))
    };

    let id = field("idDrink", "id");
    let Some(id) = id else {
        return Err(reject(None, "missing id", raw));
    };

    let Some(name) = field("strDrink", "name") else {
        return Err(reject(Some(id), "missing name", raw));
    };

    let ingredients = if flat {
        flat_ingredients(obj)
    } else {
        nested_ingredients(obj)
    };
    if ingredients.is_empty() {
        return Err(reject(Some(id), "no ingredients", raw));
    }

    let instructions_key = if flat { "strInstructions" } else { "instructions" };

    Ok(Cocktail {
        id,
        name,
        category: field("strCategory", "category").unwrap_or_default(),
        glass: field("strGlass", "glass").unwrap_or_default(),
        alcoholic_label: field("strAlcoholic", "alcoholic_label"),
        instructions: cleanup::instructions(obj.get(instructions_key)),
        ingredients,
        thumbnail_url: field("strDrinkThumb", "thumbnail_url"),
        source_modified: field("dateModified", "source_modified"),
    })
}

/// `strIngredientN` / `strMeasureN` pairs; empty slots are skipped.
fn flat_ingredients(obj: &Map<String, Value>) -> Vec<Ingredient> {
    (1..=MAX_INGREDIENT_SLOTS)
        .filter_map(|i| {
            let name = cleanup::text(obj.get(&format!("strIngredient{i}")))?;
            let measure = cleanup::text(obj.get(&format!("strMeasure{i}")));
            let amount = measure.as_deref().map(parse_measure).unwrap_or(0.0);
            Some(Ingredient {
                name,
                measure,
                amount,
            })
        })
        .collect()
}

/// Reads `ingredients: [{name, amount?, measure?}]`. Plain strings are accepted as names.
fn nested_ingredients(obj: &Map<String, Value>) -> Vec<Ingredient> {
    let Some(Value::Array(items)) = obj.get("ingredients") else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::String(_) => Some(Ingredient {
                name: cleanup::text(Some(item))?,
                measure: None,
                amount: 0.0,
            }),
            Value::Object(ing) => {
                let name = cleanup::text(ing.get("name"))?;
                let measure = cleanup::text(ing.get("measure"));
                let amount = match ing.get("amount") {
                    Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
                    Some(Value::String(s)) => s
                        .trim()
                        .parse::<f64>()
                        .unwrap_or_else(|_| parse_measure(s)),
                    _ => measure.as_deref().map(parse_measure).unwrap_or(0.0),
                };
                Some(Ingredient {
                    name,
                    measure,
                    amount: amount.max(0.0),
                })
            }
            _ => None,
        })
        .collect()
}

fn reject(record_key: Option<String>, reason: &str, raw: &RawRecord) -> Rejection {
    Rejection {
        record_key,
        reason: reason.to_string(),
        payload: raw.0.clone(),
    }
}

/// Standardize a batch, splitting it into accepted records and rejections.
#[instrument(skip_all, fields(records = raws.len()))]
pub fn transform_batch(raws: &[RawRecord]) -> TransformOutput {
    let mut output = TransformOutput::default();

    for raw in raws {
        match standardize(raw) {
            Ok(cocktail) => output.records.push(cocktail),
            Err(rejection) => {
                debug!(
                    record_key = rejection.record_key.as_deref().unwrap_or("-"),
                    reason = %rejection.reason,
                    "record rejected"
                );
                output.rejected.push(rejection);
            }
        }
    }

    info!(
        accepted = output.records.len(),
        rejected = output.rejected.len(),
        "transform complete"
    );

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn flat_mojito() -> RawRecord {
        RawRecord(json!({
            "idDrink": "11000",
            "strDrink": "Mojito",
            "strCategory": "Cocktail",
            "strAlcoholic": "Alcoholic",
            "strGlass": "Highball glass",
            "strInstructions": "Muddle mint leaves with sugar and lime juice.\r\nAdd a splash of soda water.",
            "strDrinkThumb": "https://example.com/mojito.jpg",
            "strIngredient1": "Light rum",
            "strIngredient2": "Lime",
            "strIngredient3": "Sugar",
            "strIngredient4": "Mint",
            "strIngredient5": "Soda water",
            "strIngredient6": null,
            "strIngredient7": "",
            "strMeasure1": "2-3 oz ",
            "strMeasure2": "Juice of 1 ",
            "strMeasure3": "2 tsp ",
            "strMeasure4": "2-4 ",
            "strMeasure5": null,
            "dateModified": "2016-11-04 09:17:09"
        }))
    }

    #[test]
    fn standardizes_flat_api_record() {
        let c = standardize(&flat_mojito()).expect("standardize");

        assert_eq!(c.id, "11000");
        assert_eq!(c.name, "Mojito");
        assert_eq!(c.glass, "Highball glass");
        assert_eq!(c.alcoholic_label.as_deref(), Some("Alcoholic"));
        assert_eq!(
            c.instructions,
            "Muddle mint leaves with sugar and lime juice. Add a splash of soda water."
        );
        assert_eq!(c.ingredients.len(), 5);
        assert_eq!(c.ingredients[0].name, "Light rum");
        assert_eq!(c.ingredients[0].measure.as_deref(), Some("2-3 oz"));
        assert_eq!(c.ingredients[0].amount, 2.0);
        assert_eq!(c.ingredients[1].amount, 0.0);
        assert_eq!(c.ingredients[4].measure, None);
        assert_eq!(c.source_modified.as_deref(), Some("2016-11-04 09:17:09"));
    }

    #[test]
    fn standardizes_nested_record() {
        let raw = RawRecord(json!({
            "id": 42,
            "name": "  Daiquiri ",
            "category": "Cocktail",
            "glass": "Coupe",
            "instructions": "Shake with ice. Strain.",
            "ingredients": [
                {"name": "White rum", "amount": 2},
                {"name": "Lime juice", "amount": "0.75"},
                {"name": "Simple syrup", "measure": "1/2 oz"},
                "Ice",
                {"amount": 1}
            ]
        }));

        let c = standardize(&raw).expect("standardize");
        assert_eq!(c.id, "42");
        assert_eq!(c.name, "Daiquiri");
        assert_eq!(c.ingredients.len(), 4);
        assert_eq!(c.ingredients[0].amount, 2.0);
        assert_eq!(c.ingredients[1].amount, 0.75);
        assert_eq!(c.ingredients[2].amount, 0.5);
        assert_eq!(c.ingredients[3].name, "Ice");
        assert_eq!(c.alcoholic_label, None);
    }

    #[test]
    fn rejects_malformed_records() {
        let not_object = standardize(&RawRecord(json!(["x"]))).unwrap_err();
        assert_eq!(not_object.reason, "record is not a JSON object");

        let no_id = standardize(&RawRecord(json!({"strDrink": "Ghost"}))).unwrap_err();
        assert_eq!(no_id.reason, "missing id");
        assert_eq!(no_id.record_key, None);

        let no_name = standardize(&RawRecord(json!({"idDrink": "7", "strDrink": " "}))).unwrap_err();
        assert_eq!(no_name.reason, "missing name");
        assert_eq!(no_name.record_key.as_deref(), Some("7"));

        let no_ingredients =
            standardize(&RawRecord(json!({"idDrink": "8", "strDrink": "Water"}))).unwrap_err();
        assert_eq!(no_ingredients.reason, "no ingredients");
        assert_eq!(no_ingredients.payload["strDrink"], "Water");
    }

    #[test]
    fn batch_splits_accepted_and_rejected() {
        let raws = vec![flat_mojito(), RawRecord(json!(null)), flat_mojito()];
        let out = transform_batch(&raws);
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.rejected.len(), 1);
    }
}
