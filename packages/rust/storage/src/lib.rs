//! libSQL storage layer (offline mode).
//!
//! The [`Storage`] struct wraps a local libSQL database that backs both the
//! key-value store the load stage writes to and the query engine the model
//! stage reads from. It also keeps run bookkeeping: pipeline runs, dead
//! letters and per-partition processing summaries.
//!
//! **Access rules:**
//! - pipeline runs: read-write via [`Storage::open`]
//! - inspection commands: read-only via [`Storage::open_readonly`]

mod migrations;

use std::path::Path;

use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};

use mocktailverse_shared::{
    DatePartition, DeadLetter, EnrichedCocktail, ModelRow, ModelView, MocktailverseError,
    PipelineRun, ProcessingSummary, Result, RunStatus, StoredCocktail,
};

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

fn db_err(e: libsql::Error) -> MocktailverseError {
    MocktailverseError::Storage(e.to_string())
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| MocktailverseError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(db_err)?;
        let conn = db.connect().map_err(db_err)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(MocktailverseError::not_found(format!(
                "database {} (run a pipeline first)",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(db_err)?;
        let conn = db.connect().map_err(db_err)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    MocktailverseError::Storage(format!(
                        "migration v{} failed: {e}",
                        migration.version
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Current schema version, or 0 if no migrations have been applied.
    pub async fn schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => match rows.next().await {
                Ok(Some(row)) => row.get::<u32>(0).unwrap_or(0),
                _ => 0,
            },
            // Table doesn't exist yet
            Err(_) => 0,
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(MocktailverseError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Cocktails (key-value store)
    // -----------------------------------------------------------------------

    /// Upsert a stored cocktail. The last write for a key wins.
    pub async fn put_cocktail(&self, stored: &StoredCocktail) -> Result<()> {
        self.check_writable()?;
        let item_json = serde_json::to_string(&stored.item)
            .map_err(|e| MocktailverseError::parse(format!("failed to serialize cocktail: {e}")))?;

        self.conn
            .execute(
                "INSERT INTO cocktails (id, name, category, spirit_type, complexity_score, item_json, run_id, stored_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO UPDATE SET
                   name = excluded.name,
                   category = excluded.category,
                   spirit_type = excluded.spirit_type,
                   complexity_score = excluded.complexity_score,
                   item_json = excluded.item_json,
                   run_id = excluded.run_id,
                   stored_at = excluded.stored_at",
                params![
                    stored.key.as_str(),
                    stored.item.cocktail.name.as_str(),
                    stored.item.cocktail.category.as_str(),
                    stored.item.spirit_type.as_str(),
                    stored.item.complexity_score,
                    item_json,
                    stored.run_id.as_str(),
                    stored.stored_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Point read by cocktail id.
    pub async fn get_cocktail(&self, id: &str) -> Result<Option<StoredCocktail>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, item_json, run_id, stored_at FROM cocktails WHERE id = ?1",
                params![id],
            )
            .await
            .map_err(db_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_stored(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(db_err(e)),
        }
    }

    /// All stored cocktails, ordered by name.
    pub async fn list_cocktails(&self) -> Result<Vec<StoredCocktail>> {
        self.query_cocktails(
            "SELECT id, item_json, run_id, stored_at FROM cocktails ORDER BY name, id",
            params![],
        )
        .await
    }

    /// Cocktails whose detected spirit matches (e.g. `rum`, `non-alcoholic`).
    pub async fn query_by_spirit(&self, spirit: &str) -> Result<Vec<StoredCocktail>> {
        self.query_cocktails(
            "SELECT id, item_json, run_id, stored_at FROM cocktails
             WHERE spirit_type = ?1 ORDER BY name, id",
            params![spirit.to_lowercase()],
        )
        .await
    }

    /// Cocktails in a category, case-insensitively.
    pub async fn query_by_category(&self, category: &str) -> Result<Vec<StoredCocktail>> {
        self.query_cocktails(
            "SELECT id, item_json, run_id, stored_at FROM cocktails
             WHERE category = ?1 COLLATE NOCASE ORDER BY name, id",
            params![category],
        )
        .await
    }

    pub async fn count_cocktails(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM cocktails", params![])
            .await
            .map_err(db_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(row.get::<i64>(0).map_err(db_err)? as u64),
            Ok(None) => Ok(0),
            Err(e) => Err(db_err(e)),
        }
    }

    async fn query_cocktails(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<StoredCocktail>> {
        let mut rows = self.conn.query(sql, params).await.map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(row_to_stored(&row)?);
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Processing summaries
    // -----------------------------------------------------------------------

    /// Upsert the summary for a date partition.
    pub async fn put_processing_summary(&self, summary: &ProcessingSummary) -> Result<()> {
        self.check_writable()?;
        self.conn
            .execute(
                "INSERT INTO processing_summary (date_partition, processed_at, record_count, total_ingredients, avg_complexity)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(date_partition) DO UPDATE SET
                   processed_at = excluded.processed_at,
                   record_count = excluded.record_count,
                   total_ingredients = excluded.total_ingredients,
                   avg_complexity = excluded.avg_complexity",
                params![
                    summary.date_partition.to_string(),
                    summary.processed_at.to_rfc3339(),
                    summary.record_count as i64,
                    summary.total_ingredients as i64,
                    summary.avg_complexity,
                ],
            )
            .await
            .map_err(db_err)?;
        Ok(())
    }

    pub async fn get_processing_summary(
        &self,
        partition: &DatePartition,
    ) -> Result<Option<ProcessingSummary>> {
        let mut rows = self
            .conn
            .query(
                "SELECT date_partition, processed_at, record_count, total_ingredients, avg_complexity
                 FROM processing_summary WHERE date_partition = ?1",
                params![partition.to_string()],
            )
            .await
            .map_err(db_err)?;

        let Some(row) = rows.next().await.map_err(db_err)? else {
            return Ok(None);
        };

        Ok(Some(ProcessingSummary {
            date_partition: parse_partition(&row.get::<String>(0).map_err(db_err)?)?,
            processed_at: parse_timestamp(&row.get::<String>(1).map_err(db_err)?)?,
            record_count: row.get::<i64>(2).map_err(db_err)? as u64,
            total_ingredients: row.get::<i64>(3).map_err(db_err)? as u64,
            avg_complexity: row.get::<f64>(4).map_err(db_err)?,
        }))
    }

    // -----------------------------------------------------------------------
    // Pipeline runs
    // -----------------------------------------------------------------------

    /// Record the start of a run.
    pub async fn insert_run(&self, run: &PipelineRun) -> Result<()> {
        self.check_writable()?;
        let stats_json = run.stats.as_ref().map(|s| s.to_string());
        self.conn
            .execute(
                "INSERT INTO pipeline_runs (id, pipeline_id, date_partition, status, started_at, finished_at, stats_json, error)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    run.id.as_str(),
                    run.pipeline_id.as_str(),
                    run.date_partition.to_string(),
                    run.status.as_str(),
                    run.started_at.to_rfc3339(),
                    run.finished_at.map(|t| t.to_rfc3339()),
                    stats_json,
                    run.error.as_deref(),
                ],
            )
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Close a run with its final status, stage report and error text.
    pub async fn finish_run(
        &self,
        run_id: &str,
        status: RunStatus,
        stats: Option<&serde_json::Value>,
        error: Option<&str>,
    ) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        let affected = self
            .conn
            .execute(
                "UPDATE pipeline_runs SET status = ?1, finished_at = ?2, stats_json = ?3, error = ?4
                 WHERE id = ?5",
                params![
                    status.as_str(),
                    now.as_str(),
                    stats.map(|s| s.to_string()),
                    error,
                    run_id
                ],
            )
            .await
            .map_err(db_err)?;

        if affected == 0 {
            return Err(MocktailverseError::not_found(format!("run {run_id}")));
        }
        Ok(())
    }

    pub async fn get_run(&self, run_id: &str) -> Result<Option<PipelineRun>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, pipeline_id, date_partition, status, started_at, finished_at, stats_json, error
                 FROM pipeline_runs WHERE id = ?1",
                params![run_id],
            )
            .await
            .map_err(db_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_run(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(db_err(e)),
        }
    }

    /// Most recent runs first.
    pub async fn list_runs(&self, limit: u32) -> Result<Vec<PipelineRun>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, pipeline_id, date_partition, status, started_at, finished_at, stats_json, error
                 FROM pipeline_runs ORDER BY started_at DESC, id DESC LIMIT ?1",
                params![limit],
            )
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(row_to_run(&row)?);
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Dead letters
    // -----------------------------------------------------------------------

    pub async fn insert_dead_letter(&self, letter: &DeadLetter) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO dead_letters (run_id, stage, record_key, reason, payload_json, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    letter.run_id.as_str(),
                    letter.stage.as_str(),
                    letter.record_key.as_deref(),
                    letter.reason.as_str(),
                    letter.payload.to_string(),
                    now.as_str(),
                ],
            )
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Dead letters of a run, in insertion order.
    pub async fn list_dead_letters(&self, run_id: &str) -> Result<Vec<DeadLetter>> {
        let mut rows = self
            .conn
            .query(
                "SELECT run_id, stage, record_key, reason, payload_json
                 FROM dead_letters WHERE run_id = ?1 ORDER BY id",
                params![run_id],
            )
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            let payload: String = row.get(4).map_err(db_err)?;
            results.push(DeadLetter {
                run_id: row.get(0).map_err(db_err)?,
                stage: row.get::<String>(1).map_err(db_err)?.parse()?,
                record_key: row.get::<String>(2).ok(),
                reason: row.get(3).map_err(db_err)?,
                payload: serde_json::from_str(&payload).map_err(|e| {
                    MocktailverseError::Storage(format!("corrupt dead letter payload: {e}"))
                })?,
            });
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Model views (query engine)
    // -----------------------------------------------------------------------

    /// Replace every model row in one transaction.
    pub async fn replace_model_rows(&self, model_rows: &[ModelRow]) -> Result<()> {
        self.check_writable()?;
        let tx = self.conn.transaction().await.map_err(db_err)?;

        tx.execute("DELETE FROM model_rows", params![])
            .await
            .map_err(db_err)?;

        for row in model_rows {
            tx.execute(
                "INSERT INTO model_rows (view, dimension, cocktail_count, avg_complexity, avg_calories, avg_prep_time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    row.view.as_str(),
                    row.dimension.as_str(),
                    row.cocktail_count as i64,
                    row.avg_complexity,
                    row.avg_calories,
                    row.avg_prep_time,
                ],
            )
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        tracing::debug!(rows = model_rows.len(), "model rows replaced");
        Ok(())
    }

    /// Rows of one view, largest groups first.
    pub async fn list_model_rows(&self, view: ModelView) -> Result<Vec<ModelRow>> {
        let mut rows = self
            .conn
            .query(
                "SELECT dimension, cocktail_count, avg_complexity, avg_calories, avg_prep_time
                 FROM model_rows WHERE view = ?1 ORDER BY cocktail_count DESC, dimension",
                params![view.as_str()],
            )
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(ModelRow {
                view,
                dimension: row.get(0).map_err(db_err)?,
                cocktail_count: row.get::<i64>(1).map_err(db_err)? as u64,
                avg_complexity: row.get(2).map_err(db_err)?,
                avg_calories: row.get(3).map_err(db_err)?,
                avg_prep_time: row.get(4).map_err(db_err)?,
            });
        }
        Ok(results)
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| MocktailverseError::Storage(format!("invalid date: {e}")))
}

fn parse_partition(s: &str) -> Result<DatePartition> {
    s.parse()
        .map_err(|e| MocktailverseError::Storage(format!("invalid partition '{s}': {e}")))
}

/// Row layout: `id, item_json, run_id, stored_at`.
fn row_to_stored(row: &libsql::Row) -> Result<StoredCocktail> {
    let item_json: String = row.get(1).map_err(db_err)?;
    let item: EnrichedCocktail = serde_json::from_str(&item_json)
        .map_err(|e| MocktailverseError::Storage(format!("corrupt cocktail item: {e}")))?;

    Ok(StoredCocktail {
        key: row.get(0).map_err(db_err)?,
        item,
        run_id: row.get(2).map_err(db_err)?,
        stored_at: parse_timestamp(&row.get::<String>(3).map_err(db_err)?)?,
    })
}

fn row_to_run(row: &libsql::Row) -> Result<PipelineRun> {
    let status: String = row.get(3).map_err(db_err)?;
    let stats = row.get::<String>(6).ok()
        .map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(|e| MocktailverseError::Storage(format!("corrupt run stats: {e}")))?;

    Ok(PipelineRun {
        id: row.get(0).map_err(db_err)?,
        pipeline_id: row.get(1).map_err(db_err)?,
        date_partition: parse_partition(&row.get::<String>(2).map_err(db_err)?)?,
        status: status.parse::<RunStatus>()?,
        started_at: parse_timestamp(&row.get::<String>(4).map_err(db_err)?)?,
        finished_at: row.get::<String>(5).ok()
            .map(|s| parse_timestamp(&s))
            .transpose()?,
        stats,
        error: row.get::<String>(7).ok(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mocktailverse_shared::{Cocktail, Ingredient, SpiritType, Stage};
    use uuid::Uuid;

    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("mv_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    fn stored(id: &str, name: &str, category: &str, spirit: SpiritType) -> StoredCocktail {
        StoredCocktail {
            key: id.into(),
            item: EnrichedCocktail {
                cocktail: Cocktail {
                    id: id.into(),
                    name: name.into(),
                    category: category.into(),
                    glass: "Highball glass".into(),
                    alcoholic_label: Some("Alcoholic".into()),
                    instructions: "Stir.".into(),
                    ingredients: vec![Ingredient {
                        name: "Light rum".into(),
                        measure: Some("2 oz".into()),
                        amount: 2.0,
                    }],
                    thumbnail_url: None,
                    source_modified: None,
                },
                enriched_at: Utc::now(),
                ingredient_count: 1,
                complexity_score: 0.5,
                instruction_word_count: 1,
                estimated_prep_time: 3,
                is_alcoholic: true,
                spirit_type: spirit,
                estimated_calories: 194,
                tags: vec!["cocktail".into()],
            },
            stored_at: Utc::now(),
            run_id: "run-1".into(),
        }
    }

    fn run(id: &str) -> PipelineRun {
        PipelineRun {
            id: id.into(),
            pipeline_id: "mocktailverse_etl_pipeline".into(),
            date_partition: "2024/06/01".parse().unwrap(),
            status: RunStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            stats: None,
            error: None,
        }
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        assert_eq!(storage.schema_version().await, 2);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("mv_test_{}.db", Uuid::now_v7()));
        let s1 = Storage::open(&tmp).await.expect("first open");
        drop(s1);
        let s2 = Storage::open(&tmp).await.expect("second open");
        assert_eq!(s2.schema_version().await, 2);
    }

    #[tokio::test]
    async fn cocktail_put_is_last_write_wins() {
        let storage = test_storage().await;

        storage
            .put_cocktail(&stored("11000", "Mojito", "Cocktail", SpiritType::Rum))
            .await
            .expect("first put");

        let mut second = stored("11000", "Mojito Royale", "Cocktail", SpiritType::Rum);
        second.run_id = "run-2".into();
        storage.put_cocktail(&second).await.expect("second put");

        assert_eq!(storage.count_cocktails().await.unwrap(), 1);
        let found = storage.get_cocktail("11000").await.unwrap().unwrap();
        assert_eq!(found.item.cocktail.name, "Mojito Royale");
        assert_eq!(found.run_id, "run-2");

        assert!(storage.get_cocktail("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cocktail_queries() {
        let storage = test_storage().await;
        for (id, name, category, spirit) in [
            ("1", "Mojito", "Cocktail", SpiritType::Rum),
            ("2", "Daiquiri", "Cocktail", SpiritType::Rum),
            ("3", "Martini", "Ordinary Drink", SpiritType::Gin),
            ("4", "Shirley Temple", "Soft Drink", SpiritType::NonAlcoholic),
        ] {
            storage
                .put_cocktail(&stored(id, name, category, spirit))
                .await
                .unwrap();
        }

        let all = storage.list_cocktails().await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].item.cocktail.name, "Daiquiri");

        let rum = storage.query_by_spirit("RUM").await.unwrap();
        assert_eq!(rum.len(), 2);

        let soft = storage.query_by_spirit("non-alcoholic").await.unwrap();
        assert_eq!(soft[0].key, "4");

        let cocktails = storage.query_by_category("cocktail").await.unwrap();
        assert_eq!(cocktails.len(), 2);
    }

    #[tokio::test]
    async fn processing_summary_upsert() {
        let storage = test_storage().await;
        let partition: DatePartition = "2024/06/01".parse().unwrap();

        let mut summary = ProcessingSummary {
            date_partition: partition,
            processed_at: Utc::now(),
            record_count: 3,
            total_ingredients: 12,
            avg_complexity: 2.5,
        };
        storage.put_processing_summary(&summary).await.unwrap();

        summary.record_count = 5;
        storage.put_processing_summary(&summary).await.unwrap();

        let found = storage
            .get_processing_summary(&partition)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.record_count, 5);
        assert_eq!(found.total_ingredients, 12);
        assert_eq!(found.date_partition, partition);
    }

    #[tokio::test]
    async fn run_lifecycle() {
        let storage = test_storage().await;
        storage.insert_run(&run("r1")).await.unwrap();

        let found = storage.get_run("r1").await.unwrap().unwrap();
        assert_eq!(found.status, RunStatus::Running);
        assert!(found.finished_at.is_none());

        let stats = serde_json::json!({"extract": {"records": 3}});
        storage
            .finish_run("r1", RunStatus::Success, Some(&stats), None)
            .await
            .unwrap();

        let found = storage.get_run("r1").await.unwrap().unwrap();
        assert_eq!(found.status, RunStatus::Success);
        assert!(found.finished_at.is_some());
        assert_eq!(found.stats.unwrap()["extract"]["records"], 3);

        let err = storage
            .finish_run("nope", RunStatus::Failed, None, Some("boom"))
            .await
            .unwrap_err();
        assert!(matches!(err, MocktailverseError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_runs_respects_limit() {
        let storage = test_storage().await;
        for id in ["a", "b", "c"] {
            storage.insert_run(&run(id)).await.unwrap();
        }
        assert_eq!(storage.list_runs(2).await.unwrap().len(), 2);
        assert_eq!(storage.list_runs(10).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn dead_letters_by_run() {
        let storage = test_storage().await;
        storage.insert_run(&run("r1")).await.unwrap();

        storage
            .insert_dead_letter(&DeadLetter {
                run_id: "r1".into(),
                stage: Stage::Transform,
                record_key: Some("42".into()),
                reason: "missing name".into(),
                payload: serde_json::json!({"idDrink": "42"}),
            })
            .await
            .unwrap();
        storage
            .insert_dead_letter(&DeadLetter {
                run_id: "r1".into(),
                stage: Stage::Transform,
                record_key: None,
                reason: "record is not a JSON object".into(),
                payload: serde_json::json!(7),
            })
            .await
            .unwrap();

        let letters = storage.list_dead_letters("r1").await.unwrap();
        assert_eq!(letters.len(), 2);
        assert_eq!(letters[0].stage, Stage::Transform);
        assert_eq!(letters[0].record_key.as_deref(), Some("42"));
        assert_eq!(letters[1].record_key, None);
        assert_eq!(letters[1].payload, serde_json::json!(7));

        assert!(storage.list_dead_letters("other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn model_rows_are_fully_replaced() {
        let storage = test_storage().await;
        let row = |view, dimension: &str, count| ModelRow {
            view,
            dimension: dimension.into(),
            cocktail_count: count,
            avg_complexity: 2.0,
            avg_calories: 150.0,
            avg_prep_time: 4.0,
        };

        storage
            .replace_model_rows(&[
                row(ModelView::BySpirit, "rum", 2),
                row(ModelView::BySpirit, "gin", 5),
                row(ModelView::ByCategory, "Cocktail", 7),
            ])
            .await
            .unwrap();

        let by_spirit = storage.list_model_rows(ModelView::BySpirit).await.unwrap();
        assert_eq!(by_spirit.len(), 2);
        assert_eq!(by_spirit[0].dimension, "gin");

        storage
            .replace_model_rows(&[row(ModelView::BySpirit, "vodka", 1)])
            .await
            .unwrap();

        let by_spirit = storage.list_model_rows(ModelView::BySpirit).await.unwrap();
        assert_eq!(by_spirit.len(), 1);
        assert_eq!(by_spirit[0].dimension, "vodka");
        assert!(
            storage
                .list_model_rows(ModelView::ByCategory)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn readonly_rejects_writes() {
        let tmp = std::env::temp_dir().join(format!("mv_test_{}.db", Uuid::now_v7()));
        let rw = Storage::open(&tmp).await.unwrap();
        rw.insert_run(&run("r1")).await.unwrap();
        drop(rw);

        let ro = Storage::open_readonly(&tmp).await.unwrap();
        assert!(ro.get_run("r1").await.unwrap().is_some());

        let result = ro.insert_run(&run("r2")).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("read-only"));
    }

    #[tokio::test]
    async fn readonly_requires_existing_database() {
        let tmp = std::env::temp_dir().join(format!("mv_test_{}.db", Uuid::now_v7()));
        let err = Storage::open_readonly(&tmp).await.err().expect("missing db");
        assert!(matches!(err, MocktailverseError::NotFound(_)));
    }
}
