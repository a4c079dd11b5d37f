//! SQL migration definitions for the Mocktailverse database.
//!
//! Migrations are applied in order on database open. Each one is a batch of
//! statements that records its own version in `schema_migrations`.

pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Initial schema: cocktails, processing_summary, pipeline_runs, dead_letters",
            sql: r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Enriched cocktails, keyed by cocktail id (last write wins)
CREATE TABLE IF NOT EXISTS cocktails (
    id               TEXT PRIMARY KEY,
    name             TEXT NOT NULL,
    category         TEXT NOT NULL,
    spirit_type      TEXT NOT NULL,
    complexity_score REAL NOT NULL,
    item_json        TEXT NOT NULL,
    run_id           TEXT NOT NULL,
    stored_at        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cocktails_spirit ON cocktails(spirit_type);
CREATE INDEX IF NOT EXISTS idx_cocktails_category ON cocktails(category COLLATE NOCASE);

-- One summary per date partition
CREATE TABLE IF NOT EXISTS processing_summary (
    date_partition    TEXT PRIMARY KEY,
    processed_at      TEXT NOT NULL,
    record_count      INTEGER NOT NULL,
    total_ingredients INTEGER NOT NULL,
    avg_complexity    REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS pipeline_runs (
    id             TEXT PRIMARY KEY,
    pipeline_id    TEXT NOT NULL,
    date_partition TEXT NOT NULL,
    status         TEXT NOT NULL,
    started_at     TEXT NOT NULL,
    finished_at    TEXT,
    stats_json     TEXT,
    error          TEXT
);

CREATE INDEX IF NOT EXISTS idx_pipeline_runs_started ON pipeline_runs(started_at);

CREATE TABLE IF NOT EXISTS dead_letters (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id       TEXT NOT NULL REFERENCES pipeline_runs(id) ON DELETE CASCADE,
    stage        TEXT NOT NULL,
    record_key   TEXT,
    reason       TEXT NOT NULL,
    payload_json TEXT NOT NULL,
    created_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_dead_letters_run ON dead_letters(run_id);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
        },
        Migration {
            version: 2,
            description: "Model view rows",
            sql: r#"
CREATE TABLE IF NOT EXISTS model_rows (
    view           TEXT NOT NULL,
    dimension      TEXT NOT NULL,
    cocktail_count INTEGER NOT NULL,
    avg_complexity REAL NOT NULL,
    avg_calories   REAL NOT NULL,
    avg_prep_time  REAL NOT NULL,
    PRIMARY KEY (view, dimension)
);

INSERT INTO schema_migrations (version) VALUES (2);
"#,
        },
    ]
}
