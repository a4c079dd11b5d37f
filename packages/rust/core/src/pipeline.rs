//! End-to-end run: extract → transform → enrich → load → model.
//!
//! The sequencer validates the definition, records the run, executes the
//! stages strictly in order and closes the run row as `success` or `failed`
//! before returning.

use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use url::Url;

use mocktailverse_extract::{
    ApiClientOptions, CocktailApiClient, ExtractReport, LocalObjectStore, ObjectStore,
    RecordSource, keys, parse_records, read_json_records, write_json_records,
};
use mocktailverse_shared::{
    AppConfig, DatePartition, DeadLetter, MocktailverseError, PipelineRun, RawRecord, Result,
    RunId, RunStatus, Stage,
};
use mocktailverse_storage::Storage;

use crate::enrich::{self, EnrichEvent, EnrichResponse};
use crate::load::{self, LoadReport};
use crate::model::{self, ModelReport};
use crate::retry::{RetryPolicy, with_retry};
use crate::stage::PipelineDefinition;

const SAMPLE_COCKTAILS: &str = include_str!("../data/sample_cocktails.json");

/// What to run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub definition: PipelineDefinition,
    pub partition: DatePartition,
    /// Read raw records from this file instead of the definition's source.
    pub input: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransformReport {
    pub accepted: usize,
    pub rejected: usize,
    pub location: String,
}

/// Per-stage outcome of a run. Stages that did not run are `None`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub pipeline_id: String,
    pub partition: DatePartition,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extract: Option<ExtractReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<TransformReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrich: Option<EnrichResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load: Option<LoadReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelReport>,
    pub dead_letters: usize,
    pub elapsed_ms: u64,
}

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called when a stage starts.
    fn stage_started(&self, stage: Stage);
    /// Called when a stage finishes, with a one-line summary.
    fn stage_finished(&self, stage: Stage, detail: &str);
    /// Called once the run has been closed successfully.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn stage_started(&self, _stage: Stage) {}
    fn stage_finished(&self, _stage: Stage, _detail: &str) {}
    fn done(&self, _report: &RunReport) {}
}

/// Records bundled for the example pipeline.
pub fn sample_records() -> Result<Vec<RawRecord>> {
    parse_records(SAMPLE_COCKTAILS)
        .map_err(|e| MocktailverseError::parse(format!("bundled sample data: {e}")))
}

/// Resolve where raw records come from for this run.
pub fn build_source(config: &AppConfig, options: &RunOptions) -> Result<RecordSource> {
    if let Some(path) = &options.input {
        return Ok(RecordSource::File(path.clone()));
    }
    if options.definition.sample_data {
        return Ok(RecordSource::Inline(sample_records()?));
    }

    let base_url = Url::parse(&config.source.api_base_url).map_err(|e| {
        MocktailverseError::config(format!(
            "invalid source.api_base_url '{}': {e}",
            config.source.api_base_url
        ))
    })?;
    let client = CocktailApiClient::new(ApiClientOptions {
        base_url,
        letters: config.source.letters.chars().filter(|c| c.is_ascii_alphanumeric()).collect(),
        concurrency: config.effective_concurrency() as usize,
        timeout_secs: config.source.timeout_secs,
    })?;
    Ok(RecordSource::Api(client))
}

/// Run a pipeline end to end and persist its outcome.
#[instrument(skip_all, fields(pipeline = %options.definition.id, partition = %options.partition))]
pub async fn run_pipeline(
    config: &AppConfig,
    options: &RunOptions,
    progress: &dyn ProgressReporter,
) -> Result<RunReport> {
    options.definition.validate()?;

    let start = Instant::now();
    let source = build_source(config, options)?;
    let store = LocalObjectStore::open(config.object_store_root()?)?;
    let storage = Storage::open(&config.database_path()?).await?;
    let policy = RetryPolicy::from(&config.retry);

    let run_id = RunId::new().to_string();
    storage
        .insert_run(&PipelineRun {
            id: run_id.clone(),
            pipeline_id: options.definition.id.clone(),
            date_partition: options.partition,
            status: RunStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            stats: None,
            error: None,
        })
        .await?;

    info!(%run_id, source = %source.describe(), "starting pipeline run");

    let mut report = RunReport {
        run_id: run_id.clone(),
        pipeline_id: options.definition.id.clone(),
        partition: options.partition,
        status: RunStatus::Running,
        extract: None,
        transform: None,
        enrich: None,
        load: None,
        model: None,
        dead_letters: 0,
        elapsed_ms: 0,
    };

    let ctx = StageContext {
        config,
        source: &source,
        store: &store,
        storage: &storage,
        partition: &options.partition,
        run_id: &run_id,
        policy: &policy,
    };

    let outcome = execute_stages(&ctx, &options.definition, &mut report, progress).await;

    report.elapsed_ms = start.elapsed().as_millis() as u64;
    report.status = if outcome.is_ok() {
        RunStatus::Success
    } else {
        RunStatus::Failed
    };

    match close_run(&storage, &report, outcome).await {
        Ok(()) => {
            info!(
                %run_id,
                dead_letters = report.dead_letters,
                elapsed_ms = report.elapsed_ms,
                "pipeline run succeeded"
            );
            progress.done(&report);
            Ok(report)
        }
        Err(e) => {
            error!(%run_id, error = %e, "pipeline run failed");
            Err(e)
        }
    }
}

/// Persist the final status of a run. When both the stages and the close
/// fail, the stage error is returned and the close failure is only logged.
async fn close_run(storage: &Storage, report: &RunReport, outcome: Result<()>) -> Result<()> {
    let stats = serde_json::to_value(report).ok();
    let error_text = outcome.as_ref().err().map(|e| e.to_string());

    if let Err(close_err) = storage
        .finish_run(&report.run_id, report.status, stats.as_ref(), error_text.as_deref())
        .await
    {
        error!(
            run_id = %report.run_id,
            status = %report.status,
            stage_error = error_text.as_deref().unwrap_or("-"),
            error = %close_err,
            "failed to close run record"
        );
        outcome?;
        return Err(close_err);
    }

    outcome
}

/// Everything a stage needs, borrowed for the duration of a run.
struct StageContext<'a> {
    config: &'a AppConfig,
    source: &'a RecordSource,
    store: &'a dyn ObjectStore,
    storage: &'a Storage,
    partition: &'a DatePartition,
    run_id: &'a str,
    policy: &'a RetryPolicy,
}

async fn execute_stages(
    ctx: &StageContext<'_>,
    definition: &PipelineDefinition,
    report: &mut RunReport,
    progress: &dyn ProgressReporter,
) -> Result<()> {
    let raw_bucket = ctx.config.buckets.raw.as_str();
    let processed_bucket = ctx.config.buckets.processed.as_str();

    for &stage in &definition.stages {
        progress.stage_started(stage);
        info!(stage = %stage, "stage started");

        let detail = match stage {
            Stage::Extract => {
                let extracted = with_retry(ctx.policy, stage.as_str(), || {
                    mocktailverse_extract::extract(ctx.source, ctx.store, raw_bucket, ctx.partition)
                })
                .await
                .map_err(|e| e.in_stage(stage))?;
                let detail = format!("{} records -> {}", extracted.records, extracted.location);
                report.extract = Some(extracted);
                detail
            }
            Stage::Transform => {
                let transformed = with_retry(ctx.policy, stage.as_str(), || {
                    run_transform(ctx, raw_bucket, processed_bucket)
                })
                .await
                .map_err(|e| e.in_stage(stage))?;
                report.dead_letters += transformed.rejected;
                let detail = format!(
                    "{} accepted, {} quarantined",
                    transformed.accepted, transformed.rejected
                );
                report.transform = Some(transformed);
                detail
            }
            Stage::Enrich => {
                let event = EnrichEvent {
                    input_bucket: Some(processed_bucket.to_string()),
                    output_bucket: Some(processed_bucket.to_string()),
                    date_partition: Some(*ctx.partition),
                };
                let response = with_retry(ctx.policy, stage.as_str(), || {
                    enrich::handle(&event, processed_bucket, ctx.store, ctx.storage)
                })
                .await
                .map_err(|e| e.in_stage(stage))?;
                let detail = format!("{} records enriched", response.body.records_processed);
                report.enrich = Some(response);
                detail
            }
            Stage::Load => {
                let loaded = with_retry(ctx.policy, stage.as_str(), || {
                    load::load(ctx.store, processed_bucket, ctx.partition, ctx.storage, ctx.run_id)
                })
                .await
                .map_err(|e| e.in_stage(stage))?;
                let detail = format!("{} upserted, {} stored", loaded.records, loaded.total_stored);
                report.load = Some(loaded);
                detail
            }
            Stage::Model => {
                let modeled = with_retry(ctx.policy, stage.as_str(), || {
                    model::build_model(ctx.storage, ctx.store, processed_bucket, ctx.partition)
                })
                .await
                .map_err(|e| e.in_stage(stage))?;
                let detail = format!("{} cocktails across {} views", modeled.cocktails, modeled.views.len());
                report.model = Some(modeled);
                detail
            }
        };

        info!(stage = %stage, detail = %detail, "stage finished");
        progress.stage_finished(stage, &detail);
    }

    Ok(())
}

/// Standardize the landed raw batch, quarantining records that fail.
async fn run_transform(
    ctx: &StageContext<'_>,
    raw_bucket: &str,
    processed_bucket: &str,
) -> Result<TransformReport> {
    let raws: Vec<RawRecord> =
        read_json_records(ctx.store, raw_bucket, &keys::raw_key(ctx.partition))?;

    let output = mocktailverse_transform::transform_batch(&raws);

    let key = keys::transformed_key(ctx.partition);
    write_json_records(ctx.store, processed_bucket, &key, &output.records)?;

    for rejection in &output.rejected {
        warn!(
            record_key = rejection.record_key.as_deref().unwrap_or("-"),
            reason = %rejection.reason,
            "record quarantined"
        );
        ctx.storage
            .insert_dead_letter(&DeadLetter {
                run_id: ctx.run_id.to_string(),
                stage: Stage::Transform,
                record_key: rejection.record_key.clone(),
                reason: rejection.reason.clone(),
                payload: rejection.payload.clone(),
            })
            .await?;
    }

    Ok(TransformReport {
        accepted: output.records.len(),
        rejected: output.rejected.len(),
        location: ctx.store.location(processed_bucket, &key),
    })
}
