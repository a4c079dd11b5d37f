//! Core pipeline orchestration and domain logic for Mocktailverse.
//!
//! This crate ties the extract, transform and storage crates together into
//! the five-stage run (`run_pipeline`), and holds the enrichment rules, the
//! model views, retry policy and container health checking.

pub mod enrich;
pub mod health;
pub mod load;
pub mod model;
pub mod pipeline;
pub mod retry;
pub mod stage;

pub use pipeline::{
    ProgressReporter, RunOptions, RunReport, SilentProgress, TransformReport, run_pipeline,
};
pub use stage::{PipelineDefinition, default_definition, example_definition, find_definition};
