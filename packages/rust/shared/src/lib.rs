//! Shared types, error model, and configuration for Mocktailverse.
//!
//! This crate is the foundation depended on by all other Mocktailverse crates.
//! It provides:
//! - [`MocktailverseError`]: the unified error type
//! - Record types for every stage boundary ([`RawRecord`], [`Cocktail`],
//!   [`EnrichedCocktail`], [`StoredCocktail`], [`ModelRow`])
//! - Configuration ([`AppConfig`], config loading, credential lookup)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BucketsConfig, CloudConfig, CloudCredentials, DefaultsConfig, ExecutorMode,
    RetryConfig, SchedulerConfig, ServerConfig, SourceConfig, config_dir, config_file_path,
    expand_home, init_config, load_config, load_config_from, resolve_region, validate_credentials,
};
pub use error::{MocktailverseError, Result};
pub use types::{
    Cocktail, DatePartition, DeadLetter, EXAMPLE_PIPELINE_ID, EnrichedCocktail, Ingredient,
    ModelRow, ModelView, PIPELINE_ID, PipelineRun, ProcessingSummary, RawRecord, RunId,
    RunStatus, SpiritType, Stage, StoredCocktail,
};
