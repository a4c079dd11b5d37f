//! Pipeline definitions: which stages run, in which order, and what each
//! stage is allowed to touch.

use serde::Serialize;

use mocktailverse_shared::{
    AppConfig, EXAMPLE_PIPELINE_ID, MocktailverseError, PIPELINE_ID, Result, Stage,
};

/// A registered pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineDefinition {
    pub id: String,
    pub description: String,
    /// Schedule expression (informational; runs are triggered explicitly).
    pub schedule: String,
    pub stages: Vec<Stage>,
    /// Runs on the bundled sample records instead of the configured source.
    pub sample_data: bool,
}

impl PipelineDefinition {
    /// Reject definitions that do not run the five stages once each, in order.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(MocktailverseError::validation("pipeline id must not be empty"));
        }

        if self.stages.as_slice() != Stage::ALL.as_slice() {
            let got: Vec<&str> = self.stages.iter().map(Stage::as_str).collect();
            return Err(MocktailverseError::validation(format!(
                "pipeline '{}' must run extract -> transform -> enrich -> load -> model exactly once each, got [{}]",
                self.id,
                got.join(", ")
            )));
        }

        Ok(())
    }
}

/// The production ETL pipeline.
pub fn default_definition(config: &AppConfig) -> PipelineDefinition {
    PipelineDefinition {
        id: PIPELINE_ID.to_string(),
        description: "Extract cocktails from the API, standardize, enrich, load and model them"
            .to_string(),
        schedule: config.scheduler.schedule.clone(),
        stages: Stage::ALL.to_vec(),
        sample_data: false,
    }
}

/// A demonstration pipeline over bundled sample data.
pub fn example_definition() -> PipelineDefinition {
    PipelineDefinition {
        id: EXAMPLE_PIPELINE_ID.to_string(),
        description: "Run the full pipeline over a small bundled sample".to_string(),
        schedule: "None".to_string(),
        stages: Stage::ALL.to_vec(),
        sample_data: true,
    }
}

/// Every pipeline visible under `config`.
pub fn registered_definitions(config: &AppConfig) -> Vec<PipelineDefinition> {
    let mut defs = vec![default_definition(config)];
    if config.scheduler.load_examples {
        defs.push(example_definition());
    }
    defs
}

/// Look up a registered pipeline by id.
pub fn find_definition(config: &AppConfig, id: &str) -> Result<PipelineDefinition> {
    registered_definitions(config)
        .into_iter()
        .find(|d| d.id == id)
        .ok_or_else(|| MocktailverseError::not_found(format!("pipeline '{id}'")))
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// A backend a stage talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Service {
    ObjectStore,
    KeyValue,
    Function,
    Job,
    Query,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ObjectStore => "object_store",
            Self::KeyValue => "key_value",
            Self::Function => "function",
            Self::Job => "job",
            Self::Query => "query",
        }
    }
}

/// Actions a stage needs on one service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capability {
    pub service: Service,
    pub actions: &'static [&'static str],
}

const OBJECT_STORE_RW: Capability = Capability {
    service: Service::ObjectStore,
    actions: &["read", "write", "list"],
};

const KEY_VALUE_RW: Capability = Capability {
    service: Service::KeyValue,
    actions: &["get", "put", "query"],
};

/// Least-privilege capability set of a stage.
pub fn capabilities(stage: Stage) -> Vec<Capability> {
    match stage {
        Stage::Extract => vec![OBJECT_STORE_RW],
        Stage::Transform => vec![
            OBJECT_STORE_RW,
            Capability {
                service: Service::Job,
                actions: &["start"],
            },
        ],
        Stage::Enrich => vec![
            OBJECT_STORE_RW,
            KEY_VALUE_RW,
            Capability {
                service: Service::Function,
                actions: &["invoke"],
            },
        ],
        Stage::Load => vec![KEY_VALUE_RW],
        Stage::Model => vec![
            OBJECT_STORE_RW,
            KEY_VALUE_RW,
            Capability {
                service: Service::Query,
                actions: &["start"],
            },
        ],
    }
}
