//! Workflow module - the two pipeline executors.
//!
//! # Pipelines
//! - **Basic**: [`RoundRobinTeam`] of writer, reviewer and optimizer
//! - **Advanced**: [`GraphFlow`] where the writer fans out to the reviewer and
//!   the security analyzer, both feed the optimizer, then tests, then final
//!   validation
//!
//! Both append to a single [`Transcript`] and stop on a
//! [`TerminationCondition`].

mod events;
mod graph;
mod outcome;
mod results;
mod round_robin;
mod termination;
mod transcript;

pub use events::WorkflowEvent;
pub use graph::{DiGraph, DiGraphBuilder, GraphError, GraphFlow};
pub use outcome::WorkflowOutcome;
pub use results::{
    extract_code_blocks, result_stem, save_outcome, CodeBlock, ResultsError, SavedResults,
};
pub use round_robin::RoundRobinTeam;
pub use termination::{StopReason, TerminationCondition};
pub use transcript::{Transcript, TranscriptEntry, USER_SPEAKER};

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::agents::{
    AgentContext, AgentError, AgentFactory, AgentRef, AgentRole, ChatAgent, MessageFilter,
};
use crate::config::Config;
use crate::task::{LanguageProfile, ProgrammingTask, TaskError};

/// Which pipeline variant to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowMode {
    Basic,
    Advanced,
}

impl WorkflowMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowMode::Basic => "basic",
            WorkflowMode::Advanced => "advanced",
        }
    }
}

impl std::fmt::Display for WorkflowMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WorkflowMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" | "linear" => Ok(WorkflowMode::Basic),
            "advanced" | "graph" => Ok(WorkflowMode::Advanced),
            other => Err(format!("unknown workflow mode: {}", other)),
        }
    }
}

/// Errors that end a pipeline run without an outcome.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Invalid task: {0}")]
    Task(#[from] TaskError),

    #[error("Invalid graph: {0}")]
    Graph(#[from] GraphError),

    #[error("Agent failed: {0}")]
    Agent(#[from] AgentError),

    #[error("Pipeline has no participants")]
    NoParticipants,
}

/// A runnable pipeline.
#[async_trait]
pub trait Pipeline: Send + Sync {
    fn mode(&self) -> WorkflowMode;

    /// Speaker names in declaration order.
    fn participants(&self) -> Vec<String>;

    /// Validate `task`, render it for this pipeline, and run to a stop.
    ///
    /// # Errors
    /// Task validation fails before any model call; agent failures other
    /// than cancellation abort the run.
    async fn run(
        &self,
        task: &ProgrammingTask,
        ctx: &AgentContext,
    ) -> Result<WorkflowOutcome, WorkflowError>;
}

fn prepare_task(task: &ProgrammingTask, mode: WorkflowMode) -> Result<String, WorkflowError> {
    task.validate()?;
    Ok(task.render_prompt(mode))
}

/// Build the pipeline for `mode` from configuration.
///
/// `language` only affects the advanced prompts (test framework, security
/// tools).
pub fn select_pipeline(
    mode: WorkflowMode,
    config: &Config,
    factory: &AgentFactory,
    language: &LanguageProfile,
) -> Result<Box<dyn Pipeline>, WorkflowError> {
    let settings = &config.workflow;
    match mode {
        WorkflowMode::Basic => {
            let agents = factory
                .basic_team()
                .into_iter()
                .map(|spec| Arc::new(ChatAgent::new(spec)) as AgentRef)
                .collect();
            let termination = TerminationCondition::from_limits(
                settings.basic_max_messages,
                &settings.basic_termination_keywords,
            );
            Ok(Box::new(RoundRobinTeam::new(agents, termination)?))
        }
        WorkflowMode::Advanced => {
            let builder = factory
                .advanced_team(language)
                .into_iter()
                .fold(DiGraphBuilder::new(), |builder, spec| {
                    let agent = match MessageFilter::for_role(spec.role) {
                        Some(filter) => ChatAgent::new(spec).with_filter(filter),
                        None => ChatAgent::new(spec),
                    };
                    builder.add_node(Arc::new(agent))
                });
            let graph = advanced_edges()
                .into_iter()
                .fold(builder, |builder, (from, to)| {
                    builder.add_edge(from.display_name(), to.display_name())
                })
                .build()?;
            let termination = TerminationCondition::from_limits(
                settings.advanced_max_messages,
                &settings.advanced_termination_keywords,
            );
            Ok(Box::new(
                GraphFlow::new(graph, termination).with_parallel(settings.enable_parallel_processing),
            ))
        }
    }
}

/// Edges of the advanced pipeline.
pub fn advanced_edges() -> [(AgentRole, AgentRole); 6] {
    use AgentRole::*;
    [
        (CodeWriter, CodeReviewer),
        (CodeWriter, SecurityAnalyzer),
        (CodeReviewer, CodeOptimizer),
        (SecurityAnalyzer, CodeOptimizer),
        (CodeOptimizer, TestGenerator),
        (TestGenerator, FinalValidator),
    ]
}

/// Build the pipeline for `mode` and run `task` through it.
pub async fn run_task(
    mode: WorkflowMode,
    task: &ProgrammingTask,
    ctx: &AgentContext,
) -> Result<WorkflowOutcome, WorkflowError> {
    let factory = AgentFactory::from_config(&ctx.config);
    let pipeline = select_pipeline(mode, &ctx.config, &factory, &task.language_profile())?;
    pipeline.run(task, ctx).await
}
