//! # Programming Workflow
//!
//! Multi-agent pipelines that draft, review, and optimize source code by
//! sequencing chat-completion calls.
//!
//! ## Architecture
//!
//! ```text
//!   Basic (round robin)
//!   CodeWriter -> CodeReviewer -> CodeOptimizer -> CodeWriter -> ...
//!
//!   Advanced (graph)
//!                  ┌─> CodeReviewer ─────┐
//!   CodeWriter ────┤                     ├─> CodeOptimizer -> TestGenerator -> FinalValidator
//!                  └─> SecurityAnalyzer ─┘
//! ```
//!
//! ## Task Flow
//! 1. Validate the programming task and render it as the opening message
//! 2. Build the agents for the selected mode
//! 3. Run until a keyword is mentioned, the message cap is hit, or the graph
//!    is exhausted
//! 4. Optionally save the transcript and extracted code
//!
//! ## Modules
//! - `llm`: OpenAI-compatible chat-completion client with retries
//! - `task`: programming task record, language and complexity profiles
//! - `agents`: agent specs, prompts, message filters, the chat agent
//! - `workflow`: transcript, termination, round-robin and graph executors

pub mod agents;
pub mod config;
pub mod llm;
pub mod task;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use task::ProgrammingTask;
pub use workflow::{run_task, WorkflowMode, WorkflowOutcome};
