//! Task module - the programming task submitted to a pipeline.
//!
//! Tasks are plain records: built once, validated before dispatch, then only
//! read. Language and complexity profiles add static hints to prompts.

pub mod task;
mod demo;
mod profile;

pub use demo::{demo_task, demo_tasks, DemoTask};
pub use profile::{ComplexityProfile, LanguageProfile};
pub use task::{Complexity, ProgrammingTask, TaskError, TaskId};
