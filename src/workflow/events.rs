//! Progress events broadcast while a pipeline runs.

use serde::{Deserialize, Serialize};

use super::termination::StopReason;
use super::WorkflowMode;
use crate::task::TaskId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    Started {
        task_id: TaskId,
        mode: WorkflowMode,
        participants: Vec<String>,
    },
    /// A message was appended; `index` is its position in the transcript.
    Message {
        task_id: TaskId,
        index: usize,
        speaker: String,
        content: String,
    },
    Finished {
        task_id: TaskId,
        stop_reason: StopReason,
        message_count: usize,
    },
}

impl WorkflowEvent {
    pub fn task_id(&self) -> TaskId {
        match self {
            WorkflowEvent::Started { task_id, .. }
            | WorkflowEvent::Message { task_id, .. }
            | WorkflowEvent::Finished { task_id, .. } => *task_id,
        }
    }
}
