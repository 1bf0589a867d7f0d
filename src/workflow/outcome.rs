//! Final record of a pipeline run, and the bookkeeping that builds it.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::events::WorkflowEvent;
use super::termination::{StopReason, TerminationCondition};
use super::transcript::Transcript;
use super::WorkflowMode;
use crate::agents::{AgentContext, AgentRole, AgentTurn};
use crate::llm::TokenUsage;
use crate::task::TaskId;

/// Result of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowOutcome {
    pub task_id: TaskId,
    pub mode: WorkflowMode,
    pub model: String,
    pub transcript: Transcript,
    pub stop_reason: StopReason,
    /// Summed over every agent turn that reported usage
    pub usage: TokenUsage,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl WorkflowOutcome {
    /// Number of messages, task message included.
    pub fn message_count(&self) -> usize {
        self.transcript.len()
    }

    /// The newest message an agent role produced.
    pub fn last_message_from(&self, role: AgentRole) -> Option<&str> {
        self.transcript
            .last_from(role.display_name())
            .map(|e| e.content.as_str())
    }

    pub fn was_cancelled(&self) -> bool {
        self.stop_reason == StopReason::Cancelled
    }
}

/// Appends agent turns to a transcript, publishes events, and sums usage.
pub(crate) struct RunRecorder<'a> {
    task_id: TaskId,
    mode: WorkflowMode,
    ctx: &'a AgentContext,
    transcript: Transcript,
    usage: TokenUsage,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl<'a> RunRecorder<'a> {
    pub(crate) fn start(
        task_id: TaskId,
        mode: WorkflowMode,
        task_message: String,
        participants: Vec<String>,
        ctx: &'a AgentContext,
    ) -> Self {
        tracing::info!(
            "Starting {} workflow {} with {}",
            mode,
            task_id,
            participants.join(", ")
        );
        ctx.emit(WorkflowEvent::Started {
            task_id,
            mode,
            participants,
        });

        let recorder = Self {
            task_id,
            mode,
            ctx,
            transcript: Transcript::new(task_message),
            usage: TokenUsage::default(),
            started_at: Utc::now(),
            started: Instant::now(),
        };
        recorder.emit_last();
        recorder
    }

    pub(crate) fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Append one turn and report whether `termination` now fires.
    pub(crate) fn record(
        &mut self,
        speaker: &str,
        turn: AgentTurn,
        termination: &TerminationCondition,
    ) -> Option<StopReason> {
        if let Some(usage) = &turn.usage {
            self.usage = self.usage.add(usage);
        }
        self.transcript.push(speaker, turn.content);
        tracing::debug!(
            "Message {} from {} recorded for {}",
            self.transcript.len() - 1,
            speaker,
            self.task_id
        );
        self.emit_last();
        termination.check(&self.transcript)
    }

    pub(crate) fn finish(self, stop_reason: StopReason) -> WorkflowOutcome {
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        tracing::info!(
            "Workflow {} stopped after {} messages ({}) in {}ms, {} tokens",
            self.task_id,
            self.transcript.len(),
            stop_reason,
            elapsed_ms,
            self.usage.total_tokens
        );
        self.ctx.emit(WorkflowEvent::Finished {
            task_id: self.task_id,
            stop_reason: stop_reason.clone(),
            message_count: self.transcript.len(),
        });

        WorkflowOutcome {
            task_id: self.task_id,
            mode: self.mode,
            model: self.ctx.config.default_model.clone(),
            transcript: self.transcript,
            stop_reason,
            usage: self.usage,
            started_at: self.started_at,
            elapsed_ms,
        }
    }

    fn emit_last(&self) {
        if let Some(entry) = self.transcript.last() {
            self.ctx.emit(WorkflowEvent::Message {
                task_id: self.task_id,
                index: self.transcript.len() - 1,
                speaker: entry.speaker.clone(),
                content: entry.content.clone(),
            });
        }
    }
}
