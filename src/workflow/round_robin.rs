//! Linear pipeline: participants speak in a fixed cycle.

use async_trait::async_trait;

use super::outcome::{RunRecorder, WorkflowOutcome};
use super::termination::{StopReason, TerminationCondition};
use super::{prepare_task, Pipeline, WorkflowError, WorkflowMode};
use crate::agents::{AgentContext, AgentError, AgentRef};
use crate::task::{ProgrammingTask, TaskId};

/// Round-robin team.
///
/// # Invariants
/// - Speakers follow participant order strictly, wrapping around
/// - Every participant sees the full transcript
/// - The termination condition is checked after every appended message,
///   the task message included
pub struct RoundRobinTeam {
    participants: Vec<AgentRef>,
    termination: TerminationCondition,
}

impl RoundRobinTeam {
    pub fn new(
        participants: Vec<AgentRef>,
        termination: TerminationCondition,
    ) -> Result<Self, WorkflowError> {
        if participants.is_empty() {
            return Err(WorkflowError::NoParticipants);
        }
        Ok(Self {
            participants,
            termination,
        })
    }

    /// Run the team on an already rendered task message.
    pub async fn run_message(
        &self,
        task_id: TaskId,
        task_message: String,
        ctx: &AgentContext,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        let mut recorder = RunRecorder::start(
            task_id,
            WorkflowMode::Basic,
            task_message,
            self.participant_names(),
            ctx,
        );

        if let Some(reason) = self.termination.check(recorder.transcript()) {
            return Ok(recorder.finish(reason));
        }

        for agent in self.participants.iter().cycle() {
            if ctx.is_cancelled() {
                return Ok(recorder.finish(StopReason::Cancelled));
            }

            let turn = match agent.respond(recorder.transcript(), ctx).await {
                Ok(turn) => turn,
                Err(AgentError::Cancelled(_)) => {
                    return Ok(recorder.finish(StopReason::Cancelled));
                }
                Err(e) => {
                    tracing::error!("{} failed: {}", agent.name(), e);
                    return Err(WorkflowError::Agent(e));
                }
            };

            if let Some(reason) = recorder.record(agent.name(), turn, &self.termination) {
                return Ok(recorder.finish(reason));
            }
        }

        // `participants` is non-empty, so the cycle above never ends on its own.
        Err(WorkflowError::NoParticipants)
    }

    fn participant_names(&self) -> Vec<String> {
        self.participants.iter().map(|a| a.name().to_string()).collect()
    }
}

#[async_trait]
impl Pipeline for RoundRobinTeam {
    fn mode(&self) -> WorkflowMode {
        WorkflowMode::Basic
    }

    fn participants(&self) -> Vec<String> {
        self.participant_names()
    }

    async fn run(
        &self,
        task: &ProgrammingTask,
        ctx: &AgentContext,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        let message = prepare_task(task, WorkflowMode::Basic)?;
        self.run_message(TaskId::new(), message, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{AgentFactory, ChatAgent};
    use crate::task::TaskError;
    use crate::testing::{test_context, ScriptedClient};
    use std::sync::Arc;

    fn team(termination: TerminationCondition) -> RoundRobinTeam {
        let agents: Vec<AgentRef> = AgentFactory::new()
            .basic_team()
            .into_iter()
            .map(|spec| Arc::new(ChatAgent::new(spec)) as AgentRef)
            .collect();
        RoundRobinTeam::new(agents, termination).unwrap()
    }

    fn task() -> ProgrammingTask {
        ProgrammingTask::new("A stack", ["push", "pop"])
    }

    #[test]
    fn test_rejects_empty_team() {
        let result = RoundRobinTeam::new(Vec::new(), TerminationCondition::max_messages(5));
        assert!(matches!(result, Err(WorkflowError::NoParticipants)));
    }

    #[tokio::test]
    async fn test_cycles_in_strict_order_until_cap() {
        let ctx = test_context(Arc::new(ScriptedClient::new(Vec::<String>::new())));
        let outcome = team(TerminationCondition::max_messages(8))
            .run(&task(), &ctx)
            .await
            .unwrap();

        assert_eq!(outcome.stop_reason, StopReason::MaxMessages { limit: 8 });
        assert_eq!(outcome.message_count(), 8);
        assert_eq!(
            outcome.transcript.speakers(),
            [
                "CodeWriter",
                "CodeReviewer",
                "CodeOptimizer",
                "CodeWriter",
                "CodeReviewer",
                "CodeOptimizer",
                "CodeWriter",
            ]
        );
        assert_eq!(outcome.usage.total_tokens, 7 * 15);
    }

    #[tokio::test]
    async fn test_stops_on_keyword() {
        let client = Arc::new(ScriptedClient::new([
            "def push(): ...",
            "Looks fine. APPROVE",
            "Tidied. OPTIMIZATION_COMPLETE",
            "never sent",
        ]));
        let ctx = test_context(client.clone());
        let termination = TerminationCondition::from_limits(15, &["OPTIMIZATION_COMPLETE".to_string()]);
        let outcome = team(termination).run(&task(), &ctx).await.unwrap();

        assert_eq!(outcome.message_count(), 4);
        assert_eq!(
            outcome.stop_reason,
            StopReason::TextMention {
                keyword: "OPTIMIZATION_COMPLETE".to_string(),
                speaker: "CodeOptimizer".to_string(),
            }
        );
        assert_eq!(client.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_each_speaker_sees_full_transcript() {
        let client = Arc::new(ScriptedClient::new(Vec::<String>::new()));
        let ctx = test_context(client.clone());
        team(TerminationCondition::max_messages(4))
            .run(&task(), &ctx)
            .await
            .unwrap();

        let sizes: Vec<usize> = client.calls().iter().map(|c| c.len()).collect();
        // system prompt + every message so far
        assert_eq!(sizes, [2, 3, 4]);
    }

    #[tokio::test]
    async fn test_invalid_task_never_calls_model() {
        let client = Arc::new(ScriptedClient::new(Vec::<String>::new()));
        let ctx = test_context(client.clone());
        let err = team(TerminationCondition::max_messages(4))
            .run(&ProgrammingTask::new("  ", ["x"]), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Task(TaskError::EmptyDescription)));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_agent_failure_aborts() {
        let ctx = test_context(Arc::new(ScriptedClient::failing("boom")));
        let err = team(TerminationCondition::max_messages(4))
            .run(&task(), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Agent(AgentError::Llm { .. })));
    }

    #[tokio::test]
    async fn test_cancelled_run_keeps_partial_transcript() {
        let ctx = test_context(Arc::new(ScriptedClient::new(Vec::<String>::new())));
        ctx.cancel_token.cancel();
        let outcome = team(TerminationCondition::max_messages(10))
            .run(&task(), &ctx)
            .await
            .unwrap();
        assert!(outcome.was_cancelled());
        assert_eq!(outcome.message_count(), 1);
    }
}
