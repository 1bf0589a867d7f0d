//! Core types for the agent system.

use serde::{Deserialize, Serialize};

use crate::llm::TokenUsage;

/// The part an agent plays in a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    CodeWriter,
    CodeReviewer,
    SecurityAnalyzer,
    CodeOptimizer,
    TestGenerator,
    FinalValidator,
}

impl AgentRole {
    pub const ALL: [AgentRole; 6] = [
        AgentRole::CodeWriter,
        AgentRole::CodeReviewer,
        AgentRole::SecurityAnalyzer,
        AgentRole::CodeOptimizer,
        AgentRole::TestGenerator,
        AgentRole::FinalValidator,
    ];

    /// Speaker name used in transcripts.
    pub fn display_name(&self) -> &'static str {
        match self {
            AgentRole::CodeWriter => "CodeWriter",
            AgentRole::CodeReviewer => "CodeReviewer",
            AgentRole::SecurityAnalyzer => "SecurityAnalyzer",
            AgentRole::CodeOptimizer => "CodeOptimizer",
            AgentRole::TestGenerator => "TestGenerator",
            AgentRole::FinalValidator => "FinalValidator",
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Configuration bundle for one agent.
///
/// Built by [`AgentFactory`](super::AgentFactory) at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentSpec {
    pub name: String,
    pub role: AgentRole,
    pub description: String,
    pub system_prompt: String,
}

impl AgentSpec {
    pub fn new(
        role: AgentRole,
        description: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            name: role.display_name().to_string(),
            role,
            description: description.into(),
            system_prompt: system_prompt.into(),
        }
    }
}

/// One reply produced by an agent.
#[derive(Debug, Clone)]
pub struct AgentTurn {
    pub content: String,
    pub usage: Option<TokenUsage>,
    pub model: Option<String>,
}

impl AgentTurn {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: None,
            model: None,
        }
    }
}

/// Errors that can occur while an agent takes its turn.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AgentError {
    #[error("LLM error in {agent}: {message}")]
    Llm { agent: String, message: String },

    #[error("{0} was cancelled")]
    Cancelled(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_names_are_unique() {
        let mut names: Vec<_> = AgentRole::ALL.iter().map(|r| r.display_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), AgentRole::ALL.len());
    }

    #[test]
    fn test_role_serde_keys() {
        let json = serde_json::to_string(&AgentRole::SecurityAnalyzer).unwrap();
        assert_eq!(json, "\"security_analyzer\"");
        let role: AgentRole = serde_json::from_str("\"final_validator\"").unwrap();
        assert_eq!(role, AgentRole::FinalValidator);
    }

    #[test]
    fn test_spec_takes_role_name() {
        let spec = AgentSpec::new(AgentRole::TestGenerator, "tests", "write tests");
        assert_eq!(spec.name, "TestGenerator");
    }
}
