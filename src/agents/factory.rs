//! Agent factory - turns static prompt text into agent specs.

use std::collections::HashMap;

use super::prompts;
use super::types::{AgentRole, AgentSpec};
use crate::config::Config;
use crate::task::LanguageProfile;
use crate::workflow::WorkflowMode;

/// Produces [`AgentSpec`] records for a pipeline.
///
/// Prompt overrides from configuration replace the built-in system prompt of
/// a role in both pipeline variants.
#[derive(Debug, Clone, Default)]
pub struct AgentFactory {
    overrides: HashMap<AgentRole, String>,
}

impl AgentFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            overrides: config.prompt_overrides.clone(),
        }
    }

    pub fn with_override(mut self, role: AgentRole, prompt: impl Into<String>) -> Self {
        self.overrides.insert(role, prompt.into());
        self
    }

    /// The three round-robin participants, in speaking order.
    pub fn basic_team(&self) -> Vec<AgentSpec> {
        let python = LanguageProfile::lookup("python");
        [
            AgentRole::CodeWriter,
            AgentRole::CodeReviewer,
            AgentRole::CodeOptimizer,
        ]
        .into_iter()
        .filter_map(|role| self.spec_for(role, WorkflowMode::Basic, &python))
        .collect()
    }

    /// The six graph participants, in node declaration order.
    pub fn advanced_team(&self, language: &LanguageProfile) -> Vec<AgentSpec> {
        AgentRole::ALL
            .into_iter()
            .filter_map(|role| self.spec_for(role, WorkflowMode::Advanced, language))
            .collect()
    }

    /// Build the spec for one role.
    ///
    /// Returns `None` for roles that do not take part in `mode`.
    pub fn spec_for(
        &self,
        role: AgentRole,
        mode: WorkflowMode,
        language: &LanguageProfile,
    ) -> Option<AgentSpec> {
        let (description, template) = match (mode, role) {
            (WorkflowMode::Basic, AgentRole::CodeWriter) => (
                "Expert code writer producing high-quality code from requirements",
                prompts::BASIC_WRITER,
            ),
            (WorkflowMode::Basic, AgentRole::CodeReviewer) => (
                "Senior reviewer assessing code quality and suggesting improvements",
                prompts::BASIC_REVIEWER,
            ),
            (WorkflowMode::Basic, AgentRole::CodeOptimizer) => (
                "Optimization expert improving code according to the review",
                prompts::BASIC_OPTIMIZER,
            ),
            (WorkflowMode::Basic, _) => return None,
            (WorkflowMode::Advanced, AgentRole::CodeWriter) => {
                ("Expert code writer", prompts::ADVANCED_WRITER)
            }
            (WorkflowMode::Advanced, AgentRole::CodeReviewer) => {
                ("Senior code reviewer", prompts::ADVANCED_REVIEWER)
            }
            (WorkflowMode::Advanced, AgentRole::SecurityAnalyzer) => {
                ("Code security analyst", prompts::ADVANCED_SECURITY)
            }
            (WorkflowMode::Advanced, AgentRole::CodeOptimizer) => {
                ("Code optimization expert", prompts::ADVANCED_OPTIMIZER)
            }
            (WorkflowMode::Advanced, AgentRole::TestGenerator) => {
                ("Test generation expert", prompts::ADVANCED_TEST_GENERATOR)
            }
            (WorkflowMode::Advanced, AgentRole::FinalValidator) => {
                ("Final validation and summary expert", prompts::ADVANCED_VALIDATOR)
            }
        };

        let system_prompt = match self.overrides.get(&role) {
            Some(custom) => custom.clone(),
            None => fill_template(template, language),
        };
        Some(AgentSpec::new(role, description, system_prompt))
    }
}

fn fill_template(template: &str, language: &LanguageProfile) -> String {
    let security_tools = if language.security_tools.is_empty() {
        "the standard security scanners for the language".to_string()
    } else {
        language.security_tools.join(", ")
    };
    template
        .replace("{test_framework}", language.test_framework)
        .replace("{security_tools}", &security_tools)
}
