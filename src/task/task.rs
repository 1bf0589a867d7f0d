//! Core programming task record.
//!
//! # Invariants
//! - A task that passed `validate()` has a non-blank description, language,
//!   and at least one non-blank requirement.
//! - Tasks are never mutated after submission; builders consume `self`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::profile::{ComplexityProfile, LanguageProfile};
use crate::workflow::WorkflowMode;

/// Unique identifier for a submitted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How ambitious the requested code is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    #[default]
    Medium,
    High,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Low => "low",
            Complexity::Medium => "medium",
            Complexity::High => "high",
        }
    }

    pub fn profile(&self) -> ComplexityProfile {
        ComplexityProfile::for_level(*self)
    }
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Complexity {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" | "1" => Ok(Complexity::Low),
            "medium" | "2" => Ok(Complexity::Medium),
            "high" | "3" => Ok(Complexity::High),
            other => Err(TaskError::UnknownComplexity(other.to_string())),
        }
    }
}

fn default_language() -> String {
    "python".to_string()
}

/// A programming task submitted to a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgrammingTask {
    /// What to build
    description: String,

    /// Functional requirements, one per entry
    requirements: Vec<String>,

    /// Target programming language
    #[serde(default = "default_language")]
    language: String,

    /// Only rendered by the graph pipeline
    #[serde(default)]
    complexity: Complexity,

    #[serde(default)]
    security_requirements: Vec<String>,

    #[serde(default)]
    performance_requirements: Vec<String>,
}

impl ProgrammingTask {
    /// Create a task in the default language (`python`) at medium complexity.
    pub fn new<I, S>(description: impl Into<String>, requirements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            description: description.into(),
            requirements: requirements.into_iter().map(Into::into).collect(),
            language: default_language(),
            complexity: Complexity::default(),
            security_requirements: Vec::new(),
            performance_requirements: Vec::new(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_complexity(mut self, complexity: Complexity) -> Self {
        self.complexity = complexity;
        self
    }

    pub fn with_security_requirements<I, S>(mut self, reqs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.security_requirements = reqs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_performance_requirements<I, S>(mut self, reqs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.performance_requirements = reqs.into_iter().map(Into::into).collect();
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn requirements(&self) -> &[String] {
        &self.requirements
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn complexity(&self) -> Complexity {
        self.complexity
    }

    pub fn security_requirements(&self) -> &[String] {
        &self.security_requirements
    }

    pub fn performance_requirements(&self) -> &[String] {
        &self.performance_requirements
    }

    pub fn language_profile(&self) -> LanguageProfile {
        LanguageProfile::lookup(&self.language)
    }

    /// Parse a task record from YAML or JSON text.
    ///
    /// A record without a `language` key gets `default_language`.
    pub fn parse(raw: &str, default_language: &str) -> Result<Self, TaskError> {
        let mut value: serde_yaml::Value =
            serde_yaml::from_str(raw).map_err(|e| TaskError::Parse(e.to_string()))?;
        if let Some(map) = value.as_mapping_mut() {
            let key = serde_yaml::Value::from("language");
            if !map.contains_key(&key) {
                map.insert(key, serde_yaml::Value::from(default_language));
            }
        }
        serde_yaml::from_value(value).map_err(|e| TaskError::Parse(e.to_string()))
    }

    /// Check that every required field is populated.
    ///
    /// # Errors
    /// The first violated field, checked in declaration order.
    pub fn validate(&self) -> Result<(), TaskError> {
        if self.description.trim().is_empty() {
            return Err(TaskError::EmptyDescription);
        }
        if self.requirements.is_empty() {
            return Err(TaskError::NoRequirements);
        }
        if let Some(index) = self.requirements.iter().position(|r| r.trim().is_empty()) {
            return Err(TaskError::BlankRequirement { index });
        }
        if self.language.trim().is_empty() {
            return Err(TaskError::EmptyLanguage);
        }
        Ok(())
    }

    /// Render the opening task message for the given pipeline.
    pub fn render_prompt(&self, mode: WorkflowMode) -> String {
        match mode {
            WorkflowMode::Basic => self.render_basic(),
            WorkflowMode::Advanced => self.render_advanced(),
        }
    }

    fn render_basic(&self) -> String {
        format!(
            "Programming task: {}\n\n\
             Requirements:\n{}\n\n\
             Programming language: {}\n\n\
             Collaborate in this order:\n\
             1. CodeWriter: write the code for the requirements\n\
             2. CodeReviewer: review the code and suggest improvements\n\
             3. CodeOptimizer: optimize the code based on the review\n\n\
             Begin!",
            self.description,
            bullet_list(&self.requirements),
            self.language
        )
    }

    fn render_advanced(&self) -> String {
        let scope = self.complexity.profile();
        let mut prompt = format!(
            "Advanced programming task: {}\n\n\
             Core requirements:\n{}\n\n\
             Programming language: {}\n\
             Complexity level: {} (aim for at most {} functions and about {} lines)\n\
             Review depth: {} security analysis, {} performance tuning\n",
            self.description,
            bullet_list(&self.requirements),
            self.language,
            self.complexity,
            scope.max_functions,
            scope.max_lines,
            scope.security_focus,
            scope.performance_focus
        );

        if !self.security_requirements.is_empty() {
            prompt.push_str(&format!(
                "\nSecurity requirements:\n{}\n",
                bullet_list(&self.security_requirements)
            ));
        }
        if !self.performance_requirements.is_empty() {
            prompt.push_str(&format!(
                "\nPerformance requirements:\n{}\n",
                bullet_list(&self.performance_requirements)
            ));
        }

        prompt.push_str(
            "\nWork through the workflow stages together and keep the code correct, \
             secure, and maintainable.",
        );
        prompt
    }
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Errors raised while validating or parsing tasks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("Task description cannot be empty")]
    EmptyDescription,

    #[error("Task needs at least one requirement")]
    NoRequirements,

    #[error("Requirement {index} is blank")]
    BlankRequirement { index: usize },

    #[error("Task language cannot be empty")]
    EmptyLanguage,

    #[error("Unknown complexity level: {0} (expected low, medium or high)")]
    UnknownComplexity(String),

    #[error("Malformed task record: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProgrammingTask {
        ProgrammingTask::new(
            "Build an LRU cache",
            ["get and put in O(1)", "evict least recently used"],
        )
    }

    #[test]
    fn test_defaults() {
        let task = sample();
        assert_eq!(task.language(), "python");
        assert_eq!(task.complexity(), Complexity::Medium);
        assert!(task.security_requirements().is_empty());
        assert!(task.validate().is_ok());
    }

    #[test]
    fn test_validation_failures() {
        assert_eq!(
            ProgrammingTask::new("  ", ["x"]).validate(),
            Err(TaskError::EmptyDescription)
        );
        assert_eq!(
            ProgrammingTask::new("cache", Vec::<String>::new()).validate(),
            Err(TaskError::NoRequirements)
        );
        assert_eq!(
            ProgrammingTask::new("cache", ["ok", ""]).validate(),
            Err(TaskError::BlankRequirement { index: 1 })
        );
        assert_eq!(
            sample().with_language("").validate(),
            Err(TaskError::EmptyLanguage)
        );
    }

    #[test]
    fn test_complexity_parsing() {
        assert_eq!("HIGH".parse::<Complexity>().unwrap(), Complexity::High);
        assert_eq!("1".parse::<Complexity>().unwrap(), Complexity::Low);
        assert!(matches!(
            "extreme".parse::<Complexity>(),
            Err(TaskError::UnknownComplexity(_))
        ));
    }

    #[test]
    fn test_basic_prompt() {
        let prompt = sample().render_prompt(WorkflowMode::Basic);
        assert!(prompt.starts_with("Programming task: Build an LRU cache"));
        assert!(prompt.contains("- get and put in O(1)\n- evict least recently used"));
        assert!(prompt.contains("Programming language: python"));
        assert!(prompt.contains("3. CodeOptimizer"));
        assert!(!prompt.contains("Complexity level"));
    }

    #[test]
    fn test_advanced_prompt_sections() {
        let bare = sample().with_complexity(Complexity::High);
        let prompt = bare.render_prompt(WorkflowMode::Advanced);
        assert!(prompt.contains("Complexity level: high (aim for at most 30 functions"));
        assert!(prompt.contains("Review depth: advanced security analysis, advanced performance tuning"));
        assert!(!prompt.contains("Security requirements"));
        assert!(!prompt.contains("Performance requirements"));

        let full = bare
            .with_security_requirements(["prevent SQL injection"])
            .with_performance_requirements(["p99 under 200ms"]);
        let prompt = full.render_prompt(WorkflowMode::Advanced);
        assert!(prompt.contains("Security requirements:\n- prevent SQL injection"));
        assert!(prompt.contains("Performance requirements:\n- p99 under 200ms"));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let task: ProgrammingTask = serde_json::from_str(
            r#"{"description": "todo app", "requirements": ["add items"], "complexity": "low"}"#,
        )
        .unwrap();
        assert_eq!(task.language(), "python");
        assert_eq!(task.complexity(), Complexity::Low);
        assert!(task.performance_requirements().is_empty());
    }

    #[test]
    fn test_parse_yaml_and_json() {
        let yaml = "description: rate limiter\nrequirements:\n  - token bucket\nlanguage: Go\n";
        let task = ProgrammingTask::parse(yaml, "python").unwrap();
        assert_eq!(task.language(), "Go");
        assert_eq!(task.language_profile().file_extension, "go");

        let json = r#"{"description": "parser", "requirements": ["csv"]}"#;
        let task = ProgrammingTask::parse(json, "rust").unwrap();
        assert_eq!(task.language(), "rust");

        assert!(matches!(
            ProgrammingTask::parse("description: [", "python"),
            Err(TaskError::Parse(_))
        ));
        assert!(matches!(
            ProgrammingTask::parse("requirements: []", "python"),
            Err(TaskError::Parse(_))
        ));
    }
}
