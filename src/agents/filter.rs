//! Per-source transcript filters.
//!
//! A filter narrows what an agent sees to a few messages per speaker, so late
//! pipeline stages are not flooded with every intermediate draft.

use serde::{Deserialize, Serialize};

use super::types::AgentRole;
use crate::workflow::{TranscriptEntry, USER_SPEAKER};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    First,
    Last,
}

/// Keep `count` messages from `source`, taken from the start or the end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRule {
    pub source: String,
    pub position: Position,
    pub count: usize,
}

impl SourceRule {
    pub fn first(source: impl Into<String>, count: usize) -> Self {
        Self {
            source: source.into(),
            position: Position::First,
            count,
        }
    }

    pub fn last(source: impl Into<String>, count: usize) -> Self {
        Self {
            source: source.into(),
            position: Position::Last,
            count,
        }
    }
}

/// A set of per-source rules.
///
/// Messages from speakers no rule names are dropped. The selection keeps
/// transcript order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageFilter {
    rules: Vec<SourceRule>,
}

impl MessageFilter {
    pub fn new(rules: Vec<SourceRule>) -> Self {
        Self { rules }
    }

    /// The default graph-pipeline filter for a role, if it has one.
    pub fn for_role(role: AgentRole) -> Option<Self> {
        match role {
            AgentRole::CodeOptimizer => Some(Self::new(vec![
                SourceRule::first(AgentRole::CodeWriter.display_name(), 1),
                SourceRule::last(AgentRole::CodeReviewer.display_name(), 1),
                SourceRule::last(AgentRole::SecurityAnalyzer.display_name(), 1),
            ])),
            AgentRole::FinalValidator => Some(Self::new(vec![
                SourceRule::first(USER_SPEAKER, 1),
                SourceRule::last(AgentRole::CodeOptimizer.display_name(), 1),
                SourceRule::last(AgentRole::TestGenerator.display_name(), 1),
            ])),
            _ => None,
        }
    }

    pub fn apply<'a>(&self, entries: &'a [TranscriptEntry]) -> Vec<&'a TranscriptEntry> {
        let mut keep = vec![false; entries.len()];

        for rule in &self.rules {
            let indices: Vec<usize> = entries
                .iter()
                .enumerate()
                .filter(|(_, e)| e.speaker == rule.source)
                .map(|(i, _)| i)
                .collect();
            let selected = match rule.position {
                Position::First => &indices[..rule.count.min(indices.len())],
                Position::Last => &indices[indices.len().saturating_sub(rule.count)..],
            };
            for &i in selected {
                keep[i] = true;
            }
        }

        entries
            .iter()
            .zip(keep)
            .filter_map(|(entry, kept)| kept.then_some(entry))
            .collect()
    }
}
