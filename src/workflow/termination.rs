//! Stop conditions evaluated after every appended message.

use serde::{Deserialize, Serialize};

use super::transcript::{Transcript, USER_SPEAKER};

/// Why a pipeline stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StopReason {
    /// An agent mentioned a termination keyword
    TextMention { keyword: String, speaker: String },
    /// The transcript reached the message cap
    MaxMessages { limit: usize },
    /// Every graph node has spoken
    GraphExhausted,
    /// The run's cancellation token fired
    Cancelled,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::TextMention { keyword, speaker } => {
                write!(f, "{} said {}", speaker, keyword)
            }
            StopReason::MaxMessages { limit } => write!(f, "reached {} messages", limit),
            StopReason::GraphExhausted => f.write_str("all stages finished"),
            StopReason::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// A composable stop condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationCondition {
    /// Stop once the transcript holds this many messages, task included.
    MaxMessages(usize),
    /// Stop when the newest agent message contains this text.
    TextMention(String),
    /// Stop when any inner condition fires.
    Any(Vec<TerminationCondition>),
}

impl TerminationCondition {
    pub fn max_messages(limit: usize) -> Self {
        Self::MaxMessages(limit)
    }

    pub fn text_mention(keyword: impl Into<String>) -> Self {
        Self::TextMention(keyword.into())
    }

    /// Fire when either `self` or `other` fires.
    pub fn or(self, other: TerminationCondition) -> Self {
        let mut all = match self {
            Self::Any(inner) => inner,
            single => vec![single],
        };
        match other {
            Self::Any(inner) => all.extend(inner),
            single => all.push(single),
        }
        Self::Any(all)
    }

    /// Keyword mentions or a message cap, whichever comes first.
    pub fn from_limits(max_messages: usize, keywords: &[String]) -> Self {
        keywords
            .iter()
            .filter(|k| !k.trim().is_empty())
            .fold(Self::max_messages(max_messages), |cond, keyword| {
                cond.or(Self::text_mention(keyword.clone()))
            })
    }

    /// Check the transcript after its newest message was appended.
    pub fn check(&self, transcript: &Transcript) -> Option<StopReason> {
        match self {
            Self::MaxMessages(limit) => {
                (transcript.len() >= *limit).then_some(StopReason::MaxMessages { limit: *limit })
            }
            Self::TextMention(keyword) => {
                let newest = transcript.last()?;
                (newest.speaker != USER_SPEAKER && newest.content.contains(keyword.as_str())).then(
                    || StopReason::TextMention {
                        keyword: keyword.clone(),
                        speaker: newest.speaker.clone(),
                    },
                )
            }
            Self::Any(conditions) => conditions.iter().find_map(|c| c.check(transcript)),
        }
    }
}
