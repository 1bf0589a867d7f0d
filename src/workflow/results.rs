//! Persisting outcomes to the results directory.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use super::outcome::WorkflowOutcome;
use crate::agents::AgentRole;
use crate::task::LanguageProfile;

const CODE_FENCE_PATTERN: &str = r"(?s)```([A-Za-z0-9_+#.-]*)[ \t]*\r?\n(.*?)```";

static CODE_FENCE: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum ResultsError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize outcome: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid code fence pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// A fenced code block found in a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Info string after the opening fence, if any
    pub language: Option<String>,
    pub code: String,
}

/// Files written by [`save_outcome`].
#[derive(Debug, Clone, Default)]
pub struct SavedResults {
    pub outcome_path: PathBuf,
    pub code_files: Vec<PathBuf>,
}

/// Extract every fenced code block from `text`, in order.
pub fn extract_code_blocks(text: &str) -> Result<Vec<CodeBlock>, ResultsError> {
    Ok(code_fence()?
        .captures_iter(text)
        .map(|cap| CodeBlock {
            language: cap
                .get(1)
                .map(|m| m.as_str().to_ascii_lowercase())
                .filter(|l| !l.is_empty()),
            code: cap
                .get(2)
                .map(|m| m.as_str().trim_end().to_string())
                .unwrap_or_default(),
        })
        .collect())
}

/// Compiled once per process.
fn code_fence() -> Result<&'static Regex, ResultsError> {
    CODE_FENCE
        .get_or_init(|| Regex::new(CODE_FENCE_PATTERN))
        .as_ref()
        .map_err(|e| ResultsError::Pattern(e.clone()))
}

/// File stem shared by everything saved for one outcome.
pub fn result_stem(outcome: &WorkflowOutcome) -> String {
    let id = outcome.task_id.to_string();
    format!(
        "{}_{}_{}",
        outcome.started_at.format("%Y%m%d_%H%M%S"),
        outcome.mode,
        &id[..8]
    )
}

/// Write the outcome as JSON under `dir`.
///
/// With `extract_code`, the code blocks of the final optimized message (or the
/// writer's last draft if no optimizer spoke) and of the generated tests are
/// also written to files named with the language's extension.
pub async fn save_outcome(
    outcome: &WorkflowOutcome,
    language: &LanguageProfile,
    dir: &Path,
    extract_code: bool,
) -> Result<SavedResults, ResultsError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| ResultsError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

    let stem = result_stem(outcome);
    let outcome_path = dir.join(format!("{}.json", stem));
    let payload = serde_json::to_string_pretty(outcome)?;
    write_file(&outcome_path, payload).await?;
    tracing::info!("Saved outcome to {}", outcome_path.display());

    let mut saved = SavedResults {
        outcome_path,
        code_files: Vec::new(),
    };
    if !extract_code {
        return Ok(saved);
    }

    let solution = outcome
        .last_message_from(AgentRole::CodeOptimizer)
        .or_else(|| outcome.last_message_from(AgentRole::CodeWriter));
    let tests = outcome.last_message_from(AgentRole::TestGenerator);

    for (suffix, message) in [("solution", solution), ("tests", tests)] {
        let Some(message) = message else { continue };
        let code = join_blocks(&extract_code_blocks(message)?, language);
        if code.is_empty() {
            tracing::debug!("No code blocks found for {}", suffix);
            continue;
        }
        let path = dir.join(format!("{}_{}.{}", stem, suffix, language.file_extension));
        write_file(&path, code).await?;
        tracing::info!("Saved {} code to {}", suffix, path.display());
        saved.code_files.push(path);
    }

    Ok(saved)
}

/// Blocks tagged with another language are skipped; untagged blocks are kept.
fn join_blocks(blocks: &[CodeBlock], language: &LanguageProfile) -> String {
    let mut code = blocks
        .iter()
        .filter(|b| match &b.language {
            None => true,
            Some(tag) => !language.is_known() || language.matches_tag(tag),
        })
        .map(|b| b.code.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    if !code.is_empty() {
        code.push('\n');
    }
    code
}

async fn write_file(path: &Path, contents: String) -> Result<(), ResultsError> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|source| ResultsError::Io {
            path: path.to_path_buf(),
            source,
        })
}
