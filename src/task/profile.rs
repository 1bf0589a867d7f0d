//! Static per-language and per-complexity hints fed into agent prompts.

use serde::Serialize;

use super::task::Complexity;

/// Tooling conventions for a target language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageProfile {
    /// Canonical lowercase name, or the trimmed input for unknown languages
    pub name: String,
    /// Other spellings accepted by `lookup` and in code fence tags
    pub aliases: &'static [&'static str],
    /// Extension used for extracted code files, without the dot
    pub file_extension: &'static str,
    pub test_framework: &'static str,
    pub linting_tools: &'static [&'static str],
    pub security_tools: &'static [&'static str],
}

struct KnownLanguage {
    name: &'static str,
    aliases: &'static [&'static str],
    file_extension: &'static str,
    test_framework: &'static str,
    linting_tools: &'static [&'static str],
    security_tools: &'static [&'static str],
}

const KNOWN_LANGUAGES: &[KnownLanguage] = &[
    KnownLanguage {
        name: "python",
        aliases: &["py", "python3"],
        file_extension: "py",
        test_framework: "pytest",
        linting_tools: &["flake8", "black", "isort"],
        security_tools: &["bandit", "safety"],
    },
    KnownLanguage {
        name: "javascript",
        aliases: &["js", "node", "nodejs"],
        file_extension: "js",
        test_framework: "jest",
        linting_tools: &["eslint", "prettier"],
        security_tools: &["npm audit", "snyk"],
    },
    KnownLanguage {
        name: "typescript",
        aliases: &["ts"],
        file_extension: "ts",
        test_framework: "jest",
        linting_tools: &["eslint", "prettier"],
        security_tools: &["npm audit", "snyk"],
    },
    KnownLanguage {
        name: "java",
        aliases: &[],
        file_extension: "java",
        test_framework: "junit",
        linting_tools: &["checkstyle", "spotbugs"],
        security_tools: &["spotbugs", "owasp"],
    },
    KnownLanguage {
        name: "go",
        aliases: &["golang"],
        file_extension: "go",
        test_framework: "testing",
        linting_tools: &["golint", "gofmt"],
        security_tools: &["gosec", "nancy"],
    },
    KnownLanguage {
        name: "rust",
        aliases: &["rs"],
        file_extension: "rs",
        test_framework: "cargo test",
        linting_tools: &["clippy", "rustfmt"],
        security_tools: &["cargo audit"],
    },
];

impl LanguageProfile {
    /// Case-insensitive lookup by name or alias; unknown languages get a
    /// generic profile.
    pub fn lookup(language: &str) -> Self {
        let wanted = language.trim().to_ascii_lowercase();
        match KNOWN_LANGUAGES
            .iter()
            .find(|l| l.name == wanted || l.aliases.contains(&wanted.as_str()))
        {
            Some(known) => Self {
                name: known.name.to_string(),
                aliases: known.aliases,
                file_extension: known.file_extension,
                test_framework: known.test_framework,
                linting_tools: known.linting_tools,
                security_tools: known.security_tools,
            },
            None => Self {
                name: wanted,
                aliases: &[],
                file_extension: "txt",
                test_framework: "the idiomatic test framework",
                linting_tools: &[],
                security_tools: &[],
            },
        }
    }

    pub fn is_known(&self) -> bool {
        self.file_extension != "txt"
    }

    /// Whether a code fence info string names this language.
    pub fn matches_tag(&self, tag: &str) -> bool {
        let tag = tag.trim().to_ascii_lowercase();
        tag == self.name || tag == self.file_extension || self.aliases.contains(&tag.as_str())
    }
}

/// Scope limits associated with a complexity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ComplexityProfile {
    pub max_functions: u32,
    pub max_lines: u32,
    pub security_focus: &'static str,
    pub performance_focus: &'static str,
}

impl ComplexityProfile {
    pub fn for_level(level: Complexity) -> Self {
        match level {
            Complexity::Low => Self {
                max_functions: 5,
                max_lines: 200,
                security_focus: "basic",
                performance_focus: "basic",
            },
            Complexity::Medium => Self {
                max_functions: 15,
                max_lines: 500,
                security_focus: "standard",
                performance_focus: "standard",
            },
            Complexity::High => Self {
                max_functions: 30,
                max_lines: 1000,
                security_focus: "advanced",
                performance_focus: "advanced",
            },
        }
    }
}
