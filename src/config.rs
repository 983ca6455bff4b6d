//! Configuration types.
//!
//! Every config is built from environment variables through a lookup
//! function, so tests can supply a map instead of mutating the process env.

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;

/// Default score at or above which a draft is approved.
pub const DEFAULT_APPROVAL_THRESHOLD: f64 = 7.0;

/// Default cap on revision passes.
pub const DEFAULT_MAX_REVISIONS: u32 = 3;

/// Default cap on consecutive generate→dispatch rounds within one pass.
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 8;

/// Default minimum length (in characters) for a draft to count as substantive.
pub const DEFAULT_MIN_DRAFT_CHARS: usize = 50;

/// Capability whose arguments carry the authoritative final reply.
pub const DEFAULT_FINAL_ANSWER_TOOL: &str = "notify_response_approved";

/// Argument of the final-answer capability holding the reply text.
pub const DEFAULT_FINAL_ANSWER_ARG: &str = "response_text";

/// Phrases that mark a draft as commentary about tool calls rather than a reply.
/// Matched case-insensitively as substrings.
pub const DEFAULT_META_PHRASES: &[&str] = &[
    "I have successfully sent",
    "I've sent the",
    "I've successfully",
    "successfully sent",
    "notification has been",
    "If there are any further",
    "please let me know",
];

type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn parse_var<T: FromStr>(lookup: Lookup<'_>, key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("'{raw}': {e}"),
                })
        }
        _ => Ok(default),
    }
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// How the final draft is picked out of the transcript.
#[derive(Debug, Clone)]
pub struct SelectionConfig {
    /// Capability whose argument is taken verbatim as the reply.
    pub final_answer_tool: String,
    /// Argument name carrying the reply text.
    pub final_answer_arg: String,
    /// Drafts must be strictly longer than this (in characters) to be substantive.
    pub min_draft_chars: usize,
    /// Meta-commentary phrases; a draft containing any of them is skipped.
    pub meta_phrases: Vec<String>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            final_answer_tool: DEFAULT_FINAL_ANSWER_TOOL.to_string(),
            final_answer_arg: DEFAULT_FINAL_ANSWER_ARG.to_string(),
            min_draft_chars: DEFAULT_MIN_DRAFT_CHARS,
            meta_phrases: DEFAULT_META_PHRASES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl SelectionConfig {
    fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let meta_phrases = match lookup("CAREER_META_PHRASES") {
            Some(raw) if !raw.trim().is_empty() => raw
                .split('|')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            _ => defaults.meta_phrases,
        };
        Ok(Self {
            min_draft_chars: parse_var(lookup, "CAREER_MIN_DRAFT_CHARS", defaults.min_draft_chars)?,
            meta_phrases,
            ..defaults
        })
    }
}

/// Orchestration loop configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Scores at or above this value are approvable. Must lie in [1, 10].
    pub approval_threshold: f64,
    /// Absolute cap on `revision_count`.
    pub max_revisions: u32,
    /// Cap on consecutive tool-dispatch rounds before a draft is produced.
    pub max_tool_rounds: usize,
    /// Name of the person the assistant answers for.
    pub candidate_name: String,
    pub selection: SelectionConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            approval_threshold: DEFAULT_APPROVAL_THRESHOLD,
            max_revisions: DEFAULT_MAX_REVISIONS,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            candidate_name: "the candidate".to_string(),
            selection: SelectionConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            approval_threshold: parse_var(
                lookup,
                "CAREER_APPROVAL_THRESHOLD",
                defaults.approval_threshold,
            )?,
            max_revisions: parse_var(lookup, "CAREER_MAX_REVISIONS", defaults.max_revisions)?,
            max_tool_rounds: parse_var(lookup, "CAREER_MAX_TOOL_ROUNDS", defaults.max_tool_rounds)?,
            candidate_name: lookup("CAREER_CANDIDATE_NAME")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.candidate_name),
            selection: SelectionConfig::from_lookup(lookup)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1.0..=10.0).contains(&self.approval_threshold) {
            return Err(ConfigError::InvalidValue {
                key: "CAREER_APPROVAL_THRESHOLD".to_string(),
                message: format!("{} is outside [1, 10]", self.approval_threshold),
            });
        }
        if self.max_tool_rounds == 0 {
            return Err(ConfigError::InvalidValue {
                key: "CAREER_MAX_TOOL_ROUNDS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// SMTP notification settings.
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub from_address: String,
    pub password: secrecy::SecretString,
    pub to_address: String,
    pub smtp_host: String,
    pub smtp_port: u16,
}

impl NotifyConfig {
    /// Build config from environment variables.
    /// Returns `None` unless `EMAIL_ADDRESS`, `EMAIL_PASSWORD` and
    /// `NOTIFICATION_EMAIL` are all set (notifications go to the log instead).
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Option<Self>, ConfigError> {
        let present = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());
        let (Some(from_address), Some(password), Some(to_address)) = (
            present("EMAIL_ADDRESS"),
            present("EMAIL_PASSWORD"),
            present("NOTIFICATION_EMAIL"),
        ) else {
            return Ok(None);
        };

        Ok(Some(Self {
            from_address,
            password: secrecy::SecretString::from(password),
            to_address,
            smtp_host: present("SMTP_SERVER").unwrap_or_else(|| "smtp.gmail.com".to_string()),
            smtp_port: parse_var(lookup, "SMTP_PORT", 587)?,
        }))
    }
}

/// Filesystem locations used by the binary.
#[derive(Debug, Clone)]
pub struct PathsConfig {
    pub profile_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl PathsConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: Lookup<'_>) -> Self {
        Self {
            profile_dir: lookup("CAREER_PROFILE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./me")),
            log_dir: lookup("CAREER_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./logs")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_env_empty() {
        let config = OrchestratorConfig::from_lookup(&lookup_from(&[])).unwrap();
        assert_eq!(config.approval_threshold, 7.0);
        assert_eq!(config.max_revisions, 3);
        assert_eq!(config.max_tool_rounds, DEFAULT_MAX_TOOL_ROUNDS);
        assert_eq!(config.selection.min_draft_chars, 50);
        assert_eq!(config.selection.meta_phrases.len(), DEFAULT_META_PHRASES.len());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = OrchestratorConfig::from_lookup(&lookup_from(&[
            ("CAREER_APPROVAL_THRESHOLD", "8.5"),
            ("CAREER_MAX_REVISIONS", "1"),
            ("CAREER_CANDIDATE_NAME", "Ada Lovelace"),
            ("CAREER_META_PHRASES", "sent it | done that |"),
        ]))
        .unwrap();
        assert_eq!(config.approval_threshold, 8.5);
        assert_eq!(config.max_revisions, 1);
        assert_eq!(config.candidate_name, "Ada Lovelace");
        assert_eq!(config.selection.meta_phrases, vec!["sent it", "done that"]);
    }

    #[test]
    fn invalid_number_is_an_error() {
        let err = OrchestratorConfig::from_lookup(&lookup_from(&[("CAREER_MAX_REVISIONS", "three")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "CAREER_MAX_REVISIONS"));
    }

    #[test]
    fn threshold_out_of_range_is_rejected() {
        let err =
            OrchestratorConfig::from_lookup(&lookup_from(&[("CAREER_APPROVAL_THRESHOLD", "11")]))
                .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn notify_config_requires_all_credentials() {
        let partial = NotifyConfig::from_lookup(&lookup_from(&[
            ("EMAIL_ADDRESS", "bot@example.com"),
            ("EMAIL_PASSWORD", "pw"),
        ]))
        .unwrap();
        assert!(partial.is_none());

        let full = NotifyConfig::from_lookup(&lookup_from(&[
            ("EMAIL_ADDRESS", "bot@example.com"),
            ("EMAIL_PASSWORD", "pw"),
            ("NOTIFICATION_EMAIL", "me@example.com"),
            ("SMTP_PORT", "2525"),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(full.smtp_host, "smtp.gmail.com");
        assert_eq!(full.smtp_port, 2525);
    }

    #[test]
    fn paths_default() {
        let paths = PathsConfig::from_lookup(&lookup_from(&[]));
        assert_eq!(paths.profile_dir, PathBuf::from("./me"));
        assert_eq!(paths.log_dir, PathBuf::from("./logs"));
    }
}
