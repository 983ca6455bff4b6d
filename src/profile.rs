//! Profile context source: the text describing the represented user that is
//! injected into the generation instruction.
//!
//! The profile directory may contain:
//! - `summary.txt`: a free-form CV summary
//! - `linkedin.txt`: an exported LinkedIn profile (already converted to text)
//! - `profile.md`: anything else worth knowing

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::error::ProfileError;

/// Well-known profile file names, in prompt order.
pub mod paths {
    pub const SUMMARY: &str = "summary.txt";
    pub const LINKEDIN: &str = "linkedin.txt";
    pub const PROFILE: &str = "profile.md";
}

const PROFILE_FILES: &[(&str, &str)] = &[
    (paths::SUMMARY, "Profile Summary"),
    (paths::LINKEDIN, "LinkedIn Profile"),
    (paths::PROFILE, "Additional Notes"),
];

/// Opaque profile text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub text: String,
}

impl Profile {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Supplies the profile text for the generation instruction.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn load(&self) -> Result<Profile, ProfileError>;
}

/// Fixed profile text.
pub struct StaticProfile(pub String);

#[async_trait]
impl ProfileSource for StaticProfile {
    async fn load(&self) -> Result<Profile, ProfileError> {
        Ok(Profile {
            text: self.0.clone(),
        })
    }
}

/// Profile read from text files in a directory.
pub struct FileProfile {
    base_path: PathBuf,
}

impl FileProfile {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

#[async_trait]
impl ProfileSource for FileProfile {
    async fn load(&self) -> Result<Profile, ProfileError> {
        if !fs::try_exists(&self.base_path).await.unwrap_or(false) {
            tracing::warn!(
                dir = %self.base_path.display(),
                "Profile directory not found, continuing with an empty profile"
            );
            return Ok(Profile::default());
        }

        let mut parts = Vec::new();
        for &(file, heading) in PROFILE_FILES {
            let path = self.base_path.join(file);
            let content = match fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(source) => {
                    return Err(ProfileError::Read {
                        path: path.display().to_string(),
                        source,
                    });
                }
            };
            if !content.trim().is_empty() {
                parts.push(format!("## {heading}\n{}", content.trim()));
            }
        }

        let profile = Profile {
            text: parts.join("\n\n"),
        };
        tracing::info!(
            dir = %self.base_path.display(),
            files = parts.len(),
            chars = profile.text.chars().count(),
            "Profile loaded"
        );
        Ok(profile)
    }
}
