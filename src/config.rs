//! Configuration management

use anyhow::Result;
use std::path::PathBuf;

/// Directory under the project root that holds all engine state.
pub const ENGINE_DIR: &str = ".skill-engine";

/// Default whole-script execution budget in seconds.
pub const DEFAULT_SCRIPT_TIMEOUT_SECS: u64 = 300;

/// Default per-command execution budget in seconds.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 60;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Project root the engine operates in; storage lives underneath it
    pub project_root: PathBuf,

    /// Budget for a whole script invocation, in seconds
    pub script_timeout_secs: u64,

    /// Budget for each command of a command-sequence skill, in seconds
    pub command_timeout_secs: u64,
}

impl EngineConfig {
    /// Configuration for the given project root with default timeouts
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            script_timeout_secs: DEFAULT_SCRIPT_TIMEOUT_SECS,
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let project_root = std::env::var("SKILL_ENGINE_ROOT")
            .map(|raw| PathBuf::from(shellexpand::tilde(&raw).into_owned()))
            .unwrap_or_else(|_| PathBuf::from("."));

        let script_timeout_secs = std::env::var("SKILL_ENGINE_SCRIPT_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_SCRIPT_TIMEOUT_SECS);

        let command_timeout_secs = std::env::var("SKILL_ENGINE_COMMAND_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_COMMAND_TIMEOUT_SECS);

        Ok(Self {
            project_root,
            script_timeout_secs,
            command_timeout_secs,
        })
    }

    /// Where approved skill definitions live
    pub fn skills_dir(&self) -> PathBuf {
        self.project_root.join(ENGINE_DIR).join("skills")
    }

    /// Where skill proposals live
    pub fn proposals_dir(&self) -> PathBuf {
        self.project_root.join(ENGINE_DIR).join("proposals")
    }
}
