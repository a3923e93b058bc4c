//! Skill Engine
//!
//! Lifecycle and execution engine for project-scoped skills.
//!
//! # Features
//!
//! - **Proposals**: extracted skills wait on disk as JSON until reviewed
//! - **Review Gate**: approve installs the skill, reject records a reason
//! - **TOML Skills**: installed skills are TOML documents with executable script siblings
//! - **Execution**: scripts and command sequences with parameter binding and timeouts
//! - **Prompt Block**: installed skills rendered as slash commands for an agent prompt
//!
//! # Architecture
//!
//! ```text
//! Extraction ──► ProposalStore ──► review ──► SkillStore ──► SkillExecutor
//!                (pending JSON)      │        (TOML + .sh)    (tokio, timeouts)
//!                                    └── reject (reason kept in audit trail)
//! ```

pub mod config;
pub mod skills;

pub use config::EngineConfig;
pub use skills::prompt;
pub use skills::{
    display_value, CommandStep, ExecutionError, ParameterSpec, ProposalStatus, ProposalStore,
    ReviewStatus, SecurityAssessment, SkillBody, SkillDefinition, SkillDocumentError,
    SkillExecutionResult, SkillExecutor, SkillProposal, SkillReview, SkillStore, UsageExample,
    TIMEOUT_EXIT_CODE,
};
