//! Skill Lifecycle System
//!
//! Manages project-scoped skills from proposal through review to execution.
//!
//! # Architecture
//!
//! ```text
//! Extraction → SkillProposal → ProposalStore (pending)
//!                                    ↓
//!                             approve / reject
//!                                    ↓
//!                    SkillStore (installed skills)
//!                                    ↓
//!                    SkillExecutor    prompt::render_all
//!                    (run on demand)  (agent prompt block)
//! ```
//!
//! # Skill Format
//!
//! Installed skills are TOML documents with either an embedded script or a
//! sequence of shell commands:
//!
//! ```toml
//! name = "deploy-status"
//! description = "Check the current deployment"
//! version = "1.0"
//! commands = ["kubectl get pods -n ${environment}"]
//!
//! [[parameters]]
//! name = "environment"
//! required = true
//! ```
//!
//! Script-backed skills additionally install the script as an executable
//! `{name}.sh` next to the document.

pub mod types;
pub mod store;
pub mod proposals;
pub mod executor;
pub mod prompt;

pub use types::{
    display_value, CommandStep, ParameterSpec, ProposalStatus, ReviewStatus, SecurityAssessment,
    SkillBody, SkillDefinition, SkillDocumentError, SkillProposal, SkillReview, UsageExample,
};
pub use store::SkillStore;
pub use proposals::ProposalStore;
pub use executor::{ExecutionError, SkillExecutionResult, SkillExecutor, TIMEOUT_EXIT_CODE};
