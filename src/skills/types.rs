//! Skill Data Model
//!
//! Core data structures for the skill lifecycle: definitions, reviews,
//! proposals and their document forms.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Document schema version written when a definition does not carry one.
pub const DEFAULT_VERSION: &str = "1.0";

/// A validated skill definition.
///
/// Definitions are parsed from their on-disk document form and rejected at
/// that boundary when malformed, so a value of this type always has a safe
/// name and exactly one body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SkillDocument", into = "SkillDocument")]
pub struct SkillDefinition {
    /// Unique skill name, used as the document file stem
    pub name: String,
    /// Optional human-friendly name
    pub display_name: Option<String>,
    /// What the skill does
    pub description: String,
    /// Document version
    pub version: String,
    /// Declared parameters, in document order
    pub parameters: Vec<ParameterSpec>,
    /// What runs when the skill is invoked
    pub body: SkillBody,
    /// Usage examples for prompt rendering
    pub examples: Vec<UsageExample>,
}

impl SkillDefinition {
    /// Create a minimal skill definition
    pub fn new(name: &str, description: &str, body: SkillBody) -> Result<Self, SkillDocumentError> {
        validate_name(name)?;
        Ok(Self {
            name: name.to_string(),
            display_name: None,
            description: description.to_string(),
            version: DEFAULT_VERSION.to_string(),
            parameters: Vec::new(),
            body,
            examples: Vec::new(),
        })
    }

    /// Display name, falling back to the skill name
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// Set the display name
    pub fn with_display_name(mut self, display_name: &str) -> Self {
        self.display_name = Some(display_name.to_string());
        self
    }

    /// Set the document version
    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    /// Add a parameter
    pub fn with_parameter(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Add a usage example
    pub fn with_example(mut self, example: UsageExample) -> Self {
        self.examples.push(example);
        self
    }
}

/// What a skill runs: a standalone script, or a command sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum SkillBody {
    /// Script text, installed as an executable sibling of the document
    Script(String),
    /// Shell commands run in order, failing fast
    Commands(Vec<CommandStep>),
}

/// A declared skill parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Parameter name, the substitution key
    pub name: String,
    /// Free-form type label from the document
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    /// Must the caller supply this parameter?
    #[serde(default)]
    pub required: bool,
    /// Value used when the caller supplies none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Allowed values, advisory only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<Value>>,
}

impl ParameterSpec {
    fn new(name: &str, required: bool) -> Self {
        Self {
            name: name.to_string(),
            kind: default_kind(),
            required,
            default: None,
            description: None,
            choices: None,
        }
    }

    /// Create a required parameter
    pub fn required(name: &str) -> Self {
        Self::new(name, true)
    }

    /// Create an optional parameter
    pub fn optional(name: &str) -> Self {
        Self::new(name, false)
    }

    /// Set the type label
    pub fn with_kind(mut self, kind: &str) -> Self {
        self.kind = kind.to_string();
        self
    }

    /// Set the default value
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Restrict to a set of allowed values
    pub fn with_choices(mut self, choices: Vec<Value>) -> Self {
        self.choices = Some(choices);
        self
    }
}

/// One step of a command-sequence body.
///
/// Documents may write a bare command string or a table with an optional
/// description that becomes a transcript comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandStep {
    Line(String),
    Annotated {
        command: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

impl CommandStep {
    /// The raw command template, before parameter substitution
    pub fn command(&self) -> &str {
        match self {
            Self::Line(command) => command,
            Self::Annotated { command, .. } => command,
        }
    }

    /// The optional transcript comment
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Line(_) => None,
            Self::Annotated { description, .. } => description.as_deref(),
        }
    }
}

/// A usage example: a bare invocation string, or a command/description pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UsageExample {
    Line(String),
    Hint {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        command: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

/// On-disk document form of a skill definition.
///
/// `script` and `commands` are both optional here; conversion into
/// [`SkillDefinition`] enforces that exactly one body is present, with
/// `script` winning when a document carries both. Scalar fields come first
/// so TOML serialization emits them before the parameter tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SkillDocument {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    description: String,
    #[serde(default = "default_version")]
    version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    commands: Option<Vec<CommandStep>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    examples: Vec<UsageExample>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    parameters: Vec<ParameterSpec>,
}

impl TryFrom<SkillDocument> for SkillDefinition {
    type Error = SkillDocumentError;

    fn try_from(doc: SkillDocument) -> Result<Self, Self::Error> {
        let SkillDocument {
            name,
            display_name,
            description,
            version,
            script,
            commands,
            examples,
            parameters,
        } = doc;

        validate_name(&name)?;

        let body = match (script, commands) {
            (Some(script), _) if !script.is_empty() => SkillBody::Script(script),
            (_, Some(commands)) => SkillBody::Commands(commands),
            _ => return Err(SkillDocumentError::MissingBody(name)),
        };

        for parameter in &parameters {
            if parameter.name.is_empty() {
                return Err(SkillDocumentError::InvalidParameter(format!(
                    "empty parameter name in skill '{}'",
                    name
                )));
            }
        }

        Ok(Self {
            name,
            display_name,
            description,
            version,
            parameters,
            body,
            examples,
        })
    }
}

impl From<SkillDefinition> for SkillDocument {
    fn from(skill: SkillDefinition) -> Self {
        let (script, commands) = match skill.body {
            SkillBody::Script(script) => (Some(script), None),
            SkillBody::Commands(steps) => (None, Some(steps)),
        };
        Self {
            name: skill.name,
            display_name: skill.display_name,
            description: skill.description,
            version: skill.version,
            script,
            commands,
            examples: skill.examples,
            parameters: skill.parameters,
        }
    }
}

fn default_version() -> String {
    DEFAULT_VERSION.to_string()
}

fn default_kind() -> String {
    "string".to_string()
}

fn default_true() -> bool {
    true
}

/// Skill names become file stems, so they are restricted to characters that
/// are safe on every filesystem and cannot escape the storage directory.
pub(crate) fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn validate_name(name: &str) -> Result<(), SkillDocumentError> {
    if name.is_empty() {
        return Err(SkillDocumentError::MissingField("name".to_string()));
    }
    if !is_safe_name(name) {
        return Err(SkillDocumentError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Text form of a parameter value as it appears in substituted commands,
/// script arguments and rendered prompts. Strings are used raw; everything
/// else prints as compact JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Review verdict attached to a proposal by the external reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    Approved,
    NeedsRevision,
    Rejected,
}

/// Security portion of a review payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityAssessment {
    /// Risk classification as emitted by the reviewer
    #[serde(default = "default_risk_level")]
    pub risk_level: String,
}

impl Default for SecurityAssessment {
    fn default() -> Self {
        Self {
            risk_level: default_risk_level(),
        }
    }
}

fn default_risk_level() -> String {
    "UNKNOWN".to_string()
}

/// Review payload carried by a proposal.
///
/// The engine never computes these judgments, it only stores them and gates
/// the approval flow on them. Every field except `status` is optional in
/// documents and falls back to a conservative default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillReview {
    pub status: ReviewStatus,
    #[serde(default)]
    pub security: SecurityAssessment,
    #[serde(default)]
    pub quality_score: u8,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default = "default_true")]
    pub approval_needed: bool,
    #[serde(default)]
    pub auditor_review_needed: bool,
}

impl SkillReview {
    /// Create a review with the given status and default fields
    pub fn new(status: ReviewStatus) -> Self {
        Self {
            status,
            security: SecurityAssessment::default(),
            quality_score: 0,
            recommendations: Vec::new(),
            approval_needed: true,
            auditor_review_needed: false,
        }
    }

    pub fn is_approved(&self) -> bool {
        self.status == ReviewStatus::Approved
    }

    pub fn is_rejected(&self) -> bool {
        self.status == ReviewStatus::Rejected
    }

    pub fn needs_revision(&self) -> bool {
        self.status == ReviewStatus::NeedsRevision
    }

    pub fn risk_level(&self) -> &str {
        &self.security.risk_level
    }
}

/// Lifecycle state of a stored proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Pending,
    Approved,
    Rejected,
}

/// A proposed skill awaiting an operator decision.
///
/// Proposals are persisted as JSON and never destroyed; approval and
/// rejection flip `status` exactly once and the documents remain as an
/// audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillProposal {
    /// Generated identifier, the join key for stored-document rewrites
    pub id: Uuid,
    pub skill: SkillDefinition,
    pub review: SkillReview,
    /// Opaque context from the extraction pipeline
    #[serde(default)]
    pub extraction_metadata: Map<String, Value>,
    pub proposed_at: DateTime<Utc>,
    pub status: ProposalStatus,
}

impl SkillProposal {
    /// Create a pending proposal stamped with a fresh id and the current time
    pub fn new(
        skill: SkillDefinition,
        review: SkillReview,
        extraction_metadata: Map<String, Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            skill,
            review,
            extraction_metadata,
            proposed_at: Utc::now(),
            status: ProposalStatus::Pending,
        }
    }
}

/// Skill document validation errors
#[derive(Debug, thiserror::Error)]
pub enum SkillDocumentError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid skill name: {0}")]
    InvalidName(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Skill '{0}' defines neither a script nor commands")]
    MissingBody(String),
}
