//! Proposal Store
//!
//! Persists skill proposals awaiting an operator decision, one JSON document
//! per proposal. Documents are never destroyed: approval and rejection
//! rewrite them in place, keeping a full audit trail.

use super::store::{write_atomic, SkillStore};
use super::types::{ProposalStatus, SkillProposal};
use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

/// File-backed store of skill proposals
pub struct ProposalStore {
    dir: PathBuf,
}

impl ProposalStore {
    /// Open the store, creating its directory on first use
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create proposal directory {}", dir.display()))?;
        info!("Proposal store opened: {}", dir.display());
        Ok(Self { dir })
    }

    fn load(&self, path: &Path) -> Result<SkillProposal> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read proposal file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse proposal file {}", path.display()))
    }

    /// Persist a proposal; returns the document path.
    ///
    /// The file name carries the skill name and the save-time unix epoch,
    /// `{name}_{epoch}.json`. The embedded id, not the file name, is what
    /// later locates the document for rewrites.
    pub fn save(&self, proposal: &SkillProposal) -> Result<PathBuf> {
        let path = self.dir.join(format!(
            "{}_{}.json",
            proposal.skill.name,
            Utc::now().timestamp()
        ));
        let content = serde_json::to_string_pretty(proposal)
            .with_context(|| format!("Failed to serialize proposal '{}'", proposal.skill.name))?;
        write_atomic(&path, &content)
            .with_context(|| format!("Failed to write proposal {}", path.display()))?;
        info!(
            "Saved skill proposal '{}' to {}",
            proposal.skill.name,
            path.display()
        );
        Ok(path)
    }

    /// All proposals still awaiting a decision, oldest first.
    ///
    /// Documents that cannot be read or parsed are skipped with a warning.
    pub fn list_pending(&self) -> Result<Vec<SkillProposal>> {
        let mut pending = Vec::new();
        for entry in fs::read_dir(&self.dir).with_context(|| {
            format!("Failed to read proposal directory {}", self.dir.display())
        })? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match self.load(&path) {
                Ok(proposal) => {
                    if proposal.status == ProposalStatus::Pending {
                        pending.push(proposal);
                    }
                }
                Err(e) => warn!("Skipping unreadable proposal {}: {}", path.display(), e),
            }
        }
        pending.sort_by_key(|p| p.proposed_at);
        Ok(pending)
    }

    /// Number of proposals still awaiting a decision
    pub fn pending_count(&self) -> Result<usize> {
        Ok(self.list_pending()?.len())
    }

    /// Approve a proposal: install its skill, then mark the stored document
    /// approved. Returns the installed skill definition path.
    ///
    /// The skill is saved before the document rewrite, so a rewrite failure
    /// leaves the skill installed and the document pending; the error is
    /// surfaced either way.
    pub fn approve(&self, proposal: &mut SkillProposal, skills: &SkillStore) -> Result<PathBuf> {
        let skill_path = skills.save(&proposal.skill)?;
        self.rewrite(
            &proposal.skill.name,
            proposal.id,
            ProposalStatus::Approved,
            &proposal.extraction_metadata,
        )?;
        proposal.status = ProposalStatus::Approved;
        info!("Approved skill proposal '{}'", proposal.skill.name);
        Ok(skill_path)
    }

    /// Reject a proposal, recording the reason in its metadata.
    ///
    /// Nothing is installed; the stored document is rewritten with status
    /// `rejected` and `extraction_metadata.rejection_reason` set.
    pub fn reject(&self, proposal: &mut SkillProposal, reason: &str) -> Result<()> {
        anyhow::ensure!(!reason.is_empty(), "Rejection reason must not be empty");

        let mut metadata = proposal.extraction_metadata.clone();
        metadata.insert(
            "rejection_reason".to_string(),
            Value::String(reason.to_string()),
        );
        self.rewrite(
            &proposal.skill.name,
            proposal.id,
            ProposalStatus::Rejected,
            &metadata,
        )?;
        proposal.extraction_metadata = metadata;
        proposal.status = ProposalStatus::Rejected;
        info!(
            "Rejected skill proposal '{}': {}",
            proposal.skill.name, reason
        );
        Ok(())
    }

    /// Locate the stored document by embedded id and patch its status and
    /// metadata, leaving every other field exactly as persisted.
    fn rewrite(
        &self,
        name: &str,
        id: Uuid,
        status: ProposalStatus,
        metadata: &Map<String, Value>,
    ) -> Result<()> {
        let id_text = id.to_string();
        let prefix = format!("{}_", name);

        for entry in fs::read_dir(&self.dir).with_context(|| {
            format!("Failed to read proposal directory {}", self.dir.display())
        })? {
            let path = entry?.path();
            let file_name = match path.file_name().and_then(|n| n.to_str()) {
                Some(n) => n,
                None => continue,
            };
            if !file_name.starts_with(&prefix) || !file_name.ends_with(".json") {
                continue;
            }

            let content = match fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    warn!("Skipping unreadable proposal {}: {}", path.display(), e);
                    continue;
                }
            };
            let mut document: Value = match serde_json::from_str(&content) {
                Ok(value) => value,
                Err(e) => {
                    warn!("Skipping unparsable proposal {}: {}", path.display(), e);
                    continue;
                }
            };
            if document.get("id").and_then(Value::as_str) != Some(id_text.as_str()) {
                continue;
            }

            document["status"] = serde_json::to_value(status)?;
            document["extraction_metadata"] = Value::Object(metadata.clone());
            let serialized = serde_json::to_string_pretty(&document)?;
            write_atomic(&path, &serialized)
                .with_context(|| format!("Failed to rewrite proposal {}", path.display()))?;
            return Ok(());
        }

        anyhow::bail!("No stored document found for proposal '{}' ({})", name, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::types::{
        CommandStep, ReviewStatus, SkillBody, SkillDefinition, SkillReview,
    };
    use tempfile::TempDir;

    fn open_stores() -> (TempDir, SkillStore, ProposalStore) {
        let temp = TempDir::new().unwrap();
        let skills = SkillStore::open(temp.path().join("skills")).unwrap();
        let proposals = ProposalStore::open(temp.path().join("proposals")).unwrap();
        (temp, skills, proposals)
    }

    fn proposal(name: &str) -> SkillProposal {
        let skill = SkillDefinition::new(
            name,
            "Say hello",
            SkillBody::Commands(vec![CommandStep::Line("echo hello".to_string())]),
        )
        .unwrap();
        SkillProposal::new(skill, SkillReview::new(ReviewStatus::Approved), Map::new())
    }

    #[test]
    fn test_save_creates_stamped_document() {
        let (_temp, _skills, proposals) = open_stores();
        let path = proposals.save(&proposal("greet")).unwrap();

        let file_name = path.file_name().unwrap().to_str().unwrap();
        assert!(file_name.starts_with("greet_"));
        assert!(file_name.ends_with(".json"));
        assert!(path.exists());
    }

    #[test]
    fn test_list_pending_filters_and_sorts() {
        let (_temp, skills, proposals) = open_stores();
        let mut first = proposal("alpha");
        first.proposed_at = Utc::now() - chrono::Duration::seconds(10);
        proposals.save(&first).unwrap();

        let mut second = proposal("beta");
        proposals.save(&second).unwrap();

        fs::write(proposals.dir.join("junk.json"), "not json").unwrap();

        let pending = proposals.list_pending().unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].skill.name, "alpha");
        assert_eq!(pending[1].skill.name, "beta");

        proposals.approve(&mut second, &skills).unwrap();
        let pending = proposals.list_pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].skill.name, "alpha");
        assert_eq!(proposals.pending_count().unwrap(), 1);
    }

    #[test]
    fn test_approve_installs_skill_and_rewrites_document() {
        let (_temp, skills, proposals) = open_stores();
        let mut prop = proposal("greet");
        let doc_path = proposals.save(&prop).unwrap();

        let skill_path = proposals.approve(&mut prop, &skills).unwrap();
        assert!(skill_path.ends_with("greet.toml"));
        assert!(skills.exists("greet"));
        assert_eq!(prop.status, ProposalStatus::Approved);

        let stored: Value =
            serde_json::from_str(&fs::read_to_string(&doc_path).unwrap()).unwrap();
        assert_eq!(stored["status"], "approved");
        assert_eq!(stored["id"], prop.id.to_string());
    }

    #[test]
    fn test_reject_records_reason_without_installing() {
        let (_temp, skills, proposals) = open_stores();
        let mut prop = proposal("risky");
        let doc_path = proposals.save(&prop).unwrap();

        proposals.reject(&mut prop, "touches production data").unwrap();
        assert!(!skills.exists("risky"));
        assert_eq!(prop.status, ProposalStatus::Rejected);
        assert_eq!(
            prop.extraction_metadata["rejection_reason"],
            "touches production data"
        );

        let stored: Value =
            serde_json::from_str(&fs::read_to_string(&doc_path).unwrap()).unwrap();
        assert_eq!(stored["status"], "rejected");
        assert_eq!(
            stored["extraction_metadata"]["rejection_reason"],
            "touches production data"
        );
    }

    #[test]
    fn test_reject_requires_a_reason() {
        let (_temp, _skills, proposals) = open_stores();
        let mut prop = proposal("greet");
        proposals.save(&prop).unwrap();
        assert!(proposals.reject(&mut prop, "").is_err());
        assert_eq!(prop.status, ProposalStatus::Pending);
    }

    #[test]
    fn test_rewrite_preserves_unknown_payload_fields() {
        let (_temp, skills, proposals) = open_stores();
        let mut prop = proposal("greet");
        let doc_path = proposals.save(&prop).unwrap();

        let mut raw: Value =
            serde_json::from_str(&fs::read_to_string(&doc_path).unwrap()).unwrap();
        raw["pipeline"] = serde_json::json!({ "run": 7 });
        fs::write(&doc_path, serde_json::to_string_pretty(&raw).unwrap()).unwrap();

        proposals.approve(&mut prop, &skills).unwrap();

        let stored: Value =
            serde_json::from_str(&fs::read_to_string(&doc_path).unwrap()).unwrap();
        assert_eq!(stored["status"], "approved");
        assert_eq!(stored["pipeline"]["run"], 7);
    }

    #[test]
    fn test_approve_without_stored_document_errors() {
        let (_temp, skills, proposals) = open_stores();
        let mut prop = proposal("ghost");

        let err = proposals.approve(&mut prop, &skills).unwrap_err();
        assert!(err.to_string().contains("No stored document"));
    }
}
