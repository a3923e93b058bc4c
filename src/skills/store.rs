//! Skill Store
//!
//! Persists approved skill definitions, one TOML document per skill.
//! Script-bodied skills also install an executable `{name}.sh` sibling
//! that the executor runs later.

use super::types::{is_safe_name, SkillBody, SkillDefinition};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Extension of installed script siblings
pub(crate) const SCRIPT_EXTENSION: &str = "sh";

/// File-backed store of approved skill definitions
pub struct SkillStore {
    dir: PathBuf,
}

impl SkillStore {
    /// Open the store, creating its directory on first use
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create skill directory {}", dir.display()))?;
        info!("Skill store opened: {}", dir.display());
        Ok(Self { dir })
    }

    fn definition_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.toml", name))
    }

    fn script_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, SCRIPT_EXTENSION))
    }

    fn load(&self, path: &Path) -> Result<SkillDefinition> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read skill file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse skill file {}", path.display()))
    }

    /// All stored definitions, sorted by name.
    ///
    /// A document that cannot be read or parsed is skipped with a warning;
    /// one corrupt file never aborts the listing.
    pub fn list(&self) -> Result<Vec<SkillDefinition>> {
        let mut skills = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read skill directory {}", self.dir.display()))?
        {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }
            match self.load(&path) {
                Ok(skill) => skills.push(skill),
                Err(e) => warn!("Skipping unreadable skill {}: {}", path.display(), e),
            }
        }
        skills.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(skills)
    }

    /// Fetch one definition by name.
    ///
    /// Absence is `Ok(None)`, including for names that could never have
    /// been stored; a present but corrupt document is an error.
    pub fn get(&self, name: &str) -> Result<Option<SkillDefinition>> {
        if !is_safe_name(name) {
            return Ok(None);
        }
        let path = self.definition_path(name);
        if !path.exists() {
            return Ok(None);
        }
        self.load(&path).map(Some)
    }

    /// Insert or replace a definition; returns the document path.
    ///
    /// The document is written to a temporary file and renamed into place,
    /// so a concurrent reader never observes a torn document.
    pub fn save(&self, skill: &SkillDefinition) -> Result<PathBuf> {
        let path = self.definition_path(&skill.name);
        let content = toml::to_string_pretty(skill)
            .with_context(|| format!("Failed to serialize skill '{}'", skill.name))?;
        write_atomic(&path, &content)
            .with_context(|| format!("Failed to write skill file {}", path.display()))?;

        if let SkillBody::Script(script) = &skill.body {
            let script_path = self.script_path(&skill.name);
            write_atomic(&script_path, script)
                .with_context(|| format!("Failed to write script {}", script_path.display()))?;
            make_executable(&script_path)?;
        }

        info!("Saved skill '{}' to {}", skill.name, path.display());
        Ok(path)
    }

    /// Remove a definition and its installed script.
    ///
    /// Returns `Ok(false)` when no document existed for this name.
    pub fn delete(&self, name: &str) -> Result<bool> {
        if !is_safe_name(name) {
            return Ok(false);
        }
        let path = self.definition_path(name);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)
            .with_context(|| format!("Failed to delete skill file {}", path.display()))?;

        let script_path = self.script_path(name);
        if script_path.exists() {
            fs::remove_file(&script_path)
                .with_context(|| format!("Failed to delete script {}", script_path.display()))?;
        }

        info!("Deleted skill '{}'", name);
        Ok(true)
    }

    /// Whether a definition document exists for this name
    pub fn exists(&self, name: &str) -> bool {
        is_safe_name(name) && self.definition_path(name).exists()
    }

    /// Number of stored definition documents
    pub fn count(&self) -> usize {
        fs::read_dir(&self.dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("toml"))
                    .count()
            })
            .unwrap_or(0)
    }
}

/// Write via a temporary file in the same directory, then rename into place.
pub(crate) fn write_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .with_context(|| format!("Failed to mark {} executable", path.display()))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
