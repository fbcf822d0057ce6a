use std::path::Path;

use serde::{Deserialize, Serialize};

use super::CollaboratorError;

/// Metadata for one profession in the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profession {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub headline: Option<String>,
    /// Bio template with `{title}`/`{skills}` placeholders.
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub responsibilities: Vec<String>,
}

/// Read-only lookup of profession metadata.
///
/// Errors are never fatal to an export; the view-model builder treats them as a miss.
pub trait ProfessionDirectory: Send + Sync {
    /// Resolves a profession id or free-text title.
    fn lookup(&self, id: &str) -> Result<Option<Profession>, CollaboratorError>;

    /// Case-insensitive substring search over title and slug. An empty term lists
    /// everything up to `limit`.
    fn search(&self, term: &str, limit: usize) -> Result<Vec<Profession>, CollaboratorError>;
}

/// Accepted top-level shapes of an occupations file.
#[derive(Deserialize)]
#[serde(untagged)]
enum OccupationsFile {
    List(Vec<Profession>),
    Wrapped { occupations: Vec<Profession> },
}

/// In-memory directory loaded once from an `occupations.json` file.
#[derive(Debug, Clone, Default)]
pub struct JsonProfessionDirectory {
    professions: Vec<Profession>,
}

impl JsonProfessionDirectory {
    pub fn new(professions: Vec<Profession>) -> Self {
        Self { professions }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, CollaboratorError> {
        let parsed: OccupationsFile =
            serde_json::from_str(raw).map_err(|e| CollaboratorError::Malformed(e.to_string()))?;
        let professions = match parsed {
            OccupationsFile::List(list) => list,
            OccupationsFile::Wrapped { occupations } => occupations,
        };
        Ok(Self::new(professions))
    }

    /// Loads the directory file. A missing or unparseable file yields an empty directory.
    pub async fn load(path: &Path) -> Self {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(
                    "Profession directory not loaded from {}: {e}; using an empty directory",
                    path.display()
                );
                return Self::default();
            }
        };
        match Self::from_json_str(&raw) {
            Ok(directory) => {
                tracing::info!(
                    "Loaded {} professions from {}",
                    directory.len(),
                    path.display()
                );
                directory
            }
            Err(e) => {
                tracing::warn!("Profession directory at {} is invalid: {e}", path.display());
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.professions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.professions.is_empty()
    }
}

impl ProfessionDirectory for JsonProfessionDirectory {
    fn lookup(&self, id: &str) -> Result<Option<Profession>, CollaboratorError> {
        let id = id.trim();
        if id.is_empty() {
            return Ok(None);
        }
        let found = self
            .professions
            .iter()
            .find(|p| p.slug == id)
            .or_else(|| {
                self.professions
                    .iter()
                    .find(|p| p.title.eq_ignore_ascii_case(id))
            });
        Ok(found.cloned())
    }

    fn search(&self, term: &str, limit: usize) -> Result<Vec<Profession>, CollaboratorError> {
        let term = term.trim().to_lowercase();
        Ok(self
            .professions
            .iter()
            .filter(|p| {
                term.is_empty()
                    || p.title.to_lowercase().contains(&term)
                    || p.slug.to_lowercase().contains(&term)
            })
            .take(limit)
            .cloned()
            .collect())
    }
}
