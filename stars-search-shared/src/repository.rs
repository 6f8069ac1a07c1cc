//! Starred repository records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::indexable::Indexable;

/// Primary language of a repository as reported by GitHub.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryLanguage {
    /// GitHub node id of the language.
    pub id: String,
    /// Display name, e.g. `Rust`.
    pub name: String,
    /// Hex color used by GitHub for the language, when it has one.
    #[serde(default)]
    pub color: Option<String>,
}

/// A GitHub repository.
///
/// The `readme` field is derived by the fetcher from the candidate README
/// blobs of the default branch; it is indexed for full-text search but the
/// index does not keep a stored copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// GitHub node id. Unique and stable, used as the index key.
    pub id: String,
    /// `owner/name`.
    pub name_with_owner: String,
    /// Free-text description, absent for many repositories.
    #[serde(default)]
    pub description: Option<String>,
    /// Web URL of the repository.
    pub url: String,
    /// Resolved README content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readme: Option<String>,
    /// Primary language, absent for repositories GitHub could not classify.
    #[serde(default)]
    pub primary_language: Option<PrimaryLanguage>,
}

impl Repository {
    /// Create a repository with only the mandatory fields set.
    pub fn new(
        id: impl Into<String>,
        name_with_owner: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name_with_owner: name_with_owner.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the readme.
    pub fn with_readme(mut self, readme: impl Into<String>) -> Self {
        self.readme = Some(readme.into());
        self
    }

    /// Set the primary language.
    pub fn with_primary_language(mut self, language: PrimaryLanguage) -> Self {
        self.primary_language = Some(language);
        self
    }
}

/// One starred repository: the repository plus the time the viewer starred it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarredRepository {
    /// The repository itself. Flattened so the indexed document is a single
    /// level of repository fields plus `starred_at`.
    #[serde(flatten)]
    pub repository: Repository,
    /// When the viewer starred the repository.
    pub starred_at: DateTime<Utc>,
}

impl StarredRepository {
    pub fn new(repository: Repository, starred_at: DateTime<Utc>) -> Self {
        Self {
            repository,
            starred_at,
        }
    }

    pub fn id(&self) -> &str {
        &self.repository.id
    }
}

impl Indexable for Repository {
    fn document_id(&self) -> &str {
        &self.id
    }
}

impl Indexable for StarredRepository {
    fn document_id(&self) -> &str {
        &self.repository.id
    }
}
