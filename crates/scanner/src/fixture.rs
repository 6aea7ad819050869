//! A [`RepositorySource`] served from recorded listings.
//!
//! Fixtures are JSON documents holding one entry per repository, each the
//! shape of a [`RepositorySnapshot`] plus an optional project key:
//!
//! ```json
//! {
//!   "repositories": [
//!     {
//!       "owner": "cloudbeers",
//!       "repository": "widgets",
//!       "project_key": "PK",
//!       "is_public": true,
//!       "branches": [{ "name": "main", "head_revision": "a1b2c3" }],
//!       "pull_requests": []
//!     }
//!   ]
//! }
//! ```

use std::path::Path;

use async_trait::async_trait;
use navigator::{
    BranchRef, ProjectKey, PullRequestRef, RepoOwner, RepositoryName, RepositorySnapshot,
    RepositorySource, SourceError,
};
use serde::{Deserialize, Serialize};

use crate::ScanError;

/// One recorded repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureRepository {
    /// Project the repository belongs to, if the server groups by project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_key: Option<ProjectKey>,
    #[serde(flatten)]
    pub snapshot: RepositorySnapshot,
}

/// The top-level fixture document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFixture {
    #[serde(default)]
    pub repositories: Vec<FixtureRepository>,
}

/// Serves listings out of a [`SourceFixture`].
///
/// Owner and repository lookups are case-insensitive. Asking for a repository
/// the fixture does not hold is [`SourceError::NotFound`].
#[derive(Debug, Clone, Default)]
pub struct SnapshotSource {
    fixture: SourceFixture,
}

impl SnapshotSource {
    pub fn new(fixture: SourceFixture) -> Self {
        Self { fixture }
    }

    /// Parses a fixture document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json).map(Self::new)
    }

    /// Reads and parses a fixture file.
    ///
    /// # Errors
    ///
    /// [`ScanError::Fixture`] if the file cannot be read or is not a fixture.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ScanError> {
        let path = path.as_ref();
        let fixture_error = |message: String| ScanError::Fixture {
            path: path.display().to_string(),
            message,
        };
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| fixture_error(e.to_string()))?;
        Self::from_json(&text).map_err(|e| fixture_error(e.to_string()))
    }

    fn find(
        &self,
        owner: &RepoOwner,
        repository: &RepositoryName,
    ) -> Result<&RepositorySnapshot, SourceError> {
        self.fixture
            .repositories
            .iter()
            .map(|r| &r.snapshot)
            .find(|s| {
                s.owner.as_str().eq_ignore_ascii_case(owner.as_str())
                    && s.repository.as_str().eq_ignore_ascii_case(repository.as_str())
            })
            .ok_or_else(|| SourceError::NotFound {
                what: format!("repository {owner}/{repository}"),
            })
    }
}

#[async_trait]
impl RepositorySource for SnapshotSource {
    async fn list_repositories(
        &self,
        owner: &RepoOwner,
        project: Option<&ProjectKey>,
    ) -> Result<Vec<RepositoryName>, SourceError> {
        Ok(self
            .fixture
            .repositories
            .iter()
            .filter(|r| r.snapshot.owner.as_str().eq_ignore_ascii_case(owner.as_str()))
            .filter(|r| project.is_none() || r.project_key.as_ref() == project)
            .map(|r| r.snapshot.repository.clone())
            .collect())
    }

    async fn list_branches(
        &self,
        owner: &RepoOwner,
        repository: &RepositoryName,
    ) -> Result<Vec<BranchRef>, SourceError> {
        Ok(self.find(owner, repository)?.branches.clone())
    }

    async fn list_pull_requests(
        &self,
        owner: &RepoOwner,
        repository: &RepositoryName,
    ) -> Result<Vec<PullRequestRef>, SourceError> {
        Ok(self.find(owner, repository)?.pull_requests.clone())
    }

    async fn is_repository_public(
        &self,
        owner: &RepoOwner,
        repository: &RepositoryName,
    ) -> Result<bool, SourceError> {
        Ok(self.find(owner, repository)?.is_public)
    }
}
