//! Port traits for the collaborators the domain depends on.
//!
//! Implementations live outside this crate: a hosting-service API client, a
//! webhook registrar, a credential store. This crate defines *what* is needed;
//! infrastructure supplies *how*.

use async_trait::async_trait;

use crate::{
    BranchRef, CredentialsId, NavigatorId, ProjectKey, PullRequestRef, RepoOwner, RepositoryName,
    SourceError, WebhookMode,
};

/// Read access to the hosting service's repository listings.
///
/// Implementations own transport, pagination, rate limiting and retry. Any
/// error returned fails the whole discovery cycle.
#[async_trait]
pub trait RepositorySource: Send + Sync {
    /// Lists the repositories of `owner`, optionally scoped to `project`.
    async fn list_repositories(
        &self,
        owner: &RepoOwner,
        project: Option<&ProjectKey>,
    ) -> Result<Vec<RepositoryName>, SourceError>;

    /// Lists branches with their latest revision.
    async fn list_branches(
        &self,
        owner: &RepoOwner,
        repository: &RepositoryName,
    ) -> Result<Vec<BranchRef>, SourceError>;

    /// Lists open pull requests targeting `repository`.
    async fn list_pull_requests(
        &self,
        owner: &RepoOwner,
        repository: &RepositoryName,
    ) -> Result<Vec<PullRequestRef>, SourceError>;

    /// Whether `repository` is publicly visible.
    async fn is_repository_public(
        &self,
        owner: &RepoOwner,
        repository: &RepositoryName,
    ) -> Result<bool, SourceError>;
}

/// Applies a navigator's webhook mode on the hosting service.
///
/// Must be idempotent: it is called once per successful discovery cycle with
/// the latest composed mode, including [`WebhookMode::Disable`] so stale hooks
/// can be removed.
#[async_trait]
pub trait WebhookRegistrar: Send + Sync {
    async fn apply(&self, navigator: &NavigatorId, mode: WebhookMode) -> Result<(), SourceError>;
}

/// Presence checks against the credential store.
///
/// Secrets are never read through this trait.
pub trait CredentialStore: Send + Sync {
    /// Returns `true` if credentials with `id` exist.
    fn contains(&self, id: &CredentialsId) -> bool;
}
