//! Discovery cycles.
//!
//! A cycle snapshots the navigator, builds its [`SourceConfiguration`], pulls
//! every repository listing through the [`RepositorySource`], runs the pure
//! discovery pipeline over each snapshot and finally hands the composed webhook
//! mode to the [`WebhookRegistrar`].
//!
//! Repositories failing the navigator's repository filters are skipped before
//! any of their branches or pull requests are listed.
//!
//! Cycles for different navigators run concurrently. Cycles for one navigator
//! identity are serialized: a second request waits for the first to finish.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use navigator::{
    discover, CheckoutCredentials, CredentialStore, CredentialsId, DecisionContext,
    DiscoveryRunId, ForkHistory, Head, Navigator, NavigatorId, NoForkHistory, RepoOwner,
    RepositoryName, RepositorySnapshot, RepositorySource, SourceConfiguration, SourceError,
    Timestamp, WebhookMode, WebhookRegistrar,
};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::ScanError;

#[path = "scanner_tests.rs"]
#[cfg(test)]
mod tests;

/// The heads found in one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryHeads {
    pub repository: RepositoryName,
    pub is_public: bool,
    pub heads: Vec<Head>,
}

/// The outcome of one successful discovery cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveryReport {
    pub run_id: DiscoveryRunId,
    pub navigator_id: NavigatorId,
    pub started_at: Timestamp,
    pub completed_at: Timestamp,
    /// Checkout request in force for every head of this cycle.
    pub checkout: CheckoutCredentials,
    /// Concrete id to check out with; `None` for agent-key checkout.
    pub checkout_credentials_id: Option<CredentialsId>,
    /// Mode handed to the registrar at the end of the cycle.
    pub webhook_mode: WebhookMode,
    /// Repositories in listing order.
    pub repositories: Vec<RepositoryHeads>,
}

impl DiscoveryReport {
    /// Number of heads across all repositories.
    pub fn total_heads(&self) -> usize {
        self.repositories.iter().map(|r| r.heads.len()).sum()
    }
}

type IdentityLocks = Mutex<HashMap<NavigatorId, Arc<tokio::sync::Mutex<()>>>>;

/// Runs discovery cycles against a set of collaborators.
pub struct NavigatorScanner {
    source: Arc<dyn RepositorySource>,
    registrar: Arc<dyn WebhookRegistrar>,
    credentials: Option<Arc<dyn CredentialStore>>,
    history: Arc<dyn ForkHistory + Send + Sync>,
    head_limit: Option<usize>,
    locks: IdentityLocks,
}

impl NavigatorScanner {
    /// A scanner with no credential checks, no fork history and no head limit.
    pub fn new(source: Arc<dyn RepositorySource>, registrar: Arc<dyn WebhookRegistrar>) -> Self {
        Self {
            source,
            registrar,
            credentials: None,
            history: Arc::new(NoForkHistory),
            head_limit: None,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Warn about credential ids the store does not know.
    pub fn with_credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(store);
        self
    }

    /// Build history consulted for `TrustExistingForksOnly`.
    pub fn with_fork_history(mut self, history: Arc<dyn ForkHistory + Send + Sync>) -> Self {
        self.history = history;
        self
    }

    /// Stop pulling heads from a repository after `limit`.
    pub fn with_head_limit(mut self, limit: usize) -> Self {
        self.head_limit = Some(limit);
        self
    }

    /// Runs one discovery cycle for `navigator`.
    ///
    /// The navigator is cloned on entry, so later edits by the caller do not
    /// affect a running cycle.
    ///
    /// # Errors
    ///
    /// [`ScanError::Source`] if any source or registrar call fails. The
    /// registrar is not called when listing fails.
    pub async fn scan(&self, navigator: &Navigator) -> Result<DiscoveryReport, ScanError> {
        let navigator = navigator.clone();
        let navigator_id = navigator.id();
        let lock = self.lock_for(&navigator_id);
        let outcome = {
            let _serial = lock.lock().await;
            let run_id = DiscoveryRunId::new_random();
            let span = tracing::info_span!(
                "discovery_cycle",
                navigator = %navigator_id,
                run_id = %run_id,
            );
            self.run_cycle(&navigator, run_id).instrument(span).await
        };
        drop(lock);
        self.release_lock(&navigator_id);

        outcome.map_err(|source| ScanError::Source {
            navigator: navigator_id,
            source,
        })
    }

    /// Runs a cycle for each navigator concurrently and returns the outcomes
    /// in input order.
    pub async fn scan_all(
        self: &Arc<Self>,
        navigators: Vec<Navigator>,
    ) -> Vec<Result<DiscoveryReport, ScanError>> {
        let ids: Vec<NavigatorId> = navigators.iter().map(Navigator::id).collect();
        let mut outcomes: Vec<Option<Result<DiscoveryReport, ScanError>>> =
            (0..navigators.len()).map(|_| None).collect();

        let mut tasks = JoinSet::new();
        let mut indices: HashMap<tokio::task::Id, usize> = HashMap::with_capacity(ids.len());
        for (index, navigator) in navigators.into_iter().enumerate() {
            let scanner = Arc::clone(self);
            let handle = tasks.spawn(async move { (index, scanner.scan(&navigator).await) });
            indices.insert(handle.id(), index);
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = Some(outcome),
                Err(e) => match indices.get(&e.id()) {
                    Some(&index) => {
                        let navigator = ids[index].clone();
                        let message = e.to_string();
                        tracing::error!(navigator = %navigator, %message, "Discovery task aborted");
                        outcomes[index] = Some(Err(ScanError::Aborted { navigator, message }));
                    }
                    None => tracing::error!(task = %e.id(), error = %e, "Unknown discovery task failed"),
                },
            }
        }

        outcomes
            .into_iter()
            .zip(ids)
            .map(|(outcome, navigator)| {
                outcome.unwrap_or_else(|| {
                    Err(ScanError::Aborted {
                        navigator,
                        message: "task did not report".to_string(),
                    })
                })
            })
            .collect()
    }

    fn lock_for(&self, id: &NavigatorId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Arc::clone(locks.entry(id.clone()).or_default())
    }

    /// Drops the lock entry for `id` once no cycle holds or awaits it. Clones
    /// are only handed out under the map lock, so the count cannot rise here.
    fn release_lock(&self, id: &NavigatorId) {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if locks.get(id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(id);
        }
    }

    async fn run_cycle(
        &self,
        navigator: &Navigator,
        run_id: DiscoveryRunId,
    ) -> Result<DiscoveryReport, SourceError> {
        let started_at = Timestamp::now();
        let config = navigator.build_source_configuration();
        self.check_credentials(&config);

        if config.context.discovers_nothing() {
            tracing::debug!("No discovery trait enabled; listings will yield no heads");
        }

        let names = self
            .source
            .list_repositories(&config.repo_owner, config.project_key.as_ref())
            .await?;
        tracing::debug!(repositories = names.len(), "Listed repositories");

        let mut repositories = Vec::with_capacity(names.len());
        for name in names {
            if !config.context.accepts_repository(name.as_str()) {
                tracing::debug!(repository = %name, "Repository filtered out");
                continue;
            }
            let snapshot = self.snapshot(&config.repo_owner, name).await?;
            let heads = self.collect_heads(&config.context, &snapshot);
            tracing::debug!(
                repository = %snapshot.repository,
                heads = heads.len(),
                "Discovered heads"
            );
            repositories.push(RepositoryHeads {
                repository: snapshot.repository,
                is_public: snapshot.is_public,
                heads,
            });
        }

        let webhook_mode = config.webhook_mode();
        self.registrar.apply(&config.navigator_id, webhook_mode).await?;

        let report = DiscoveryReport {
            run_id,
            navigator_id: config.navigator_id,
            started_at,
            completed_at: Timestamp::now(),
            checkout: config.context.checkout,
            checkout_credentials_id: config.checkout_credentials_id,
            webhook_mode,
            repositories,
        };
        tracing::info!(
            repositories = report.repositories.len(),
            heads = report.total_heads(),
            webhook_mode = %webhook_mode,
            "Discovery cycle complete"
        );
        Ok(report)
    }

    fn collect_heads(&self, context: &DecisionContext, snapshot: &RepositorySnapshot) -> Vec<Head> {
        let found = discover(context, snapshot, self.history.as_ref());
        match self.head_limit {
            Some(limit) => found.take(limit).collect(),
            None => found.collect(),
        }
    }

    async fn snapshot(
        &self,
        owner: &RepoOwner,
        repository: RepositoryName,
    ) -> Result<RepositorySnapshot, SourceError> {
        let branches = self.source.list_branches(owner, &repository).await?;
        let pull_requests = self.source.list_pull_requests(owner, &repository).await?;
        let is_public = self.source.is_repository_public(owner, &repository).await?;
        Ok(RepositorySnapshot {
            owner: owner.clone(),
            repository,
            is_public,
            branches,
            pull_requests,
        })
    }

    fn check_credentials(&self, config: &SourceConfiguration) {
        let Some(store) = &self.credentials else {
            return;
        };
        match &config.scan_credentials_id {
            Some(id) if !store.contains(id) => {
                tracing::warn!(credentials_id = %id, "Scan credentials not found; listing may fail");
            }
            Some(_) => {}
            None => tracing::debug!("Scanning anonymously"),
        }
        if let CheckoutCredentials::UseExplicit(id) = &config.context.checkout {
            if !store.contains(id) {
                tracing::warn!(credentials_id = %id, "Checkout credentials not found");
            }
        }
    }
}
