use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use navigator::{
    BranchRef, EndpointConfig, NavigatorTrait, ProjectKey, PullRequestRef, PullRequestStrategy,
    RegexFilterTrait, RetryPolicy, TrustPolicy,
};

use crate::{SnapshotSource, StaticCredentialStore};

const FIXTURE: &str = r#"{
    "repositories": [
        {
            "owner": "cloudbeers",
            "repository": "widgets",
            "branches": [
                { "name": "main", "head_revision": "m1" },
                { "name": "feature/a", "head_revision": "f1" }
            ],
            "pull_requests": [
                {
                    "id": 1,
                    "source_owner": "cloudbeers",
                    "source_repo": "widgets",
                    "source_branch": "feature/a",
                    "target_branch": "main",
                    "author_is_team_member": true
                },
                {
                    "id": 2,
                    "source_owner": "outsider",
                    "source_repo": "widgets",
                    "source_branch": "patch",
                    "target_branch": "main",
                    "is_fork": true
                }
            ]
        },
        {
            "owner": "cloudbeers",
            "repository": "gadgets",
            "branches": [{ "name": "main", "head_revision": "g1" }]
        }
    ]
}"#;

#[derive(Default)]
struct RecordingRegistrar {
    calls: Mutex<Vec<(NavigatorId, WebhookMode)>>,
}

impl RecordingRegistrar {
    fn calls(&self) -> Vec<(NavigatorId, WebhookMode)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebhookRegistrar for RecordingRegistrar {
    async fn apply(&self, navigator: &NavigatorId, mode: WebhookMode) -> Result<(), SourceError> {
        self.calls.lock().unwrap().push((navigator.clone(), mode));
        Ok(())
    }
}

/// Fails every branch listing.
struct UnreachableSource;

#[async_trait]
impl RepositorySource for UnreachableSource {
    async fn list_repositories(
        &self,
        _: &RepoOwner,
        _: Option<&ProjectKey>,
    ) -> Result<Vec<RepositoryName>, SourceError> {
        Ok(vec![RepositoryName::new("widgets").unwrap()])
    }

    async fn list_branches(
        &self,
        _: &RepoOwner,
        _: &RepositoryName,
    ) -> Result<Vec<BranchRef>, SourceError> {
        Err(SourceError::Transport {
            message: "connection reset".to_string(),
            retry: RetryPolicy::Retryable { after: None },
        })
    }

    async fn list_pull_requests(
        &self,
        _: &RepoOwner,
        _: &RepositoryName,
    ) -> Result<Vec<PullRequestRef>, SourceError> {
        Ok(Vec::new())
    }

    async fn is_repository_public(&self, _: &RepoOwner, _: &RepositoryName) -> Result<bool, SourceError> {
        Ok(false)
    }
}

/// Counts how many repository listings are in flight at once.
#[derive(Default)]
struct SlowSource {
    active: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl RepositorySource for SlowSource {
    async fn list_repositories(
        &self,
        _: &RepoOwner,
        _: Option<&ProjectKey>,
    ) -> Result<Vec<RepositoryName>, SourceError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    async fn list_branches(
        &self,
        _: &RepoOwner,
        _: &RepositoryName,
    ) -> Result<Vec<BranchRef>, SourceError> {
        Ok(Vec::new())
    }

    async fn list_pull_requests(
        &self,
        _: &RepoOwner,
        _: &RepositoryName,
    ) -> Result<Vec<PullRequestRef>, SourceError> {
        Ok(Vec::new())
    }

    async fn is_repository_public(&self, _: &RepoOwner, _: &RepositoryName) -> Result<bool, SourceError> {
        Ok(false)
    }
}

/// Panics while listing for owners `early` (at once) and `late` (after a
/// delay), so failures complete in the reverse of input order.
struct PanickingSource;

#[async_trait]
impl RepositorySource for PanickingSource {
    async fn list_repositories(
        &self,
        owner: &RepoOwner,
        _: Option<&ProjectKey>,
    ) -> Result<Vec<RepositoryName>, SourceError> {
        match owner.as_str() {
            "early" => panic!("listing exploded for early"),
            "late" => {
                tokio::time::sleep(Duration::from_millis(50)).await;
                panic!("listing exploded for late")
            }
            _ => Ok(Vec::new()),
        }
    }

    async fn list_branches(
        &self,
        _: &RepoOwner,
        _: &RepositoryName,
    ) -> Result<Vec<BranchRef>, SourceError> {
        Ok(Vec::new())
    }

    async fn list_pull_requests(
        &self,
        _: &RepoOwner,
        _: &RepositoryName,
    ) -> Result<Vec<PullRequestRef>, SourceError> {
        Ok(Vec::new())
    }

    async fn is_repository_public(&self, _: &RepoOwner, _: &RepositoryName) -> Result<bool, SourceError> {
        Ok(false)
    }
}

fn fixture_source() -> Arc<SnapshotSource> {
    Arc::new(SnapshotSource::from_json(FIXTURE).unwrap())
}

fn navigator(owner: &str, traits: Vec<NavigatorTrait>) -> Navigator {
    let mut navigator = Navigator::new(owner, &EndpointConfig::default()).unwrap();
    navigator.set_credentials_id(Some("bitbucket"));
    navigator.set_traits(traits);
    navigator
}

fn standard_traits(trust: TrustPolicy) -> Vec<NavigatorTrait> {
    vec![
        NavigatorTrait::branch_discovery(true, false),
        NavigatorTrait::origin_pull_requests(PullRequestStrategy::Head),
        NavigatorTrait::fork_pull_requests(PullRequestStrategy::Head, trust),
        NavigatorTrait::webhook_registration(WebhookMode::Item),
    ]
}

fn names_and_trust(heads: &[Head]) -> Vec<(&str, bool)> {
    heads.iter().map(|h| (h.name(), h.is_trusted())).collect()
}

#[tokio::test]
async fn scan_reports_heads_per_repository() {
    let registrar = Arc::new(RecordingRegistrar::default());
    let scanner = NavigatorScanner::new(fixture_source(), registrar.clone());

    let report = scanner
        .scan(&navigator("cloudbeers", standard_traits(TrustPolicy::TrustNobody)))
        .await
        .unwrap();

    assert_eq!(report.navigator_id.as_str(), "https://bitbucket.org::cloudbeers");
    assert_eq!(report.repositories.len(), 2);
    assert_eq!(
        names_and_trust(&report.repositories[0].heads),
        vec![("main", true), ("PR-1", true), ("PR-2", false)]
    );
    assert_eq!(names_and_trust(&report.repositories[1].heads), vec![("main", true)]);
    assert_eq!(report.total_heads(), 4);
    assert!(report.started_at <= report.completed_at);
    assert_eq!(report.checkout, CheckoutCredentials::UseScan);
    assert_eq!(
        report.checkout_credentials_id.as_ref().map(CredentialsId::as_str),
        Some("bitbucket")
    );
}

#[tokio::test]
async fn registrar_is_called_once_with_composed_mode() {
    let registrar = Arc::new(RecordingRegistrar::default());
    let scanner = NavigatorScanner::new(fixture_source(), registrar.clone());
    let navigator = navigator("cloudbeers", standard_traits(TrustPolicy::TrustNobody));

    scanner.scan(&navigator).await.unwrap();

    assert_eq!(registrar.calls(), vec![(navigator.id(), WebhookMode::Item)]);
}

#[tokio::test]
async fn empty_trait_list_discovers_nothing_and_disables_hooks() {
    let registrar = Arc::new(RecordingRegistrar::default());
    let scanner = NavigatorScanner::new(fixture_source(), registrar.clone());

    let report = scanner.scan(&navigator("cloudbeers", Vec::new())).await.unwrap();

    assert_eq!(report.total_heads(), 0);
    assert_eq!(report.webhook_mode, WebhookMode::Disable);
    assert_eq!(registrar.calls().len(), 1);
    assert_eq!(registrar.calls()[0].1, WebhookMode::Disable);
}

#[tokio::test]
async fn source_failure_fails_the_cycle_without_registering() {
    let registrar = Arc::new(RecordingRegistrar::default());
    let scanner = NavigatorScanner::new(Arc::new(UnreachableSource), registrar.clone());

    let err = scanner
        .scan(&navigator("cloudbeers", standard_traits(TrustPolicy::TrustNobody)))
        .await
        .unwrap_err();

    assert!(matches!(err, ScanError::Source { .. }));
    assert_eq!(err.retry_policy(), RetryPolicy::Retryable { after: None });
    assert!(registrar.calls().is_empty());
}

#[tokio::test]
async fn fork_history_decides_existing_fork_trust() {
    let history = |_: &RepositorySnapshot, pr: &PullRequestRef| pr.id.as_u64() == 2;
    let scanner = NavigatorScanner::new(fixture_source(), Arc::new(RecordingRegistrar::default()))
        .with_fork_history(Arc::new(history));

    let report = scanner
        .scan(&navigator(
            "cloudbeers",
            standard_traits(TrustPolicy::TrustExistingForksOnly),
        ))
        .await
        .unwrap();

    assert_eq!(
        names_and_trust(&report.repositories[0].heads),
        vec![("main", true), ("PR-1", true), ("PR-2", true)]
    );
}

#[tokio::test]
async fn head_limit_stops_discovery_early() {
    let scanner = NavigatorScanner::new(fixture_source(), Arc::new(RecordingRegistrar::default()))
        .with_head_limit(1);

    let report = scanner
        .scan(&navigator("cloudbeers", standard_traits(TrustPolicy::TrustEveryone)))
        .await
        .unwrap();

    assert!(report.repositories.iter().all(|r| r.heads.len() == 1));
    assert_eq!(report.repositories[0].heads[0].name(), "main");
}

#[tokio::test]
async fn unknown_credentials_only_warn() {
    let scanner = NavigatorScanner::new(fixture_source(), Arc::new(RecordingRegistrar::default()))
        .with_credential_store(Arc::new(StaticCredentialStore::default()));

    let report = scanner
        .scan(&navigator("cloudbeers", standard_traits(TrustPolicy::TrustNobody)))
        .await;

    assert!(report.is_ok());
}

#[tokio::test]
async fn cycles_for_one_navigator_are_serialized() {
    let source = Arc::new(SlowSource::default());
    let scanner = Arc::new(NavigatorScanner::new(
        source.clone(),
        Arc::new(RecordingRegistrar::default()),
    ));
    let same = navigator("cloudbeers", Vec::new());

    let outcomes = scanner.scan_all(vec![same.clone(), same.clone(), same]).await;

    assert!(outcomes.iter().all(Result::is_ok));
    assert_eq!(source.peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cycles_for_different_navigators_overlap() {
    let source = Arc::new(SlowSource::default());
    let scanner = Arc::new(NavigatorScanner::new(
        source.clone(),
        Arc::new(RecordingRegistrar::default()),
    ));

    let outcomes = scanner
        .scan_all(vec![navigator("cloudbeers", Vec::new()), navigator("DUB", Vec::new())])
        .await;

    assert!(outcomes.iter().all(Result::is_ok));
    assert_eq!(source.peak.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn scan_all_keeps_input_order() {
    let scanner = Arc::new(NavigatorScanner::new(
        Arc::new(SlowSource::default()),
        Arc::new(RecordingRegistrar::default()),
    ));
    let owners = ["zeta", "alpha", "mid"];

    let outcomes = scanner
        .scan_all(owners.iter().map(|o| navigator(o, Vec::new())).collect())
        .await;

    let ids: Vec<String> = outcomes
        .into_iter()
        .map(|o| o.unwrap().navigator_id.to_string())
        .collect();
    assert_eq!(
        ids,
        vec![
            "https://bitbucket.org::zeta",
            "https://bitbucket.org::alpha",
            "https://bitbucket.org::mid",
        ]
    );
}

#[tokio::test]
async fn regex_filter_skips_repositories_but_keeps_their_branches() {
    let scanner = NavigatorScanner::new(fixture_source(), Arc::new(RecordingRegistrar::default()));
    let traits = vec![
        NavigatorTrait::branch_discovery(true, true),
        RegexFilterTrait::new("widg.*").unwrap().into(),
    ];

    let report = scanner.scan(&navigator("cloudbeers", traits)).await.unwrap();

    assert_eq!(report.repositories.len(), 1);
    assert_eq!(report.repositories[0].repository.as_str(), "widgets");
    assert_eq!(
        names_and_trust(&report.repositories[0].heads),
        vec![("main", true), ("feature/a", true)]
    );
}

#[tokio::test]
async fn lock_map_is_pruned_after_cycles() {
    let scanner = Arc::new(NavigatorScanner::new(
        Arc::new(SlowSource::default()),
        Arc::new(RecordingRegistrar::default()),
    ));
    let same = navigator("cloudbeers", Vec::new());

    scanner.scan(&same).await.unwrap();
    assert!(scanner.locks.lock().unwrap().is_empty());

    let outcomes = scanner
        .scan_all(vec![same.clone(), same, navigator("DUB", Vec::new())])
        .await;

    assert!(outcomes.iter().all(Result::is_ok));
    assert!(scanner.locks.lock().unwrap().is_empty());
}

#[tokio::test]
async fn panicking_cycle_is_reported_for_its_own_navigator() {
    let scanner = Arc::new(NavigatorScanner::new(
        Arc::new(PanickingSource),
        Arc::new(RecordingRegistrar::default()),
    ));

    let outcomes = scanner
        .scan_all(vec![
            navigator("late", Vec::new()),
            navigator("fine", Vec::new()),
            navigator("early", Vec::new()),
        ])
        .await;

    let aborted = |outcome: &Result<DiscoveryReport, ScanError>| match outcome {
        Err(ScanError::Aborted { navigator, message }) => {
            Some((navigator.to_string(), message.clone()))
        }
        _ => None,
    };

    let (late_id, late_message) = aborted(&outcomes[0]).unwrap();
    assert_eq!(late_id, "https://bitbucket.org::late");
    assert!(late_message.contains("exploded for late"), "{late_message}");

    assert!(outcomes[1].is_ok());

    let (early_id, early_message) = aborted(&outcomes[2]).unwrap();
    assert_eq!(early_id, "https://bitbucket.org::early");
    assert!(early_message.contains("exploded for early"), "{early_message}");
}
