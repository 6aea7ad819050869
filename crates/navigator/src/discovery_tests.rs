use super::*;
use crate::{
    compose, CompositionBase, NavigatorTrait, RegexFilterTrait, WebhookMode, WildcardFilterTrait,
};

fn owner() -> RepoOwner {
    RepoOwner::new("cloudbeers").unwrap()
}

fn context(traits: &[NavigatorTrait]) -> DecisionContext {
    let owner = owner();
    compose(
        &CompositionBase {
            repo_owner: &owner,
            server_url: "https://bitbucket.org",
            credentials_id: None,
            project_key: None,
        },
        traits,
    )
}

fn branch(name: &str) -> BranchRef {
    BranchRef {
        name: BranchName::new(name).unwrap(),
        head_revision: CommitSha::new(format!("{name}-sha")).unwrap(),
    }
}

fn origin_pr(id: u64, source: &str) -> PullRequestRef {
    PullRequestRef {
        id: PullRequestId::new(id),
        source_owner: owner(),
        source_repo: RepositoryName::new("widgets").unwrap(),
        source_branch: BranchName::new(source).unwrap(),
        target_branch: BranchName::new("main").unwrap(),
        author: "alice".to_string(),
        author_is_team_member: true,
        is_fork: false,
    }
}

fn fork_pr(id: u64, source: &str, team_member: bool) -> PullRequestRef {
    PullRequestRef {
        id: PullRequestId::new(id),
        source_owner: RepoOwner::new("outsider").unwrap(),
        source_repo: RepositoryName::new("widgets").unwrap(),
        source_branch: BranchName::new(source).unwrap(),
        target_branch: BranchName::new("main").unwrap(),
        author: "mallory".to_string(),
        author_is_team_member: team_member,
        is_fork: true,
    }
}

fn snapshot(branches: Vec<BranchRef>, pull_requests: Vec<PullRequestRef>) -> RepositorySnapshot {
    RepositorySnapshot {
        owner: owner(),
        repository: RepositoryName::new("widgets").unwrap(),
        is_public: false,
        branches,
        pull_requests,
    }
}

fn names(context: &DecisionContext, snapshot: &RepositorySnapshot) -> Vec<String> {
    discover(context, snapshot, &NoForkHistory)
        .map(|h| h.name().to_string())
        .collect()
}

fn pull_request_heads(context: &DecisionContext, snapshot: &RepositorySnapshot) -> Vec<PullRequestHead> {
    discover(context, snapshot, &NoForkHistory)
        .filter_map(|h| match h {
            Head::PullRequest(pr) => Some(pr),
            Head::Branch(_) => None,
        })
        .collect()
}

#[test]
fn no_traits_discovers_nothing() {
    let snap = snapshot(vec![branch("main")], vec![origin_pr(1, "feature")]);
    assert!(names(&context(&[]), &snap).is_empty());
}

#[test]
fn branch_discovery_lists_branches_in_snapshot_order() {
    let snap = snapshot(vec![branch("main"), branch("develop"), branch("feature/x")], vec![]);
    let ctx = context(&[NavigatorTrait::branch_discovery(true, true)]);
    assert_eq!(names(&ctx, &snap), vec!["main", "develop", "feature/x"]);

    let first = discover(&ctx, &snap, &NoForkHistory).next().unwrap();
    assert_eq!(
        first,
        Head::Branch(BranchHead {
            name: BranchName::new("main").unwrap(),
            revision: CommitSha::new("main-sha").unwrap(),
        })
    );
}

#[test]
fn branch_with_origin_pr_is_not_double_counted() {
    let snap = snapshot(vec![branch("main"), branch("feature")], vec![origin_pr(7, "feature")]);
    let ctx = context(&[
        NavigatorTrait::branch_discovery(true, false),
        NavigatorTrait::origin_pull_requests(PullRequestStrategy::Head),
    ]);
    assert_eq!(names(&ctx, &snap), vec!["main", "PR-7"]);
}

#[test]
fn branch_with_pr_is_kept_when_origin_discovery_is_off() {
    let snap = snapshot(vec![branch("main"), branch("feature")], vec![origin_pr(7, "feature")]);
    let ctx = context(&[NavigatorTrait::branch_discovery(true, false)]);
    assert_eq!(names(&ctx, &snap), vec!["main", "feature"]);
}

#[test]
fn build_branches_with_pr_keeps_both() {
    let snap = snapshot(vec![branch("feature")], vec![origin_pr(7, "feature")]);
    let ctx = context(&[
        NavigatorTrait::branch_discovery(true, true),
        NavigatorTrait::origin_pull_requests(PullRequestStrategy::Head),
    ]);
    assert_eq!(names(&ctx, &snap), vec!["feature", "PR-7"]);
}

#[test]
fn pr_branches_only() {
    let snap = snapshot(vec![branch("main"), branch("feature")], vec![origin_pr(7, "feature")]);
    let ctx = context(&[NavigatorTrait::branch_discovery(false, true)]);
    assert_eq!(names(&ctx, &snap), vec!["feature"]);
}

#[test]
fn filters_apply_to_branches_and_pr_sources() {
    let snap = snapshot(
        vec![branch("limited-x"), branch("other-branch")],
        vec![origin_pr(1, "limited-fix"), origin_pr(2, "other-fix")],
    );
    let ctx = context(&[
        NavigatorTrait::branch_discovery(true, true),
        NavigatorTrait::origin_pull_requests(PullRequestStrategy::Merge),
        WildcardFilterTrait::new("limited-*", "").unwrap().into(),
    ]);
    assert_eq!(names(&ctx, &snap), vec!["limited-x", "PR-1"]);
}

#[test]
fn filtered_out_repository_yields_nothing() {
    let snap = snapshot(vec![branch("main")], vec![origin_pr(1, "feature")]);
    let ctx = context(&[
        NavigatorTrait::branch_discovery(true, true),
        NavigatorTrait::origin_pull_requests(PullRequestStrategy::Merge),
        RegexFilterTrait::new("gadg.*").unwrap().into(),
    ]);
    assert!(names(&ctx, &snap).is_empty());
}

#[test]
fn accepted_repository_keeps_every_branch() {
    let snap = snapshot(vec![branch("main"), branch("other-branch")], vec![]);
    let ctx = context(&[
        NavigatorTrait::branch_discovery(true, true),
        RegexFilterTrait::new("widg.*").unwrap().into(),
    ]);
    assert_eq!(names(&ctx, &snap), vec!["main", "other-branch"]);
}

#[test]
fn wildcard_excludes_drop_branches() {
    let snap = snapshot(vec![branch("main"), branch("develop")], vec![]);
    let ctx = context(&[
        NavigatorTrait::branch_discovery(true, true),
        WildcardFilterTrait::new("*", "main").unwrap().into(),
    ]);
    assert_eq!(names(&ctx, &snap), vec!["develop"]);
}

#[test]
fn head_and_merge_yields_two_heads_per_pr() {
    let snap = snapshot(vec![], vec![origin_pr(3, "feature")]);
    let ctx = context(&[NavigatorTrait::origin_pull_requests(PullRequestStrategy::HeadAndMerge)]);
    let heads = pull_request_heads(&ctx, &snap);
    assert_eq!(heads.len(), 2);
    assert_eq!(heads[0].name, "PR-3-head");
    assert_eq!(heads[0].revision_kind, RevisionKind::Head);
    assert_eq!(heads[1].name, "PR-3-merge");
    assert_eq!(heads[1].revision_kind, RevisionKind::Merge);
}

#[test]
fn origin_prs_are_always_trusted() {
    let snap = snapshot(vec![], vec![origin_pr(1, "feature")]);
    let ctx = context(&[NavigatorTrait::origin_pull_requests(PullRequestStrategy::Head)]);
    let heads = pull_request_heads(&ctx, &snap);
    assert_eq!(heads[0].origin, PullRequestOrigin::Origin);
    assert!(heads[0].trusted);
}

#[test]
fn fork_prs_need_fork_discovery() {
    let snap = snapshot(vec![], vec![fork_pr(4, "patch", true)]);
    let ctx = context(&[NavigatorTrait::origin_pull_requests(PullRequestStrategy::Head)]);
    assert!(names(&ctx, &snap).is_empty());
}

#[test]
fn source_in_another_owner_is_a_fork_even_without_the_flag() {
    let mut pr = fork_pr(4, "patch", false);
    pr.is_fork = false;
    let snap = snapshot(vec![], vec![pr]);
    let ctx = context(&[NavigatorTrait::fork_pull_requests(
        PullRequestStrategy::Head,
        TrustPolicy::TrustEveryone,
    )]);
    let heads = pull_request_heads(&ctx, &snap);
    assert_eq!(heads[0].origin, PullRequestOrigin::Fork);
}

#[test]
fn untrusted_forks_are_surfaced_but_flagged() {
    let snap = snapshot(vec![], vec![fork_pr(4, "patch", false)]);
    let ctx = context(&[NavigatorTrait::fork_pull_requests(
        PullRequestStrategy::Head,
        TrustPolicy::TrustNobody,
    )]);
    let heads = pull_request_heads(&ctx, &snap);
    assert_eq!(heads.len(), 1);
    assert!(!heads[0].trusted);
}

#[test]
fn team_member_trust_follows_the_author_flag() {
    let snap = snapshot(vec![], vec![fork_pr(4, "a", true), fork_pr(5, "b", false)]);
    let ctx = context(&[NavigatorTrait::fork_pull_requests(
        PullRequestStrategy::Head,
        TrustPolicy::TrustTeamMembers,
    )]);
    let trusted: Vec<bool> = pull_request_heads(&ctx, &snap).iter().map(|h| h.trusted).collect();
    assert_eq!(trusted, vec![true, false]);
}

#[test]
fn existing_forks_trust_asks_the_history() {
    let snap = snapshot(vec![], vec![fork_pr(4, "a", false), fork_pr(5, "b", false)]);
    let ctx = context(&[NavigatorTrait::fork_pull_requests(
        PullRequestStrategy::Head,
        TrustPolicy::TrustExistingForksOnly,
    )]);
    let history = |_: &RepositorySnapshot, pr: &PullRequestRef| pr.id.as_u64() == 5;
    let trusted: Vec<bool> = discover(&ctx, &snap, &history).map(|h| h.is_trusted()).collect();
    assert_eq!(trusted, vec![false, true]);
}

#[test]
fn public_repository_relaxation_trusts_forks() {
    let mut snap = snapshot(vec![], vec![fork_pr(4, "patch", false)]);
    snap.is_public = true;
    let traits = [
        NavigatorTrait::fork_pull_requests(PullRequestStrategy::Head, TrustPolicy::TrustNobody),
        NavigatorTrait::PublicRepoPullRequestFilter,
    ];
    let heads = pull_request_heads(&context(&traits), &snap);
    assert!(heads[0].trusted);

    snap.is_public = false;
    let heads = pull_request_heads(&context(&traits), &snap);
    assert!(!heads[0].trusted, "private repositories get no relaxation");
}

#[test]
fn output_is_stable_across_runs() {
    let snap = snapshot(
        vec![branch("main"), branch("feature")],
        vec![origin_pr(7, "feature"), fork_pr(8, "patch", true)],
    );
    let ctx = context(&[
        NavigatorTrait::branch_discovery(true, false),
        NavigatorTrait::origin_pull_requests(PullRequestStrategy::HeadAndMerge),
        NavigatorTrait::fork_pull_requests(PullRequestStrategy::Merge, TrustPolicy::TrustTeamMembers),
        NavigatorTrait::webhook_registration(WebhookMode::Item),
    ]);
    let first: Vec<Head> = discover(&ctx, &snap, &NoForkHistory).collect();
    let second: Vec<Head> = discover(&ctx, &snap, &NoForkHistory).collect();
    assert_eq!(first, second);
    assert_eq!(
        first.iter().map(Head::name).collect::<Vec<_>>(),
        vec!["main", "PR-7-head", "PR-7-merge", "PR-8"]
    );
}

#[test]
fn consumers_can_stop_early() {
    let branches = (0..1000).map(|i| branch(&format!("b{i}"))).collect();
    let snap = snapshot(branches, vec![]);
    let ctx = context(&[NavigatorTrait::branch_discovery(true, true)]);
    let taken: Vec<Head> = discover(&ctx, &snap, &NoForkHistory).take(2).collect();
    assert_eq!(taken.len(), 2);
}
