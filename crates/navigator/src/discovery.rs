//! The discovery and filtering pipeline.
//!
//! [`discover`] turns one repository snapshot into the buildable [`Head`]s a
//! [`DecisionContext`] asks for. The snapshot is gathered beforehand by the
//! orchestration layer through [`crate::ports::RepositorySource`], so the
//! pipeline itself performs no I/O and can run on any thread.
//!
//! The returned iterator is lazy. Branch heads come first in snapshot order,
//! then pull-request heads in snapshot order, so output is stable for a fixed
//! snapshot. A consumer may stop pulling at any point.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    BranchName, CommitSha, DecisionContext, PullRequestId, PullRequestStrategy, RepoOwner,
    RepositoryName, RevisionKind, TrustPolicy,
};

#[path = "discovery_tests.rs"]
#[cfg(test)]
mod tests;

// ---------------------------------------------------------------------------
// Snapshot types
// ---------------------------------------------------------------------------

/// A branch as listed by the hosting service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRef {
    /// Branch name.
    pub name: BranchName,
    /// Latest commit on the branch.
    pub head_revision: CommitSha,
}

/// An open pull request as listed by the hosting service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRef {
    /// Pull-request number.
    pub id: PullRequestId,
    /// Owner of the repository the source branch lives in.
    pub source_owner: RepoOwner,
    /// Repository the source branch lives in.
    pub source_repo: RepositoryName,
    /// Branch carrying the changes.
    pub source_branch: BranchName,
    /// Branch the PR targets.
    pub target_branch: BranchName,
    /// Author login, for logging only.
    #[serde(default)]
    pub author: String,
    /// Author belongs to the owning team.
    #[serde(default)]
    pub author_is_team_member: bool,
    /// The hosting service reports the source as a fork.
    #[serde(default)]
    pub is_fork: bool,
}

/// Everything discovery needs to know about one repository at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySnapshot {
    /// Owner of the repository.
    pub owner: RepoOwner,
    /// Repository name.
    pub repository: RepositoryName,
    /// Whether the repository is publicly visible.
    #[serde(default)]
    pub is_public: bool,
    /// Branches in listing order.
    #[serde(default)]
    pub branches: Vec<BranchRef>,
    /// Open pull requests in listing order.
    #[serde(default)]
    pub pull_requests: Vec<PullRequestRef>,
}

impl RepositorySnapshot {
    /// Returns `true` if `pr` comes from a fork rather than this repository.
    pub fn is_fork(&self, pr: &PullRequestRef) -> bool {
        pr.is_fork
            || !pr.source_owner.as_str().eq_ignore_ascii_case(self.owner.as_str())
            || !pr.source_repo.as_str().eq_ignore_ascii_case(self.repository.as_str())
    }
}

// ---------------------------------------------------------------------------
// Heads
// ---------------------------------------------------------------------------

/// Where a pull request's source branch lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestOrigin {
    /// Same repository as the target.
    Origin,
    /// A fork.
    Fork,
}

/// A branch head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchHead {
    /// Branch name, also the head name.
    pub name: BranchName,
    /// Revision to build.
    pub revision: CommitSha,
}

/// A pull-request head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestHead {
    /// `PR-{id}`, or `PR-{id}-head` / `PR-{id}-merge` when both are built.
    pub name: String,
    /// Pull-request number.
    pub id: PullRequestId,
    /// Owner of the source repository.
    pub source_owner: RepoOwner,
    /// Source repository.
    pub source_repo: RepositoryName,
    /// Source branch.
    pub source_branch: BranchName,
    /// Target branch.
    pub target_branch: BranchName,
    /// Origin or fork.
    pub origin: PullRequestOrigin,
    /// Whether the PR's code is trusted for automated builds.
    pub trusted: bool,
    /// Which revision this head builds.
    pub revision_kind: RevisionKind,
}

/// One buildable unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Head {
    /// A plain branch.
    Branch(BranchHead),
    /// A pull request.
    PullRequest(PullRequestHead),
}

impl Head {
    /// The head's name.
    pub fn name(&self) -> &str {
        match self {
            Head::Branch(b) => b.name.as_str(),
            Head::PullRequest(pr) => &pr.name,
        }
    }

    /// Returns `true` for branches and trusted pull requests.
    pub fn is_trusted(&self) -> bool {
        match self {
            Head::Branch(_) => true,
            Head::PullRequest(pr) => pr.trusted,
        }
    }
}

// ---------------------------------------------------------------------------
// Fork history
// ---------------------------------------------------------------------------

/// Answers "has this fork been built before?" for
/// [`TrustPolicy::TrustExistingForksOnly`].
///
/// Build history is owned by the caller; closures work as implementations.
pub trait ForkHistory {
    /// Returns `true` if a previous build of `pr`'s fork exists.
    fn has_prior_build(&self, repository: &RepositorySnapshot, pr: &PullRequestRef) -> bool;
}

impl<F> ForkHistory for F
where
    F: Fn(&RepositorySnapshot, &PullRequestRef) -> bool,
{
    fn has_prior_build(&self, repository: &RepositorySnapshot, pr: &PullRequestRef) -> bool {
        self(repository, pr)
    }
}

/// A [`ForkHistory`] with no recorded builds.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoForkHistory;

impl ForkHistory for NoForkHistory {
    fn has_prior_build(&self, _: &RepositorySnapshot, _: &PullRequestRef) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Lazily yields the heads `context` selects from `snapshot`. Nothing is
/// yielded when the snapshot's repository fails the repository filters.
pub fn discover<'a, H>(
    context: &'a DecisionContext,
    snapshot: &'a RepositorySnapshot,
    history: &'a H,
) -> impl Iterator<Item = Head> + 'a
where
    H: ForkHistory + ?Sized,
{
    // Source branches of open origin PRs. Bounded by the PR count.
    let filed_as_pr: HashSet<&'a str> = snapshot
        .pull_requests
        .iter()
        .filter(|pr| !snapshot.is_fork(pr))
        .map(|pr| pr.source_branch.as_str())
        .collect();
    let origin_enabled = context.origin_pull_requests.is_some();
    // A filtered-out repository yields no heads at all.
    let repository_accepted = context.accepts_repository(snapshot.repository.as_str());

    let branches = context
        .branch_discovery
        .filter(|_| repository_accepted)
        .into_iter()
        .flat_map(move |policy| {
            let filed_as_pr = filed_as_pr.clone();
            snapshot.branches.iter().filter(move |branch| {
                let name = branch.name.as_str();
                if !context.accepts(name) {
                    return false;
                }
                if filed_as_pr.contains(name) {
                    // Suppressed only when the origin PR head will stand in for it.
                    policy.build_branches_with_pr || (policy.build_branch && !origin_enabled)
                } else {
                    policy.build_branch
                }
            })
        })
        .map(|branch| {
            Head::Branch(BranchHead {
                name: branch.name.clone(),
                revision: branch.head_revision.clone(),
            })
        });

    let pull_requests = snapshot
        .pull_requests
        .iter()
        .take_while(move |_| repository_accepted)
        .filter_map(move |pr| {
            let fork = snapshot.is_fork(pr);
            let strategy = if fork {
                context.fork_pull_requests?
            } else {
                context.origin_pull_requests?
            };
            if !context.accepts(pr.source_branch.as_str()) {
                return None;
            }
            let trusted = !fork || is_trusted_fork(context, snapshot, pr, history);
            Some((pr, fork, strategy, trusted))
        })
        .flat_map(|(pr, fork, strategy, trusted)| {
            strategy
                .revision_kinds()
                .iter()
                .map(move |&kind| pull_request_head(pr, fork, strategy, kind, trusted))
        });

    branches.chain(pull_requests)
}

fn is_trusted_fork<H>(
    context: &DecisionContext,
    snapshot: &RepositorySnapshot,
    pr: &PullRequestRef,
    history: &H,
) -> bool
where
    H: ForkHistory + ?Sized,
{
    let by_policy = match context.fork_trust {
        TrustPolicy::TrustEveryone => true,
        TrustPolicy::TrustNobody => false,
        TrustPolicy::TrustTeamMembers => pr.author_is_team_member,
        TrustPolicy::TrustExistingForksOnly => history.has_prior_build(snapshot, pr),
    };
    by_policy || (context.trust_public_repositories && snapshot.is_public)
}

fn pull_request_head(
    pr: &PullRequestRef,
    fork: bool,
    strategy: PullRequestStrategy,
    kind: RevisionKind,
    trusted: bool,
) -> Head {
    let name = match strategy {
        PullRequestStrategy::HeadAndMerge => format!("PR-{}-{}", pr.id, kind.suffix()),
        PullRequestStrategy::Head | PullRequestStrategy::Merge => format!("PR-{}", pr.id),
    };
    Head::PullRequest(PullRequestHead {
        name,
        id: pr.id,
        source_owner: pr.source_owner.clone(),
        source_repo: pr.source_repo.clone(),
        source_branch: pr.source_branch.clone(),
        target_branch: pr.target_branch.clone(),
        origin: if fork {
            PullRequestOrigin::Fork
        } else {
            PullRequestOrigin::Origin
        },
        trusted,
        revision_kind: kind,
    })
}
