//! The trait composition engine.
//!
//! [`compose`] folds an ordered trait list into a fresh [`DecisionContext`].
//! It is pure: no I/O, no shared state, and the same inputs always produce an
//! equal context. It never fails. Unknown traits are skipped, and a filter whose
//! pattern does not compile becomes a filter that rejects every name.

use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use serde::Serialize;

use crate::{
    resolve_checkout_credentials, BranchDiscoveryTrait, CheckoutCredentials, CredentialsId,
    DecisionContributor, NavigatorError, NavigatorTrait, ProjectKey, PullRequestStrategy,
    RepoOwner, TrustPolicy, WebhookMode,
};

// Unit tests live in a sibling file to keep this module readable.
#[path = "compose_tests.rs"]
#[cfg(test)]
mod tests;

// ---------------------------------------------------------------------------
// Name filters
// ---------------------------------------------------------------------------

/// One compiled name filter.
///
/// Equality compares the source patterns, never the compiled matchers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NameFilter {
    /// Whole-name regular expression.
    Regex {
        /// Source pattern.
        pattern: String,
        #[serde(skip)]
        matcher: Regex,
    },
    /// Space-separated glob includes and excludes.
    Wildcard {
        /// Source include patterns.
        includes: String,
        /// Source exclude patterns.
        excludes: String,
        #[serde(skip)]
        include_set: GlobSet,
        #[serde(skip)]
        exclude_set: GlobSet,
    },
    /// A pattern that failed to compile. Rejects every name.
    Invalid {
        /// Source pattern.
        pattern: String,
        /// Compiler diagnostic.
        reason: String,
    },
}

impl NameFilter {
    /// Compiles a whole-name regular expression filter.
    pub fn regex(pattern: &str) -> Self {
        match Regex::new(&format!("^(?:{pattern})$")) {
            Ok(matcher) => NameFilter::Regex {
                pattern: pattern.to_string(),
                matcher,
            },
            Err(e) => NameFilter::Invalid {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            },
        }
    }

    /// Compiles a wildcard filter from space-separated include and exclude lists.
    pub fn wildcard(includes: &str, excludes: &str) -> Self {
        let sets = glob_set(includes).and_then(|inc| glob_set(excludes).map(|exc| (inc, exc)));
        match sets {
            Ok((include_set, exclude_set)) => NameFilter::Wildcard {
                includes: includes.to_string(),
                excludes: excludes.to_string(),
                include_set,
                exclude_set,
            },
            Err(e) => NameFilter::Invalid {
                pattern: format!("{includes} !{excludes}"),
                reason: e.to_string(),
            },
        }
    }

    /// Returns `true` if `name` passes this filter.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            NameFilter::Regex { matcher, .. } => matcher.is_match(name),
            NameFilter::Wildcard {
                include_set,
                exclude_set,
                ..
            } => include_set.is_match(name) && !exclude_set.is_match(name),
            NameFilter::Invalid { .. } => false,
        }
    }

    /// Turns an [`NameFilter::Invalid`] into an error.
    pub fn into_result(self) -> Result<Self, NavigatorError> {
        match self {
            NameFilter::Invalid { pattern, reason } => {
                Err(NavigatorError::InvalidPattern { pattern, reason })
            }
            valid => Ok(valid),
        }
    }
}

impl PartialEq for NameFilter {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (NameFilter::Regex { pattern: a, .. }, NameFilter::Regex { pattern: b, .. }) => a == b,
            (
                NameFilter::Wildcard {
                    includes: ai,
                    excludes: ae,
                    ..
                },
                NameFilter::Wildcard {
                    includes: bi,
                    excludes: be,
                    ..
                },
            ) => ai == bi && ae == be,
            (
                NameFilter::Invalid {
                    pattern: a,
                    reason: ar,
                },
                NameFilter::Invalid {
                    pattern: b,
                    reason: br,
                },
            ) => a == b && ar == br,
            _ => false,
        }
    }
}

fn glob_set(patterns: &str) -> Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns.split_whitespace() {
        builder.add(Glob::new(pattern)?);
    }
    builder.build()
}

// ---------------------------------------------------------------------------
// Decision context
// ---------------------------------------------------------------------------

/// The fully resolved behaviour of one navigator, produced by [`compose`].
///
/// Every field has a safe default: nothing is discovered, no fork is trusted,
/// every repository and head name is accepted, checkout uses the scan
/// credentials and webhooks are disabled.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DecisionContext {
    /// Plain branch discovery; `None` means disabled.
    pub branch_discovery: Option<BranchDiscoveryTrait>,
    /// Origin pull-request strategy; `None` means disabled.
    pub origin_pull_requests: Option<PullRequestStrategy>,
    /// Fork pull-request strategy; `None` means disabled.
    pub fork_pull_requests: Option<PullRequestStrategy>,
    /// Trust policy for fork pull requests.
    pub fork_trust: TrustPolicy,
    /// Fork pull requests on public repositories are trusted regardless of policy.
    pub trust_public_repositories: bool,
    /// Conjunction of filters on repository names. Empty accepts everything.
    pub repository_filters: Vec<NameFilter>,
    /// Conjunction of filters on branch and PR source-branch names. Empty
    /// accepts everything.
    pub name_filters: Vec<NameFilter>,
    /// Checkout credentials, already resolved against the scan credentials.
    pub checkout: CheckoutCredentials,
    /// Webhook registration mode.
    pub webhook_mode: WebhookMode,
}

impl DecisionContext {
    /// Returns `true` if the head name `name` passes every name filter.
    pub fn accepts(&self, name: &str) -> bool {
        self.name_filters.iter().all(|filter| filter.matches(name))
    }

    /// Returns `true` if repository `name` passes every repository filter.
    pub fn accepts_repository(&self, name: &str) -> bool {
        self.repository_filters.iter().all(|filter| filter.matches(name))
    }

    /// Returns `true` if any branch head can be produced.
    pub fn discovers_branches(&self) -> bool {
        self.branch_discovery
            .is_some_and(|b| b.build_branch || b.build_branches_with_pr)
    }

    /// Returns `true` if nothing at all will be discovered.
    pub fn discovers_nothing(&self) -> bool {
        !self.discovers_branches()
            && self.origin_pull_requests.is_none()
            && self.fork_pull_requests.is_none()
    }
}

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

/// The navigator-level configuration a composition starts from.
#[derive(Debug, Clone, Copy)]
pub struct CompositionBase<'a> {
    /// Owner being discovered.
    pub repo_owner: &'a RepoOwner,
    /// Normalized server URL.
    pub server_url: &'a str,
    /// Scan credentials.
    pub credentials_id: Option<&'a CredentialsId>,
    /// Optional project scope.
    pub project_key: Option<&'a ProjectKey>,
}

/// Folds `traits`, in order, into a fresh [`DecisionContext`].
pub fn compose(base: &CompositionBase<'_>, traits: &[NavigatorTrait]) -> DecisionContext {
    let mut context = DecisionContext::default();

    for navigator_trait in traits {
        if let NavigatorTrait::Unknown(opaque) = navigator_trait {
            tracing::debug!(
                owner = %base.repo_owner,
                server_url = base.server_url,
                trait_type = opaque.type_name().unwrap_or("<untagged>"),
                "Ignoring unrecognised trait"
            );
            continue;
        }
        navigator_trait.apply(&mut context);
    }

    for filter in context.repository_filters.iter().chain(&context.name_filters) {
        if let NameFilter::Invalid { pattern, reason } = filter {
            tracing::warn!(
                owner = %base.repo_owner,
                pattern = pattern.as_str(),
                reason = reason.as_str(),
                "Name filter does not compile; every name will be rejected"
            );
        }
    }

    context.checkout = resolve_checkout_credentials(base.credentials_id, &context.checkout);
    context
}
