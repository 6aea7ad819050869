//! The navigator trait catalogue.
//!
//! A navigator trait is an independently authored behaviour modifier. Each one
//! owns one or more [`DecisionSlot`]s of the [`DecisionContext`] and writes only
//! those slots when applied. Scalar slots follow last-write-wins; the two
//! filter slots ([`DecisionSlot::RepositoryFilters`], [`DecisionSlot::NameFilters`])
//! are cumulative.
//!
//! The catalogue is closed: [`NavigatorTrait`] lists every variant this crate
//! understands. Anything else deserializes into [`NavigatorTrait::Unknown`],
//! which the composition engine ignores and serialization writes back verbatim.
//!
//! ## Wire format
//!
//! Traits are JSON objects tagged by a `type` field:
//!
//! ```json
//! { "type": "branch_discovery", "build_branch": true, "build_branches_with_pr": false }
//! { "type": "webhook_registration", "mode": "ITEM" }
//! ```

use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    CheckoutCredentials, DecisionContext, NameFilter, NavigatorError, PullRequestStrategy,
    TrustPolicy, WebhookMode,
};

// ---------------------------------------------------------------------------
// Slots and the contributor seam
// ---------------------------------------------------------------------------

/// A region of the [`DecisionContext`] owned by one kind of trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecisionSlot {
    /// Plain branch discovery on/off and PR-branch handling.
    BranchDiscovery,
    /// Origin pull-request discovery and its strategy.
    OriginPullRequests,
    /// Fork pull-request discovery, its strategy and trust policy.
    ForkPullRequests,
    /// Auto-trust for pull requests on public repositories.
    PublicRepositoryTrust,
    /// Filters applied to repository names. Cumulative.
    RepositoryFilters,
    /// Filters applied to branch and PR source-branch names. Cumulative.
    NameFilters,
    /// Checkout credentials request.
    CheckoutCredentials,
    /// Webhook registration mode.
    WebhookMode,
}

/// Something that writes into a [`DecisionContext`].
///
/// Implementations must write only the slots they report from [`slots`](Self::slots)
/// and must not read any slot they do not own.
pub trait DecisionContributor {
    /// The slots this contributor writes.
    fn slots(&self) -> &'static [DecisionSlot];

    /// Writes this contributor's decision into `context`.
    fn apply(&self, context: &mut DecisionContext);
}

// ---------------------------------------------------------------------------
// Discovery traits
// ---------------------------------------------------------------------------

/// Enables discovery of plain branches.
///
/// `build_branch` covers branches that are not the source of an open origin pull
/// request; `build_branches_with_pr` covers branches that are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BranchDiscoveryTrait {
    /// Build branches not filed as pull requests.
    pub build_branch: bool,
    /// Build branches that are also filed as origin pull requests.
    pub build_branches_with_pr: bool,
}

impl BranchDiscoveryTrait {
    /// Creates the trait from its two flags.
    pub fn new(build_branch: bool, build_branches_with_pr: bool) -> Self {
        Self {
            build_branch,
            build_branches_with_pr,
        }
    }

    /// Decodes the numeric strategy id of older configuration: bit `1` is
    /// `build_branch`, bit `2` is `build_branches_with_pr`.
    pub fn from_strategy_id(id: u8) -> Self {
        Self::new(id & 1 != 0, id & 2 != 0)
    }

    /// Inverse of [`from_strategy_id`](Self::from_strategy_id).
    pub fn strategy_id(self) -> u8 {
        u8::from(self.build_branch) | (u8::from(self.build_branches_with_pr) << 1)
    }
}

impl DecisionContributor for BranchDiscoveryTrait {
    fn slots(&self) -> &'static [DecisionSlot] {
        &[DecisionSlot::BranchDiscovery]
    }

    fn apply(&self, context: &mut DecisionContext) {
        context.branch_discovery = Some(*self);
    }
}

/// Enables discovery of pull requests whose source branch lives in the same
/// repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OriginPullRequestDiscoveryTrait {
    /// Revision(s) to build per pull request.
    pub strategy: PullRequestStrategy,
}

impl DecisionContributor for OriginPullRequestDiscoveryTrait {
    fn slots(&self) -> &'static [DecisionSlot] {
        &[DecisionSlot::OriginPullRequests]
    }

    fn apply(&self, context: &mut DecisionContext) {
        context.origin_pull_requests = Some(self.strategy);
    }
}

/// Enables discovery of pull requests from forks, with a trust policy.
///
/// When several are present the last one wins for both strategy and trust.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForkPullRequestDiscoveryTrait {
    /// Revision(s) to build per pull request.
    pub strategy: PullRequestStrategy,
    /// Which fork pull requests are trusted.
    pub trust: TrustPolicy,
}

impl DecisionContributor for ForkPullRequestDiscoveryTrait {
    fn slots(&self) -> &'static [DecisionSlot] {
        &[DecisionSlot::ForkPullRequests]
    }

    fn apply(&self, context: &mut DecisionContext) {
        context.fork_pull_requests = Some(self.strategy);
        context.fork_trust = self.trust;
    }
}

/// Marker: fork pull requests on public repositories are trusted.
///
/// Its decision is a single flag OR'd into the fork trust predicate at discovery
/// time; it does not touch the trust policy slot itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PublicRepoPullRequestFilterTrait;

impl DecisionContributor for PublicRepoPullRequestFilterTrait {
    fn slots(&self) -> &'static [DecisionSlot] {
        &[DecisionSlot::PublicRepositoryTrust]
    }

    fn apply(&self, context: &mut DecisionContext) {
        context.trust_public_repositories = true;
    }
}

// ---------------------------------------------------------------------------
// Filter traits (cumulative)
// ---------------------------------------------------------------------------

/// Accepts only repositories whose name fully matches a regular expression.
///
/// Filters accumulate: a repository must satisfy every regex filter in the
/// list, not just the last one. Branches of an accepted repository are not
/// filtered by this trait.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegexFilterTrait {
    /// The pattern, matched against the whole name.
    pub regex: String,
}

impl RegexFilterTrait {
    /// Creates the trait, rejecting patterns that do not compile.
    pub fn new(regex: impl Into<String>) -> Result<Self, NavigatorError> {
        let regex = regex.into();
        NameFilter::regex(&regex).into_result()?;
        Ok(Self { regex })
    }
}

impl DecisionContributor for RegexFilterTrait {
    fn slots(&self) -> &'static [DecisionSlot] {
        &[DecisionSlot::RepositoryFilters]
    }

    fn apply(&self, context: &mut DecisionContext) {
        context.repository_filters.push(NameFilter::regex(&self.regex));
    }
}

/// Space-separated glob includes and excludes on head names.
///
/// Applied to branch names and to the source branch of pull requests. `*`
/// matches any run of characters including `/`. Cumulative.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WildcardFilterTrait {
    /// Names must match at least one of these patterns.
    pub includes: String,
    /// Names must match none of these patterns.
    #[serde(default)]
    pub excludes: String,
}

impl WildcardFilterTrait {
    /// Creates the trait, rejecting patterns that do not compile.
    pub fn new(includes: impl Into<String>, excludes: impl Into<String>) -> Result<Self, NavigatorError> {
        let includes = includes.into();
        let excludes = excludes.into();
        NameFilter::wildcard(&includes, &excludes).into_result()?;
        Ok(Self { includes, excludes })
    }
}

impl DecisionContributor for WildcardFilterTrait {
    fn slots(&self) -> &'static [DecisionSlot] {
        &[DecisionSlot::NameFilters]
    }

    fn apply(&self, context: &mut DecisionContext) {
        context
            .name_filters
            .push(NameFilter::wildcard(&self.includes, &self.excludes));
    }
}

// ---------------------------------------------------------------------------
// Checkout and webhook traits
// ---------------------------------------------------------------------------

/// Requests distinct credentials for checking out sources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SshCheckoutTrait {
    /// The requested checkout credentials.
    pub credentials: CheckoutCredentials,
}

impl DecisionContributor for SshCheckoutTrait {
    fn slots(&self) -> &'static [DecisionSlot] {
        &[DecisionSlot::CheckoutCredentials]
    }

    fn apply(&self, context: &mut DecisionContext) {
        context.checkout = self.credentials.clone();
    }
}

/// Chooses the webhook registration mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WebhookRegistrationTrait {
    /// Registration mode.
    pub mode: WebhookMode,
}

impl DecisionContributor for WebhookRegistrationTrait {
    fn slots(&self) -> &'static [DecisionSlot] {
        &[DecisionSlot::WebhookMode]
    }

    fn apply(&self, context: &mut DecisionContext) {
        context.webhook_mode = self.mode;
    }
}

// ---------------------------------------------------------------------------
// The catalogue
// ---------------------------------------------------------------------------

/// A trait whose `type` this crate does not recognise, kept byte-for-byte.
#[derive(Debug, Clone, PartialEq)]
pub struct OpaqueTrait(serde_json::Value);

impl OpaqueTrait {
    /// Wraps raw trait data.
    pub fn new(raw: serde_json::Value) -> Self {
        Self(raw)
    }

    /// The `type` tag, when the data has one.
    pub fn type_name(&self) -> Option<&str> {
        self.0.get("type").and_then(serde_json::Value::as_str)
    }

    /// The raw data.
    pub fn raw(&self) -> &serde_json::Value {
        &self.0
    }
}

/// One entry of a navigator's ordered trait list.
#[derive(Debug, Clone, PartialEq)]
pub enum NavigatorTrait {
    /// See [`BranchDiscoveryTrait`].
    BranchDiscovery(BranchDiscoveryTrait),
    /// See [`OriginPullRequestDiscoveryTrait`].
    OriginPullRequestDiscovery(OriginPullRequestDiscoveryTrait),
    /// See [`ForkPullRequestDiscoveryTrait`].
    ForkPullRequestDiscovery(ForkPullRequestDiscoveryTrait),
    /// See [`PublicRepoPullRequestFilterTrait`].
    PublicRepoPullRequestFilter,
    /// See [`RegexFilterTrait`].
    RegexFilter(RegexFilterTrait),
    /// See [`WildcardFilterTrait`].
    WildcardFilter(WildcardFilterTrait),
    /// See [`SshCheckoutTrait`].
    SshCheckout(SshCheckoutTrait),
    /// See [`WebhookRegistrationTrait`].
    WebhookRegistration(WebhookRegistrationTrait),
    /// A trait from a newer or foreign catalogue.
    Unknown(OpaqueTrait),
}

impl NavigatorTrait {
    /// `branch_discovery(true, false)` and friends, for terse construction.
    pub fn branch_discovery(build_branch: bool, build_branches_with_pr: bool) -> Self {
        Self::BranchDiscovery(BranchDiscoveryTrait::new(build_branch, build_branches_with_pr))
    }

    /// Origin pull-request discovery with `strategy`.
    pub fn origin_pull_requests(strategy: PullRequestStrategy) -> Self {
        Self::OriginPullRequestDiscovery(OriginPullRequestDiscoveryTrait { strategy })
    }

    /// Fork pull-request discovery with `strategy` and `trust`.
    pub fn fork_pull_requests(strategy: PullRequestStrategy, trust: TrustPolicy) -> Self {
        Self::ForkPullRequestDiscovery(ForkPullRequestDiscoveryTrait { strategy, trust })
    }

    /// SSH checkout with the given credentials request.
    pub fn ssh_checkout(credentials: CheckoutCredentials) -> Self {
        Self::SshCheckout(SshCheckoutTrait { credentials })
    }

    /// Webhook registration in `mode`.
    pub fn webhook_registration(mode: WebhookMode) -> Self {
        Self::WebhookRegistration(WebhookRegistrationTrait { mode })
    }

    /// The `type` tag this trait is (de)serialized with.
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Self::BranchDiscovery(_) => Some("branch_discovery"),
            Self::OriginPullRequestDiscovery(_) => Some("origin_pull_request_discovery"),
            Self::ForkPullRequestDiscovery(_) => Some("fork_pull_request_discovery"),
            Self::PublicRepoPullRequestFilter => Some("public_repo_pull_request_filter"),
            Self::RegexFilter(_) => Some("regex_filter"),
            Self::WildcardFilter(_) => Some("wildcard_filter"),
            Self::SshCheckout(_) => Some("ssh_checkout"),
            Self::WebhookRegistration(_) => Some("webhook_registration"),
            Self::Unknown(opaque) => opaque.type_name(),
        }
    }

    /// `true` for [`NavigatorTrait::Unknown`].
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }

    fn contributor(&self) -> Option<&dyn DecisionContributor> {
        let contributor: &dyn DecisionContributor = match self {
            Self::BranchDiscovery(t) => t,
            Self::OriginPullRequestDiscovery(t) => t,
            Self::ForkPullRequestDiscovery(t) => t,
            Self::PublicRepoPullRequestFilter => &PublicRepoPullRequestFilterTrait,
            Self::RegexFilter(t) => t,
            Self::WildcardFilter(t) => t,
            Self::SshCheckout(t) => t,
            Self::WebhookRegistration(t) => t,
            Self::Unknown(_) => return None,
        };
        Some(contributor)
    }
}

impl DecisionContributor for NavigatorTrait {
    fn slots(&self) -> &'static [DecisionSlot] {
        match self.contributor() {
            Some(contributor) => contributor.slots(),
            None => &[],
        }
    }

    fn apply(&self, context: &mut DecisionContext) {
        if let Some(contributor) = self.contributor() {
            contributor.apply(context);
        }
    }
}

macro_rules! impl_from_trait {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for NavigatorTrait {
                fn from(value: $ty) -> Self {
                    NavigatorTrait::$variant(value)
                }
            }
        )*
    };
}

impl_from_trait! {
    BranchDiscovery(BranchDiscoveryTrait),
    OriginPullRequestDiscovery(OriginPullRequestDiscoveryTrait),
    ForkPullRequestDiscovery(ForkPullRequestDiscoveryTrait),
    RegexFilter(RegexFilterTrait),
    WildcardFilter(WildcardFilterTrait),
    SshCheckout(SshCheckoutTrait),
    WebhookRegistration(WebhookRegistrationTrait),
}

impl From<PublicRepoPullRequestFilterTrait> for NavigatorTrait {
    fn from(_: PublicRepoPullRequestFilterTrait) -> Self {
        NavigatorTrait::PublicRepoPullRequestFilter
    }
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

// Tagged representation of the known variants.
#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Tagged {
    BranchDiscovery(BranchDiscoveryTrait),
    OriginPullRequestDiscovery(OriginPullRequestDiscoveryTrait),
    ForkPullRequestDiscovery(ForkPullRequestDiscoveryTrait),
    PublicRepoPullRequestFilter,
    RegexFilter(RegexFilterTrait),
    WildcardFilter(WildcardFilterTrait),
    SshCheckout(SshCheckoutTrait),
    WebhookRegistration(WebhookRegistrationTrait),
}

const KNOWN_TYPES: &[&str] = &[
    "branch_discovery",
    "origin_pull_request_discovery",
    "fork_pull_request_discovery",
    "public_repo_pull_request_filter",
    "regex_filter",
    "wildcard_filter",
    "ssh_checkout",
    "webhook_registration",
];

impl Serialize for NavigatorTrait {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let tagged = match self {
            Self::Unknown(opaque) => return opaque.raw().serialize(serializer),
            Self::BranchDiscovery(t) => Tagged::BranchDiscovery(*t),
            Self::OriginPullRequestDiscovery(t) => Tagged::OriginPullRequestDiscovery(*t),
            Self::ForkPullRequestDiscovery(t) => Tagged::ForkPullRequestDiscovery(*t),
            Self::PublicRepoPullRequestFilter => Tagged::PublicRepoPullRequestFilter,
            Self::RegexFilter(t) => Tagged::RegexFilter(t.clone()),
            Self::WildcardFilter(t) => Tagged::WildcardFilter(t.clone()),
            Self::SshCheckout(t) => Tagged::SshCheckout(t.clone()),
            Self::WebhookRegistration(t) => Tagged::WebhookRegistration(*t),
        };
        tagged.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for NavigatorTrait {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        let known = raw
            .get("type")
            .and_then(serde_json::Value::as_str)
            .is_some_and(|t| KNOWN_TYPES.contains(&t));
        if !known {
            return Ok(Self::Unknown(OpaqueTrait::new(raw)));
        }

        let tagged: Tagged = serde_json::from_value(raw).map_err(D::Error::custom)?;
        Ok(match tagged {
            Tagged::BranchDiscovery(t) => Self::BranchDiscovery(t),
            Tagged::OriginPullRequestDiscovery(t) => Self::OriginPullRequestDiscovery(t),
            Tagged::ForkPullRequestDiscovery(t) => Self::ForkPullRequestDiscovery(t),
            Tagged::PublicRepoPullRequestFilter => Self::PublicRepoPullRequestFilter,
            Tagged::RegexFilter(t) => Self::RegexFilter(t),
            Tagged::WildcardFilter(t) => Self::WildcardFilter(t),
            Tagged::SshCheckout(t) => Self::SshCheckout(t),
            Tagged::WebhookRegistration(t) => Self::WebhookRegistration(t),
        })
    }
}
