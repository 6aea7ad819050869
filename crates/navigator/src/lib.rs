//! Navigator domain: repository discovery configuration for one hosting-service
//! account.
//!
//! A [`Navigator`] names an owner on a server, its scan credentials and an
//! ordered list of [`NavigatorTrait`]s. [`compose`] folds the traits into a
//! [`DecisionContext`]; [`discover`] applies that context to a
//! [`RepositorySnapshot`] and yields the buildable [`Head`]s.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! Everything here is pure and synchronous except the collaborator traits in
//! [`ports`], which the orchestration layer implements and drives.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`RepoOwner`, `CredentialsId`, `NavigatorId`, ...) |
//! | [`types`] | Shared value types (`PullRequestStrategy`, `TrustPolicy`, `WebhookMode`, ...) |
//! | [`errors`] | Domain and collaborator errors, retry policy |
//! | [`endpoint`] | Server URL normalization and navigator identity |
//! | [`credentials`] | Checkout credential resolution |
//! | [`traits`] | The trait catalogue and the slots each trait owns |
//! | [`compose`] | The composition engine and `DecisionContext` |
//! | [`discovery`] | Snapshot types, `Head`, and the filtering pipeline |
//! | [`navigator`] | The `Navigator` aggregate and its persisted form |
//! | [`legacy`] | Migration of pre-trait configuration |
//! | [`ports`] | Collaborator traits |

pub mod compose;
pub mod credentials;
pub mod discovery;
pub mod endpoint;
pub mod errors;
pub mod identifiers;
pub mod legacy;
pub mod navigator;
pub mod ports;
pub mod traits;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use compose::{compose, CompositionBase, DecisionContext, NameFilter};
pub use credentials::{credentials_from_field, resolve_checkout_credentials, CheckoutCredentials};
pub use discovery::{
    discover, BranchHead, BranchRef, ForkHistory, Head, NoForkHistory, PullRequestHead,
    PullRequestOrigin, PullRequestRef, RepositorySnapshot,
};
pub use endpoint::{navigator_id, normalize_server_url, EndpointConfig, CLOUD_SERVER_URL};
pub use errors::{NavigatorError, RetryPolicy, SourceError};
pub use identifiers::{
    BranchName, CommitSha, CredentialsId, DiscoveryRunId, NavigatorId, ProjectKey, PullRequestId,
    RepoOwner, RepositoryName,
};
pub use legacy::LegacyNavigatorConfig;
pub use navigator::{Navigator, NavigatorConfig, SourceConfiguration};
pub use ports::{CredentialStore, RepositorySource, WebhookRegistrar};
pub use traits::{
    BranchDiscoveryTrait, DecisionContributor, DecisionSlot, ForkPullRequestDiscoveryTrait,
    NavigatorTrait, OpaqueTrait, OriginPullRequestDiscoveryTrait, PublicRepoPullRequestFilterTrait,
    RegexFilterTrait, SshCheckoutTrait, WebhookRegistrationTrait, WildcardFilterTrait,
};
pub use types::{PullRequestStrategy, RevisionKind, Timestamp, TrustPolicy, WebhookMode};
