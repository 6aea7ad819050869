//! Discovery-cycle orchestration for navigators.
//!
//! [`NavigatorScanner`] drives the pure `navigator` crate against its ports:
//! it gathers repository snapshots through a [`navigator::RepositorySource`],
//! runs [`navigator::discover`] over each one and applies the composed webhook
//! mode through a [`navigator::WebhookRegistrar`].
//!
//! ## Architectural Layer
//!
//! **Orchestration.** Concurrency lives here: cycles for different navigators
//! run as separate tasks, cycles for the same navigator identity queue behind a
//! per-identity lock.
//!
//! The crate also ships local collaborators used by the `navscan` binary and by
//! tests: [`SnapshotSource`] serves recorded listings from JSON,
//! [`TracingWebhookRegistrar`] logs instead of calling a server and
//! [`StaticCredentialStore`] answers presence checks from a fixed set.

pub mod errors;
pub mod fixture;
pub mod scanner;
pub mod stores;

pub use errors::ScanError;
pub use fixture::{FixtureRepository, SnapshotSource, SourceFixture};
pub use scanner::{DiscoveryReport, NavigatorScanner, RepositoryHeads};
pub use stores::{StaticCredentialStore, TracingWebhookRegistrar};
