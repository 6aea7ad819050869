//! Checkout credential resolution.
//!
//! Scanning always uses the navigator's own credentials. Checkout may use a
//! different identity, requested through an SSH checkout trait as one of three
//! explicit states rather than by comparing identifiers against a sentinel.

use serde::{Deserialize, Serialize};

use crate::CredentialsId;

/// Which credentials a checkout uses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutCredentials {
    /// Same credentials as scanning. Equivalent to having no SSH checkout trait.
    #[default]
    UseScan,
    /// A distinct credentials id.
    UseExplicit(CredentialsId),
    /// The build agent's own key; no credentials id is passed at all.
    UseAmbient,
}

impl CheckoutCredentials {
    /// Returns `true` when this differs observably from scanning credentials.
    pub fn is_override(&self) -> bool {
        !matches!(self, CheckoutCredentials::UseScan)
    }

    /// The credentials id a checkout should hand to the credential store.
    ///
    /// `None` means "no credentials": either ambient, or scanning itself is
    /// anonymous.
    pub fn effective<'a>(&'a self, scan: Option<&'a CredentialsId>) -> Option<&'a CredentialsId> {
        match self {
            CheckoutCredentials::UseScan => scan,
            CheckoutCredentials::UseExplicit(id) => Some(id),
            CheckoutCredentials::UseAmbient => None,
        }
    }
}

/// Collapses a checkout request against the scan credentials.
///
/// An explicit id equal to the scan id is the same as asking for the scan
/// credentials, so it resolves to [`CheckoutCredentials::UseScan`]. Every other
/// request is returned unchanged.
pub fn resolve_checkout_credentials(
    scan: Option<&CredentialsId>,
    requested: &CheckoutCredentials,
) -> CheckoutCredentials {
    match requested {
        CheckoutCredentials::UseExplicit(id) if Some(id) == scan => CheckoutCredentials::UseScan,
        other => other.clone(),
    }
}

/// Converts a raw credentials field into an id, treating blank as absent.
pub fn credentials_from_field(raw: Option<&str>) -> Option<CredentialsId> {
    raw.map(str::trim).and_then(CredentialsId::new)
}
