//! Newtype domain identifiers.
//!
//! Every domain concept that has an identity is represented as a distinct newtype
//! wrapping a primitive. This prevents accidentally interchanging, for example, a
//! [`CredentialsId`] with a [`ProjectKey`] even though both are strings under the
//! hood.
//!
//! String-backed identifiers can never be empty: [`CredentialsId::new("")`]
//! returns `None`, which is how an empty credentials field becomes "absent"
//! rather than an identifier that silently fails every lookup. Deserializing an
//! empty string into one is an error.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display, and a
// TryFrom<String> that deserialization goes through.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String")]
        pub struct $name(String);

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value).ok_or_else(|| {
                    format!("{} must not be empty", stringify!($name))
                })
            }
        }

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: hosting-service-integer-backed
// ---------------------------------------------------------------------------

/// Identifies a pull request within one repository.
///
/// Wraps the number assigned by the hosting service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PullRequestId(u64);

impl PullRequestId {
    /// Creates a new identifier from a raw integer.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the underlying integer value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PullRequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Identifiers: UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies a single discovery cycle for one navigator.
///
/// Generated fresh for every cycle; recorded on spans and on the cycle report so
/// all activity from a single run can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiscoveryRunId(Uuid);

impl DiscoveryRunId {
    /// Generates a new random run identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a [`DiscoveryRunId`] from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for DiscoveryRunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Identifiers: String-backed (configuration / hosting-service names)
// ---------------------------------------------------------------------------

string_id! {
    /// The account (team, project owner or user) whose repositories are discovered.
    RepoOwner
}

string_id! {
    /// The name of one repository owned by a [`RepoOwner`].
    RepositoryName
}

string_id! {
    /// An opaque credentials identifier.
    ///
    /// The core only compares identifiers for equality and presence; it never
    /// resolves or inspects the secret behind them.
    CredentialsId
}

string_id! {
    /// Scopes repository discovery to one sub-project of the owner.
    ProjectKey
}

string_id! {
    /// A Git branch name (e.g. `"main"`, `"feature/login"`).
    BranchName
}

string_id! {
    /// A Git commit SHA.
    CommitSha
}

string_id! {
    /// Stable identity of a navigator: `"{server_url}::{repo_owner}"`.
    ///
    /// Built by [`crate::endpoint::navigator_id`]; external collaborators use it
    /// to index and de-duplicate navigators.
    NavigatorId
}

impl NavigatorId {
    /// Joins a normalized server URL and an owner. Never empty because the owner
    /// never is.
    pub(crate) fn from_parts(server_url: &str, repo_owner: &RepoOwner) -> Self {
        Self(format!(
            "{server_url}{}{repo_owner}",
            crate::endpoint::ID_SEPARATOR
        ))
    }
}
