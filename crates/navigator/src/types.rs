//! Shared value types for the navigator domain.
//!
//! These enums are written by traits, read by the discovery pipeline and handed
//! to collaborators, so they live apart from any single module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Pull-request strategies
// ---------------------------------------------------------------------------

/// Which revision(s) of a pull request become buildable heads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PullRequestStrategy {
    /// The PR merged with its target branch.
    Merge,
    /// The PR's source revision as-is.
    Head,
    /// One head per revision kind.
    HeadAndMerge,
}

impl PullRequestStrategy {
    /// Decodes the numeric strategy id used by older configuration
    /// (`1` = merge, `2` = head, `3` = both). Returns `None` for any other value.
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Self::Merge),
            2 => Some(Self::Head),
            3 => Some(Self::HeadAndMerge),
            _ => None,
        }
    }

    /// Returns the numeric strategy id.
    pub fn id(self) -> u8 {
        match self {
            Self::Merge => 1,
            Self::Head => 2,
            Self::HeadAndMerge => 3,
        }
    }

    /// The revision kinds this strategy produces, in head order.
    pub fn revision_kinds(self) -> &'static [RevisionKind] {
        match self {
            Self::Merge => &[RevisionKind::Merge],
            Self::Head => &[RevisionKind::Head],
            Self::HeadAndMerge => &[RevisionKind::Head, RevisionKind::Merge],
        }
    }
}

/// The revision a pull-request head builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionKind {
    /// The source branch tip.
    Head,
    /// The source merged into the target.
    Merge,
}

impl RevisionKind {
    /// Suffix used in head names when a PR produces more than one head.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::Merge => "merge",
        }
    }
}

// ---------------------------------------------------------------------------
// Trust
// ---------------------------------------------------------------------------

/// Decides whether a fork pull request's code is eligible for automated building.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustPolicy {
    /// Every fork PR is trusted.
    TrustEveryone,
    /// Trusted iff the PR author is a member of the owning team.
    TrustTeamMembers,
    /// No fork PR is trusted.
    #[default]
    TrustNobody,
    /// Trusted iff the fork has been built before.
    TrustExistingForksOnly,
}

// ---------------------------------------------------------------------------
// Webhooks
// ---------------------------------------------------------------------------

/// How (and whether) webhooks are registered for discovered repositories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WebhookMode {
    /// No webhook is registered; existing ones should be removed.
    #[default]
    Disable,
    /// Register using the navigator's own scan credentials.
    Item,
    /// Register using the system-wide endpoint credentials.
    System,
}

impl std::fmt::Display for WebhookMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Disable => "DISABLE",
            Self::Item => "ITEM",
            Self::System => "SYSTEM",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
