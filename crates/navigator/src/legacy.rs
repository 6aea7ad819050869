//! Migration of pre-trait navigator configuration.
//!
//! Older navigators stored discovery behaviour as flat fields. Loading one
//! produces the trait list those fields implied, so the rest of the system only
//! ever sees traits.

use serde::Deserialize;

use crate::{
    credentials_from_field, BranchDiscoveryTrait, CheckoutCredentials, EndpointConfig, Navigator,
    NavigatorError, NavigatorTrait, PullRequestStrategy, RegexFilterTrait, TrustPolicy,
    WebhookMode, WildcardFilterTrait,
};

/// `checkoutCredentialsId` value meaning "same as scan".
pub const SAME_CHECKOUT_CREDENTIALS: &str = "SAME";

/// `checkoutCredentialsId` value meaning "use the agent's own key".
pub const ANONYMOUS_CHECKOUT_CREDENTIALS: &str = "ANONYMOUS";

const MATCH_ALL_PATTERN: &str = ".*";
const MATCH_ALL_INCLUDES: &str = "*";

/// A navigator as persisted before traits existed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyNavigatorConfig {
    pub repo_owner: String,
    pub credentials_id: Option<String>,
    pub checkout_credentials_id: Option<String>,
    pub pattern: Option<String>,
    pub auto_register_hooks: bool,
    pub bitbucket_server_url: Option<String>,
    pub project_key: Option<String>,
    pub includes: Option<String>,
    pub excludes: Option<String>,
}

impl LegacyNavigatorConfig {
    /// Converts into a [`Navigator`] with the equivalent trait list.
    ///
    /// # Errors
    ///
    /// [`NavigatorError::InvalidConfiguration`] if the owner is blank.
    pub fn migrate(self, endpoints: &EndpointConfig) -> Result<Navigator, NavigatorError> {
        let mut navigator = Navigator::new(&self.repo_owner, endpoints)?;
        navigator.set_server_url(self.bitbucket_server_url.as_deref().unwrap_or(""), endpoints);
        navigator.set_credentials_id(self.credentials_id.as_deref());
        navigator.set_project_key(self.project_key.as_deref());

        let mut traits = vec![
            NavigatorTrait::BranchDiscovery(BranchDiscoveryTrait::new(true, true)),
            NavigatorTrait::origin_pull_requests(PullRequestStrategy::Head),
            NavigatorTrait::fork_pull_requests(PullRequestStrategy::Head, TrustPolicy::TrustEveryone),
            NavigatorTrait::PublicRepoPullRequestFilter,
        ];

        if let Some(checkout) = self.checkout_trait(navigator.credentials_id()) {
            traits.push(checkout);
        }

        let pattern = self.pattern.as_deref().map(str::trim).unwrap_or("");
        if !pattern.is_empty() && pattern != MATCH_ALL_PATTERN {
            traits.push(NavigatorTrait::RegexFilter(regex_or_verbatim(pattern)));
        }

        let includes = self.includes.as_deref().unwrap_or(MATCH_ALL_INCLUDES);
        let excludes = self.excludes.as_deref().unwrap_or("");
        if includes != MATCH_ALL_INCLUDES || !excludes.is_empty() {
            traits.push(NavigatorTrait::WildcardFilter(WildcardFilterTrait {
                includes: includes.to_string(),
                excludes: excludes.to_string(),
            }));
        }

        traits.push(NavigatorTrait::webhook_registration(if self.auto_register_hooks {
            WebhookMode::Item
        } else {
            WebhookMode::Disable
        }));

        navigator.set_traits(traits);
        Ok(navigator)
    }

    fn checkout_trait(&self, scan: Option<&crate::CredentialsId>) -> Option<NavigatorTrait> {
        let credentials = match self.checkout_credentials_id.as_deref() {
            None | Some(SAME_CHECKOUT_CREDENTIALS) => return None,
            Some(ANONYMOUS_CHECKOUT_CREDENTIALS) => CheckoutCredentials::UseAmbient,
            Some(raw) => match credentials_from_field(Some(raw)) {
                None => CheckoutCredentials::UseAmbient,
                Some(id) if Some(&id) == scan => return None,
                Some(id) => CheckoutCredentials::UseExplicit(id),
            },
        };
        Some(NavigatorTrait::ssh_checkout(credentials))
    }
}

// A pattern that does not compile is still carried over so the navigator
// rejects every repository rather than silently accepting all of them.
fn regex_or_verbatim(pattern: &str) -> RegexFilterTrait {
    RegexFilterTrait::new(pattern).unwrap_or_else(|e| {
        tracing::warn!(pattern, error = %e, "Legacy repository pattern does not compile");
        RegexFilterTrait {
            regex: pattern.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DecisionSlot;
    use crate::DecisionContributor;

    fn legacy(json: &str) -> Navigator {
        let config: LegacyNavigatorConfig = serde_json::from_str(json).unwrap();
        config.migrate(&EndpointConfig::default()).unwrap()
    }

    fn has_slot(navigator: &Navigator, slot: DecisionSlot) -> bool {
        navigator.traits().iter().any(|t| t.slots().contains(&slot))
    }

    #[test]
    fn blank_checkout_id_means_ambient() {
        let navigator = legacy(r#"{"repoOwner": "DUB", "checkoutCredentialsId": ""}"#);
        assert!(navigator
            .traits()
            .contains(&NavigatorTrait::ssh_checkout(CheckoutCredentials::UseAmbient)));
    }

    #[test]
    fn absent_checkout_id_means_same_as_scan() {
        let navigator = legacy(r#"{"repoOwner": "DUB"}"#);
        assert!(!has_slot(&navigator, DecisionSlot::CheckoutCredentials));
    }

    #[test]
    fn blank_pattern_adds_no_regex_filter() {
        let navigator = legacy(r#"{"repoOwner": "DUB", "pattern": "  "}"#);
        assert!(!has_slot(&navigator, DecisionSlot::RepositoryFilters));
    }

    #[test]
    fn uncompilable_pattern_rejects_everything() {
        let navigator = legacy(r#"{"repoOwner": "DUB", "pattern": "(broken"}"#);
        let context = navigator.decision_context();
        assert!(!context.accepts_repository("anything"));
        assert!(context.accepts("master"), "head names stay unfiltered");
    }

    #[test]
    fn blank_owner_fails_migration() {
        let config: LegacyNavigatorConfig = serde_json::from_str(r#"{"repoOwner": ""}"#).unwrap();
        assert!(config.migrate(&EndpointConfig::default()).is_err());
    }
}
