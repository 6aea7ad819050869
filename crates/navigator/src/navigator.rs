//! The navigator aggregate.
//!
//! A [`Navigator`] binds an owner on one server to scan credentials, an optional
//! project scope and an ordered trait list. Its identity is `(server_url,
//! repo_owner)` only. Trait and credential changes never alter [`Navigator::id`].

use serde::{Deserialize, Serialize};

use crate::{
    compose, credentials_from_field, navigator_id, CheckoutCredentials, CompositionBase,
    CredentialsId, DecisionContext, EndpointConfig, NavigatorError, NavigatorId, NavigatorTrait,
    ProjectKey, RepoOwner, WebhookMode,
};

/// Discovers the repositories of one owner on one server.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Navigator {
    repo_owner: RepoOwner,
    server_url: String,
    credentials_id: Option<CredentialsId>,
    project_key: Option<ProjectKey>,
    traits: Vec<NavigatorTrait>,
}

impl Navigator {
    /// Creates a navigator for `repo_owner` on the configured default server.
    ///
    /// # Errors
    ///
    /// [`NavigatorError::InvalidConfiguration`] if `repo_owner` is blank.
    pub fn new(repo_owner: &str, endpoints: &EndpointConfig) -> Result<Self, NavigatorError> {
        let repo_owner = RepoOwner::new(repo_owner.trim()).ok_or_else(|| {
            NavigatorError::InvalidConfiguration {
                message: "repository owner must not be empty".to_string(),
            }
        })?;
        Ok(Self {
            repo_owner,
            server_url: endpoints.default_server_url(),
            credentials_id: None,
            project_key: None,
            traits: Vec::new(),
        })
    }

    /// Stable identity: `"{server_url}::{repo_owner}"`.
    pub fn id(&self) -> NavigatorId {
        navigator_id(&self.server_url, &self.repo_owner)
    }

    pub fn repo_owner(&self) -> &RepoOwner {
        &self.repo_owner
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Normalizes and stores `raw`. Blank selects the default server.
    pub fn set_server_url(&mut self, raw: &str, endpoints: &EndpointConfig) {
        self.server_url = endpoints.normalize(raw);
    }

    pub fn credentials_id(&self) -> Option<&CredentialsId> {
        self.credentials_id.as_ref()
    }

    /// Stores the scan credentials id; an empty or blank value stores "absent".
    pub fn set_credentials_id(&mut self, raw: Option<&str>) {
        self.credentials_id = credentials_from_field(raw);
    }

    pub fn project_key(&self) -> Option<&ProjectKey> {
        self.project_key.as_ref()
    }

    /// Stores the project scope; blank clears it.
    pub fn set_project_key(&mut self, raw: Option<&str>) {
        self.project_key = raw.map(str::trim).and_then(ProjectKey::new);
    }

    /// The ordered trait list.
    pub fn traits(&self) -> &[NavigatorTrait] {
        &self.traits
    }

    /// Replaces the whole trait list.
    pub fn set_traits(&mut self, traits: Vec<NavigatorTrait>) {
        self.traits = traits;
    }

    /// Composes the trait list against this navigator's base configuration.
    pub fn decision_context(&self) -> DecisionContext {
        let base = CompositionBase {
            repo_owner: &self.repo_owner,
            server_url: &self.server_url,
            credentials_id: self.credentials_id.as_ref(),
            project_key: self.project_key.as_ref(),
        };
        compose(&base, &self.traits)
    }

    /// Everything one discovery cycle needs, computed from a snapshot of this
    /// navigator's state.
    pub fn build_source_configuration(&self) -> SourceConfiguration {
        let context = self.decision_context();
        let checkout_credentials_id = context
            .checkout
            .effective(self.credentials_id.as_ref())
            .cloned();
        SourceConfiguration {
            navigator_id: self.id(),
            repo_owner: self.repo_owner.clone(),
            server_url: self.server_url.clone(),
            scan_credentials_id: self.credentials_id.clone(),
            checkout_credentials_id,
            project_key: self.project_key.clone(),
            context,
        }
    }

    /// The persisted form of this navigator.
    pub fn to_config(&self) -> NavigatorConfig {
        NavigatorConfig {
            repo_owner: self.repo_owner.to_string(),
            server_url: Some(self.server_url.clone()),
            credentials_id: self.credentials_id.as_ref().map(ToString::to_string),
            project_key: self.project_key.as_ref().map(ToString::to_string),
            traits: self.traits.clone(),
        }
    }
}

/// The persisted field set of a [`Navigator`].
///
/// It is the complete state: building a navigator from it and composing gives
/// the same context as composing the navigator it was taken from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigatorConfig {
    pub repo_owner: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_key: Option<String>,
    #[serde(default)]
    pub traits: Vec<NavigatorTrait>,
}

impl NavigatorConfig {
    /// Validates and normalizes into a [`Navigator`].
    ///
    /// # Errors
    ///
    /// [`NavigatorError::InvalidConfiguration`] if the owner is blank.
    pub fn build(self, endpoints: &EndpointConfig) -> Result<Navigator, NavigatorError> {
        let mut navigator = Navigator::new(&self.repo_owner, endpoints)?;
        navigator.set_server_url(self.server_url.as_deref().unwrap_or(""), endpoints);
        navigator.set_credentials_id(self.credentials_id.as_deref());
        navigator.set_project_key(self.project_key.as_deref());
        navigator.set_traits(self.traits);
        Ok(navigator)
    }
}

/// The output of [`Navigator::build_source_configuration`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceConfiguration {
    pub navigator_id: NavigatorId,
    pub repo_owner: RepoOwner,
    pub server_url: String,
    pub scan_credentials_id: Option<CredentialsId>,
    /// Id to check out with; `None` for anonymous or agent-key checkout.
    pub checkout_credentials_id: Option<CredentialsId>,
    pub project_key: Option<ProjectKey>,
    pub context: DecisionContext,
}

impl SourceConfiguration {
    /// The composed webhook mode, to hand to a webhook registrar.
    pub fn webhook_mode(&self) -> WebhookMode {
        self.context.webhook_mode
    }

    /// The resolved checkout request.
    pub fn checkout(&self) -> &CheckoutCredentials {
        &self.context.checkout
    }
}
