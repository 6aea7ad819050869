//! Local collaborator implementations: a webhook registrar that only logs and a
//! credential store backed by a fixed id set.

use std::collections::HashSet;

use async_trait::async_trait;
use navigator::{CredentialStore, CredentialsId, NavigatorId, SourceError, WebhookMode, WebhookRegistrar};

/// Records the requested webhook mode as a structured event and does nothing
/// else. Used when no hosting-service client is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingWebhookRegistrar;

#[async_trait]
impl WebhookRegistrar for TracingWebhookRegistrar {
    async fn apply(&self, navigator: &NavigatorId, mode: WebhookMode) -> Result<(), SourceError> {
        tracing::info!(navigator = %navigator, mode = %mode, "Webhook registration requested");
        Ok(())
    }
}

/// A [`CredentialStore`] that knows a fixed set of ids.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialStore {
    known: HashSet<CredentialsId>,
}

impl StaticCredentialStore {
    pub fn new(known: impl IntoIterator<Item = CredentialsId>) -> Self {
        Self {
            known: known.into_iter().collect(),
        }
    }
}

impl CredentialStore for StaticCredentialStore {
    fn contains(&self, id: &CredentialsId) -> bool {
        self.known.contains(id)
    }
}
