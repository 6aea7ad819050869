//! `navscan.toml` and navigator definition files.

use std::path::Path;

use anyhow::Context;
use navigator::{CredentialsId, EndpointConfig, LegacyNavigatorConfig, Navigator, NavigatorConfig};
use serde::Deserialize;

/// Contents of `navscan.toml`. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    pub endpoints: EndpointConfig,
    pub credentials: CredentialsSection,
}

/// `[credentials]`: ids the local credential store reports as present.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CredentialsSection {
    pub known: Option<Vec<String>>,
}

impl CredentialsSection {
    /// `None` when no `known` list is configured, so credential checks are skipped.
    pub fn known_ids(&self) -> Option<Vec<CredentialsId>> {
        self.known
            .as_ref()
            .map(|ids| ids.iter().filter_map(|id| CredentialsId::new(id.trim())).collect())
    }
}

impl CliConfig {
    /// Loads `path`. A missing file yields defaults only when `required` is
    /// false.
    pub fn load(path: &Path, required: bool) -> anyhow::Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
                tracing::debug!(path = %path.display(), "No config file; using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", path.display()));
            }
        };
        Self::parse(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

/// Reads a navigator definition, either current or legacy JSON.
pub fn load_navigator(
    path: &Path,
    legacy: bool,
    endpoints: &EndpointConfig,
) -> anyhow::Result<Navigator> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading navigator {}", path.display()))?;
    let navigator = if legacy {
        let config: LegacyNavigatorConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing legacy navigator {}", path.display()))?;
        config.migrate(endpoints)?
    } else {
        let config: NavigatorConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing navigator {}", path.display()))?;
        config.build(endpoints)?
    };
    tracing::debug!(
        navigator = %navigator.id(),
        traits = navigator.traits().len(),
        "Loaded navigator"
    );
    Ok(navigator)
}
