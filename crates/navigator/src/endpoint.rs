//! Server URL normalization and navigator identity.
//!
//! The endpoint configuration is an explicit value: nothing here reads global
//! state, so normalization is a pure function of `(config, raw)`.

use serde::{Deserialize, Serialize};

use crate::{NavigatorId, RepoOwner};

/// Canonical URL of the public hosting service.
pub const CLOUD_SERVER_URL: &str = "https://bitbucket.org";

/// Separator between server URL and owner in a [`NavigatorId`].
pub const ID_SEPARATOR: &str = "::";

/// Endpoint settings consulted when normalizing server URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// URL substituted for blank input. Normalized itself before use.
    pub default_server_url: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            default_server_url: CLOUD_SERVER_URL.to_string(),
        }
    }
}

impl EndpointConfig {
    /// Returns the canonical form of `raw`.
    ///
    /// Scheme and host are lower-cased, default ports dropped, `.` and `..` path
    /// segments resolved and the trailing slash removed. Blank input yields the
    /// default server URL. Input that does not parse as `scheme://host...` is
    /// returned trimmed but otherwise untouched.
    pub fn normalize(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            let fallback = self.default_server_url.trim();
            if fallback.is_empty() {
                return CLOUD_SERVER_URL.to_string();
            }
            return canonicalize(fallback).unwrap_or_else(|| fallback.to_string());
        }
        canonicalize(trimmed).unwrap_or_else(|| trimmed.to_string())
    }

    /// The normalized default server URL.
    pub fn default_server_url(&self) -> String {
        self.normalize("")
    }
}

/// Normalizes `raw` against the built-in cloud default.
pub fn normalize_server_url(raw: &str) -> String {
    EndpointConfig::default().normalize(raw)
}

/// Builds the identity key of a navigator from an already-normalized server URL.
pub fn navigator_id(server_url: &str, repo_owner: &RepoOwner) -> NavigatorId {
    NavigatorId::from_parts(server_url, repo_owner)
}

fn canonicalize(raw: &str) -> Option<String> {
    let (scheme, rest) = raw.split_once("://")?;
    if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c)) {
        return None;
    }
    let scheme = scheme.to_ascii_lowercase();

    let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let (authority, remainder) = rest.split_at(authority_end);
    let path_end = remainder.find(['?', '#']).unwrap_or(remainder.len());
    let (path, suffix) = remainder.split_at(path_end);

    let (userinfo, host_port) = match authority.rsplit_once('@') {
        Some((user, hp)) => (Some(user), hp),
        None => (None, authority),
    };
    let (host, port) = split_host_port(host_port)?;
    if host.is_empty() {
        return None;
    }

    let mut out = format!("{scheme}://");
    if let Some(user) = userinfo {
        out.push_str(user);
        out.push('@');
    }
    out.push_str(&host.to_ascii_lowercase());
    if let Some(port) = port {
        if Some(port) != default_port(&scheme) {
            out.push(':');
            out.push_str(&port.to_string());
        }
    }
    out.push_str(&resolve_path(path));
    out.push_str(suffix);
    Some(out)
}

fn split_host_port(host_port: &str) -> Option<(&str, Option<u16>)> {
    // Bracketed IPv6 literal.
    let (host, port) = if host_port.starts_with('[') {
        let close = host_port.find(']')?;
        let (host, after) = host_port.split_at(close + 1);
        match after.strip_prefix(':') {
            Some(port) => (host, Some(port)),
            None if after.is_empty() => (host, None),
            None => return None,
        }
    } else {
        match host_port.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (host_port, None),
        }
    };

    match port {
        None | Some("") => Some((host, None)),
        Some(port) => port.parse::<u16>().ok().map(|p| (host, Some(p))),
    }
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

fn resolve_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    if segments.is_empty() {
        String::new()
    } else {
        format!("/{}", segments.join("/"))
    }
}
