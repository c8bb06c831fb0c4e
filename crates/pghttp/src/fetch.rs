//! HTTP transport options for the executor.

use crate::conn_string::ConnectionInfo;
use crate::error::OrmResult;
use std::time::Duration;

/// Transport options consumed once, when the executor is constructed.
///
/// The default verifies TLS certificates. Turning verification off is only
/// meant for a trusted local proxy with a self-signed certificate, and must be
/// requested explicitly through [`FetchOptions::danger_accept_invalid_certs`]
/// or [`FetchOptions::local_proxy`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Skip TLS certificate verification.
    pub accept_invalid_certs: bool,
    /// Endpoint override, used verbatim as the request URL.
    pub endpoint: Option<String>,
    /// Per-request timeout.
    pub timeout: Option<Duration>,
}

impl FetchOptions {
    /// Create options with defaults (certificates verified, endpoint derived from the host).
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for a local development proxy: certificate verification disabled.
    pub fn local_proxy() -> Self {
        Self::default().danger_accept_invalid_certs(true)
    }

    /// Enable or disable TLS certificate verification.
    pub fn danger_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Override the request URL.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set a per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Resolve the URL requests are sent to.
    ///
    /// The override wins when set; otherwise the connection string is parsed and
    /// mapped to `https://api.<domain>/sql`.
    pub fn resolve_endpoint(&self, connection_string: &str) -> OrmResult<String> {
        if let Some(endpoint) = &self.endpoint {
            return Ok(endpoint.clone());
        }
        let info = ConnectionInfo::parse(connection_string)?;
        Ok(default_endpoint(&info.host))
    }
}

/// `ep-cool-name-123.us-east-2.aws.neon.tech` -> `https://api.us-east-2.aws.neon.tech/sql`.
///
/// A host without a dot is used as-is.
pub fn default_endpoint(host: &str) -> String {
    match host.split_once('.') {
        Some((_, domain)) if !domain.is_empty() => format!("https://api.{}/sql", domain),
        _ => format!("https://{}/sql", host),
    }
}
