//! Connection string parsing.
//!
//! The executor keeps the connection string verbatim and only parses it when a
//! request is issued, so a malformed value surfaces on first use.

use crate::error::{OrmError, OrmResult};
use percent_encoding::percent_decode_str;
use url::Url;

/// Parsed parts of a `postgres://` connection string.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub user: String,
    pub password: Option<String>,
    pub host: String,
    pub port: Option<u16>,
    pub database: Option<String>,
}

impl std::fmt::Debug for ConnectionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionInfo")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .finish()
    }
}

impl ConnectionInfo {
    /// Parse a `postgres://` or `postgresql://` connection string.
    pub fn parse(connection_string: &str) -> OrmResult<Self> {
        let url = Url::parse(connection_string)
            .map_err(|e| OrmError::Connection(format!("invalid connection string: {}", e)))?;

        match url.scheme() {
            "postgres" | "postgresql" => {}
            other => {
                return Err(OrmError::Connection(format!(
                    "invalid connection string: unsupported scheme '{}'",
                    other
                )));
            }
        }

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| OrmError::Connection("invalid connection string: missing host".into()))?
            .to_string();

        let database = url
            .path()
            .strip_prefix('/')
            .filter(|db| !db.is_empty())
            .map(percent_decode);

        Ok(Self {
            user: percent_decode(url.username()),
            password: url.password().map(percent_decode),
            host,
            port: url.port(),
            database,
        })
    }
}

fn percent_decode(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}
