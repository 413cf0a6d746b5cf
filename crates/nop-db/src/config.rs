use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::DbError;

pub const DEFAULT_CONTEXT_KEY: &str = "db_session";

/// Settings for one [`SessionManager`](crate::SessionManager).
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    /// Slot name the manager binds its session under in a request context.
    pub context_key: String,
    pub pool_size: u32,
    pub connect_timeout: Duration,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            context_key: DEFAULT_CONTEXT_KEY.to_string(),
            pool_size: 8,
            connect_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_context_key(mut self, key: impl Into<String>) -> Self {
        self.context_key = key.into();
        self
    }

    pub fn with_pool_size(mut self, size: u32) -> Self {
        self.pool_size = size.max(1);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Parsed form of a `sqlite://` connection URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseUrl {
    pub path: PathBuf,
    pub read_only: bool,
}

impl DatabaseUrl {
    /// Accepts `sqlite://relative/path.db`, `sqlite:///absolute/path.db`
    /// and an optional `?mode=ro|rw` query.
    pub fn parse(raw: &str) -> Result<Self, DbError> {
        let invalid = |reason: &str| DbError::InvalidUrl {
            url: raw.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
        if url.scheme() != "sqlite" {
            return Err(invalid("scheme must be sqlite"));
        }

        // `sqlite://nop.db` parses "nop.db" as the host. Both parts come back
        // percent-encoded.
        let encoded = match url.host_str() {
            Some(host) => format!("{}{}", host, url.path()),
            None => url.path().to_string(),
        };
        let path = urlencoding::decode(&encoded)
            .map_err(|e| invalid(&format!("path is not valid UTF-8: {}", e)))?;
        if path.is_empty() || path == "/" {
            return Err(invalid("missing database path"));
        }

        let mut read_only = false;
        for (key, value) in url.query_pairs() {
            match (key.as_ref(), value.as_ref()) {
                ("mode", "ro") => read_only = true,
                ("mode", "rw") => read_only = false,
                ("mode", other) => return Err(invalid(&format!("unknown mode '{}'", other))),
                _ => {}
            }
        }

        Ok(Self {
            path: PathBuf::from(path.as_ref()),
            read_only,
        })
    }
}
