// src/proxy/backend.rs
use crate::config::ConfigError;
use std::fmt;
use std::hash::{Hash, Hasher};
use url::{Host, Url};

/// Identity of one backend server. Never mutated once built.
#[derive(Debug, Clone)]
pub struct Backend {
    host: String,
    port: u16,
    id: String,
}

impl Backend {
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self, ConfigError> {
        let host = host.into();
        let invalid = |reason: &str| ConfigError::InvalidBackend {
            host: host.clone(),
            port,
            reason: reason.to_string(),
        };

        if host.trim().is_empty() {
            return Err(invalid("host must not be empty"));
        }
        if port == 0 {
            return Err(invalid("port must be between 1 and 65535"));
        }

        // Bare hostname or IP literal only: no scheme, port, path or userinfo.
        Host::parse(&host).map_err(|e| invalid(&e.to_string()))?;
        let base = Url::parse(&format!("http://{}:{}/", host, port))
            .map_err(|e| invalid(&e.to_string()))?;
        if base.port_or_known_default() != Some(port)
            || base.path() != "/"
            || !base.username().is_empty()
            || base.query().is_some()
        {
            return Err(invalid("host must be a bare hostname or IP address"));
        }

        let id = format!("{}:{}", host, port);
        Ok(Self { host, port, id })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port`, used in logs and metric labels.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Outbound URL: the backend authority followed by the inbound path and
    /// query exactly as received.
    pub fn url_for(&self, path_and_query: &str) -> Result<Url, url::ParseError> {
        if path_and_query.starts_with('/') {
            Url::parse(&format!("http://{}{}", self.id, path_and_query))
        } else {
            Url::parse(&format!("http://{}/{}", self.id, path_and_query))
        }
    }
}

impl PartialEq for Backend {
    fn eq(&self, other: &Self) -> bool {
        self.host == other.host && self.port == other.port
    }
}

impl Eq for Backend {}

impl Hash for Backend {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.host.hash(state);
        self.port.hash(state);
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}
