use std::net::SocketAddr;

/// Runtime configuration for the frame bus server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the websocket host listens on
    pub bind_addr: SocketAddr,
    /// Origin this process presents to child frames
    pub origin: String,
    /// Origins whose messages are trusted; empty trusts every origin
    pub allowed_origins: Vec<String>,
    /// Location of the connection that plays the opener window
    pub opener_url: Option<String>,
    /// Tracing filter used when RUST_LOG is not set
    pub log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            origin: "http://localhost:3000".to_string(),
            allowed_origins: Vec::new(),
            opener_url: None,
            log_filter: "framebus=debug,tower_http=debug".to_string(),
        }
    }
}

impl ServerConfig {
    /// Read overrides from the environment, keeping defaults for anything unset or unparsable
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("FRAMEBUS_BIND").and_then(|v| v.parse().ok()) {
            config.bind_addr = addr;
        }
        if let Some(origin) = lookup("FRAMEBUS_ORIGIN").filter(|v| !v.is_empty()) {
            config.origin = origin;
        }
        if let Some(origins) = lookup("FRAMEBUS_ALLOWED_ORIGINS") {
            config.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }
        config.opener_url = lookup("FRAMEBUS_OPENER").filter(|v| !v.is_empty());
        if let Some(filter) = lookup("RUST_LOG").filter(|v| !v.is_empty()) {
            config.log_filter = filter;
        }

        config
    }

    /// Whether messages from `origin` are trusted
    pub fn is_trusted(&self, origin: Option<&str>) -> bool {
        if self.allowed_origins.is_empty() {
            return true;
        }
        origin.is_some_and(|o| self.allowed_origins.iter().any(|allowed| allowed == o))
    }
}
