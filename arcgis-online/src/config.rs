use crate::DEFAULT_PORTAL_URL;

/// Configuration for the ArcGIS Online client
#[derive(Debug, Clone)]
pub struct ArcGisConfig {
    /// Base URL of the portal
    pub portal_url: String,
    /// User agent for HTTP requests
    pub user_agent: String,
    /// Timeout for remote requests in seconds
    pub request_timeout_secs: u64,
}

impl Default for ArcGisConfig {
    fn default() -> Self {
        Self {
            portal_url: DEFAULT_PORTAL_URL.to_string(),
            user_agent: "arcgis-online-rs/0.1".to_string(),
            request_timeout_secs: 120,
        }
    }
}

impl ArcGisConfig {
    /// Create a new configuration for ArcGIS Online
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the client at a different portal (e.g., an Enterprise instance)
    pub fn with_portal_url<S: Into<String>>(mut self, portal_url: S) -> Self {
        self.portal_url = portal_url.into();
        self
    }

    /// Set custom user agent
    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set request timeout
    pub fn with_request_timeout(mut self, timeout_secs: u64) -> Self {
        self.request_timeout_secs = timeout_secs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = ArcGisConfig::new()
            .with_portal_url("https://example.maps.arcgis.com")
            .with_user_agent("bridge/1.0")
            .with_request_timeout(30);

        assert_eq!(config.portal_url, "https://example.maps.arcgis.com");
        assert_eq!(config.user_agent, "bridge/1.0");
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn defaults_point_at_arcgis_online() {
        let config = ArcGisConfig::default();
        assert_eq!(config.portal_url, DEFAULT_PORTAL_URL);
    }
}
