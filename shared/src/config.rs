use crate::tiles::OSM_TILE_URL;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u32 = 30_000;
pub const DEFAULT_MAP_ZOOM: f64 = 15.0;
/// `localStorage` key holding the session token.
pub const TOKEN_STORAGE_KEY: &str = "cidade_token";

/// Runtime settings of the web client.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub request_timeout_ms: u32,
    pub tile_url_template: String,
    pub default_zoom: f64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            tile_url_template: OSM_TILE_URL.to_string(),
            default_zoom: DEFAULT_MAP_ZOOM,
        }
    }
}

impl ClientConfig {
    /// Settings baked in at build time through `CIDADE_API_BASE_URL` and
    /// `CIDADE_API_TIMEOUT_MS`.
    pub fn from_build_env() -> Self {
        Self::from_values(
            option_env!("CIDADE_API_BASE_URL"),
            option_env!("CIDADE_API_TIMEOUT_MS"),
        )
    }

    /// Blank, unparsable, or non-positive overrides fall back to the defaults.
    pub fn from_values(base_url: Option<&str>, timeout_ms: Option<&str>) -> Self {
        let defaults = Self::default();
        let api_base_url = base_url
            .map(|value| value.trim().trim_end_matches('/'))
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or(defaults.api_base_url);
        let request_timeout_ms = timeout_ms
            .and_then(|value| value.trim().parse::<u32>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(defaults.request_timeout_ms);
        Self {
            api_base_url,
            request_timeout_ms,
            ..defaults
        }
    }

    /// Absolute URL for an API path (which must start with `/`).
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset() {
        let config = ClientConfig::from_values(None, None);
        assert_eq!(config.api_base_url, "http://localhost:8000");
        assert_eq!(config.request_timeout_ms, 30_000);
    }

    #[test]
    fn overrides_are_trimmed() {
        let config = ClientConfig::from_values(Some(" https://api.cidade.example/ "), Some("5000"));
        assert_eq!(config.api_base_url, "https://api.cidade.example");
        assert_eq!(config.request_timeout_ms, 5_000);
        assert_eq!(
            config.url("/api/problems/list"),
            "https://api.cidade.example/api/problems/list"
        );
    }

    #[test]
    fn invalid_overrides_are_ignored() {
        let config = ClientConfig::from_values(Some("   "), Some("0"));
        assert_eq!(config, ClientConfig::default());
        let config = ClientConfig::from_values(None, Some("soon"));
        assert_eq!(config.request_timeout_ms, DEFAULT_REQUEST_TIMEOUT_MS);
    }
}
