use crate::utils::error::Result;
use crate::utils::validation::{validate_url, Validate};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Where the client reaches the API, and the base a browser should use for
/// share links (they differ when the API runs behind a container network).
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub api_url: String,
    pub public_backend_base: String,
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>, public_backend_base: Option<String>) -> Self {
        let api_url = api_url.into();
        let public_backend_base = public_backend_base
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| api_url.clone());
        Self {
            api_url,
            public_backend_base,
        }
    }

    pub fn api_endpoint(&self, path: &str) -> String {
        join_url(&self.api_url, path)
    }

    /// Joins a backend path with the browser-reachable base URL.
    pub fn public_link(&self, path: &str) -> String {
        join_url(&self.public_backend_base, path)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL, None)
    }
}

impl Validate for ClientConfig {
    fn validate(&self) -> Result<()> {
        validate_url("API_URL", &self.api_url)?;
        validate_url("PUBLIC_BACKEND_BASE", &self.public_backend_base)
    }
}

fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}
