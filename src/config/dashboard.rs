use super::client::{ClientConfig, DEFAULT_API_URL};
use super::DEFAULT_MAX_UPLOAD_MB;
use crate::utils::error::Result;
use crate::utils::validation::{validate_non_empty_string, validate_positive_number, Validate};
use clap::Parser;

pub const DEFAULT_DASHBOARD_PORT: u16 = 8501;

#[derive(Debug, Clone, Parser)]
#[command(name = "aibox-dashboard")]
#[command(version, about = "Browser dashboard for the AI-in-a-Box cleaning API")]
pub struct DashboardArgs {
    #[arg(long, env = "DASHBOARD_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = DEFAULT_DASHBOARD_PORT)]
    pub port: u16,

    /// Base URL of the API, as seen from the dashboard process
    #[arg(long, env = "API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Browser-reachable API base used for share and download links
    #[arg(long, env = "PUBLIC_BACKEND_BASE")]
    pub public_backend_base: Option<String>,

    #[arg(long, env = "MAX_UPLOAD_MB", default_value_t = DEFAULT_MAX_UPLOAD_MB)]
    pub max_upload_mb: usize,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, env = "LOG_JSON", help = "Emit JSON log lines")]
    pub log_json: bool,
}

impl Default for DashboardArgs {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_DASHBOARD_PORT,
            api_url: DEFAULT_API_URL.to_string(),
            public_backend_base: None,
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
            verbose: false,
            log_json: false,
        }
    }
}

impl DashboardArgs {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.api_url.clone(), self.public_backend_base.clone())
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

impl Validate for DashboardArgs {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("host", &self.host)?;
        validate_positive_number("max_upload_mb", self.max_upload_mb, 1)?;
        self.client_config().validate()
    }
}
