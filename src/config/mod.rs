pub mod client;
pub mod dashboard;
pub mod file;

use crate::utils::error::{CleanError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_url, Validate,
};
use clap::Parser;
use file::FileSettings;
use std::path::PathBuf;

pub use client::ClientConfig;
pub use dashboard::DashboardArgs;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost:8501";
pub const DEFAULT_MAX_UPLOAD_MB: usize = 50;
pub const DEFAULT_SHARE_ROW_LIMIT: usize = 200;

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "aibox")]
#[command(version, about = "AI-in-a-Box data cleaning API")]
pub struct ServerArgs {
    /// Optional TOML settings file
    #[arg(short, long, env = "AIBOX_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "API_HOST")]
    pub host: Option<String>,

    /// Listen port; falls back to $PORT, then 8000
    #[arg(long, env = "API_PORT")]
    pub port: Option<u16>,

    /// Comma-separated list of allowed browser origins
    #[arg(long, env = "CORS_ORIGINS")]
    pub cors_origins: Option<String>,

    #[arg(long, env = "MAX_UPLOAD_MB")]
    pub max_upload_mb: Option<usize>,

    /// Where cleaned files are written (defaults to the system temp dir)
    #[arg(long, env = "ARTIFACT_DIR")]
    pub artifact_dir: Option<PathBuf>,

    /// Forget cleaned files after this many seconds
    #[arg(long, env = "ARTIFACT_TTL_SECS")]
    pub artifact_ttl_secs: Option<u64>,

    #[arg(long, env = "SHARE_ROW_LIMIT")]
    pub share_row_limit: Option<usize>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, env = "LOG_JSON", help = "Emit JSON log lines")]
    pub log_json: bool,
}

/// Effective server settings after merging CLI/env, file and defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub max_upload_mb: usize,
    pub artifact_dir: PathBuf,
    pub artifact_ttl_secs: Option<u64>,
    pub share_row_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cors_origins: split_origins(DEFAULT_CORS_ORIGINS),
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
            artifact_dir: std::env::temp_dir(),
            artifact_ttl_secs: None,
            share_row_limit: DEFAULT_SHARE_ROW_LIMIT,
        }
    }
}

pub fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

impl Settings {
    /// Loads the optional file named in `args` and reads `$PORT`.
    pub fn load(args: &ServerArgs) -> Result<Self> {
        let file = match &args.config {
            Some(path) => FileSettings::from_file(path)?,
            None => FileSettings::default(),
        };
        Self::resolve(args, file, std::env::var("PORT").ok())
    }

    /// Precedence: CLI/env > settings file > `PORT` (port only) > defaults.
    pub fn resolve(args: &ServerArgs, file: FileSettings, env_port: Option<String>) -> Result<Self> {
        let defaults = Settings::default();

        let fallback_port = match env_port.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => {
                Some(raw.parse::<u16>().map_err(|e| CleanError::InvalidConfigValueError {
                    field: "PORT".to_string(),
                    value: raw.to_string(),
                    reason: e.to_string(),
                })?)
            }
            _ => None,
        };

        let cors_origins = match (&args.cors_origins, file.cors_origins) {
            (Some(raw), _) => split_origins(raw),
            (None, Some(list)) => list,
            (None, None) => defaults.cors_origins,
        };

        let settings = Settings {
            host: args.host.clone().or(file.host).unwrap_or(defaults.host),
            port: args
                .port
                .or(file.port)
                .or(fallback_port)
                .unwrap_or(defaults.port),
            cors_origins,
            max_upload_mb: args
                .max_upload_mb
                .or(file.max_upload_mb)
                .unwrap_or(defaults.max_upload_mb),
            artifact_dir: args
                .artifact_dir
                .clone()
                .or(file.artifact_dir)
                .unwrap_or(defaults.artifact_dir),
            artifact_ttl_secs: args.artifact_ttl_secs.or(file.artifact_ttl_secs),
            share_row_limit: args
                .share_row_limit
                .or(file.share_row_limit)
                .unwrap_or(defaults.share_row_limit),
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("host", &self.host)?;
        validate_positive_number("max_upload_mb", self.max_upload_mb, 1)?;
        validate_positive_number("share_row_limit", self.share_row_limit, 1)?;
        if let Some(ttl) = self.artifact_ttl_secs {
            // 0 秒代表 token 一建立就過期
            validate_positive_number("artifact_ttl_secs", usize::try_from(ttl).unwrap_or(usize::MAX), 1)?;
        }
        validate_path("artifact_dir", &self.artifact_dir.to_string_lossy())?;
        for origin in &self.cors_origins {
            if origin != "*" {
                validate_url("cors_origins", origin)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::resolve(&ServerArgs::default(), FileSettings::default(), None).unwrap();
        assert_eq!(settings.bind_addr(), "0.0.0.0:8000");
        assert_eq!(settings.cors_origins, vec!["http://localhost:8501"]);
        assert_eq!(settings.max_upload_bytes(), 50 * 1024 * 1024);
        assert_eq!(settings.share_row_limit, 200);
        assert_eq!(settings.artifact_ttl_secs, None);
    }

    #[test]
    fn test_port_env_is_the_fallback() {
        let settings =
            Settings::resolve(&ServerArgs::default(), FileSettings::default(), Some("9000".to_string()))
                .unwrap();
        assert_eq!(settings.port, 9000);

        let args = ServerArgs {
            port: Some(8100),
            ..Default::default()
        };
        let settings =
            Settings::resolve(&args, FileSettings::default(), Some("9000".to_string())).unwrap();
        assert_eq!(settings.port, 8100);

        assert!(Settings::resolve(&ServerArgs::default(), FileSettings::default(), Some("abc".to_string())).is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = FileSettings {
            host: Some("127.0.0.1".to_string()),
            port: Some(7000),
            cors_origins: Some(vec!["https://app.example.com".to_string()]),
            ..Default::default()
        };
        let args = ServerArgs {
            cors_origins: Some("http://a.test, http://b.test ,".to_string()),
            ..Default::default()
        };
        let settings = Settings::resolve(&args, file, None).unwrap();
        assert_eq!(settings.host, "127.0.0.1");
        assert_eq!(settings.port, 7000);
        assert_eq!(settings.cors_origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let args = ServerArgs {
            max_upload_mb: Some(0),
            ..Default::default()
        };
        assert!(Settings::resolve(&args, FileSettings::default(), None).is_err());

        let args = ServerArgs {
            cors_origins: Some("not-a-url".to_string()),
            ..Default::default()
        };
        assert!(Settings::resolve(&args, FileSettings::default(), None).is_err());

        let args = ServerArgs {
            cors_origins: Some("*".to_string()),
            ..Default::default()
        };
        assert!(Settings::resolve(&args, FileSettings::default(), None).is_ok());
    }

    #[test]
    fn test_artifact_ttl_must_be_positive() {
        let args = ServerArgs {
            artifact_ttl_secs: Some(0),
            ..Default::default()
        };
        let err = Settings::resolve(&args, FileSettings::default(), None).unwrap_err();
        assert!(err.to_string().contains("artifact_ttl_secs"));

        let args = ServerArgs {
            artifact_ttl_secs: Some(1),
            ..Default::default()
        };
        let settings = Settings::resolve(&args, FileSettings::default(), None).unwrap();
        assert_eq!(settings.artifact_ttl_secs, Some(1));
    }
}
