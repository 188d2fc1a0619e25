use crate::utils::error::{CleanError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("static env var regex"));

/// Server settings as written in a TOML file. Every field is optional.
///
/// ```toml
/// host = "0.0.0.0"
/// port = 8000
/// cors_origins = ["http://localhost:8501", "${DASHBOARD_URL}"]
/// max_upload_mb = 50
/// artifact_dir = "/var/lib/aibox"
/// artifact_ttl_secs = 86400
/// share_row_limit = 200
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub cors_origins: Option<Vec<String>>,
    pub max_upload_mb: Option<usize>,
    pub artifact_dir: Option<PathBuf>,
    pub artifact_ttl_secs: Option<u64>,
    pub share_row_limit: Option<usize>,
}

impl FileSettings {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| CleanError::ConfigError {
            message: format!("cannot read {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = substitute_env_vars(content);
        toml::from_str(&processed).map_err(|e| CleanError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }
}

/// 替換環境變數 (例如 ${DASHBOARD_URL})；未定義的變數保持原樣
pub fn substitute_env_vars(content: &str) -> String {
    ENV_VAR
        .replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_full_file() {
        let settings = FileSettings::from_toml_str(
            r#"
host = "127.0.0.1"
port = 8080
cors_origins = ["http://localhost:8501"]
artifact_ttl_secs = 3600
"#,
        )
        .unwrap();

        assert_eq!(settings.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(settings.port, Some(8080));
        assert_eq!(settings.artifact_ttl_secs, Some(3600));
        assert_eq!(settings.max_upload_mb, None);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(FileSettings::from_toml_str("hots = \"x\"").is_err());
    }

    #[test]
    fn test_env_substitution() {
        std::env::set_var("AIBOX_TEST_ORIGIN", "https://dash.example.com");
        let out = substitute_env_vars("origin = \"${AIBOX_TEST_ORIGIN}\" other = \"${AIBOX_UNSET_VAR_X}\"");
        assert_eq!(
            out,
            "origin = \"https://dash.example.com\" other = \"${AIBOX_UNSET_VAR_X}\""
        );
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "share_row_limit = 50").unwrap();
        let settings = FileSettings::from_file(file.path()).unwrap();
        assert_eq!(settings.share_row_limit, Some(50));

        assert!(FileSettings::from_file("/definitely/missing/aibox.toml").is_err());
    }
}
