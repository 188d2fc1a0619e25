use thiserror::Error;

#[derive(Error, Debug)]
pub enum CleanError {
    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Failed to read workbook: {0}")]
    WorkbookReadError(#[from] calamine::XlsxError),

    #[error("Failed to write workbook: {0}")]
    WorkbookWriteError(#[from] rust_xlsxwriter::XlsxError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API responded with {status}: {body}")]
    ApiStatus { status: u16, body: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required setting: {field}")]
    MissingConfigError { field: String },

    #[error("Unsupported file '{file_name}': only CSV or XLSX allowed")]
    UnsupportedFile { file_name: String },

    #[error("No rows detected in file.")]
    EmptyInput,

    #[error("File too large ({size} bytes, max {max} bytes)")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Artifact not found: {token}")]
    ArtifactNotFound { token: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

impl CleanError {
    pub fn processing(message: impl Into<String>) -> Self {
        Self::ProcessingError {
            message: message.into(),
        }
    }

    /// 是否由使用者輸入造成 (上傳檔案或參數有誤)
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::CsvError(_)
                | Self::WorkbookReadError(_)
                | Self::UnsupportedFile { .. }
                | Self::EmptyInput
                | Self::InvalidConfigValueError { .. }
                | Self::MissingConfigError { .. }
        )
    }

    /// 給使用者的處理建議
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::UnsupportedFile { .. } => "Upload a .csv or .xlsx file",
            Self::EmptyInput => "Check that the file has a header row and at least one data row",
            Self::CsvError(_) | Self::WorkbookReadError(_) => {
                "Re-export the sheet as UTF-8 CSV or XLSX and try again"
            }
            Self::PayloadTooLarge { .. } => "Split the file or raise MAX_UPLOAD_MB",
            Self::ArtifactNotFound { .. } => "Clean the file again to get a fresh token",
            Self::ApiError(_) => "Check that the API is running and API_URL points to it",
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => "Fix the setting and restart",
            _ => "See the logs for details",
        }
    }
}

pub type Result<T> = std::result::Result<T, CleanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors_are_classified() {
        assert!(CleanError::EmptyInput.is_input_error());
        assert!(CleanError::UnsupportedFile {
            file_name: "a.txt".to_string()
        }
        .is_input_error());
        assert!(!CleanError::processing("boom").is_input_error());
        assert!(!CleanError::ArtifactNotFound {
            token: "x".to_string()
        }
        .is_input_error());
    }

    #[test]
    fn test_empty_input_message() {
        assert_eq!(CleanError::EmptyInput.to_string(), "No rows detected in file.");
    }
}
