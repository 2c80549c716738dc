use thiserror::Error;

#[derive(Error, Debug)]
pub enum PermitError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid query: {message}")]
    InvalidQuery { message: String },

    #[error("{adapter} responded with HTTP {status}")]
    UpstreamStatus { adapter: String, status: u16 },

    #[error("Unexpected response from {source_name}: {message}")]
    UnexpectedResponse {
        source_name: String,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Input,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl PermitError {
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::HttpError(_) | Self::UpstreamStatus { .. } => ErrorCategory::Network,
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::InvalidQuery { .. } => ErrorCategory::Input,
            Self::UnexpectedResponse { .. } => ErrorCategory::Data,
            Self::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input => ErrorSeverity::Low,
            ErrorCategory::Network | ErrorCategory::Data => ErrorSeverity::Medium,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 根據錯誤嚴重程度決定退出碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,      // 警告，但成功
            ErrorSeverity::Medium => 2,   // 重試錯誤
            ErrorSeverity::High => 1,     // 處理錯誤
            ErrorSeverity::Critical => 3, // 系統錯誤
        }
    }

    /// 給使用者看的簡短訊息
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::HttpError(_) | Self::UpstreamStatus { .. } => {
                "A permit data source could not be reached".to_string()
            }
            Self::IoError(e) => format!("File system error: {}", e),
            Self::UnexpectedResponse { .. } => {
                "A permit data source returned data in an unexpected format".to_string()
            }
            Self::ConfigError { message } => format!("Configuration problem: {}", message),
            Self::ConfigValidationError { field, message } => {
                format!("Configuration field '{}' is invalid: {}", field, message)
            }
            Self::InvalidConfigValueError { field, reason, .. } => {
                format!("Configuration field '{}' is invalid: {}", field, reason)
            }
            Self::MissingConfigError { field } => {
                format!("Configuration field '{}' is required", field)
            }
            Self::InvalidQuery { message } => message.clone(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check network connectivity and the adapter endpoint URL",
            ErrorCategory::Configuration => {
                "Review the TOML configuration file and any ${VAR} environment variables it uses"
            }
            ErrorCategory::Input => {
                "Provide an 'address' or 'parcel' parameter and ISO dates (YYYY-MM-DD)"
            }
            ErrorCategory::Data => "The upstream schema may have changed; check the field mapping",
            ErrorCategory::System => "Check file permissions and that the path exists",
        }
    }
}

pub type Result<T> = std::result::Result<T, PermitError>;
