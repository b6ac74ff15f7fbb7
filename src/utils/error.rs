use crate::core::validator::FieldErrors;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Validation failed: {errors}")]
    ValidationError { errors: FieldErrors },

    #[error("Invalid grade range: {message}")]
    RangeError { message: String },

    #[error("{kind} already exists: {key}")]
    ConflictError { kind: String, key: String },

    #[error("{kind} #{id} not found")]
    NotFoundError { kind: String, id: i64 },

    #[error("Transient failure: {message}")]
    TransientError { message: String },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

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

    #[error("Workflow cannot {action} while {phase}")]
    WorkflowError { action: String, phase: String },
}

pub type Result<T> = std::result::Result<T, ProvisionError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Conflict,
    Transient,
    Configuration,
    Workflow,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ProvisionError {
    pub fn conflict(kind: impl Into<String>, key: impl Into<String>) -> Self {
        Self::ConflictError {
            kind: kind.into(),
            key: key.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::TransientError {
            message: message.into(),
        }
    }

    pub fn range(message: impl Into<String>) -> Self {
        Self::RangeError {
            message: message.into(),
        }
    }

    /// 是否為「資料已存在」訊號（本地偵測或遠端 409）
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ConflictError { .. })
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ValidationError { .. } | Self::RangeError { .. } | Self::NotFoundError { .. } => {
                ErrorCategory::Validation
            }
            Self::ConflictError { .. } => ErrorCategory::Conflict,
            Self::TransientError { .. } | Self::ApiError(_) => ErrorCategory::Transient,
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::WorkflowError { .. } => ErrorCategory::Workflow,
            Self::IoError(_) | Self::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Conflict => ErrorSeverity::Low,
            ErrorCategory::Transient => ErrorSeverity::Medium,
            ErrorCategory::Validation | ErrorCategory::Workflow => ErrorSeverity::High,
            ErrorCategory::Configuration | ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ValidationError { errors } => {
                format!("Please correct the highlighted fields: {}", errors)
            }
            Self::RangeError { message } => format!("The grade range is not valid: {}", message),
            Self::ConflictError { kind, key } => {
                format!("A {} with the same identity already exists ({})", kind, key)
            }
            Self::TransientError { .. } | Self::ApiError(_) => {
                "The school catalog service could not be reached".to_string()
            }
            Self::WorkflowError { .. } => {
                "Another provisioning request is still in progress".to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Validation => "Fill in every required field and resubmit",
            ErrorCategory::Conflict => "Pick a different code, name or section, or edit the existing entry",
            ErrorCategory::Transient => "Retry later; already created items will be skipped",
            ErrorCategory::Configuration => "Check the configuration file and environment variables",
            ErrorCategory::Workflow => "Wait for the current batch to finish or cancel it first",
            ErrorCategory::System => "Check file permissions and disk space",
        }
    }
}
