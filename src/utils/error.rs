use thiserror::Error;

#[derive(Error, Debug)]
pub enum InvoiceError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Renderer failed: {message}")]
    Render { message: String },

    #[error("Renderer timed out after {seconds}s")]
    RenderTimeout { seconds: u64 },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Provisioning error: {message}")]
    Provisioning { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid value for {field}: {reason} (got '{value}')")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfig { field: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Download failed: {0}")]
    Download(#[from] reqwest::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Render,
    Storage,
    Provisioning,
    Configuration,
    System,
}

impl InvoiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn render(message: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn provisioning(message: impl Into<String>) -> Self {
        Self::Provisioning {
            message: message.into(),
        }
    }

    /// 超出長度限制時的統一錯誤
    pub fn input_too_long() -> Self {
        Self::validation("input too long")
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::Render { .. } | Self::RenderTimeout { .. } => ErrorCategory::Render,
            Self::Storage { .. } => ErrorCategory::Storage,
            Self::Provisioning { .. } | Self::Download(_) | Self::Archive(_) => {
                ErrorCategory::Provisioning
            }
            Self::Config { .. } | Self::InvalidConfigValue { .. } | Self::MissingConfig { .. } => {
                ErrorCategory::Configuration
            }
            Self::Io(_) | Self::Serialization(_) => ErrorCategory::System,
        }
    }

    pub fn is_validation(&self) -> bool {
        self.category() == ErrorCategory::Validation
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Validation { message } => format!("Invalid invoice input: {}", message),
            Self::Render { .. } | Self::RenderTimeout { .. } => {
                format!("The invoice could not be rendered: {}", self)
            }
            Self::Storage { message } => format!("The invoice could not be stored: {}", message),
            Self::Provisioning { .. } | Self::Download(_) | Self::Archive(_) => {
                format!("The invoice renderer is not available: {}", self)
            }
            Self::Config { .. } | Self::InvalidConfigValue { .. } | Self::MissingConfig { .. } => {
                format!("Configuration problem: {}", self)
            }
            Self::Io(_) | Self::Serialization(_) => format!("Unexpected system error: {}", self),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Validation => {
                "Check the payload: from, to, tax and items are required and items look like '2x Widget [$ 10]'"
            }
            ErrorCategory::Render => {
                "Check that the renderer binary runs on this host, or raise renderer.timeout_seconds"
            }
            ErrorCategory::Storage => "Check that storage.root exists and is writable",
            ErrorCategory::Provisioning => {
                "Check network access to the release URL or install the renderer into renderer.install_dir manually"
            }
            ErrorCategory::Configuration => "Fix the configuration file and try again",
            ErrorCategory::System => "Retry the operation; if it keeps failing, run with --verbose",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Validation => 2,
            ErrorCategory::Render => 3,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, InvoiceError>;
