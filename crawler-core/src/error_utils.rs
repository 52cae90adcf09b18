use crate::error::*;
use tracing::{error, warn};

pub trait ErrorExt: std::fmt::Display {
    fn log_error(&self) -> &Self {
        error!("{}", self);
        self
    }

    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!("CoreError: {}", self);
        match self {
            CoreError::WeiboApi(e) => {
                error!("Weibo API error details: {:?}", e);
            }
            CoreError::Export(e) => {
                error!("Export error details: {:?}", e);
            }
            CoreError::Config(e) => {
                error!("Configuration error details: {:?}", e);
            }
            _ => {}
        }
        self
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::WeiboApi(e) => e.user_friendly_message(),
            CoreError::Export(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Io(e) => format!("File system error: {}", e),
            CoreError::Network(_) => {
                "Network connection error. Please check your internet connection.".to_string()
            }
            CoreError::InvalidInput { message } => format!("Invalid input: {}", message),
            _ => "An unexpected error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::WeiboApi(_) => "WEIBO_API".to_string(),
            CoreError::Export(_) => "EXPORT".to_string(),
            CoreError::Config(_) => "CONFIG".to_string(),
            CoreError::Io(_) => "IO".to_string(),
            CoreError::Serialization(_) => "SERIALIZATION".to_string(),
            CoreError::Network(_) => "NETWORK".to_string(),
            CoreError::InvalidInput { .. } => "INVALID_INPUT".to_string(),
            CoreError::Internal { .. } => "INTERNAL".to_string(),
        }
    }
}

impl ErrorExt for WeiboApiError {
    fn user_friendly_message(&self) -> String {
        match self {
            WeiboApiError::RequestFailed { status: 403, .. } => {
                "Weibo refused the request. The cookie may be missing or expired.".to_string()
            }
            WeiboApiError::RequestFailed { url, status } => {
                format!("Weibo returned status {} for {}.", status, url)
            }
            WeiboApiError::InvalidResponse { .. } => {
                "Weibo returned a response in an unexpected format.".to_string()
            }
            WeiboApiError::RequestTimeout { .. } => {
                "Request to Weibo timed out. Please try again.".to_string()
            }
            WeiboApiError::UserNotFound { nickname } => {
                format!("No Weibo user named '{}' was found.", nickname)
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            WeiboApiError::RequestFailed { .. } => "WEIBO_REQUEST_FAILED".to_string(),
            WeiboApiError::InvalidResponse { .. } => "WEIBO_INVALID_RESPONSE".to_string(),
            WeiboApiError::RequestTimeout { .. } => "WEIBO_TIMEOUT".to_string(),
            WeiboApiError::UserNotFound { .. } => "WEIBO_USER_NOT_FOUND".to_string(),
        }
    }
}

impl ErrorExt for ExportError {
    fn user_friendly_message(&self) -> String {
        match self {
            ExportError::Workbook(e) => format!("Could not write the spreadsheet: {}", e),
            ExportError::InvalidPath { path } => {
                format!("Cannot export to '{}'. Please check the output directory.", path)
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            ExportError::Workbook(_) => "EXPORT_WORKBOOK".to_string(),
            ExportError::InvalidPath { .. } => "EXPORT_INVALID_PATH".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => {
                format!("Configuration file not found at '{}'.", path)
            }
            ConfigError::InvalidValue { field, value } => {
                format!("Invalid value '{}' for setting '{}'.", value, field)
            }
            ConfigError::Parse(_) => {
                "Configuration file is not valid TOML. Please check the syntax.".to_string()
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
        }
    }
}

/// Most specific code for `error`: the subsystem's own code when there is
/// one, otherwise the top-level code.
pub fn detailed_error_code(error: &CoreError) -> String {
    match error {
        CoreError::WeiboApi(e) => e.error_code(),
        CoreError::Export(e) => e.error_code(),
        CoreError::Config(e) => e.error_code(),
        other => other.error_code(),
    }
}

/// Crawl targets (keywords or uids) that failed, each with the code of the
/// error that stopped it.
#[derive(Debug, Default)]
pub struct FailureReport {
    failures: Vec<(String, String)>,
}

impl FailureReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log `error` as the reason `target` stopped and remember it.
    pub fn record(&mut self, target: &str, error: &CoreError) {
        error.log_error();
        let code = detailed_error_code(error);
        warn!(
            "Crawl of '{}' failed [{}]: {}",
            target,
            code,
            error.user_friendly_message()
        );
        self.failures.push((target.to_string(), code));
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// `target (CODE)` pairs in the order they failed.
    pub fn summary(&self) -> String {
        self.failures
            .iter()
            .map(|(target, code)| format!("{} ({})", target, code))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
