use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Weibo API error: {0}")]
    WeiboApi(#[from] WeiboApiError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

#[derive(Error, Debug, Clone)]
pub enum WeiboApiError {
    #[error("{url} responded with status {status}")]
    RequestFailed { url: String, status: u16 },

    #[error("Invalid API response: {details}")]
    InvalidResponse { details: String },

    #[error("Request to {url} timed out")]
    RequestTimeout { url: String },

    #[error("{nickname} is not a Weibo user name or Weibo returned a bad response")]
    UserNotFound { nickname: String },
}

impl WeiboApiError {
    pub fn invalid_response(details: impl Into<String>) -> Self {
        WeiboApiError::InvalidResponse {
            details: details.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Workbook error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error("Invalid export path: {path}")]
    InvalidPath { path: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}
