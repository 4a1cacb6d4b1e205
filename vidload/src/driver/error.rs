use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Invalid base URL `{url}`: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Base URL `{0}` must use http or https.")]
    UnsupportedScheme(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request timed out.")]
    Timeout,

    #[error("Transport failure: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Expected HTTP {expected}, got {actual}.")]
    UnexpectedStatus { expected: u16, actual: u16 },

    #[error("Response is missing `{0}`.")]
    MissingField(&'static str),

    #[error("Response body is not the expected JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for DriverError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DriverError::Timeout
        } else {
            DriverError::Transport(err)
        }
    }
}
