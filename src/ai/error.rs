/// Error types for the AI collaborator module
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiError {
    /// Missing or invalid provider configuration (API key, model name)
    ConfigError(String),
    /// Transport-level failure (connection, TLS, caller-imposed timeout)
    NetworkError(String),
    /// The provider answered but the response could not be interpreted
    ProtocolError(String),
    /// The provider reported a failure
    ProviderError(String),
}

impl std::fmt::Display for AiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AiError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AiError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            AiError::ProtocolError(msg) => write!(f, "Protocol error: {}", msg),
            AiError::ProviderError(msg) => write!(f, "Provider error: {}", msg),
        }
    }
}

impl std::error::Error for AiError {}

impl From<reqwest::Error> for AiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AiError::NetworkError(format!("Request timed out: {}", err))
        } else {
            AiError::NetworkError(err.to_string())
        }
    }
}

/// Result type for AI collaborator operations
pub type AiResult<T> = Result<T, AiError>;
