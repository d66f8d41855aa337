use thiserror::Error;

/// Why a provider call failed. Drives the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    Timeout,
    RateLimited,
    Http,
    InvalidResponse,
    Unavailable,
    /// In-process model failure (loading, tokenization, inference).
    Model,
}

impl std::fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Timeout => "timeout",
            Self::RateLimited => "rate limited",
            Self::Http => "http",
            Self::InvalidResponse => "invalid response",
            Self::Unavailable => "unavailable",
            Self::Model => "model",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Ingestion failed for '{source_name}': {reason}")]
    Ingestion { source_name: String, reason: String },

    #[error("Provider error ({kind}): {message}")]
    Provider { kind: ProviderErrorKind, message: String },

    #[error("Vector index is not ready: build it from at least one chunk first")]
    IndexNotReady,

    #[error("Could not parse structured model output: {0}")]
    SkillParse(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn provider(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self::Provider { kind, message: message.into() }
    }

    pub fn ingestion(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Ingestion { source_name: source_name.into(), reason: reason.into() }
    }

    /// Transient provider failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Provider {
                kind: ProviderErrorKind::Timeout
                    | ProviderErrorKind::RateLimited
                    | ProviderErrorKind::Unavailable,
                ..
            }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_provider_errors_retry() {
        assert!(Error::provider(ProviderErrorKind::Timeout, "slow").is_retryable());
        assert!(Error::provider(ProviderErrorKind::RateLimited, "429").is_retryable());
        assert!(Error::provider(ProviderErrorKind::Unavailable, "503").is_retryable());
        assert!(!Error::provider(ProviderErrorKind::Http, "401").is_retryable());
        assert!(!Error::provider(ProviderErrorKind::Model, "bad weights").is_retryable());
        assert!(!Error::IndexNotReady.is_retryable());
        assert!(!Error::SkillParse("x".into()).is_retryable());
    }
}
