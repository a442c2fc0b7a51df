//! Error types for aliddns.

use thiserror::Error;

/// Result type alias for aliddns.
pub type Result<T> = std::result::Result<T, DdnsError>;

/// DDNS error types.
#[derive(Error, Debug)]
pub enum DdnsError {
    /// Configuration error (credentials, redo spec, domain shape).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network/HTTP error.
    #[error("Network error: {0}")]
    Network(String),

    /// Provider rejected the request.
    #[error("Provider error ({provider}): {message}")]
    Provider { provider: String, message: String },

    /// More than one record exists for the same host label.
    #[error("Duplicate record for {rr}.{domain}")]
    DuplicateRecord { rr: String, domain: String },

    /// The matched record carries a different type than requested.
    #[error("Record type mismatch: existing={existing}, desired={desired}")]
    TypeMismatch { existing: String, desired: String },

    /// IP detection error.
    #[error("IP detection failed: {0}")]
    IpDetection(String),

    /// DNS wire error from a single upstream.
    #[error("DNS query failed: {0}")]
    Dns(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DdnsError {
    /// Whether this is the provider-side duplicate conflict that reconciliation recovers from.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, DdnsError::DuplicateRecord { .. })
    }
}

impl From<reqwest::Error> for DdnsError {
    fn from(e: reqwest::Error) -> Self {
        DdnsError::Network(e.to_string())
    }
}

impl From<toml::de::Error> for DdnsError {
    fn from(e: toml::de::Error) -> Self {
        DdnsError::Config(e.to_string())
    }
}

impl From<serde_json::Error> for DdnsError {
    fn from(e: serde_json::Error) -> Self {
        DdnsError::Serialization(e.to_string())
    }
}

impl From<hickory_proto::ProtoError> for DdnsError {
    fn from(e: hickory_proto::ProtoError) -> Self {
        DdnsError::Dns(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_is_recoverable() {
        let err = DdnsError::DuplicateRecord {
            rr: "ddns".to_string(),
            domain: "example.com".to_string(),
        };
        assert!(err.is_duplicate());
        assert_eq!(err.to_string(), "Duplicate record for ddns.example.com");
    }

    #[test]
    fn test_other_errors_are_not_duplicates() {
        assert!(!DdnsError::Network("timeout".to_string()).is_duplicate());
        assert!(!DdnsError::TypeMismatch {
            existing: "AAAA".to_string(),
            desired: "A".to_string(),
        }
        .is_duplicate());
    }

    #[test]
    fn test_type_mismatch_message() {
        let err = DdnsError::TypeMismatch {
            existing: "AAAA".to_string(),
            desired: "A".to_string(),
        };
        assert_eq!(err.to_string(), "Record type mismatch: existing=AAAA, desired=A");
    }
}
