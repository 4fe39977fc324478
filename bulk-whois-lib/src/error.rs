//! Error handling for bulk WHOIS operations.
//!
//! Only input and setup problems ever leave the library as an `Err`. Problems
//! with a single domain are converted into a [`FailureDetail`] on that
//! domain's outcome instead.
//!
//! [`FailureDetail`]: crate::FailureDetail

use crate::types::FailureKind;
use std::fmt;
use std::time::Duration;

/// Main error type for bulk WHOIS operations.
#[derive(Debug, Clone)]
pub enum WhoisError {
    /// A raw token could not be turned into a lookup target
    InvalidDomain { domain: String, reason: String },

    /// Normalization left nothing to look up
    NoValidDomains { rejected: usize },

    /// A lookup did not finish in time
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// Resolver-level failure (connection error, malformed response, ...)
    ResolutionError { domain: String, message: String },

    /// The registry has no record for this domain
    NotFound { domain: String },

    /// The WHOIS server refused the query because of rate limiting
    RateLimited { domain: String, message: String },

    /// The resolver backend cannot be used at all (e.g. missing `whois` binary)
    ResolverUnavailable { message: String },

    /// Configuration errors (invalid settings, unreadable TOML, ...)
    ConfigError { message: String },

    /// File I/O errors when reading domain lists or config files
    FileError { path: String, message: String },

    /// Generic internal errors that don't fit other categories
    Internal { message: String },
}

impl WhoisError {
    /// Create a new invalid domain error.
    pub fn invalid_domain<D: Into<String>, R: Into<String>>(domain: D, reason: R) -> Self {
        Self::InvalidDomain {
            domain: domain.into(),
            reason: reason.into(),
        }
    }

    /// Create a new resolution error.
    pub fn resolution<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::ResolutionError {
            domain: domain.into(),
            message: message.into(),
        }
    }

    /// Create a new not-found error.
    pub fn not_found<D: Into<String>>(domain: D) -> Self {
        Self::NotFound {
            domain: domain.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<O: Into<String>>(operation: O, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a new rate-limited error.
    pub fn rate_limited<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::RateLimited {
            domain: domain.into(),
            message: message.into(),
        }
    }

    /// Create a new resolver-unavailable error.
    pub fn resolver_unavailable<M: Into<String>>(message: M) -> Self {
        Self::ResolverUnavailable {
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this error means the registry simply has no record.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether this error aborts the whole batch rather than a single lookup.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::NoValidDomains { .. }
                | Self::ResolverUnavailable { .. }
                | Self::ConfigError { .. }
                | Self::FileError { .. }
        )
    }

    /// Map this error onto the per-outcome failure taxonomy.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::NotFound { .. } => FailureKind::NotFound,
            _ => FailureKind::ResolutionError,
        }
    }
}

impl fmt::Display for WhoisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDomain { domain, reason } => {
                write!(f, "Invalid domain '{}': {}", domain, reason)
            }
            Self::NoValidDomains { rejected } => {
                if *rejected > 0 {
                    write!(f, "No valid domains provided ({} rejected)", rejected)
                } else {
                    write!(f, "No valid domains provided")
                }
            }
            Self::Timeout {
                operation,
                duration,
            } => {
                write!(f, "Timeout after {:?} during: {}", duration, operation)
            }
            Self::ResolutionError { domain, message } => {
                write!(f, "WHOIS lookup for '{}' failed: {}", domain, message)
            }
            Self::NotFound { domain } => {
                write!(f, "No WHOIS record found for '{}'", domain)
            }
            Self::RateLimited { domain, message } => {
                write!(f, "Rate limited while looking up '{}': {}", domain, message)
            }
            Self::ResolverUnavailable { message } => {
                write!(f, "WHOIS resolver unavailable: {}", message)
            }
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for WhoisError {}

impl From<serde_json::Error> for WhoisError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal {
            message: format!("JSON serialization failed: {}", err),
        }
    }
}

impl From<std::io::Error> for WhoisError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}
