//! WHOIS resolver implementations.
//!
//! The batch pipeline only knows about the [`WhoisResolver`] trait. The
//! default implementation shells out to the system `whois` command and parses
//! its text output.

use crate::error::WhoisError;
use crate::types::WhoisRecord;
use async_trait::async_trait;

/// Parsing of raw WHOIS text into structured records
pub mod parser;

/// Resolver backed by the system `whois` command
#[cfg(feature = "system-whois")]
pub mod whois;

pub use parser::{is_not_found_response, is_rate_limited, parse_whois_response};
#[cfg(feature = "system-whois")]
pub use whois::SystemWhoisResolver;

/// Performs a single WHOIS lookup.
///
/// Implementations return:
/// - `Ok(Some(record))` when the registry answered. An empty record is
///   reported as "no data" by the batch pipeline.
/// - `Ok(None)` when the backend explicitly had nothing to return.
/// - `Err(_)` for timeouts, connection problems, malformed responses and
///   unknown domains ([`WhoisError::NotFound`]).
#[async_trait]
pub trait WhoisResolver: Send + Sync {
    /// Look up one domain.
    async fn resolve(&self, domain: &str) -> Result<Option<WhoisRecord>, WhoisError>;

    /// Verify the backend can be used at all.
    ///
    /// Called once before a batch starts. An error here aborts the batch with
    /// no lookups performed.
    async fn ensure_available(&self) -> Result<(), WhoisError> {
        Ok(())
    }
}
