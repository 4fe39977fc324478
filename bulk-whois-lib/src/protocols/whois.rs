//! WHOIS lookups through the system's `whois` command.
//!
//! The command handles server discovery and referrals; this module only runs
//! it, classifies the reply and hands the text to the parser.

use super::parser::{is_not_found_response, is_rate_limited, parse_whois_response};
use super::WhoisResolver;
use crate::error::WhoisError;
use crate::types::WhoisRecord;
use async_trait::async_trait;
use std::io::ErrorKind;
use tokio::process::Command;
use tracing::debug;

/// Replies from `whois` itself (not from a registry) about unsupported TLDs.
const UNKNOWN_TLD_PATTERNS: &[&str] = &[
    "no whois server is known",
    "no whois server",
    "invalid tld",
    "unknown tld",
    "no such tld",
];

/// Resolver that runs the system `whois` command for each lookup.
///
/// The child process is killed if the lookup future is dropped, so batch
/// timeouts and cancellation do not leave stray processes behind.
#[derive(Debug, Clone)]
pub struct SystemWhoisResolver {
    /// Program to execute
    command: String,
}

impl SystemWhoisResolver {
    /// Create a resolver using `whois` from `PATH`.
    pub fn new() -> Self {
        Self {
            command: "whois".to_string(),
        }
    }

    /// Create a resolver using a specific program.
    pub fn with_command<C: Into<String>>(command: C) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// The program this resolver runs.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Run the command and return its stdout.
    async fn run(&self, domain: &str) -> Result<String, WhoisError> {
        let output = Command::new(&self.command)
            .arg(domain)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                WhoisError::resolution(domain, format!("failed to execute '{}': {}", self.command, e))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();

        if !output.status.success() && stdout.trim().is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr.trim();
            return Err(WhoisError::resolution(
                domain,
                if message.is_empty() {
                    format!("'{}' exited with {}", self.command, output.status)
                } else {
                    message.to_string()
                },
            ));
        }

        Ok(stdout)
    }
}

impl Default for SystemWhoisResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WhoisResolver for SystemWhoisResolver {
    async fn resolve(&self, domain: &str) -> Result<Option<WhoisRecord>, WhoisError> {
        let text = self.run(domain).await?;
        debug!(domain, bytes = text.len(), "received WHOIS response");
        classify_response(domain, &text)
    }

    async fn ensure_available(&self) -> Result<(), WhoisError> {
        // Only a missing binary counts; many whois builds reject --version
        match Command::new(&self.command)
            .arg("--version")
            .kill_on_drop(true)
            .output()
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(WhoisError::resolver_unavailable(
                format!("'{}' command not found. Make sure 'whois' is installed.", self.command),
            )),
            Err(e) => Err(WhoisError::resolver_unavailable(format!(
                "cannot execute '{}': {}",
                self.command, e
            ))),
        }
    }
}

/// Turn raw `whois` output into a resolver result.
///
/// A parsed registrar or creation date always wins, because some registries
/// include phrases like "not found" in their legal boilerplate.
fn classify_response(domain: &str, text: &str) -> Result<Option<WhoisRecord>, WhoisError> {
    if text.trim().is_empty() {
        return Ok(None);
    }

    let record = parse_whois_response(text);
    if record.registrar.is_some() || record.creation_date.is_some() {
        return Ok(Some(record));
    }

    let lower = text.to_lowercase();
    if UNKNOWN_TLD_PATTERNS.iter().any(|p| lower.contains(p)) {
        return Err(WhoisError::resolution(domain, "no WHOIS server known for this TLD"));
    }
    if is_rate_limited(text) {
        return Err(WhoisError::rate_limited(domain, "WHOIS server throttled the query"));
    }
    if is_not_found_response(text) {
        return Err(WhoisError::not_found(domain));
    }

    Ok(Some(record))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolver_creation() {
        assert_eq!(SystemWhoisResolver::new().command(), "whois");
        assert_eq!(
            SystemWhoisResolver::with_command("/usr/local/bin/whois").command(),
            "/usr/local/bin/whois"
        );
    }

    #[test]
    fn test_classify_registered_domain() {
        let text = "Registrar: Example Registrar, Inc.\nCreation Date: 2001-01-01\nNot found in cache: ignore\n";
        let record = classify_response("example.com", text).unwrap().unwrap();
        assert_eq!(record.registrar.as_deref(), Some("Example Registrar, Inc."));
    }

    #[test]
    fn test_classify_not_found() {
        let err = classify_response("nope-12345.com", "No match for \"NOPE-12345.COM\".\n")
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_classify_rate_limited() {
        let err = classify_response("a.com", "Too many requests, try again later\n").unwrap_err();
        assert!(matches!(err, WhoisError::RateLimited { .. }));
    }

    #[test]
    fn test_classify_unknown_tld() {
        let err = classify_response("a.zzzz", "No whois server is known for this kind of object.\n")
            .unwrap_err();
        assert!(matches!(err, WhoisError::ResolutionError { .. }));
    }

    #[test]
    fn test_classify_empty_output() {
        assert_eq!(classify_response("a.com", "  \n").unwrap(), None);
    }

    #[test]
    fn test_classify_unparseable_output() {
        let record = classify_response("a.com", "Some free-form text the parser ignores\n")
            .unwrap()
            .unwrap();
        assert!(record.is_empty());
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let resolver = SystemWhoisResolver::with_command("definitely-not-a-whois-binary-4242");
        let err = resolver.ensure_available().await.unwrap_err();
        assert!(matches!(err, WhoisError::ResolverUnavailable { .. }));
    }
}
