//! Turning raw user input into lookup targets.
//!
//! Input comes from command-line arguments and domain files, so it is full of
//! noise: stray whitespace, mixed case, pasted URLs, repeated entries. This
//! module cleans that up into an ordered list of unique [`DomainTarget`]s.

use crate::error::WhoisError;
use crate::types::DomainTarget;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Longest domain name accepted, per RFC 1035.
const MAX_DOMAIN_LEN: usize = 253;

lazy_static! {
    /// One or more LDH labels followed by an alphabetic (or punycode) TLD.
    static ref DOMAIN_PATTERN: Regex = Regex::new(
        r"^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+(?:[a-z]{2,63}|xn--[a-z0-9-]{1,59})$"
    )
    .expect("domain pattern is valid");
}

/// A raw token that was dropped during normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedToken {
    /// The token as the user supplied it
    pub token: String,
    /// Why it was dropped
    pub reason: String,
}

/// Output of [`normalize_domains`].
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    /// Unique targets in first-seen order
    pub targets: Vec<DomainTarget>,
    /// Tokens that were dropped, in input order
    pub rejected: Vec<RejectedToken>,
    /// How many valid tokens were dropped as repeats
    pub duplicates: usize,
}

/// Normalize raw domain strings into an ordered list of unique targets.
///
/// Each token is trimmed and lowercased, and any `http://`/`https://` scheme,
/// port, path, query or fragment is stripped. Tokens that are empty or not a
/// valid domain are collected in [`Normalized::rejected`] instead of failing
/// the batch. Repeats keep their first position.
///
/// # Errors
///
/// Returns [`WhoisError::NoValidDomains`] when nothing valid remains.
///
/// # Example
///
/// ```rust
/// use bulk_whois_lib::normalize_domains;
///
/// let normalized = normalize_domains(["a.com", "A.com", " b.com "]).unwrap();
/// let domains: Vec<&str> = normalized.targets.iter().map(|t| t.as_str()).collect();
/// assert_eq!(domains, ["a.com", "b.com"]);
/// ```
pub fn normalize_domains<I, S>(raw: I) -> Result<Normalized, WhoisError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized = Normalized::default();
    let mut seen = HashSet::new();

    for token in raw {
        let token = token.as_ref();
        match canonicalize(token) {
            Ok(domain) => {
                if seen.insert(domain.clone()) {
                    normalized.targets.push(DomainTarget::new_unchecked(domain));
                } else {
                    debug!(domain = %domain, "dropping duplicate domain");
                    normalized.duplicates += 1;
                }
            }
            Err(WhoisError::InvalidDomain { reason, .. }) => {
                warn!(token = %token, reason = %reason, "skipping invalid domain");
                normalized.rejected.push(RejectedToken {
                    token: token.to_string(),
                    reason,
                });
            }
            Err(other) => return Err(other),
        }
    }

    if normalized.targets.is_empty() {
        return Err(WhoisError::NoValidDomains {
            rejected: normalized.rejected.len(),
        });
    }

    Ok(normalized)
}

/// Split domain-list text into raw tokens.
///
/// Domains may be separated by any whitespace, including newlines. A token
/// starting with `#` comments out the rest of its line.
pub fn split_domain_text(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();

    for line in text.lines() {
        for word in line.split_whitespace() {
            if word.starts_with('#') {
                break;
            }
            tokens.push(word.to_string());
        }
    }

    tokens
}

/// Reduce one raw token to its canonical domain form, or explain why not.
pub(crate) fn canonicalize(token: &str) -> Result<String, WhoisError> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return Err(WhoisError::invalid_domain(token, "empty domain"));
    }

    let lowered = trimmed.to_lowercase();
    let without_scheme = lowered
        .strip_prefix("https://")
        .or_else(|| lowered.strip_prefix("http://"))
        .unwrap_or(&lowered);

    // Everything from the first path, query or fragment delimiter is noise
    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();

    let host = strip_port(host).trim_end_matches('.');

    if host.is_empty() {
        return Err(WhoisError::invalid_domain(token, "empty domain"));
    }
    if host.chars().any(char::is_whitespace) {
        return Err(WhoisError::invalid_domain(token, "contains whitespace"));
    }
    if !host.contains('.') {
        return Err(WhoisError::invalid_domain(token, "missing dot separator"));
    }
    if host.len() > MAX_DOMAIN_LEN {
        return Err(WhoisError::invalid_domain(
            token,
            format!("longer than {} characters", MAX_DOMAIN_LEN),
        ));
    }
    if !DOMAIN_PATTERN.is_match(host) {
        return Err(WhoisError::invalid_domain(
            token,
            "illegal characters or label structure",
        ));
    }

    Ok(host.to_string())
}

/// Drop a trailing `:port` if the part after the colon is numeric.
fn strip_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => {
            name
        }
        _ => host,
    }
}
