//! Parsing of WHOIS text responses.
//!
//! WHOIS responses are free-form `Key: value` text whose key names differ
//! from registry to registry. The parser maps the common spellings onto
//! [`WhoisRecord`] fields. The first value seen for a single-valued field
//! wins, which favours the registry block over later registrar blocks.

use crate::types::WhoisRecord;

/// Which record field a WHOIS key feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Registrar,
    CreationDate,
    ExpirationDate,
    UpdatedDate,
    NameServer,
    Status,
    RegistrantName,
    RegistrantOrganization,
    RegistrantCountry,
    AdminEmail,
    TechEmail,
}

/// Key spellings seen in the wild, lowercase.
const FIELD_KEYS: &[(&str, Field)] = &[
    ("registrar", Field::Registrar),
    ("registrar name", Field::Registrar),
    ("sponsoring registrar", Field::Registrar),
    ("creation date", Field::CreationDate),
    ("created", Field::CreationDate),
    ("created on", Field::CreationDate),
    ("registered on", Field::CreationDate),
    ("registration time", Field::CreationDate),
    ("domain registration date", Field::CreationDate),
    ("registry expiry date", Field::ExpirationDate),
    ("registrar registration expiration date", Field::ExpirationDate),
    ("expiration date", Field::ExpirationDate),
    ("expiry date", Field::ExpirationDate),
    ("expires", Field::ExpirationDate),
    ("expires on", Field::ExpirationDate),
    ("expiration time", Field::ExpirationDate),
    ("paid-till", Field::ExpirationDate),
    ("updated date", Field::UpdatedDate),
    ("last updated", Field::UpdatedDate),
    ("last modified", Field::UpdatedDate),
    ("changed", Field::UpdatedDate),
    ("name server", Field::NameServer),
    ("nameserver", Field::NameServer),
    ("nameservers", Field::NameServer),
    ("nserver", Field::NameServer),
    ("domain status", Field::Status),
    ("status", Field::Status),
    ("state", Field::Status),
    ("registrant name", Field::RegistrantName),
    ("registrant", Field::RegistrantName),
    ("registrant organization", Field::RegistrantOrganization),
    ("registrant organisation", Field::RegistrantOrganization),
    ("org", Field::RegistrantOrganization),
    ("registrant country", Field::RegistrantCountry),
    ("registrant country code", Field::RegistrantCountry),
    ("admin email", Field::AdminEmail),
    ("administrative contact email", Field::AdminEmail),
    ("tech email", Field::TechEmail),
    ("technical contact email", Field::TechEmail),
];

/// Replies that mean the registry has no record for the domain.
const NOT_FOUND_PATTERNS: &[&str] = &[
    "no match",
    "not found",
    "no data found",
    "no entries found",
    "domain not found",
    "status: available",
    "status: free",
    "not registered",
    "no matching record",
    "no object found",
    "the queried object does not exist",
    "object does not exist",
    "no matching entry",
    "this domain name has not been registered",
];

/// Replies that mean the server refused to answer because of throttling.
const RATE_LIMIT_PATTERNS: &[&str] = &[
    "rate limit exceeded",
    "too many requests",
    "try again later",
    "quota exceeded",
    "limit exceeded",
    "throttled",
    "rate-limited",
];

/// Parse a WHOIS text response into a record.
///
/// Unknown keys, comment lines and empty values are ignored, so the result
/// may be empty.
pub fn parse_whois_response(text: &str) -> WhoisRecord {
    let mut record = WhoisRecord::default();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('%') || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        if let Some(field) = field_for_key(key) {
            apply(&mut record, field, value);
        }
    }

    record
}

/// Check whether a response says the domain is not registered.
pub fn is_not_found_response(text: &str) -> bool {
    let lower = text.to_lowercase();
    NOT_FOUND_PATTERNS.iter().any(|pattern| lower.contains(pattern))
}

/// Check whether a response is a throttling notice.
pub fn is_rate_limited(text: &str) -> bool {
    let lower = text.to_lowercase();
    RATE_LIMIT_PATTERNS.iter().any(|pattern| lower.contains(pattern))
}

fn field_for_key(key: &str) -> Option<Field> {
    let key = key.trim().to_lowercase();
    FIELD_KEYS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, field)| *field)
}

fn apply(record: &mut WhoisRecord, field: Field, value: &str) {
    match field {
        Field::Registrar => set_once(&mut record.registrar, value),
        Field::CreationDate => set_once(&mut record.creation_date, value),
        Field::ExpirationDate => set_once(&mut record.expiration_date, value),
        Field::UpdatedDate => set_once(&mut record.updated_date, value),
        Field::RegistrantName => set_once(&mut record.registrant_name, value),
        Field::RegistrantOrganization => set_once(&mut record.registrant_organization, value),
        Field::RegistrantCountry => set_once(&mut record.registrant_country, value),
        Field::AdminEmail => set_once(&mut record.admin_email, value),
        Field::TechEmail => set_once(&mut record.tech_email, value),
        Field::NameServer => {
            // Some registries append glue IPs after the host name
            if let Some(host) = value.split_whitespace().next() {
                record.add_name_server(host.trim_end_matches('.').to_lowercase());
            }
        }
        Field::Status => {
            // "clientTransferProhibited https://icann.org/epp#clientTransferProhibited"
            // or "REGISTERED, DELEGATED, VERIFIED"
            for part in value.split(',') {
                if let Some(code) = part.split_whitespace().next() {
                    record.add_status(code);
                }
            }
        }
    }
}

fn set_once(slot: &mut Option<String>, value: &str) {
    if slot.is_none() {
        *slot = Some(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERISIGN_STYLE: &str = "\
   Domain Name: EXAMPLE.COM
   Registry Domain ID: 2336799_DOMAIN_COM-VRSN
   Registrar WHOIS Server: whois.iana.org
   Updated Date: 2024-08-14T07:01:34Z
   Creation Date: 1995-08-14T04:00:00Z
   Registry Expiry Date: 2025-08-13T04:00:00Z
   Registrar: RESERVED-Internet Assigned Numbers Authority
   Domain Status: clientDeleteProhibited https://icann.org/epp#clientDeleteProhibited
   Domain Status: clientTransferProhibited https://icann.org/epp#clientTransferProhibited
   Domain Status: clientDeleteProhibited https://icann.org/epp#clientDeleteProhibited
   Name Server: A.IANA-SERVERS.NET
   Name Server: B.IANA-SERVERS.NET
>>> Last update of whois database: 2024-10-19T05:20:00Z <<<

Registrar: Some Later Registrar Block
Registrant Organization: Internet Assigned Numbers Authority
Registrant Country: US
Admin Email: admin@example.com
Tech Email: tech@example.com
";

    #[test]
    fn test_parse_registry_response() {
        let record = parse_whois_response(VERISIGN_STYLE);

        assert_eq!(
            record.registrar.as_deref(),
            Some("RESERVED-Internet Assigned Numbers Authority")
        );
        assert_eq!(record.creation_date.as_deref(), Some("1995-08-14T04:00:00Z"));
        assert_eq!(record.expiration_date.as_deref(), Some("2025-08-13T04:00:00Z"));
        assert_eq!(record.updated_date.as_deref(), Some("2024-08-14T07:01:34Z"));
        assert_eq!(
            record.name_servers,
            vec!["a.iana-servers.net", "b.iana-servers.net"]
        );
        assert_eq!(
            record.status,
            vec!["clientDeleteProhibited", "clientTransferProhibited"]
        );
        assert_eq!(
            record.registrant_organization.as_deref(),
            Some("Internet Assigned Numbers Authority")
        );
        assert_eq!(record.registrant_country.as_deref(), Some("US"));
        assert_eq!(record.admin_email.as_deref(), Some("admin@example.com"));
        assert_eq!(record.tech_email.as_deref(), Some("tech@example.com"));
    }

    #[test]
    fn test_parse_ripe_style_response() {
        let text = "\
% This is the RIPE-style output
domain:       example.ru
nserver:      ns1.example.ru. 192.0.2.1
nserver:      ns2.example.ru.
state:        REGISTERED, DELEGATED, VERIFIED
org:          Example LLC
created:      2004-06-01T20:00:00Z
paid-till:    2025-07-01T21:00:00Z
";
        let record = parse_whois_response(text);

        assert_eq!(record.name_servers, vec!["ns1.example.ru", "ns2.example.ru"]);
        assert_eq!(record.status, vec!["REGISTERED", "DELEGATED", "VERIFIED"]);
        assert_eq!(record.registrant_organization.as_deref(), Some("Example LLC"));
        assert_eq!(record.creation_date.as_deref(), Some("2004-06-01T20:00:00Z"));
        assert_eq!(record.expiration_date.as_deref(), Some("2025-07-01T21:00:00Z"));
        assert!(record.registrar.is_none());
    }

    #[test]
    fn test_unknown_keys_yield_empty_record() {
        let record = parse_whois_response("% comment\nfoo: bar\nno colon here\nRegistrar:\n");
        assert!(record.is_empty());
    }

    #[test]
    fn test_not_found_detection() {
        assert!(is_not_found_response("No match for \"NOPE-12345.COM\"."));
        assert!(is_not_found_response("Domain not found."));
        assert!(is_not_found_response("%% NOT FOUND"));
        assert!(!is_not_found_response(VERISIGN_STYLE));
    }

    #[test]
    fn test_rate_limit_detection() {
        assert!(is_rate_limited("Rate limit exceeded. Try again later."));
        assert!(is_rate_limited("Too many requests from your IP."));
        assert!(!is_rate_limited("Normal whois response"));
    }
}
