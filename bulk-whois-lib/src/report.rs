//! Flattened views of a [`BatchReport`] for export.
//!
//! JSON export serialises the report model directly. CSV needs one flat row
//! per domain, which is what [`ReportRow`] provides.

use crate::types::{BatchReport, LookupOutcome, LookupStatus};
use serde::Serialize;

/// Column order of the CSV export.
pub const CSV_COLUMNS: [&str; 13] = [
    "domain",
    "registrar",
    "creation_date",
    "expiration_date",
    "updated_date",
    "registrant_name",
    "registrant_organization",
    "registrant_country",
    "admin_email",
    "tech_email",
    "name_servers",
    "status",
    "error",
];

/// Separator used when joining name servers and status codes.
pub const LIST_SEPARATOR: &str = "; ";

/// One domain's outcome as a flat row. Missing values are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportRow {
    pub domain: String,
    pub registrar: String,
    pub creation_date: String,
    pub expiration_date: String,
    pub updated_date: String,
    pub registrant_name: String,
    pub registrant_organization: String,
    pub registrant_country: String,
    pub admin_email: String,
    pub tech_email: String,
    pub name_servers: String,
    pub status: String,
    pub error: String,
}

impl ReportRow {
    /// Values in [`CSV_COLUMNS`] order.
    pub fn fields(&self) -> [&str; 13] {
        [
            self.domain.as_str(),
            self.registrar.as_str(),
            self.creation_date.as_str(),
            self.expiration_date.as_str(),
            self.updated_date.as_str(),
            self.registrant_name.as_str(),
            self.registrant_organization.as_str(),
            self.registrant_country.as_str(),
            self.admin_email.as_str(),
            self.tech_email.as_str(),
            self.name_servers.as_str(),
            self.status.as_str(),
            self.error.as_str(),
        ]
    }
}

impl From<&LookupOutcome> for ReportRow {
    fn from(outcome: &LookupOutcome) -> Self {
        let mut row = ReportRow {
            domain: outcome.domain.to_string(),
            ..Default::default()
        };

        match &outcome.status {
            LookupStatus::Success(record) => {
                let text = |value: &Option<String>| value.clone().unwrap_or_default();
                row.registrar = text(&record.registrar);
                row.creation_date = text(&record.creation_date);
                row.expiration_date = text(&record.expiration_date);
                row.updated_date = text(&record.updated_date);
                row.registrant_name = text(&record.registrant_name);
                row.registrant_organization = text(&record.registrant_organization);
                row.registrant_country = text(&record.registrant_country);
                row.admin_email = text(&record.admin_email);
                row.tech_email = text(&record.tech_email);
                row.name_servers = record.name_servers.join(LIST_SEPARATOR);
                row.status = record.status.join(LIST_SEPARATOR);
            }
            LookupStatus::NoData => {}
            LookupStatus::Failed(detail) => row.error = detail.message.clone(),
        }

        row
    }
}

impl BatchReport {
    /// One flat row per outcome, in report order.
    pub fn rows(&self) -> Vec<ReportRow> {
        self.outcomes.iter().map(ReportRow::from).collect()
    }

    /// Render the report as CSV with a header line.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        push_csv_line(&mut out, &CSV_COLUMNS);
        for row in self.rows() {
            push_csv_line(&mut out, &row.fields());
        }
        out
    }

    /// Render the report as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, crate::WhoisError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn push_csv_line(out: &mut String, fields: &[&str]) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&escape_csv(field));
    }
    out.push_str("\r\n");
}

/// Quote a CSV field when it contains a delimiter, quote or line break.
fn escape_csv(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
