//! Terminal display logic for the bulk-whois CLI.
//!
//! Result tables, detailed per-domain views, the progress spinner, headers
//! and summaries. Progress and warnings go to stderr so stdout stays clean
//! for piping.

use bulk_whois_lib::{
    BatchReport, LookupConfig, LookupOutcome, LookupStatus, RejectedToken, ReportSummary,
    WhoisRecord,
};
use console::{pad_str, style, Alignment, StyledObject, Term};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const DOMAIN_WIDTH: usize = 25;
const REGISTRAR_WIDTH: usize = 30;
const REGISTRAR_MAX_CHARS: usize = 28;
const RULE_WIDTH: usize = 80;
const DETAIL_NAME_SERVERS: usize = 5;
const DETAIL_STATUSES: usize = 3;

// ── Spinner ──────────────────────────────────────────────────────────────────

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// An async braille-dot spinner with a completion counter, drawn on stderr.
pub struct Spinner {
    running: Arc<AtomicBool>,
    completed: Arc<AtomicUsize>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl Spinner {
    /// Start a spinner for a batch of `total` domains.
    pub fn start(total: usize) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let completed = Arc::new(AtomicUsize::new(0));
        let running_clone = running.clone();
        let completed_clone = completed.clone();

        let handle = tokio::spawn(async move {
            let term = Term::stderr();
            let mut idx = 0usize;
            while running_clone.load(Ordering::Relaxed) {
                let frame = SPINNER_FRAMES[idx % SPINNER_FRAMES.len()];
                let done = completed_clone.load(Ordering::Relaxed);
                let _ = term.clear_line();
                let _ = term.write_str(&format!(
                    "{} Looking up {} domain{}... {}",
                    style(frame).cyan(),
                    total,
                    plural(total),
                    style(format!("[{}/{}]", done, total)).dim(),
                ));
                idx += 1;
                tokio::time::sleep(Duration::from_millis(80)).await;
            }
            let _ = term.clear_line();
        });

        Self {
            running,
            completed,
            handle: Some(handle),
        }
    }

    /// Record how many lookups have finished.
    pub fn set_completed(&self, completed: usize) {
        self.completed.store(completed, Ordering::Relaxed);
    }

    /// Stop the spinner and clear the line.
    pub async fn stop(mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(h) = self.handle.take() {
            let _ = h.await;
        }
    }
}

// ── Header ───────────────────────────────────────────────────────────────────

/// Print a styled header before the lookups start.
pub fn print_header(domain_count: usize, config: &LookupConfig) {
    println!(
        "{} {} {}",
        style("bulk-whois").bold(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
        style(format!(
            "- Looking up {} domain{}",
            domain_count,
            plural(domain_count)
        ))
        .dim(),
    );
    println!(
        "{}",
        style(format!(
            "Rate limit: {}s between requests | Workers: {} | Timeout: {}s",
            config.rate_limit.as_secs_f64(),
            config.workers,
            config.timeout.as_secs_f64(),
        ))
        .dim()
    );
    println!();
}

// ── Input warnings ───────────────────────────────────────────────────────────

/// Report tokens that were skipped during normalization.
pub fn print_rejected(rejected: &[RejectedToken]) {
    if rejected.is_empty() {
        return;
    }

    eprintln!(
        "{}",
        style(format!(
            "Skipping {} invalid domain{}:",
            rejected.len(),
            plural(rejected.len())
        ))
        .yellow()
    );
    for token in rejected.iter().take(5) {
        eprintln!(
            "  {} '{}' {}",
            style("•").dim(),
            token.token,
            style(format!("({})", token.reason)).dim()
        );
    }
    if rejected.len() > 5 {
        eprintln!("  ... and {} more", rejected.len() - 5);
    }
    eprintln!();
}

// ── Table ────────────────────────────────────────────────────────────────────

/// Print one row per domain: domain, registrar and status label.
pub fn print_table(report: &BatchReport) {
    println!("{}", style("RESULTS").bold());
    println!("{}", "=".repeat(RULE_WIDTH));
    println!(
        "{} {} {}",
        style(pad_str("Domain", DOMAIN_WIDTH, Alignment::Left, None)).bold(),
        style(pad_str("Registrar", REGISTRAR_WIDTH, Alignment::Left, None)).bold(),
        style("Status").bold(),
    );
    println!("{}", "-".repeat(RULE_WIDTH));

    for outcome in &report.outcomes {
        let registrar = table_registrar(outcome);
        println!(
            "{} {} {}",
            pad_str(outcome.domain.as_str(), DOMAIN_WIDTH, Alignment::Left, None),
            pad_str(&registrar, REGISTRAR_WIDTH, Alignment::Left, None),
            styled_label(&outcome.status),
        );
    }

    println!("{}", "-".repeat(RULE_WIDTH));
}

/// Registrar column text, truncated to fit the table.
fn table_registrar(outcome: &LookupOutcome) -> String {
    match outcome.record().and_then(|r| r.registrar.as_deref()) {
        Some(name) => truncate_chars(name, REGISTRAR_MAX_CHARS),
        None => "Unknown".to_string(),
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn styled_label(status: &LookupStatus) -> StyledObject<&'static str> {
    let label = style(status.label());
    match status {
        LookupStatus::Success(_) => label.green(),
        LookupStatus::NoData => label.yellow(),
        LookupStatus::Failed(_) => label.red(),
    }
}

// ── Detailed view ────────────────────────────────────────────────────────────

/// Print every known field for each domain.
pub fn print_detailed(report: &BatchReport) {
    println!("{}", style("DETAILED RESULTS").bold());
    println!("{}", "=".repeat(RULE_WIDTH));

    for (i, outcome) in report.outcomes.iter().enumerate() {
        println!();
        println!(
            "{}",
            style(format!("{}. {}", i + 1, outcome.domain.as_str().to_uppercase())).bold()
        );
        println!("{}", "-".repeat(40));

        match &outcome.status {
            LookupStatus::Failed(detail) => {
                println!(
                    "{} {}",
                    style(format!("Error ({}):", detail.kind)).red(),
                    detail.message
                );
            }
            LookupStatus::NoData => {
                println!("{}", style("No WHOIS data returned").yellow());
            }
            LookupStatus::Success(record) => print_record(record),
        }
    }
    println!();
}

fn print_record(record: &WhoisRecord) {
    for (label, value) in record_fields(record) {
        if label == "Registrar" {
            println!("{} {}", style(format!("{}:", label)).cyan(), style(value).bold());
        } else {
            println!("{} {}", style(format!("{}:", label)).cyan(), value);
        }
    }

    if !record.name_servers.is_empty() {
        println!("{}", style("Name Servers:").cyan());
        for ns in record.name_servers.iter().take(DETAIL_NAME_SERVERS) {
            println!("  {} {}", style("•").dim(), ns);
        }
        if record.name_servers.len() > DETAIL_NAME_SERVERS {
            println!(
                "  {}",
                style(format!(
                    "... and {} more",
                    record.name_servers.len() - DETAIL_NAME_SERVERS
                ))
                .dim()
            );
        }
    }

    if !record.status.is_empty() {
        println!(
            "{} {}",
            style("Status:").cyan(),
            first_statuses(record, DETAIL_STATUSES)
        );
    }
}

/// Labelled single-value fields that are present in the record.
fn record_fields(record: &WhoisRecord) -> Vec<(&'static str, &str)> {
    [
        ("Registrar", &record.registrar),
        ("Created", &record.creation_date),
        ("Expires", &record.expiration_date),
        ("Updated", &record.updated_date),
        ("Registrant", &record.registrant_name),
        ("Organization", &record.registrant_organization),
        ("Country", &record.registrant_country),
        ("Admin Email", &record.admin_email),
        ("Tech Email", &record.tech_email),
    ]
    .into_iter()
    .filter_map(|(label, value)| value.as_deref().map(|v| (label, v)))
    .collect()
}

fn first_statuses(record: &WhoisRecord, count: usize) -> String {
    record
        .status
        .iter()
        .take(count)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

// ── Summary ──────────────────────────────────────────────────────────────────

/// Print the final summary bar with colored counts.
pub fn print_summary(summary: &ReportSummary, duration: Duration) {
    println!(
        "  {} domain{} in {:.2}s  {}  {}  {}  {}  {}  {}",
        style(summary.total).bold(),
        plural(summary.total),
        duration.as_secs_f64(),
        style("|").dim(),
        style(format!("{} succeeded", summary.succeeded)).green(),
        style("|").dim(),
        style(format!("{} no data", summary.no_data)).yellow(),
        style("|").dim(),
        style(format!("{} failed", summary.failed)).red(),
    );
}

/// Warn that the batch was cut short and list what never ran.
pub fn print_interrupted(report: &BatchReport) {
    let total = report.len() + report.unfinished.len();
    eprintln!();
    eprintln!(
        "{}",
        style(format!(
            "Interrupted: {} of {} domain{} finished",
            report.len(),
            total,
            plural(total)
        ))
        .yellow()
        .bold()
    );

    if !report.unfinished.is_empty() {
        let names: Vec<&str> = report.unfinished.iter().map(|t| t.as_str()).collect();
        eprintln!(
            "  {} not looked up: {}",
            style("•").dim(),
            format_list(&names, 5)
        );
    }
}

/// Confirm where an export file was written.
pub fn print_exported(path: &Path) {
    eprintln!(
        "{} {}",
        style("Results exported to:").green(),
        path.display()
    );
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn format_list(items: &[&str], max_show: usize) -> String {
    if items.len() <= max_show {
        items.join(", ")
    } else {
        let shown = &items[..max_show];
        let remaining = items.len() - max_show;
        format!("{}, ... and {} more", shown.join(", "), remaining)
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
