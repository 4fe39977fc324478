//! Bulk WHOIS CLI Application
//!
//! A command-line interface for rate-limited bulk WHOIS lookups.
//! This CLI application provides a user-friendly interface to the bulk-whois-lib library.

mod ui;

use bulk_whois_lib::{load_env_config, parse_duration, split_domain_text, ConfigManager};
use bulk_whois_lib::{normalize_domains, BatchReport, LookupConfig, WhoisChecker};
use bulk_whois_lib::{
    EnvConfig, FileConfig, SystemWhoisResolver, MAX_RATE_LIMIT_SECS, MAX_WORKERS,
};
use chrono::{Local, NaiveDateTime};
use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Parser, ValueEnum};
use console::Term;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Exit code for a run cut short by Ctrl-C.
const EXIT_INTERRUPTED: i32 = 130;

/// Export file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Guess the format from a file extension, defaulting to CSV.
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Csv,
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

/// CLI arguments for bulk-whois
#[derive(Parser, Debug)]
#[command(name = "bulk-whois")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Rate-limited bulk WHOIS lookups")]
#[command(
    long_about = "Look up WHOIS registration data for many domains at once.\n\nLookups run on a pool of workers that share one global rate limit, and results are reported in input order as a table, a detailed view, CSV or JSON."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Domain names to look up (URLs are accepted and stripped)
    #[arg(value_name = "DOMAINS", help_heading = "Domain Selection")]
    pub domains: Vec<String>,

    /// Input file with domains (whitespace separated, # starts a comment)
    #[arg(
        short = 'f',
        long = "file",
        value_name = "FILE",
        help_heading = "Domain Selection"
    )]
    pub file: Option<String>,

    /// Print results as JSON instead of the table
    #[arg(short = 'j', long = "json", help_heading = "Output Format")]
    pub json: bool,

    /// Print results as CSV instead of the table
    #[arg(long = "csv", help_heading = "Output Format")]
    pub csv: bool,

    /// Show every known field per domain instead of the table
    #[arg(long = "detailed", help_heading = "Output Format")]
    pub detailed: bool,

    /// Export results to whois_results_<timestamp>.<csv|json>
    #[arg(
        long = "export",
        value_name = "FORMAT",
        value_enum,
        help_heading = "Export"
    )]
    pub export: Option<ExportFormat>,

    /// Write the export to this path instead of a timestamped file
    #[arg(
        short = 'o',
        long = "output",
        value_name = "PATH",
        help_heading = "Export"
    )]
    pub output: Option<PathBuf>,

    /// Seconds between lookup dispatches across all workers (default: 0.5)
    #[arg(long = "rate-limit", value_name = "SECS", help_heading = "Performance")]
    pub rate_limit: Option<f64>,

    /// Number of concurrent workers (default: 5, max: 100)
    #[arg(
        short = 'w',
        long = "workers",
        value_name = "N",
        help_heading = "Performance"
    )]
    pub workers: Option<usize>,

    /// Timeout per lookup, e.g. "30s", "2m" (default: 30s)
    #[arg(long = "timeout", value_name = "DURATION", help_heading = "Performance")]
    pub timeout: Option<String>,

    /// Program to run for lookups instead of `whois`
    #[arg(long = "whois-command", value_name = "PROGRAM", help_heading = "Protocol")]
    pub whois_command: Option<String>,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Show debug logging
    #[arg(short = 'd', long = "debug", help_heading = "Configuration")]
    pub debug: bool,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

/// Effective settings after merging files, environment and CLI flags.
#[derive(Debug, Clone, PartialEq)]
struct Settings {
    lookup: LookupConfig,
    detailed: bool,
    export: Option<ExportFormat>,
    export_dir: Option<PathBuf>,
    file: Option<String>,
    whois_command: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Validate arguments
    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    init_logging(&args);
    info!("bulk-whois v{} starting", env!("CARGO_PKG_VERSION"));

    match run_lookup(args).await {
        Ok(true) => {}
        Ok(false) => process::exit(EXIT_INTERRUPTED),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

/// Install the tracing subscriber. `RUST_LOG` wins over the flags.
fn init_logging(args: &Args) {
    let level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("warn,bulk_whois={0},bulk_whois_lib={0}", level))
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn validate_args(args: &Args) -> Result<(), String> {
    // Can't have multiple output formats
    if args.json && args.csv {
        return Err("Cannot specify multiple output formats (--json, --csv)".to_string());
    }

    if args.detailed && (args.json || args.csv) {
        return Err("Cannot use --detailed with --json or --csv".to_string());
    }

    if let Some(workers) = args.workers {
        if workers == 0 || workers > MAX_WORKERS {
            return Err(format!("Workers must be between 1 and {}", MAX_WORKERS));
        }
    }

    if let Some(rate_limit) = args.rate_limit {
        if !rate_limit.is_finite() || rate_limit <= 0.0 || rate_limit > MAX_RATE_LIMIT_SECS {
            return Err(format!(
                "Rate limit must be between 0 and {} seconds",
                MAX_RATE_LIMIT_SECS
            ));
        }
    }

    if let Some(timeout) = &args.timeout {
        if parse_duration(timeout).is_none() {
            return Err(format!(
                "Invalid timeout '{}'. Use format like '5s', '30s', '2m'",
                timeout
            ));
        }
    }

    Ok(())
}

/// Run one batch. Returns `Ok(false)` when the batch was interrupted.
async fn run_lookup(args: Args) -> Result<bool, Box<dyn Error>> {
    let env_config = load_env_config();
    let file_config = load_file_config(&args, &env_config)?;
    let settings = build_settings(&args, &file_config, &env_config)?;
    debug!(?settings, "resolved settings");

    let raw = collect_raw_domains(&args.domains, settings.file.as_deref())?;
    let normalized = normalize_domains(&raw)?;
    ui::print_rejected(&normalized.rejected);
    if normalized.duplicates > 0 {
        info!(duplicates = normalized.duplicates, "dropped repeated domains");
    }

    let resolver = match &settings.whois_command {
        Some(command) => SystemWhoisResolver::with_command(command.clone()),
        None => SystemWhoisResolver::new(),
    };
    let checker = WhoisChecker::with_resolver(settings.lookup.clone(), resolver);

    let structured = args.json || args.csv;
    let total = normalized.targets.len();
    if !structured {
        ui::print_header(total, checker.config());
    }

    let show_spinner = !args.verbose && !args.debug && Term::stderr().is_term();
    let spinner = show_spinner.then(|| ui::Spinner::start(total));

    let result = checker
        .lookup_with_progress(normalized.targets, shutdown_signal(), |progress| {
            if let Some(spinner) = &spinner {
                spinner.set_completed(progress.completed);
            }
        })
        .await;

    if let Some(spinner) = spinner {
        spinner.stop().await;
    }
    let report = result?;

    display_results(&report, &args, &settings)?;

    if !report.complete {
        ui::print_interrupted(&report);
    }

    if let Some(format) = settings.export {
        let path = export_path(
            format,
            args.output.as_deref(),
            settings.export_dir.as_deref(),
            Local::now().naive_local(),
        );
        write_export(&report, format, &path)?;
        ui::print_exported(&path);
    }

    Ok(report.complete)
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// Load the explicit config file (`--config`, then `BW_CONFIG`) or discover one.
fn load_file_config(args: &Args, env_config: &EnvConfig) -> Result<FileConfig, Box<dyn Error>> {
    let config_manager = ConfigManager::new();

    match args.config.as_ref().or(env_config.config.as_ref()) {
        Some(path) => {
            info!(path = %path, "using explicit config file");
            let file_config = config_manager
                .load_file(path)
                .map_err(|e| format!("Failed to load config file '{}': {}", path, e))?;
            Ok(file_config)
        }
        None => Ok(config_manager.discover_and_load()),
    }
}

/// Merge settings with precedence CLI > environment > config files > defaults.
fn build_settings(
    args: &Args,
    file_config: &FileConfig,
    env_config: &EnvConfig,
) -> Result<Settings, Box<dyn Error>> {
    // Step 1: config files
    let mut lookup = file_config.apply_to(LookupConfig::default())?;
    let mut detailed = file_config.detailed().unwrap_or(false);
    let mut export = file_config.export_format().and_then(ExportFormat::from_name);

    // Step 2: environment variables (BW_*)
    lookup = env_config.apply_to(lookup);
    if let Some(env_detailed) = env_config.detailed {
        detailed = env_detailed;
    }
    if let Some(format) = env_config.export.as_deref().and_then(ExportFormat::from_name) {
        export = Some(format);
    }

    // Step 3: CLI arguments (highest precedence)
    if let Some(secs) = args.rate_limit {
        lookup = lookup.with_rate_limit_secs(secs)?;
    }
    if let Some(workers) = args.workers {
        lookup = lookup.with_workers(workers);
    }
    if let Some(timeout) = &args.timeout {
        let timeout =
            parse_duration(timeout).ok_or_else(|| format!("Invalid timeout '{}'", timeout))?;
        lookup = lookup.with_timeout(timeout);
    }
    if args.detailed {
        detailed = true;
    }
    if args.export.is_some() {
        export = args.export;
    }

    // -o alone still means "export", in the format its extension suggests
    if export.is_none() {
        export = args.output.as_deref().map(ExportFormat::from_path);
    }

    let export_dir = file_config
        .output
        .as_ref()
        .and_then(|o| o.export_dir.as_ref())
        .map(PathBuf::from);

    Ok(Settings {
        lookup,
        detailed,
        export,
        export_dir,
        file: args.file.clone().or_else(|| env_config.file.clone()),
        whois_command: args
            .whois_command
            .clone()
            .or_else(|| file_config.whois_command().map(str::to_string)),
    })
}

/// Gather raw tokens: file entries first, then command-line domains.
fn collect_raw_domains(
    cli_domains: &[String],
    file: Option<&str>,
) -> Result<Vec<String>, Box<dyn Error>> {
    let mut raw = Vec::new();

    if let Some(path) = file {
        raw.extend(read_domains_from_file(path)?);
    }
    raw.extend(cli_domains.iter().cloned());

    if raw.is_empty() {
        return Err("You must specify domain names or a file with --file".into());
    }

    Ok(raw)
}

fn read_domains_from_file(file_path: &str) -> Result<Vec<String>, Box<dyn Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {}", file_path).into());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| format!("Error reading file '{}': {}", file_path, e))?;

    let domains = split_domain_text(&content);
    if domains.is_empty() {
        warn!(path = %file_path, "domain file has no entries");
    } else {
        debug!(path = %file_path, count = domains.len(), "read domain file");
    }

    Ok(domains)
}

fn display_results(
    report: &BatchReport,
    args: &Args,
    settings: &Settings,
) -> Result<(), Box<dyn Error>> {
    if args.json {
        println!("{}", report.to_json()?);
    } else if args.csv {
        print!("{}", report.to_csv());
    } else {
        if settings.detailed {
            ui::print_detailed(report);
        } else {
            ui::print_table(report);
        }
        ui::print_summary(&report.summary, report.elapsed());
    }

    Ok(())
}

/// `whois_results_YYYYmmdd_HHMMSS.<ext>`
fn default_export_filename(format: ExportFormat, now: NaiveDateTime) -> String {
    format!(
        "whois_results_{}.{}",
        now.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

fn export_path(
    format: ExportFormat,
    output: Option<&Path>,
    export_dir: Option<&Path>,
    now: NaiveDateTime,
) -> PathBuf {
    match output {
        Some(path) => path.to_path_buf(),
        None => {
            let filename = default_export_filename(format, now);
            match export_dir {
                Some(dir) => dir.join(filename),
                None => PathBuf::from(filename),
            }
        }
    }
}

fn write_export(
    report: &BatchReport,
    format: ExportFormat,
    path: &Path,
) -> Result<(), Box<dyn Error>> {
    let content = match format {
        ExportFormat::Csv => report.to_csv(),
        ExportFormat::Json => report.to_json()?,
    };

    fs::write(path, content)
        .map_err(|e| format!("Failed to write export '{}': {}", path.display(), e))?;
    info!(path = %path.display(), "exported results");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulk_whois_lib::{DefaultsConfig, OutputConfig};
    use chrono::NaiveDate;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    // Helper function with all required fields
    fn create_test_args() -> Args {
        Args {
            domains: vec![],
            file: None,
            json: false,
            csv: false,
            detailed: false,
            export: None,
            output: None,
            rate_limit: None,
            workers: None,
            timeout: None,
            whois_command: None,
            config: None,
            debug: false,
            verbose: false,
        }
    }

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 7)
            .unwrap()
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "bulk-whois",
            "example.com",
            "rust-lang.org",
            "--export",
            "json",
            "--rate-limit",
            "1.5",
            "-w",
            "3",
        ])
        .unwrap();

        assert_eq!(args.domains, vec!["example.com", "rust-lang.org"]);
        assert_eq!(args.export, Some(ExportFormat::Json));
        assert_eq!(args.rate_limit, Some(1.5));
        assert_eq!(args.workers, Some(3));
    }

    #[test]
    fn test_args_reject_unknown_export() {
        assert!(Args::try_parse_from(["bulk-whois", "--export", "xml", "a.com"]).is_err());
    }

    #[test]
    fn test_validate_args_ok() {
        let mut args = create_test_args();
        args.domains = vec!["example.com".to_string()];
        assert!(validate_args(&args).is_ok());
    }

    #[test]
    fn test_validate_args_conflicting_formats() {
        let mut args = create_test_args();
        args.json = true;
        args.csv = true;
        assert!(validate_args(&args).is_err());

        let mut args = create_test_args();
        args.detailed = true;
        args.json = true;
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_workers_range() {
        let mut args = create_test_args();
        args.workers = Some(0);
        assert!(validate_args(&args).is_err());

        args.workers = Some(101);
        assert!(validate_args(&args).is_err());

        args.workers = Some(100);
        assert!(validate_args(&args).is_ok());
    }

    #[test]
    fn test_validate_args_rate_limit_and_timeout() {
        let mut args = create_test_args();
        args.rate_limit = Some(0.0);
        assert!(validate_args(&args).is_err());

        args.rate_limit = Some(-2.0);
        assert!(validate_args(&args).is_err());

        args.rate_limit = Some(1e20);
        assert!(validate_args(&args).is_err());

        args.rate_limit = Some(0.25);
        args.timeout = Some("soon".to_string());
        assert!(validate_args(&args).is_err());

        args.timeout = Some("45s".to_string());
        assert!(validate_args(&args).is_ok());
    }

    #[test]
    fn test_build_settings_defaults() {
        let settings = build_settings(
            &create_test_args(),
            &FileConfig::default(),
            &EnvConfig::default(),
        )
        .unwrap();

        assert_eq!(settings.lookup, LookupConfig::default());
        assert!(!settings.detailed);
        assert_eq!(settings.export, None);
        assert_eq!(settings.file, None);
        assert_eq!(settings.whois_command, None);
    }

    #[test]
    fn test_build_settings_precedence() {
        let file_config = FileConfig {
            defaults: Some(DefaultsConfig {
                rate_limit: Some(2.0),
                workers: Some(2),
                timeout: Some("10s".to_string()),
                detailed: Some(true),
                whois_command: Some("jwhois".to_string()),
            }),
            output: Some(OutputConfig {
                export: Some("csv".to_string()),
                export_dir: Some("/tmp/exports".to_string()),
            }),
        };
        let env_config = EnvConfig {
            workers: Some(4),
            timeout: Some(Duration::from_secs(20)),
            detailed: Some(false),
            export: Some("json".to_string()),
            file: Some("env-domains.txt".to_string()),
            ..Default::default()
        };
        let mut args = create_test_args();
        args.workers = Some(8);

        let settings = build_settings(&args, &file_config, &env_config).unwrap();

        assert_eq!(settings.lookup.rate_limit, Duration::from_secs(2)); // file
        assert_eq!(settings.lookup.timeout, Duration::from_secs(20)); // env
        assert_eq!(settings.lookup.workers, 8); // CLI
        assert!(!settings.detailed); // env overrides file
        assert_eq!(settings.export, Some(ExportFormat::Json));
        assert_eq!(settings.export_dir, Some(PathBuf::from("/tmp/exports")));
        assert_eq!(settings.file.as_deref(), Some("env-domains.txt"));
        assert_eq!(settings.whois_command.as_deref(), Some("jwhois"));
    }

    #[test]
    fn test_build_settings_cli_flags_win() {
        let env_config = EnvConfig {
            rate_limit: Some(3.0),
            file: Some("env-domains.txt".to_string()),
            ..Default::default()
        };
        let mut args = create_test_args();
        args.rate_limit = Some(0.25);
        args.timeout = Some("2m".to_string());
        args.detailed = true;
        args.export = Some(ExportFormat::Csv);
        args.file = Some("cli-domains.txt".to_string());

        let settings = build_settings(&args, &FileConfig::default(), &env_config).unwrap();

        assert_eq!(settings.lookup.rate_limit, Duration::from_millis(250));
        assert_eq!(settings.lookup.timeout, Duration::from_secs(120));
        assert!(settings.detailed);
        assert_eq!(settings.export, Some(ExportFormat::Csv));
        assert_eq!(settings.file.as_deref(), Some("cli-domains.txt"));
    }

    #[test]
    fn test_output_path_implies_export() {
        let mut args = create_test_args();
        args.output = Some(PathBuf::from("results.json"));

        let settings =
            build_settings(&args, &FileConfig::default(), &EnvConfig::default()).unwrap();
        assert_eq!(settings.export, Some(ExportFormat::Json));
    }

    #[test]
    fn test_export_format_from_path() {
        assert_eq!(ExportFormat::from_path(Path::new("out.JSON")), ExportFormat::Json);
        assert_eq!(ExportFormat::from_path(Path::new("out.csv")), ExportFormat::Csv);
        assert_eq!(ExportFormat::from_path(Path::new("out")), ExportFormat::Csv);
    }

    #[test]
    fn test_default_export_filename() {
        assert_eq!(
            default_export_filename(ExportFormat::Csv, timestamp()),
            "whois_results_20240309_140507.csv"
        );
        assert_eq!(
            default_export_filename(ExportFormat::Json, timestamp()),
            "whois_results_20240309_140507.json"
        );
    }

    #[test]
    fn test_export_path() {
        assert_eq!(
            export_path(
                ExportFormat::Csv,
                Some(Path::new("custom.csv")),
                Some(Path::new("/tmp")),
                timestamp()
            ),
            PathBuf::from("custom.csv")
        );
        assert_eq!(
            export_path(ExportFormat::Json, None, Some(Path::new("/tmp")), timestamp()),
            PathBuf::from("/tmp/whois_results_20240309_140507.json")
        );
        assert_eq!(
            export_path(ExportFormat::Csv, None, None, timestamp()),
            PathBuf::from("whois_results_20240309_140507.csv")
        );
    }

    #[test]
    fn test_read_domains_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "# watched domains").unwrap();
        writeln!(temp_file, "example.com  rust-lang.org").unwrap();
        writeln!(temp_file).unwrap();
        writeln!(temp_file, "https://github.com/rust-lang # code host").unwrap();
        temp_file.flush().unwrap();

        let domains = read_domains_from_file(temp_file.path().to_str().unwrap()).unwrap();
        assert_eq!(
            domains,
            vec!["example.com", "rust-lang.org", "https://github.com/rust-lang"]
        );
    }

    #[test]
    fn test_read_domains_missing_file() {
        let err = read_domains_from_file("/definitely/not/here.txt").unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }

    #[test]
    fn test_collect_raw_domains_file_first() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "from-file.com").unwrap();
        temp_file.flush().unwrap();

        let raw = collect_raw_domains(
            &["from-cli.com".to_string()],
            Some(temp_file.path().to_str().unwrap()),
        )
        .unwrap();
        assert_eq!(raw, vec!["from-file.com", "from-cli.com"]);
    }

    #[test]
    fn test_collect_raw_domains_requires_input() {
        assert!(collect_raw_domains(&[], None).is_err());
    }
}
