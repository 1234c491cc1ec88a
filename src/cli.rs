use crate::dispatch::{DispatchConfig, FileTally, FinalReport, DEFAULT_WORKERS};
use crate::filter::DateFilter;
use crate::models::Level;
use crate::report::fmt::{ceprintln, plural, BRIGHT_RED, CYAN, DIM, GREEN, RESET, YELLOW};
use crate::report::{OutputFormat, ReportKind};
use crate::source::{ReadStrategy, DEFAULT_CHUNK_SIZE};
use crate::table::CountTable;
use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::str::FromStr;

pub fn print_help() {
    println!("logtally {}", env!("CARGO_PKG_VERSION"));
    println!("Count Django request log lines per endpoint and level.\n");
    print_usage();
    print_options();
}

fn print_usage() {
    println!("USAGE:");
    println!("  logtally <FILE>... --report <KIND> [OPTIONS]");
    println!("  logtally help | --help | -h     Show this message");
    println!("  logtally --version | -V         Show version\n");
    println!("REPORTS:");
    for name in ReportKind::names() {
        println!("  {name}");
    }
    println!();
}

fn print_options() {
    println!("OPTIONS:");
    println!("  --report <kind>       Report to generate (required)");
    println!("  --workers <n>         Files processed in parallel (default: {DEFAULT_WORKERS})");
    println!("  --chunked             Read files in fixed-size chunks (bounded memory)");
    println!("  --chunk-size <bytes>  Chunk size, implies --chunked (default: {DEFAULT_CHUNK_SIZE})");
    println!("  --since <expr>        From date  (today, yesterday, 7d, 2w, 1m, YYYY-MM-DD)");
    println!("  --until <expr>        To date    (same formats as --since)");
    println!("  --format <fmt>        Output format: text (default) | json");
    println!("  --no-color            Disable colored output (also respects NO_COLOR env)");
    println!("  --verbose             Per-file progress and line counts on stderr\n");
    println!("ENVIRONMENT:");
    println!("  LOGTALLY_WORKERS      Default for --workers");
    println!("  LOGTALLY_CHUNK_SIZE   Default for --chunk-size");
}

/// Raw command line, before anything is checked against the filesystem.
#[derive(Debug, Default, PartialEq)]
pub struct Args {
    pub files: Vec<PathBuf>,
    pub report: Option<String>,
    pub workers: Option<String>,
    pub chunked: bool,
    pub chunk_size: Option<String>,
    pub since: Option<String>,
    pub until: Option<String>,
    pub format: Option<String>,
    pub no_color: bool,
    pub verbose: bool,
}

/// Everything the pipeline needs, validated.
#[derive(Debug)]
pub struct Plan {
    pub paths: Vec<PathBuf>,
    pub config: DispatchConfig,
    pub format: OutputFormat,
    pub no_color: bool,
}

pub fn parse_args(args: &[String]) -> Result<Args> {
    let mut out = Args::default();
    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        match arg {
            "--report" | "--workers" | "--chunk-size" | "--since" | "--until" | "--format" => {
                let Some(val) = args.get(i + 1) else {
                    bail!("{arg} requires a value");
                };
                let slot = match arg {
                    "--report" => &mut out.report,
                    "--workers" => &mut out.workers,
                    "--chunk-size" => &mut out.chunk_size,
                    "--since" => &mut out.since,
                    "--until" => &mut out.until,
                    _ => &mut out.format,
                };
                *slot = Some(val.clone());
                i += 1;
            }
            "--chunked" => out.chunked = true,
            "--no-color" => out.no_color = true,
            "--verbose" => out.verbose = true,
            other if other.starts_with("--") => bail!("unknown option '{other}'"),
            file => out.files.push(PathBuf::from(file)),
        }
        i += 1;
    }
    Ok(out)
}

impl Args {
    pub fn into_plan(self) -> Result<Plan> {
        if self.files.is_empty() {
            bail!("no log files given (see --help)");
        }
        validate_file_paths(&self.files)?;

        let Some(report) = self.report.as_deref() else {
            bail!("--report is required (supported: {})", supported_reports());
        };
        let kind = validate_report_type(report)?;

        let workers = flag_or_env(self.workers.as_deref(), "LOGTALLY_WORKERS", DEFAULT_WORKERS)
            .context("invalid worker count")?;
        if workers == 0 {
            bail!("worker count must be at least 1");
        }

        let strategy = if self.chunked || self.chunk_size.is_some() {
            let chunk_size = flag_or_env(
                self.chunk_size.as_deref(),
                "LOGTALLY_CHUNK_SIZE",
                DEFAULT_CHUNK_SIZE,
            )
            .context("invalid chunk size")?;
            if chunk_size == 0 {
                bail!("chunk size must be at least 1 byte");
            }
            ReadStrategy::Chunked { chunk_size }
        } else {
            ReadStrategy::Lines
        };

        let format = match self.format.as_deref() {
            Some(f) => f.parse()?,
            None => OutputFormat::default(),
        };

        let filter = DateFilter::from_exprs(self.since.as_deref(), self.until.as_deref())?;

        Ok(Plan {
            paths: self.files,
            config: DispatchConfig {
                kind,
                strategy,
                workers,
                filter,
                verbose: self.verbose,
            },
            format,
            no_color: self.no_color,
        })
    }
}

/// Stderr banner printed before the workers start when `--verbose` is set.
pub fn print_plan(plan: &Plan) {
    let names: Vec<String> = plan.paths.iter().map(|p| p.display().to_string()).collect();
    ceprintln!("{DIM}Processing log files: {}{RESET}", names.join(", "));
    ceprintln!("{DIM}Generating '{}' report...{RESET}", plan.config.kind.name());
    let filter = &plan.config.filter;
    if !filter.is_empty() {
        let bound = |d: Option<chrono::NaiveDate>| {
            d.map_or_else(|| "*".to_string(), |d| d.to_string())
        };
        ceprintln!(
            "{DIM}Dates: {} .. {}{RESET}",
            bound(filter.since),
            bound(filter.until)
        );
    }
}

pub fn print_file_summary(report: &FinalReport) {
    ceprintln!();
    for f in &report.files {
        print_file_line(f);
    }
    ceprintln!(
        "  {} across {}",
        plural(report.total, "request"),
        plural(report.table.len() as u64, "endpoint")
    );
    ceprintln!("  {DIM}{}{RESET}", level_breakdown(&report.table));
    ceprintln!();
}

fn print_file_line(f: &FileTally) {
    let path = f.path.display();
    match &f.error {
        Some(e) => ceprintln!(
            "  {BRIGHT_RED}✖{RESET} {CYAN}{path}{RESET}  {} read, then: {e}",
            plural(f.lines, "line")
        ),
        None if f.events == 0 => ceprintln!(
            "  {YELLOW}!{RESET} {CYAN}{path}{RESET}  {}, no matching requests",
            plural(f.lines, "line")
        ),
        None => ceprintln!(
            "  {GREEN}✓{RESET} {CYAN}{path}{RESET}  {} · {}",
            plural(f.lines, "line"),
            plural(f.events, "request")
        ),
    }
}

fn level_breakdown(table: &CountTable) -> String {
    Level::ALL
        .iter()
        .map(|level| format!("{level} {}", table.level_total(*level)))
        .collect::<Vec<_>>()
        .join(" · ")
}

fn supported_reports() -> String {
    ReportKind::names().collect::<Vec<_>>().join(", ")
}

pub fn validate_file_paths(paths: &[PathBuf]) -> Result<()> {
    for path in paths {
        if !path.exists() {
            bail!("file '{}' does not exist", path.display());
        }
    }
    Ok(())
}

pub fn validate_report_type(name: &str) -> Result<ReportKind> {
    match ReportKind::from_name(name) {
        Some(kind) => Ok(kind),
        None => bail!(
            "unsupported report type '{name}' (supported: {})",
            supported_reports()
        ),
    }
}

fn flag_or_env<T>(flag: Option<&str>, var: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    if let Some(raw) = flag {
        return raw
            .parse()
            .with_context(|| format!("expected a number, got '{raw}'"));
    }
    match std::env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{var}: expected a number, got '{raw}'")),
        _ => Ok(default),
    }
}

pub fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}
