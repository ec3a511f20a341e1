// weblog CLI - Apache access log parser

mod config;
mod input;

use clap::{Parser, Subcommand};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use config::{resolve_config, Config, OutputFormat};
use input::open_log;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use weblog_core::codec::int_to_ip4;
use weblog_core::dns::{DnsCache, DnsRecord};
use weblog_core::parser::{AccessLogParser, CompiledFormat, Preset, Resolution};
use weblog_core::pipeline::{ingest, IngestStats, DEFAULT_BATCH_SIZE};
use weblog_core::sink::{JsonLinesSink, TextSink};
use weblog_core::{CanonicalOptions, CompilationError};

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Parser)]
#[command(name = "weblog")]
#[command(version = "0.1.0")]
#[command(about = "Parse Apache access logs into normalized requests", long_about = None)]
struct Cli {
    /// TOML config file (default: ./weblog.toml when present)
    #[arg(short, long, global = true, env = "WEBLOG_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a LogFormat string or preset and show its fields
    Compile {
        /// LogFormat string, or a preset (common, combined, vcommon, vcombined, vhost_combined)
        format: String,
    },

    /// Parse a log file and write normalized requests to stdout
    Parse {
        /// Log file (.gz, .bz2 and .xz are decompressed), or - for stdin
        #[arg(default_value = "-")]
        file: String,

        /// LogFormat string or preset name
        #[arg(short, long)]
        format: Option<String>,

        /// Domain for every request, overriding %v and %{Host}i
        #[arg(short, long)]
        domain: Option<String>,

        /// analog DNS cache used to fill in hostnames
        #[arg(long)]
        dns_cache: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum)]
        output: Option<OutputFormat>,

        /// Requests written per batch
        #[arg(short, long)]
        batch_size: Option<usize>,
    },

    /// Inspect an analog DNS cache file
    Dns {
        /// Path to the cache file
        file: PathBuf,

        /// Drop failed lookups older than this many days
        #[arg(long, value_parser = clap::value_parser!(i64).range(0..))]
        retry_after: Option<i64>,

        /// Drop successful lookups older than this many days
        #[arg(long, value_parser = clap::value_parser!(i64).range(0..))]
        expire_after: Option<i64>,

        /// Write the remaining records to stdout in cache-file form
        #[arg(short, long)]
        write: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries parsed output, so logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = resolve_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Compile { format } => {
            show_format(&format)?;
        }
        Commands::Parse {
            file,
            format,
            domain,
            dns_cache,
            output,
            batch_size,
        } => {
            let settings =
                ParseSettings::merge(config, format, domain, dns_cache, output, batch_size);
            parse_file(&file, settings)?;
        }
        Commands::Dns {
            file,
            retry_after,
            expire_after,
            write,
        } => {
            inspect_dns_cache(&file, retry_after, expire_after, write)?;
        }
    }

    Ok(())
}

/// Accepts a preset name as well as a literal LogFormat string.
fn resolve_format(format: &str) -> Result<CompiledFormat, CompilationError> {
    match Preset::from_name(format) {
        Some(preset) => preset.compile(),
        None => CompiledFormat::compile(format),
    }
}

fn show_format(format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let compiled = resolve_format(format)?;

    println!("\n{} {}", "Format:".cyan().bold(), compiled.format());

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "Token", "Capture", "Kind", "Identifier"]);

    for (i, directive) in compiled.directives().iter().enumerate() {
        let kind = match directive.resolution() {
            Resolution::Standard(_) => "standard".green(),
            Resolution::RequestHeader(_) => "header".blue(),
            Resolution::Literal(_) => "literal".yellow(),
        };
        table.add_row(vec![
            (i + 1).to_string(),
            directive.token().to_string(),
            directive.kind().to_string(),
            kind.to_string(),
            directive.identifier().to_string(),
        ]);
    }

    println!("{table}");
    println!("{} {}", "Pattern:".cyan().bold(), compiled.pattern());
    Ok(())
}

// ============ PARSE ============

struct ParseSettings {
    format: String,
    domain: Option<String>,
    dns_cache: Option<PathBuf>,
    output: OutputFormat,
    batch_size: usize,
}

impl ParseSettings {
    // flags win over the config file
    fn merge(
        config: Config,
        format: Option<String>,
        domain: Option<String>,
        dns_cache: Option<PathBuf>,
        output: Option<OutputFormat>,
        batch_size: Option<usize>,
    ) -> Self {
        Self {
            format: format
                .or(config.log_format)
                .unwrap_or_else(|| Preset::Combined.name().to_string()),
            domain: domain.or(config.domain),
            dns_cache: dns_cache.or(config.dns_cache),
            output: output.or(config.output).unwrap_or_default(),
            batch_size: batch_size.or(config.batch_size).unwrap_or(DEFAULT_BATCH_SIZE),
        }
    }
}

fn parse_file(file: &str, settings: ParseSettings) -> Result<(), Box<dyn std::error::Error>> {
    let compiled = resolve_format(&settings.format)?;

    let logs_domain = compiled
        .identifiers()
        .any(|id| id == "server_name" || id == "request_header_host");
    if !logs_domain && settings.domain.is_none() {
        warn!(
            format = %settings.format,
            "format logs no domain and none was given; domain will be empty"
        );
    }

    let options = CanonicalOptions {
        domain: settings.domain,
    };
    let mut parser = AccessLogParser::new(compiled, options).named(settings.format);

    if let Some(path) = &settings.dns_cache {
        let cache = load_dns_cache(path)?;
        parser = parser.with_hosts(Arc::new(cache));
    }

    let reader = open_log(file)?;
    let writer = BufWriter::new(io::stdout().lock());
    let batch_size = settings.batch_size;

    let stats = match settings.output {
        OutputFormat::Json => {
            ingest(reader, &parser, &mut JsonLinesSink::new(writer), batch_size)?
        }
        OutputFormat::Text => ingest(reader, &parser, &mut TextSink::new(writer), batch_size)?,
    };

    print_summary(file, &stats);
    Ok(())
}

fn print_summary(file: &str, stats: &IngestStats) {
    let source = if file == "-" { "stdin" } else { file };

    eprintln!("\n{} {}", "📄 Parsed".cyan().bold(), source);
    eprintln!("{}", "─".repeat(50).dimmed());
    eprintln!("  {} {}", "Lines:".dimmed(), stats.lines);
    eprintln!("  {} {}", "Requests:".green(), stats.parsed);
    if stats.blank > 0 {
        eprintln!("  {} {}", "Blank:".dimmed(), stats.blank);
    }

    if stats.skipped() == 0 {
        eprintln!("  {}", "No lines skipped".green());
        return;
    }

    eprintln!("  {} {}", "Skipped:".yellow().bold(), stats.skipped());
    for (label, count) in [
        ("unmatched", stats.parse_errors),
        ("bad field", stats.conversion_errors),
        ("not utf-8", stats.encoding_errors),
    ] {
        if count > 0 {
            eprintln!("    {} {}", format!("{label}:").red(), count);
        }
    }
}

// ============ DNS CACHE ============

fn load_dns_cache(path: &Path) -> Result<DnsCache, Box<dyn std::error::Error>> {
    let file = File::open(path)?;
    let (cache, skipped) = DnsCache::load(BufReader::new(file))?;
    info!(path = %path.display(), records = cache.len(), skipped, "loaded dns cache");
    Ok(cache)
}

// epoch seconds `days` before `now`, clamped instead of overflowing
fn cutoff(now: i64, days: i64) -> i64 {
    now.saturating_sub(days.saturating_mul(SECONDS_PER_DAY))
}

fn inspect_dns_cache(
    path: &Path,
    retry_after: Option<i64>,
    expire_after: Option<i64>,
    write: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut cache = load_dns_cache(path)?;
    let now = chrono::Utc::now().timestamp();

    if let Some(days) = retry_after {
        cache.flush_unresolved(cutoff(now, days));
    }
    if let Some(days) = expire_after {
        cache.flush_resolved(cutoff(now, days));
    }

    let mut records: Vec<&DnsRecord> = cache.records().collect();
    records.sort_by_key(|r| r.ip);

    if write {
        let mut out = BufWriter::new(io::stdout().lock());
        for record in &records {
            writeln!(out, "{record}")?;
        }
        out.flush()?;
        return Ok(());
    }

    let resolved = records.iter().filter(|r| r.is_resolved()).count();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Records", "Resolved", "Unresolved", "Oldest", "Newest"]);

    let age = |timestamp: Option<i64>| {
        timestamp
            .map(|t| format!("{}d", (now - t).div_euclid(SECONDS_PER_DAY)))
            .unwrap_or_else(|| "-".to_string())
    };
    table.add_row(vec![
        records.len().to_string(),
        resolved.to_string().green().to_string(),
        (records.len() - resolved).to_string().yellow().to_string(),
        age(records.iter().map(|r| r.timestamp).min()),
        age(records.iter().map(|r| r.timestamp).max()),
    ]);

    println!("\n{} {}", "🌐 DNS cache".cyan().bold(), path.display());
    println!("{table}");

    if let Some(sample) = records.iter().find(|r| r.is_resolved()) {
        println!(
            "  {} {} → {}",
            "e.g.".dimmed(),
            int_to_ip4(sample.ip),
            sample.hostname.as_deref().unwrap_or_default()
        );
    }

    Ok(())
}
