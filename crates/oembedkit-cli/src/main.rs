//! oembedkit CLI - resolve URLs into oEmbed records from the command line

use clap::{Args, Parser, Subcommand, ValueEnum};
use oembedkit::{ResolveError, Resolution, Resolver, ResolverBuilder, ResolverConfig};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Output format for the resolve subcommand
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Full envelope with timing and service information
    #[default]
    Json,
    /// Only the embed record
    Embed,
}

/// oembedkit - resolve URLs into oEmbed records
#[derive(Parser, Debug)]
#[command(name = "oembedkit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve a URL and print the result as JSON
    Resolve {
        /// URL to resolve
        url: String,

        #[command(flatten)]
        options: ResolverArgs,

        /// Output format
        #[arg(long, short, default_value = "json")]
        output: OutputFormat,
    },
    /// List service keys in lookup order
    Services {
        /// JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Default)]
struct ResolverArgs {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Per-request timeout, e.g. 500ms, 10s
    #[arg(long, value_parser = parse_timeout)]
    timeout: Option<Duration>,

    /// Maximum redirect and discovery hops
    #[arg(long)]
    max_redirects: Option<u32>,

    /// URL glob to allow (repeatable)
    #[arg(long = "allow", value_name = "GLOB")]
    allow_list: Vec<String>,

    /// URL glob to deny (repeatable)
    #[arg(long = "deny", value_name = "GLOB")]
    deny_list: Vec<String>,

    /// Extra request header as "Name: value" (repeatable)
    #[arg(long = "header", short = 'H', value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Custom User-Agent
    #[arg(long)]
    user_agent: Option<String>,
}

impl ResolverArgs {
    /// Config file first, then command line flags on top
    fn builder(&self) -> Result<ResolverBuilder, String> {
        let mut builder = load_builder(self.config.as_ref())?;

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(max_redirects) = self.max_redirects {
            builder = builder.max_redirects(max_redirects);
        }
        for pattern in &self.allow_list {
            builder = builder.allow(pattern.clone());
        }
        for pattern in &self.deny_list {
            builder = builder.deny(pattern.clone());
        }
        for (name, value) in &self.headers {
            builder = builder.header(name.clone(), value.clone());
        }
        if let Some(ref ua) = self.user_agent {
            builder = builder.user_agent(ua.clone());
        }
        Ok(builder)
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Resolve {
            url,
            options,
            output,
        }) => {
            run_resolve(&url, &options, output).await;
        }
        Some(Commands::Services { config }) => {
            run_services(config.as_ref());
        }
        None => {
            eprintln!("Usage: oembedkit resolve <URL>");
            eprintln!("   or: oembedkit services");
            eprintln!("   or: oembedkit --help");
            std::process::exit(1);
        }
    }
}

async fn run_resolve(url: &str, options: &ResolverArgs, output: OutputFormat) {
    let resolver = match options.builder().and_then(|b| b.build().map_err(|e| e.to_string())) {
        Ok(resolver) => resolver,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    debug!(services = resolver.registry().len(), url, "Resolver ready");

    match resolver.resolve(url).await {
        Ok(resolution) => match format_resolution(&resolution, output) {
            Ok(json) => writeln_safe(&json),
            Err(e) => {
                eprintln!("Error serializing response: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("{}", format_error(&e));
            std::process::exit(1);
        }
    }
}

fn run_services(config: Option<&PathBuf>) {
    let resolver = match load_builder(config).and_then(|b| b.build().map_err(|e| e.to_string())) {
        Ok(resolver) => resolver,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    writeln_safe(&format_services(&resolver));
}

fn load_builder(config: Option<&PathBuf>) -> Result<ResolverBuilder, String> {
    match config {
        Some(path) => ResolverConfig::from_path(path)
            .and_then(ResolverConfig::into_builder)
            .map_err(|e| e.to_string()),
        None => Ok(Resolver::builder()),
    }
}

fn format_resolution(resolution: &Resolution, output: OutputFormat) -> serde_json::Result<String> {
    match output {
        OutputFormat::Json => serde_json::to_string_pretty(resolution),
        OutputFormat::Embed => serde_json::to_string_pretty(&resolution.embed),
    }
}

/// Structured error body, falling back to the plain message
fn format_error(err: &ResolveError) -> String {
    serde_json::to_string_pretty(&err.to_body()).unwrap_or_else(|_| format!("Error: {}", err))
}

/// One line per service: key, name and match patterns
fn format_services(resolver: &Resolver) -> String {
    resolver
        .registry()
        .iter()
        .map(|(key, service)| format!("{}\t{}\t{}", key, service.name, service.matches.join(" ")))
        .collect::<Vec<_>>()
        .join("\n")
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected \"Name: value\", got \"{}\"", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in \"{}\"", raw));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

fn parse_timeout(raw: &str) -> Result<Duration, String> {
    oembedkit::config::parse_duration(raw).map_err(|e| e.to_string())
}

/// Write to stdout, exit silently on broken pipe
fn writeln_safe(s: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", s) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        eprintln!("Error writing to stdout: {}", e);
        std::process::exit(1);
    }
}
