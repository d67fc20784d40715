//! netscope: issue HTTP requests through the interceptors and print the log.
//!
//! Logging is configured through the environment:
//!   LOG_FORMAT  - "text" (default) or "json"
//!   LOG_FILE    - path to log file (optional, enables file logging)
//!   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
//!   RUST_LOG    - standard env filter (default: "netscope=info")

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::future::join_all;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use netscope_core::{
    format_duration, format_time, format_url, LogEntry, LogFilter, LogSummary, Method, RequestBody,
    RequestKind, StatusBadge,
};
use netscope_intercept::{InterceptConfig, Interceptors, RequestInit};

#[derive(Parser)]
#[command(name = "netscope")]
#[command(author, version, about = "Record HTTP requests in an in-memory request log")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Issue one request per URL (concurrently) and print the request log
    Request {
        /// Target URLs
        #[arg(required = true, num_args = 1..)]
        urls: Vec<String>,

        /// HTTP method
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// Request header as 'Name: value' (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Request body
        #[arg(short, long)]
        data: Option<String>,

        /// Use the XHR-style interceptor instead of the fetch-style one
        #[arg(long)]
        xhr: bool,

        /// Log store capacity (overrides NETSCOPE_LOG_CAPACITY)
        #[arg(long)]
        capacity: Option<usize>,

        /// Request timeout in seconds (overrides NETSCOPE_TIMEOUT_SECS)
        #[arg(long)]
        timeout: Option<u64>,

        /// Print entries as JSON
        #[arg(long)]
        json: bool,

        /// Only show entries with this method
        #[arg(long)]
        filter_method: Option<String>,

        /// Only show entries recorded by this interceptor (fetch or xhr)
        #[arg(long)]
        filter_kind: Option<String>,

        /// Only show entries whose URL contains this text
        #[arg(long)]
        grep: Option<String>,
    },

    /// Print the effective configuration
    Config,
}

struct RequestPlan {
    method: String,
    headers: Vec<(String, String)>,
    body: Option<RequestBody>,
    xhr: bool,
}

fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "netscope=info,netscope_intercept=info,netscope_core=info".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("netscope.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // Console output goes to stderr so stdout stays machine-readable.
        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    }
}

fn parse_header(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once(':')
        .with_context(|| format!("header {raw:?} is not 'Name: value'"))?;
    let name = name.trim();
    anyhow::ensure!(!name.is_empty(), "header {raw:?} has an empty name");
    Ok((name.to_string(), value.trim().to_string()))
}

async fn issue(interceptors: &Interceptors, url: String, plan: &RequestPlan) {
    if plan.xhr {
        let mut xhr = interceptors.xhr();
        let outcome = async {
            xhr.open(&plan.method, &url)?;
            for (name, value) in &plan.headers {
                xhr.set_request_header(name, value)?;
            }
            xhr.send(plan.body.clone()).await
        }
        .await;
        match outcome {
            Ok(event) => debug!(url = %url, event = ?event.kind(), "XHR settled"),
            Err(e) => warn!(url = %url, error = %e, "XHR failed"),
        }
    } else {
        let mut init = RequestInit::new()
            .method(plan.method.clone())
            .headers(plan.headers.clone());
        init.body = plan.body.clone();
        match interceptors.fetch().fetch(url.as_str(), Some(init)).await {
            Ok(response) => debug!(url = %url, status = response.status, "Fetch completed"),
            Err(e) => warn!(url = %url, error = %e, "Fetch failed"),
        }
    }
}

fn print_table(entries: &[&LogEntry]) {
    for entry in entries {
        let kind = match entry.kind {
            RequestKind::Fetch => "fetch",
            RequestKind::Xhr => "xhr",
        };
        println!(
            "{}  {:<5} {:<7} {:<8} {:>8}  {}",
            format_time(entry.timestamp),
            kind,
            entry.method.as_str(),
            StatusBadge::for_entry(entry).label(),
            format_duration(entry.duration_ms),
            format_url(&entry.url),
        );
        if let Some(ref error) = entry.error {
            println!("{:>32}  {}", "", error);
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_request(
    urls: Vec<String>,
    method: String,
    headers: Vec<String>,
    data: Option<String>,
    xhr: bool,
    capacity: Option<usize>,
    timeout: Option<u64>,
    json: bool,
    filter_method: Option<String>,
    filter_kind: Option<String>,
    grep: Option<String>,
) -> Result<()> {
    let mut config = InterceptConfig::from_env();
    if let Some(capacity) = capacity {
        config = config.with_capacity(capacity);
    }
    if let Some(timeout) = timeout {
        config = config.with_timeout_secs(timeout);
    }

    let interceptors = Interceptors::new(config).context("invalid configuration")?;
    let _changes = interceptors.store().subscribe({
        let store = interceptors.store().clone();
        move || debug!(entry_count = store.len(), "Request log changed")
    });

    let plan = RequestPlan {
        method,
        headers: headers
            .iter()
            .map(|h| parse_header(h))
            .collect::<Result<Vec<_>>>()?,
        body: data.map(RequestBody::from),
        xhr,
    };

    let mut filter = LogFilter::new();
    if let Some(ref method) = filter_method {
        filter = filter.with_method(Method::parse(method));
    }
    if let Some(ref kind) = filter_kind {
        filter = filter.with_kind(kind.parse::<RequestKind>()?);
    }
    if let Some(text) = grep {
        filter = filter.with_text(text);
    }

    info!(subsystem = "cli", count = urls.len(), xhr, "Issuing requests");
    join_all(urls.into_iter().map(|url| issue(&interceptors, url, &plan))).await;

    let snapshot = interceptors.store().snapshot();
    let shown = filter.apply(&snapshot);
    if json {
        println!("{}", serde_json::to_string_pretty(&shown)?);
    } else {
        print_table(&shown);
        let summary = LogSummary::from_entries(shown.iter().copied());
        println!(
            "{} shown / {} recorded: {} ok, {} failed, {} pending",
            summary.total,
            snapshot.len(),
            summary.success,
            summary.error,
            summary.pending
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let _log_guard = init_logging();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Request {
            urls,
            method,
            headers,
            data,
            xhr,
            capacity,
            timeout,
            json,
            filter_method,
            filter_kind,
            grep,
        } => {
            run_request(
                urls,
                method,
                headers,
                data,
                xhr,
                capacity,
                timeout,
                json,
                filter_method,
                filter_kind,
                grep,
            )
            .await
        }
        Commands::Config => {
            let config = InterceptConfig::from_env();
            serde_json::to_string_pretty(&config)
                .map(|json| println!("{json}"))
                .map_err(anyhow::Error::from)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header("Content-Type: application/json").unwrap(),
            ("Content-Type".to_string(), "application/json".to_string())
        );
        assert_eq!(
            parse_header("X-Empty:").unwrap(),
            ("X-Empty".to_string(), String::new())
        );
        assert!(parse_header("no separator").is_err());
        assert!(parse_header(": value").is_err());
    }

    #[test]
    fn test_cli_parses_request() {
        let cli = Cli::try_parse_from([
            "netscope",
            "request",
            "-X",
            "post",
            "-H",
            "A: 1",
            "--xhr",
            "http://a.test",
            "http://b.test",
        ])
        .unwrap();
        match cli.command {
            Commands::Request {
                urls, method, xhr, ..
            } => {
                assert_eq!(urls.len(), 2);
                assert_eq!(method, "post");
                assert!(xhr);
            }
            Commands::Config => panic!("expected request"),
        }
    }
}
