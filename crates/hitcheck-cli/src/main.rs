//! hitcheck CLI
//!
//! ## Commands
//!
//! - `check`: evaluate one point locally and print the response envelope
//! - `stress`: fire many concurrent checks at a fresh engine
//! - `remote`: ask a running `hitcheckd` and merge its history into a local cache
//! - `history`: print records from a JSON-lines history file

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use hit_core::{
    merge_history, read_history_file, CheckEngine, EngineConfig, EvaluationRecord,
    FileHistoryLedger, HistoryLedger, LogFormat, MemoryHistoryLedger, ResponseEnvelope,
};
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(name = "hitcheck")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Check whether points fall inside the R-parameterized area", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a single point locally
    Check {
        #[command(flatten)]
        point: PointArgs,

        /// TOML engine config
        #[arg(long, env = "HITCHECK_CONFIG")]
        config: Option<PathBuf>,

        /// Append the result to this JSON-lines history file
        #[arg(long, env = "HITCHECK_HISTORY_FILE")]
        history_file: Option<PathBuf>,

        /// Print the full response envelope as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run many concurrent checks against an in-memory engine
    Stress {
        /// Number of concurrent requests
        #[arg(short, long, default_value = "1000")]
        count: usize,
    },

    /// Send a point to a running hitcheckd
    Remote {
        #[command(flatten)]
        point: PointArgs,

        /// Base URL of the daemon
        #[arg(long, env = "HITCHECK_URL", default_value = "http://127.0.0.1:8080")]
        url: String,

        /// Local history cache (JSON array), merged with every response
        #[arg(long, default_value = ".hitcheck/history-cache.json")]
        cache: PathBuf,
    },

    /// Show records from a JSON-lines history file
    History {
        /// History file written by hitcheckd or `hitcheck check`
        #[arg(long, env = "HITCHECK_HISTORY_FILE")]
        file: PathBuf,

        /// Show only the newest N records
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

/// Raw point fields, passed to the engine untouched.
#[derive(clap::Args, Debug, Clone)]
struct PointArgs {
    #[arg(short, long, allow_hyphen_values = true)]
    x: String,

    #[arg(short, long, allow_hyphen_values = true)]
    y: String,

    #[arg(short, long)]
    r: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    hit_core::init_tracing(format, level);

    match cli.command {
        Commands::Check {
            point,
            config,
            history_file,
            json,
        } => cmd_check(&point, config.as_deref(), history_file.as_deref(), json).await,
        Commands::Stress { count } => cmd_stress(count).await,
        Commands::Remote { point, url, cache } => cmd_remote(&point, &url, &cache).await,
        Commands::History { file, limit } => cmd_history(&file, limit).await,
    }
}

/// Evaluate one point locally
async fn cmd_check(
    point: &PointArgs,
    config: Option<&Path>,
    history_file: Option<&Path>,
    json: bool,
) -> Result<()> {
    let config = match config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let ledger: Arc<dyn HistoryLedger> = match history_file {
        Some(path) => Arc::new(
            FileHistoryLedger::open(path)
                .await
                .with_context(|| format!("Failed to open history file {}", path.display()))?,
        ),
        None => Arc::new(MemoryHistoryLedger::new()),
    };

    let engine = CheckEngine::new(&config, ledger);
    let reply = engine.check(&point.x, &point.y, &point.r).await;

    if json {
        println!("{}", reply.envelope.to_json_pretty()?);
    } else {
        print_envelope(&reply.envelope);
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
struct StressReport {
    requested: usize,
    recorded: usize,
    unique_positions: usize,
    hits: usize,
}

/// Fire `count` concurrent checks, cycling through the allowed inputs.
async fn run_stress(engine: &CheckEngine, config: &EngineConfig, count: usize) -> Result<StressReport> {
    let before = engine.ledger().len().await;

    let tasks: Vec<_> = (0..count)
        .map(|i| {
            let engine = engine.clone();
            let x = config.x_min + (config.x_max - config.x_min) * (i % 17) as f64 / 16.0;
            let y = config.allowed_y[i % config.allowed_y.len()];
            let r = config.allowed_r[i % config.allowed_r.len()];
            tokio::spawn(async move {
                engine
                    .check(&x.to_string(), &y.to_string(), &r.to_string())
                    .await
            })
        })
        .collect();

    let mut positions = HashSet::with_capacity(count);
    let mut hits = 0;
    for joined in futures::future::join_all(tasks).await {
        let reply = joined.context("check task panicked")?;
        if let Some(data) = reply.envelope.data() {
            hits += usize::from(data.hit);
        }
        if let Some(position) = reply.position {
            positions.insert(position);
        }
    }

    Ok(StressReport {
        requested: count,
        recorded: engine.ledger().len().await - before,
        unique_positions: positions.len(),
        hits,
    })
}

async fn cmd_stress(count: usize) -> Result<()> {
    let config = EngineConfig::default();
    let engine = CheckEngine::new(&config, Arc::new(MemoryHistoryLedger::new()));

    let started = Instant::now();
    let report = run_stress(&engine, &config, count).await?;
    let elapsed = started.elapsed();

    println!("Requests:         {}", report.requested);
    println!("Records appended: {}", report.recorded);
    println!("Unique positions: {}", report.unique_positions);
    println!("Hits:             {}", report.hits);
    println!("Elapsed:          {:.1?}", elapsed);

    if report.recorded != report.requested || report.unique_positions != report.requested {
        bail!("ledger lost or duplicated records under concurrency");
    }
    Ok(())
}

/// Ask a running daemon, then merge its history into the local cache
async fn cmd_remote(point: &PointArgs, url: &str, cache: &Path) -> Result<()> {
    let envelope = fetch_envelope(&reqwest::Client::new(), url, point).await?;
    print_envelope(&envelope);

    let (total, added) = update_cache(cache, &envelope)?;
    println!("Cache: {} records ({} new) in {}", total, added, cache.display());
    Ok(())
}

/// POST one point to `{url}/api/check` and decode the envelope, whatever the
/// HTTP status.
async fn fetch_envelope(
    client: &reqwest::Client,
    url: &str,
    point: &PointArgs,
) -> Result<ResponseEnvelope> {
    let endpoint = format!("{}/api/check", url.trim_end_matches('/'));
    info!(endpoint = %endpoint, "sending check");

    let response = client
        .post(&endpoint)
        .form(&[
            ("x", point.x.as_str()),
            ("y", point.y.as_str()),
            ("r", point.r.as_str()),
        ])
        .send()
        .await
        .with_context(|| format!("Failed to reach {endpoint}"))?;

    let status = response.status();
    response
        .json()
        .await
        .with_context(|| format!("Unexpected response from {endpoint} (HTTP {status})"))
}

/// Merge `envelope` into the cache file; returns the cache size and how many
/// records were new.
fn update_cache(cache: &Path, envelope: &ResponseEnvelope) -> Result<(usize, usize)> {
    let local = load_cache(cache);
    let merged = merge_into_cache(&local, envelope);
    save_cache(cache, &merged)?;
    Ok((merged.len(), merged.len().saturating_sub(local.len())))
}

/// Merge order matches the browser client: cached, then server history,
/// then the fresh record.
fn merge_into_cache(local: &[EvaluationRecord], envelope: &ResponseEnvelope) -> Vec<EvaluationRecord> {
    let mut merged = merge_history(local, envelope.history());
    if let Some(data) = envelope.data() {
        merged = merge_history(&merged, std::slice::from_ref(data));
    }
    merged
}

/// A missing or unreadable cache starts empty.
fn load_cache(path: &Path) -> Vec<EvaluationRecord> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "history cache unreadable");
            return Vec::new();
        }
    };
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "history cache corrupt, starting fresh");
        Vec::new()
    })
}

/// Atomic write: temp file in the same directory, then rename.
fn save_cache(path: &Path, records: &[EvaluationRecord]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, records)?;
    tmp.write_all(b"\n")?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

async fn cmd_history(file: &Path, limit: Option<usize>) -> Result<()> {
    let mut shown = read_history_file(file)
        .await
        .with_context(|| format!("Failed to read history {}", file.display()))?;
    if let Some(n) = limit {
        let skip = shown.len().saturating_sub(n);
        shown.drain(..skip);
    }

    if shown.is_empty() {
        println!("No records in {}", file.display());
        return Ok(());
    }

    println!(
        "{:>8} {:>6} {:>5} {:>5}  {:<24} {:>6}",
        "x", "y", "r", "hit", "time", "ms"
    );
    for record in &shown {
        println!("{}", format_row(record));
    }
    Ok(())
}

fn format_row(record: &EvaluationRecord) -> String {
    format!(
        "{:>8} {:>6} {:>5} {:>5}  {:<24} {:>6}",
        record.x,
        record.y,
        record.r,
        if record.hit { "yes" } else { "no" },
        record.current_time(),
        record.processing_time_ms
    )
}

fn print_envelope(envelope: &ResponseEnvelope) {
    match envelope {
        ResponseEnvelope::Ok { data, history } => {
            let verdict = if data.hit { "inside" } else { "outside" };
            println!(
                "Point ({}, {}) with R = {} is {} the area ({} ms, {})",
                data.x,
                data.y,
                data.r,
                verdict,
                data.processing_time_ms,
                data.current_time()
            );
            println!("History: {} records", history.len());
        }
        ResponseEnvelope::Error { errors, history } => {
            eprintln!("Rejected:");
            for error in errors {
                eprintln!("  - {error}");
            }
            println!("History: {} records", history.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hit_core::build_response;

    fn record(x: f64) -> EvaluationRecord {
        EvaluationRecord::new(x, 0.0, 1.0, true, 0)
    }

    #[test]
    fn point_args_accept_negative_values() {
        let cli = Cli::try_parse_from(["hitcheck", "check", "-x", "-2,5", "-y", "-1", "-r", "2"])
            .unwrap();
        match cli.command {
            Commands::Check { point, .. } => {
                assert_eq!(point.x, "-2,5");
                assert_eq!(point.y, "-1");
            }
            _ => panic!("expected check"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn stress_records_every_request_once() {
        let config = EngineConfig::default();
        let engine = CheckEngine::new(&config, Arc::new(MemoryHistoryLedger::new()));

        let report = run_stress(&engine, &config, 250).await.unwrap();

        assert_eq!(report.recorded, 250);
        assert_eq!(report.unique_positions, 250);
        assert!(report.hits > 0);
    }

    #[test]
    fn cache_merge_adds_only_new_records() {
        let a = record(1.0);
        let b = record(2.0);
        let c = record(3.0);
        let envelope = build_response(Ok(c), vec![a, b, c]);

        let merged = merge_into_cache(&[a], &envelope);
        assert_eq!(merged, vec![a, b, c]);
        assert_eq!(merge_into_cache(&merged, &envelope), merged);
    }

    /// Serve `POST /api/check` from a real engine on an ephemeral port.
    async fn spawn_daemon() -> String {
        use axum::extract::State;
        use axum::http::StatusCode;
        use axum::{Form, Json};
        use hit_core::RawInput;

        async fn check(
            State(engine): State<CheckEngine>,
            Form(raw): Form<RawInput>,
        ) -> (StatusCode, Json<ResponseEnvelope>) {
            let reply = engine.handle(raw).await;
            let status = match reply.rejection {
                None => StatusCode::OK,
                Some(_) => StatusCode::BAD_REQUEST,
            };
            (status, Json(reply.envelope))
        }

        let engine = CheckEngine::new(&EngineConfig::default(), Arc::new(MemoryHistoryLedger::new()));
        let app = axum::Router::new()
            .route("/api/check", axum::routing::post(check))
            .with_state(engine);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}/")
    }

    fn point(x: &str, y: &str, r: &str) -> PointArgs {
        PointArgs {
            x: x.to_string(),
            y: y.to_string(),
            r: r.to_string(),
        }
    }

    #[tokio::test]
    async fn remote_check_fills_cache() {
        let url = spawn_daemon().await;
        let client = reqwest::Client::new();
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("cache.json");

        let first = fetch_envelope(&client, &url, &point("0,5", "0", "2")).await.unwrap();
        assert!(first.is_ok());
        assert_eq!(first.data().unwrap().x, 0.5);
        assert_eq!(update_cache(&cache, &first).unwrap(), (1, 1));

        let second = fetch_envelope(&client, &url, &point("-1", "-1", "3")).await.unwrap();
        assert_eq!(update_cache(&cache, &second).unwrap(), (2, 1));
        assert_eq!(update_cache(&cache, &second).unwrap(), (2, 0));

        let cached = load_cache(&cache);
        assert_eq!(cached, second.history().to_vec());
    }

    #[tokio::test]
    async fn remote_rejection_still_decodes() {
        let url = spawn_daemon().await;
        let envelope = fetch_envelope(&reqwest::Client::new(), &url, &point("9", "0", "1"))
            .await
            .unwrap();

        assert!(!envelope.is_ok());
        assert_eq!(envelope.errors().len(), 1);
    }

    #[tokio::test]
    async fn unreachable_daemon_is_an_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = fetch_envelope(
            &reqwest::Client::new(),
            &format!("http://{addr}"),
            &point("0", "0", "1"),
        )
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn cache_round_trip_and_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");
        assert!(load_cache(&path).is_empty());

        let saved = record(1.0);
        save_cache(&path, &[saved]).unwrap();
        assert_eq!(load_cache(&path), vec![saved]);

        std::fs::write(&path, "{ not json").unwrap();
        assert!(load_cache(&path).is_empty());
    }

    #[test]
    fn row_format() {
        let row = format_row(&EvaluationRecord::new(-1.5, 2.0, 3.0, false, 7));
        assert!(row.contains("-1.5"));
        assert!(row.contains("no"));
        assert!(row.trim_end().ends_with('7'));
    }
}
