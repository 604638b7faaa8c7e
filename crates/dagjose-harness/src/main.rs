// dagjose-diff: run the dagjose script against two backends and compare.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tokio::sync::watch;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use dagjose_core::HashAlgorithm;
use dagjose_harness::{BackendKind, BackendSpec, Harness, HarnessConfig, Verdict};
use dagjose_store::HttpStoreConfig;

#[derive(Parser)]
#[command(name = "dagjose-diff")]
#[command(about = "Check that two block store backends behave identically", long_about = None)]
struct Cli {
    /// TOML config file; flags override its values
    #[arg(short, long, env = "DAGJOSE_DIFF_CONFIG")]
    config: Option<PathBuf>,

    /// Left backend
    #[arg(long, value_enum)]
    left: Option<Backend>,

    /// Right backend
    #[arg(long, value_enum)]
    right: Option<Backend>,

    /// RPC URL when the left backend is http
    #[arg(long, env = "DAGJOSE_LEFT_URL")]
    left_url: Option<String>,

    /// RPC URL when the right backend is http
    #[arg(long, env = "DAGJOSE_RIGHT_URL")]
    right_url: Option<String>,

    /// Hash algorithm for the left backend (sha2-256, blake3)
    #[arg(long)]
    left_hash: Option<HashAlgorithm>,

    /// Hash algorithm for the right backend (sha2-256, blake3)
    #[arg(long)]
    right_hash: Option<HashAlgorithm>,

    /// SQLite file for sqlite backends (in-memory if unset)
    #[arg(long)]
    sqlite_path: Option<PathBuf>,

    /// HTTP request timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Passphrase the identity is derived from
    #[arg(long, env = "DAGJOSE_SEED_PHRASE")]
    seed_phrase: Option<String>,

    /// Seed for the encryption RNG
    #[arg(long)]
    rng_seed: Option<u64>,

    /// Run both backends concurrently
    #[arg(long)]
    parallel: bool,

    /// Print both full logs as JSON on divergence
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    Memory,
    Sqlite,
    Http,
}

struct Overrides<'a> {
    backend: Option<Backend>,
    url: Option<String>,
    hash: Option<HashAlgorithm>,
    sqlite_path: &'a Option<PathBuf>,
    timeout_ms: Option<u64>,
}

fn apply(spec: &mut BackendSpec, o: Overrides<'_>) {
    if let Some(backend) = o.backend {
        spec.kind = match backend {
            Backend::Memory => BackendKind::Memory,
            Backend::Sqlite => BackendKind::Sqlite {
                path: o.sqlite_path.clone(),
            },
            Backend::Http => match &spec.kind {
                BackendKind::Http(config) => BackendKind::Http(config.clone()),
                _ => BackendKind::Http(HttpStoreConfig::default()),
            },
        };
    }
    if let BackendKind::Http(config) = &mut spec.kind {
        if let Some(url) = o.url {
            config.url = url;
        }
        if let Some(timeout_ms) = o.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
    }
    if let Some(hash) = o.hash {
        spec.hash = hash;
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<HarnessConfig> {
    let mut config = match &cli.config {
        Some(path) => HarnessConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => HarnessConfig::default(),
    };

    apply(
        &mut config.left,
        Overrides {
            backend: cli.left,
            url: cli.left_url.clone(),
            hash: cli.left_hash,
            sqlite_path: &cli.sqlite_path,
            timeout_ms: cli.timeout_ms,
        },
    );
    apply(
        &mut config.right,
        Overrides {
            backend: cli.right,
            url: cli.right_url.clone(),
            hash: cli.right_hash,
            sqlite_path: &cli.sqlite_path,
            timeout_ms: cli.timeout_ms,
        },
    );
    if let Some(phrase) = &cli.seed_phrase {
        config.seed_phrase = phrase.clone();
    }
    if let Some(seed) = cli.rng_seed {
        config.rng_seed = seed;
    }
    config.parallel |= cli.parallel;
    Ok(config)
}

async fn run(cli: &Cli) -> anyhow::Result<Verdict> {
    let config = load_config(cli)?;

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current store operation");
            let _ = stop_tx.send(true);
        }
    });

    let harness = Harness::from_config(&config).with_stop(stop_rx);
    let verdict = harness
        .run_pair(&config.left, &config.right, config.parallel)
        .await
        .with_context(|| format!("{} vs {}", config.left, config.right))?;
    Ok(verdict)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli).await {
        Ok(Verdict::Pass) => {
            println!("PASSED");
            ExitCode::SUCCESS
        }
        Ok(Verdict::Divergence(divergence)) => {
            println!("DIVERGED");
            println!("{divergence}");
            if cli.json {
                match serde_json::to_string_pretty(&divergence) {
                    Ok(json) => println!("{json}"),
                    Err(e) => eprintln!("error: could not serialize logs: {e}"),
                }
            }
            ExitCode::from(1)
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
