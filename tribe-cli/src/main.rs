//! Tribe matching CLI
//!
//! Scores users against users or tribes from a JSON dataset and prints the
//! results as JSON.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use tribe_cache::MemoryCache;
use tribe_core::{parse_overrides, TargetType};
use tribe_runtime::{EngineConfig, MatchRequest, Matcher, MemoryStore};

#[derive(Parser)]
#[command(name = "tribe-match")]
#[command(author, version, about = "Compatibility scoring for users and tribes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (0-3)
    #[arg(short, long, default_value = "1")]
    verbose: u8,

    /// TOML configuration file
    #[arg(short, long, env = "TRIBE_CONFIG")]
    config: Option<PathBuf>,

    /// JSON dataset with `profiles` and `tribes`
    #[arg(short, long, env = "TRIBE_DATA")]
    data: Option<PathBuf>,

    /// Cache entry lifetime in seconds
    #[arg(long, env = "TRIBE_CACHE_TTL_SECS")]
    cache_ttl_secs: Option<u64>,

    /// Give up scoring further candidates after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    User,
    Tribe,
}

impl From<Kind> for TargetType {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::User => TargetType::User,
            Kind::Tribe => TargetType::Tribe,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Score one user against one target
    Score {
        /// Subject user id
        subject: String,

        /// Target user or tribe id
        target: String,

        #[arg(short, long, value_enum, default_value = "user")]
        kind: Kind,

        /// Weight overrides, e.g. "personality=0.5,location=0"
        #[arg(short, long)]
        weights: Option<String>,

        /// Include per-factor details
        #[arg(long)]
        details: bool,
    },

    /// Score one user against several targets
    Batch {
        subject: String,

        /// Comma-separated target ids
        #[arg(short, long, value_delimiter = ',', required = true)]
        targets: Vec<String>,

        #[arg(short, long, value_enum, default_value = "user")]
        kind: Kind,

        #[arg(short, long)]
        weights: Option<String>,

        #[arg(long)]
        details: bool,
    },

    /// Best matches for a user
    Top {
        subject: String,

        #[arg(short, long, value_enum, default_value = "tribe")]
        kind: Kind,

        /// Candidate ids; defaults to every other user, or every open tribe
        /// the subject has not joined
        #[arg(short, long, value_delimiter = ',')]
        pool: Vec<String>,

        /// Number of matches to return
        #[arg(short, long, env = "TRIBE_LIMIT")]
        limit: Option<usize>,

        /// Minimum score (0-100)
        #[arg(short, long, env = "TRIBE_THRESHOLD")]
        threshold: Option<f64>,

        #[arg(short, long)]
        weights: Option<String>,

        #[arg(long)]
        details: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(ttl) = cli.cache_ttl_secs {
        config.cache.ttl_secs = ttl;
    }

    let deadline = cli
        .timeout_ms
        .map(|ms| Instant::now() + Duration::from_millis(ms));

    match cli.command {
        Commands::Score {
            subject,
            target,
            kind,
            weights,
            details,
        } => {
            let matcher = build_matcher(config, cli.data.as_deref())?.0;
            let request = build_request(weights.as_deref(), details, deadline)?;
            let result = matcher
                .score(&subject, kind.into(), &target, &request)
                .await?;
            print_json(&result)?;
            log_stats(&matcher).await;
        }
        Commands::Batch {
            subject,
            targets,
            kind,
            weights,
            details,
        } => {
            let matcher = build_matcher(config, cli.data.as_deref())?.0;
            let request = build_request(weights.as_deref(), details, deadline)?;
            let outcome = matcher
                .score_batch(&subject, kind.into(), &targets, &request)
                .await?;
            print_json(&outcome)?;
            log_stats(&matcher).await;
        }
        Commands::Top {
            subject,
            kind,
            pool,
            limit,
            threshold,
            weights,
            details,
        } => {
            if let Some(limit) = limit {
                config.matcher.limit = limit;
            }
            if let Some(threshold) = threshold {
                config.matcher.threshold = threshold;
            }

            let (matcher, store) = build_matcher(config, cli.data.as_deref())?;
            let target_type: TargetType = kind.into();
            let pool = if pool.is_empty() {
                match target_type {
                    TargetType::User => store.user_ids(&subject),
                    TargetType::Tribe => store.open_tribe_ids(&subject),
                }
            } else {
                pool
            };
            info!("Ranking {} {} candidates for {}", pool.len(), target_type, subject);

            let request = build_request(weights.as_deref(), details, deadline)?;
            let top = matcher
                .find_top_matches(&subject, target_type, &pool, &request)
                .await?;
            print_json(&top)?;
            log_stats(&matcher).await;
        }
        Commands::Config => {
            let config = config.validate()?;
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

fn build_matcher(config: EngineConfig, data: Option<&Path>) -> Result<(Matcher, Arc<MemoryStore>)> {
    let path = data.context("A dataset is required. Use --data or set TRIBE_DATA")?;
    let store = Arc::new(
        MemoryStore::load(path)
            .with_context(|| format!("Failed to load dataset from {}", path.display()))?,
    );
    info!(
        "Loaded {} profiles and {} tribes",
        store.profile_count(),
        store.tribe_count()
    );

    let matcher = Matcher::from_config(config, store.clone(), MemoryCache::shared())
        .context("Invalid configuration")?;
    Ok((matcher, store))
}

fn build_request(weights: Option<&str>, details: bool, deadline: Option<Instant>) -> Result<MatchRequest> {
    let mut request = MatchRequest::new().with_details(details);
    if let Some(weights) = weights {
        let overrides = parse_overrides(weights)
            .with_context(|| format!("Invalid weight overrides: {}", weights))?;
        request = request.with_weights(overrides);
    }
    if let Some(deadline) = deadline {
        request = request.with_deadline(deadline);
    }
    Ok(request)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn log_stats(matcher: &Matcher) {
    let stats = matcher.stats().await;
    info!(
        "Computed {} results ({} cache hits, {} misses, strategy {})",
        stats.computed, stats.cache.hits, stats.cache.misses, stats.strategy
    );
}
