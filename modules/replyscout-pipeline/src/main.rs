use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use ai_client::{GuardConfig, GuardedClient, OpenRouterClient, Pricing};
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use replyscout_common::file_config::LlmConfig;
use replyscout_common::{load_config, AppConfig, FileConfig, Platform, Post};
use replyscout_pipeline::dedup::DedupGuard;
use replyscout_pipeline::drafting::DraftGenerator;
use replyscout_pipeline::notify::{ApprovalNotifier, NoopNotifier, TelegramNotifier};
use replyscout_pipeline::pipeline::Coordinator;
use replyscout_pipeline::scheduling::ActiveWindow;
use replyscout_pipeline::sources::SnapshotSource;
use replyscout_pipeline::store::{MemoryStore, PgStore};
use replyscout_pipeline::traits::{EngagementLog, ExampleCorpus, RunStore};
use replyscout_pipeline::voice::ComplianceValidator;

#[derive(Parser)]
#[command(name = "replyscout", about = "Find posts worth replying to and queue drafts for approval")]
struct Cli {
    /// Path to the TOML configuration.
    #[arg(long, env = "REPLYSCOUT_CONFIG", default_value = "config/replyscout.toml", global = true)]
    config: PathBuf,

    /// JSON logs and JSON command output.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the pipeline once.
    Run {
        /// Posts exported by a scraper, as `platform=path/to/posts.json`.
        #[arg(long = "snapshot", value_name = "PLATFORM=PATH")]
        snapshots: Vec<String>,

        /// Keep everything in memory and log instead of notifying.
        #[arg(long)]
        dry_run: bool,
    },
    /// Delete expired engagement history and audit rows.
    Cleanup,
    /// Show whether the active window is open and when it next opens.
    Window,
    /// Show engagement counts against the rate caps.
    Stats,
    /// Validate a reply against the voice rules.
    CheckVoice {
        text: String,
        #[arg(long)]
        platform: Option<String>,
    },
    /// Print the JSON schema of a snapshot file.
    SnapshotSchema,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json)?;

    match &cli.command {
        Command::SnapshotSchema => {
            let schema = schemars::schema_for!(Vec<Post>);
            println!("{}", serde_json::to_string_pretty(&schema)?);
            return Ok(());
        }
        Command::CheckVoice { text, platform } => {
            let config = load_config(&cli.config)?;
            return check_voice(&config, text, platform.as_deref(), cli.json);
        }
        Command::Window => {
            let config = load_config(&cli.config)?;
            return show_window(&config);
        }
        _ => {}
    }

    let config = Arc::new(load_config(&cli.config)?);
    let env = AppConfig::from_env()?;

    match cli.command {
        Command::Run { snapshots, dry_run } => run(config, &env, &snapshots, dry_run, cli.json).await,
        Command::Cleanup => cleanup(&config, &env).await,
        Command::Stats => stats(&config, &env, cli.json).await,
        Command::SnapshotSchema | Command::CheckVoice { .. } | Command::Window => Ok(()),
    }
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("replyscout=info".parse()?)
        .add_directive("ai_client=info".parse()?);
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

fn guard_config(llm: &LlmConfig) -> GuardConfig {
    GuardConfig {
        model: llm.model.clone(),
        temperature: llm.temperature,
        max_tokens: llm.max_tokens,
        top_p: llm.top_p,
        daily_budget_usd: llm.daily_budget_usd,
        requests_per_minute: llm.requests_per_minute,
        max_attempts: llm.max_attempts,
        pricing: Pricing {
            input_per_million: llm.input_cost_per_million,
            output_per_million: llm.output_cost_per_million,
        },
        ..GuardConfig::default()
    }
}

/// One store serving all three storage seams.
fn split_store<S>(store: Arc<S>) -> (Arc<dyn EngagementLog>, Arc<dyn RunStore>, Arc<dyn ExampleCorpus>)
where
    S: EngagementLog + RunStore + ExampleCorpus + 'static,
{
    let log: Arc<dyn EngagementLog> = store.clone();
    let runs: Arc<dyn RunStore> = store.clone();
    let corpus: Arc<dyn ExampleCorpus> = store;
    (log, runs, corpus)
}

fn parse_snapshot(arg: &str) -> Result<(Platform, PathBuf)> {
    let (platform, path) = arg
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected PLATFORM=PATH, got '{arg}'"))?;
    let platform =
        Platform::from_str_loose(platform).ok_or_else(|| anyhow!("Unknown platform '{platform}'"))?;
    Ok((platform, PathBuf::from(path)))
}

async fn run(
    config: Arc<FileConfig>,
    env: &AppConfig,
    snapshots: &[String],
    dry_run: bool,
    json: bool,
) -> Result<()> {
    info!(dry_run, "ReplyScout starting...");

    let backend = OpenRouterClient::with_timeout(
        &env.openrouter_api_key,
        Duration::from_secs(config.llm.timeout_secs),
    )?
    .with_app_name("ReplyScout");
    let backend = match &env.app_site_url {
        Some(url) => backend.with_site_url(url),
        None => backend,
    };
    let client = Arc::new(GuardedClient::new(Arc::new(backend), guard_config(&config.llm)));

    let (log, store, corpus) = if dry_run {
        split_store(Arc::new(MemoryStore::new()))
    } else {
        let pg = Arc::new(PgStore::connect(&env.database_url).await?);
        pg.migrate().await?;
        split_store(pg)
    };

    let notifier: Arc<dyn ApprovalNotifier> = match env.telegram() {
        Some((token, chat)) if !dry_run => Arc::new(TelegramNotifier::new(token, chat, &config.notify)?),
        _ => {
            if !dry_run {
                warn!("TELEGRAM_BOT_TOKEN/TELEGRAM_CHAT_ID not set, drafts will only be logged");
            }
            Arc::new(NoopNotifier)
        }
    };

    let mut drafter = DraftGenerator::new(client.clone(), &config)?;
    if config.llm.learning.enabled {
        drafter = drafter.with_corpus(corpus);
    }

    let mut coordinator = Coordinator::new(config, drafter, log, store, notifier)?;
    if snapshots.is_empty() {
        warn!("No --snapshot sources given, nothing will be scraped");
    }
    for arg in snapshots {
        let (platform, path) = parse_snapshot(arg)?;
        let source = SnapshotSource::from_file(platform, &path)?;
        info!(platform = %platform, posts = source.len(), path = %path.display(), "Snapshot loaded");
        coordinator = coordinator.with_source(Arc::new(source));
    }

    let cancel = coordinator.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current item");
            cancel.store(true, Ordering::Relaxed);
        }
    });

    let report = coordinator.run().await;
    client.ledger().log_status().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if let Some(wait) = report.time_until_active {
        println!(
            "Outside active window. Next window opens in {}h {}m.",
            wait.as_secs() / 3600,
            (wait.as_secs() % 3600) / 60
        );
    } else {
        println!("Run {} {} at stage {}", report.run_id, report.status, report.stage);
        print!("{}", report.stats);
    }

    match report.error {
        Some(e) => Err(anyhow!(e)),
        None => Ok(()),
    }
}

async fn cleanup(config: &FileConfig, env: &AppConfig) -> Result<()> {
    let pg = Arc::new(PgStore::connect(&env.database_url).await?);
    pg.migrate().await?;

    let now = Utc::now();
    let removed = DedupGuard::new(pg.clone(), &config.deduplication)
        .cleanup_at(now)
        .await
        .context("Engagement cleanup failed")?;
    let pruned = pg
        .prune_audit(now - chrono::Duration::days(config.retention.audit_days))
        .await
        .context("Audit prune failed")?;

    info!(engagements = removed, audit_rows = pruned, "Cleanup complete");
    Ok(())
}

async fn stats(config: &FileConfig, env: &AppConfig, json: bool) -> Result<()> {
    let pg = Arc::new(PgStore::connect(&env.database_url).await?);
    let stats = DedupGuard::new(pg, &config.deduplication)
        .stats(Utc::now())
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("Last hour:  {}/{} ({} remaining)", stats.hour_count, stats.hour_limit, stats.hour_remaining);
        println!("Last day:   {}/{} ({} remaining)", stats.day_count, stats.day_limit, stats.day_remaining);
        println!("Last week:  {} replies to {} authors", stats.week_count, stats.unique_authors_7d);
        println!("All time:   {}", stats.total);
    }
    Ok(())
}

fn show_window(config: &FileConfig) -> Result<()> {
    let window = ActiveWindow::new(&config.schedule, &config.behavior)?;
    let now = Utc::now();
    let (start, end) = window.next_window(now);
    let tz = window.timezone();

    if window.is_active(now) {
        println!("Active until {}", end.with_timezone(&tz).format("%H:%M %Z"));
    } else {
        println!(
            "Inactive. Next window {} to {}",
            start.with_timezone(&tz).format("%a %H:%M"),
            end.with_timezone(&tz).format("%a %H:%M %Z")
        );
    }
    Ok(())
}

fn check_voice(config: &FileConfig, text: &str, platform: Option<&str>, json: bool) -> Result<()> {
    let platform = platform
        .map(|p| Platform::from_str_loose(p).ok_or_else(|| anyhow!("Unknown platform '{p}'")))
        .transpose()?;
    let validator = ComplianceValidator::new(&config.voice)?;
    let result = validator.validate(text, platform);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!(
        "{} (score {}, {} chars, preferred max {})",
        if result.is_valid { "Valid" } else { "Invalid" },
        result.score,
        result.char_count,
        result.preferred_max
    );
    for v in &result.violations {
        println!("  violation: {v}");
    }
    for w in &result.warnings {
        println!("  warning:   {w}");
    }
    for s in validator.suggest_improvements(text, &result) {
        println!("  suggest:   {s}");
    }
    Ok(())
}
