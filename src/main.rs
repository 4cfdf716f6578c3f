//! CLI entry point for `inboxsweep`.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{CommandFactory, Parser, Subcommand};
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};

use inboxsweep::analysis::{
    cleanup_candidates, sender_aggregates, summarize, ClusterEngine, DecayAnalyzer,
    PrivacyScanner,
};
use inboxsweep::config::{self, Config};
use inboxsweep::ingest::{JsonDirSource, MboxSource, MessageSource, Pipeline, ScanEvent};
use inboxsweep::model::raw::{GmailMessage, RawMessage};
use inboxsweep::model::{Category, MessageRecord};
use inboxsweep::parser::{mime, parse_message};
use inboxsweep::store::{RecordStore, SnapshotStore};

#[derive(Parser)]
#[command(name = "inboxsweep", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Record snapshot to use instead of the one in the data directory
    #[arg(long, global = true, value_name = "PATH")]
    store: Option<PathBuf>,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest an MBOX file or a directory of Gmail API JSON messages
    Scan {
        source: PathBuf,
        /// Maximum number of messages to ingest
        #[arg(long, value_name = "N")]
        max: Option<usize>,
    },
    /// Show mailbox totals and the category breakdown
    Stats,
    /// List senders by storage used
    Senders {
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },
    /// Show senders whose mail goes unread
    Decay,
    /// Show repeating subject patterns
    Clusters,
    /// Show messages that may contain sensitive data
    Privacy,
    /// List messages of one category
    Candidates {
        #[arg(value_parser = parse_category)]
        category: Category,
    },
    /// Parse and classify a single .eml or Gmail API .json file
    Classify { file: PathBuf },
    /// Remove records from the local snapshot
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Show the effective configuration and file locations
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        init: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn parse_category(s: &str) -> Result<Category, String> {
    s.parse()
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);
    config.validate()?;

    let store_path = cli.store.clone().unwrap_or_else(|| config::store_path(&config));
    let json = cli.json;

    match cli.command {
        Commands::Scan { source, max } => cmd_scan(&source, max, &store_path, &config, json),
        Commands::Stats => cmd_stats(&store_path, json),
        Commands::Senders { limit } => cmd_senders(&store_path, limit, json),
        Commands::Decay => cmd_decay(&store_path, &config, json),
        Commands::Clusters => cmd_clusters(&store_path, &config, json),
        Commands::Privacy => cmd_privacy(&store_path, json),
        Commands::Candidates { category } => cmd_candidates(&store_path, category, json),
        Commands::Classify { file } => cmd_classify(&file, &config, json),
        Commands::Delete { ids } => cmd_delete(&store_path, &ids, json),
        Commands::Config { init } => cmd_config(&config, &store_path, init, json),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // Try to set up file logging
    let log_path = config::log_file_path(config);
    let log_dir = log_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let log_name = log_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "inboxsweep.log".into());
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, log_name);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Print where configuration, records and logs live, or write the config file.
fn cmd_config(config: &Config, store_path: &Path, init: bool, json: bool) -> anyhow::Result<()> {
    if init {
        let path = config::save_config(config)?;
        if json {
            println!("{}", serde_json::json!({ "written": path }));
        } else {
            println!("Wrote {}", path.display());
        }
        return Ok(());
    }

    let config_path = config::config_file_path();
    let log_path = config::log_file_path(config);
    if json {
        let out = serde_json::json!({
            "config_file": config_path,
            "data_dir": config::data_dir(config),
            "store": store_path,
            "log_file": log_path,
            "config": config,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let shown = config_path
        .as_deref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(none)".to_string());
    println!();
    println!("  {:<12} {}", "Config", shown);
    println!("  {:<12} {}", "Data dir", config::data_dir(config).display());
    println!("  {:<12} {}", "Store", store_path.display());
    println!("  {:<12} {}", "Log file", log_path.display());
    println!();
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "inboxsweep", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Ingest a source into the snapshot store.
fn cmd_scan(
    source: &Path,
    max: Option<usize>,
    store_path: &Path,
    config: &Config,
    json: bool,
) -> anyhow::Result<()> {
    if !source.exists() {
        anyhow::bail!("Source not found: {}", source.display());
    }

    let store = SnapshotStore::open(store_path)?;
    let page_size = config.scan.page_size;
    if source.is_dir() {
        run_scan(JsonDirSource::open(source, page_size)?, store, max, config, json)
    } else {
        run_scan(MboxSource::open(source, page_size)?, store, max, config, json)
    }
}

fn run_scan<S: MessageSource + Send + 'static>(
    source: S,
    store: SnapshotStore,
    max: Option<usize>,
    config: &Config,
    json: bool,
) -> anyhow::Result<()> {
    let pipeline = Pipeline::new(source, store, config.categorizer(), config.scan_options(max));

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")?,
    );
    pb.enable_steady_tick(Duration::from_millis(120));

    let start = Instant::now();
    let handle = pipeline.spawn();
    for event in handle.events() {
        if let ScanEvent::Processed { current, total } = event {
            pb.set_length(total as u64);
            pb.set_position(current as u64);
        }
        pb.set_message(event.to_string());
    }
    let (pipeline, result) = handle.join();
    pb.finish_and_clear();
    let report = result?;
    let elapsed = start.elapsed();

    let (_, store) = pipeline.into_parts();
    if json {
        let output = serde_json::json!({
            "report": report,
            "store": store.path().to_string_lossy(),
            "stored_records": store.records().len(),
            "elapsed_ms": elapsed.as_millis(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!();
        println!("  {:<20} {}", "Listed", report.listed);
        println!("  {:<20} {}", "Saved", report.saved);
        println!("  {:<20} {}", "Skipped", report.skipped);
        println!("  {:<20} {}", "Batches", report.batches);
        println!("  {:<20} {}", "Records in store", store.records().len());
        println!("  {:<20} {}", "Store", store.path().display());
        println!("  {:<20} {:.2?}", "Time", elapsed);
        println!();
    }
    Ok(())
}

/// Load every stored record.
fn load_records(store_path: &Path) -> anyhow::Result<Vec<MessageRecord>> {
    if !store_path.exists() {
        anyhow::bail!(
            "No records at {}. Run `inboxsweep scan <SOURCE>` first.",
            store_path.display()
        );
    }
    Ok(SnapshotStore::open(store_path)?.query_all()?)
}

fn cmd_stats(store_path: &Path, json: bool) -> anyhow::Result<()> {
    let records = load_records(store_path)?;
    let summary = summarize(&records);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!();
    println!("  {:<20} {}", "Messages", summary.total_messages);
    println!("  {:<20} {}", "Storage", format_size(summary.total_bytes, BINARY));
    println!("  {:<20} {}", "Unread", summary.unread);
    println!("  {:<20} {}", "With unsubscribe", summary.with_unsubscribe);
    println!();
    println!("  {:<14} {:>8} {:>12}", "Category", "Count", "Size");
    println!("  {}", "-".repeat(36));
    for row in &summary.categories {
        let name = row.category.map(|c| c.as_str()).unwrap_or("UNCLASSIFIED");
        println!(
            "  {:<14} {:>8} {:>12}",
            name,
            row.count,
            format_size(row.total_bytes, BINARY)
        );
    }
    println!();
    Ok(())
}

fn cmd_senders(store_path: &Path, limit: usize, json: bool) -> anyhow::Result<()> {
    let records = load_records(store_path)?;
    let mut senders = sender_aggregates(&records);
    senders.truncate(limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&senders)?);
        return Ok(());
    }

    println!();
    println!("  {:<40} {:>7} {:>7} {:>12}", "Sender", "Count", "Unread", "Size");
    println!("  {}", "-".repeat(69));
    for s in &senders {
        println!(
            "  {:<40} {:>7} {:>7} {:>12}",
            truncate(&s.address, 39),
            s.count,
            s.unread,
            format_size(s.total_bytes, BINARY)
        );
    }
    println!();
    Ok(())
}

fn cmd_decay(store_path: &Path, config: &Config, json: bool) -> anyhow::Result<()> {
    let records = load_records(store_path)?;
    let scores = DecayAnalyzer::new(config.analysis.decay.clone()).analyze(&records);

    if json {
        println!("{}", serde_json::to_string_pretty(&scores)?);
        return Ok(());
    }

    println!();
    println!("  {} sender(s) worth cleaning up", scores.len());
    println!();
    if scores.is_empty() {
        return Ok(());
    }
    println!(
        "  {:<8} {:<32} {:>6} {:>7} {:>7} {:<10} {:>10}",
        "Status", "Sender", "Total", "Unread", "Opened", "Last", "Size"
    );
    println!("  {}", "-".repeat(88));
    for s in &scores {
        println!(
            "  {:<8} {:<32} {:>6} {:>7} {:>6.1}% {:<10} {:>10}",
            s.status,
            truncate(&s.display_name, 31),
            s.total,
            s.unread,
            s.open_rate * 100.0,
            s.last_received.format("%Y-%m-%d"),
            format_size(s.wasted_bytes, BINARY)
        );
    }
    println!();
    Ok(())
}

fn cmd_clusters(store_path: &Path, config: &Config, json: bool) -> anyhow::Result<()> {
    let records = load_records(store_path)?;
    let clusters = ClusterEngine::new(config.analysis.min_cluster_size).cluster(&records);

    if json {
        let items: Vec<serde_json::Value> = clusters
            .iter()
            .map(|c| {
                serde_json::json!({
                    "key": c.key,
                    "count": c.count,
                    "total_bytes": c.total_bytes,
                    "ids": c.members.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    println!();
    println!("  {} repeating subject pattern(s)", clusters.len());
    println!();
    for c in &clusters {
        println!(
            "  {:>5}x {:>10}  {}",
            c.count,
            format_size(c.total_bytes, BINARY),
            c.key
        );
    }
    println!();
    Ok(())
}

fn cmd_privacy(store_path: &Path, json: bool) -> anyhow::Result<()> {
    let records = load_records(store_path)?;
    let risks = PrivacyScanner::new().scan(&records);

    if json {
        let items: Vec<serde_json::Value> = risks
            .iter()
            .map(|r| {
                serde_json::json!({
                    "id": r.record.id,
                    "subject": r.record.subject,
                    "from": r.record.from.address,
                    "category": r.category,
                    "level": r.level,
                    "trigger": r.trigger,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    println!();
    println!("  {} message(s) with sensitive content", risks.len());
    println!();
    for r in &risks {
        println!(
            "  {:<6} {:<11} {:<22} {}",
            r.level,
            r.category,
            format!("\"{}\"", r.trigger),
            truncate(&r.record.subject, 60)
        );
    }
    println!();
    Ok(())
}

fn cmd_candidates(store_path: &Path, category: Category, json: bool) -> anyhow::Result<()> {
    let records = load_records(store_path)?;
    let candidates = cleanup_candidates(&records, category);

    if json {
        println!("{}", serde_json::to_string_pretty(&candidates)?);
        return Ok(());
    }

    let total: u64 = candidates.iter().map(|r| r.size_bytes).sum();
    println!();
    println!(
        "  {} {} message(s), {}",
        candidates.len(),
        category,
        format_size(total, BINARY)
    );
    println!();
    for r in &candidates {
        let date = r
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        println!(
            "  {:<10} {:<28} {:<44} {}",
            date,
            truncate(r.from.label(), 27),
            truncate(&r.subject, 43),
            r.id
        );
    }
    println!();
    Ok(())
}

/// Parse and classify one message file without touching the store.
fn cmd_classify(file: &Path, config: &Config, json: bool) -> anyhow::Result<()> {
    let data = std::fs::read(file)?;
    let raw = if file
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
    {
        RawMessage::from_gmail(serde_json::from_slice::<GmailMessage>(&data)?)
    } else {
        let id = file.file_name().unwrap_or_default().to_string_lossy();
        match mime::raw_from_rfc822(&id, &data) {
            Some(raw) => raw,
            None => anyhow::bail!("Not a readable message: {}", file.display()),
        }
    };

    let parsed = parse_message(&raw)?;
    let categorizer = config.categorizer();
    let html = Some(parsed.html_body.as_str()).filter(|b| !b.is_empty());
    let category = categorizer.classify(&parsed.record, html);
    let rule = categorizer.explain(&parsed.record, html);

    if json {
        let output = serde_json::json!({
            "category": category,
            "rule": rule,
            "record": parsed.record,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let record = &parsed.record;
    println!();
    println!("  {:<14} {}", "From", record.from);
    println!("  {:<14} {}", "Subject", record.subject);
    println!("  {:<14} {}", "Size", format_size(record.size_bytes, BINARY));
    println!(
        "  {:<14} {}",
        "Unsubscribe",
        record.unsubscribe_url.as_deref().unwrap_or("-")
    );
    println!("  {:<14} {} (rule: {})", "Category", category, rule);
    println!();
    Ok(())
}

fn cmd_delete(store_path: &Path, ids: &[String], json: bool) -> anyhow::Result<()> {
    let mut store = SnapshotStore::open(store_path)?;
    let removed = store.delete_by_ids(ids)?;

    if json {
        let output = serde_json::json!({ "requested": ids.len(), "removed": removed });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("  Removed {removed} of {} record(s)", ids.len());
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
