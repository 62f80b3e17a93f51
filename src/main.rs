//! Typing Load Agent CLI
//!
//! Records typing sessions, extracts features and classifies cognitive load.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use typing_load_agent::{
    collector::{Collector, CollectorConfig, Key},
    config::{Config, SourceMode},
    core::{run_listener, DwellPairing, ListenerExit, Session, SessionState, SourceInput, TextStats},
    pipeline::{Outcome, Pipeline},
    stats::CollectionStats,
    store::{summarize, FeatureStore},
    PipelineError, DATA_NOTICE, VERSION,
};

#[derive(Parser)]
#[command(name = "typing-load")]
#[command(version = VERSION)]
#[command(about = "Cognitive load detection from keystroke timing", long_about = None)]
struct Cli {
    /// Override the data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Override the classifier model file
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a typing session from a raw key event stream
    Record {
        /// Cognitive load label for this session (e.g. low, high)
        #[arg(long)]
        label: String,

        /// JSON-lines event stream to read (stdin when omitted)
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Dwell pairing strategy (per-key or positional)
        #[arg(long)]
        pairing: Option<String>,
    },

    /// Extract features from a saved session file
    Extract {
        /// Session CSV file
        #[arg(long)]
        session: PathBuf,

        /// Dwell pairing strategy (per-key or positional)
        #[arg(long)]
        pairing: Option<String>,

        /// Print features without appending them to the summary
        #[arg(long)]
        no_append: bool,
    },

    /// Analyze a block of text with simulated timing
    Analyze {
        /// Text to analyze
        #[arg(long, conflicts_with = "text_file")]
        text: Option<String>,

        /// File containing the text to analyze (stdin when neither is given)
        #[arg(long)]
        text_file: Option<PathBuf>,

        /// Label to store when no classifier is configured
        #[arg(long, default_value = "unlabeled")]
        label: String,

        /// Seed for reproducible sampling
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Summarize the collected feature records
    Summary {
        /// Number of most recent records to show
        #[arg(long, default_value = "5")]
        tail: usize,
    },

    /// Show current collection status
    Status,

    /// Display the data collection notice
    Privacy,

    /// Show configuration
    Config,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: Could not load configuration ({e}); using defaults");
        Config::default()
    });
    if let Some(dir) = cli.data_dir {
        config.data_path = dir;
    }
    if let Some(model) = cli.model {
        config.model_path = Some(model);
    }

    let result = match cli.command {
        Commands::Record {
            label,
            input,
            pairing,
        } => cmd_record(config, &label, input, pairing.as_deref()),
        Commands::Extract {
            session,
            pairing,
            no_append,
        } => cmd_extract(config, &session, pairing.as_deref(), no_append),
        Commands::Analyze {
            text,
            text_file,
            label,
            seed,
        } => cmd_analyze(config, text, text_file, &label, seed),
        Commands::Summary { tail } => cmd_summary(&config, tail),
        Commands::Status => {
            cmd_status(&config);
            Ok(())
        }
        Commands::Privacy => {
            println!("{DATA_NOTICE}");
            Ok(())
        }
        Commands::Config => cmd_config(&config),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn cmd_record(
    mut config: Config,
    label: &str,
    input: Option<PathBuf>,
    pairing: Option<&str>,
) -> anyhow::Result<()> {
    let label = label.trim().to_lowercase();
    if label.is_empty() {
        anyhow::bail!("a cognitive load label is required");
    }

    config.source = SourceMode::Capture;
    apply_pairing(&mut config, pairing)?;
    config
        .ensure_directories()
        .context("could not create data directories")?;

    let mut pipeline = Pipeline::from_config(&config)?;
    let stats = CollectionStats::with_persistence(config.stats_path());

    let reader: Box<dyn BufRead + Send> = match input {
        Some(ref path) => Box::new(BufReader::new(
            std::fs::File::open(path).with_context(|| format!("cannot open {path:?}"))?,
        )),
        None => Box::new(BufReader::new(std::io::stdin())),
    };

    println!("Typing Load Agent v{VERSION}");
    println!();
    println!("Start typing... (Cognitive Load: {label})");
    println!("Release '{}' to stop, or press Ctrl+C.", config.stop_key);
    println!();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("could not set Ctrl+C handler")?;

    let mut collector = Collector::new(CollectorConfig::default());
    collector.start(reader)?;
    let receiver = collector
        .receiver()
        .context("collector has no event channel")?
        .clone();

    let mut state = SessionState::with_stop_key(label.as_str(), Key::from_raw(&config.stop_key));
    let exit = run_listener(&receiver, &mut state, &running);
    collector.stop();

    match exit {
        ListenerExit::StopKey => println!("Typing session completed"),
        ListenerExit::Interrupted => println!("Typing session interrupted"),
        ListenerExit::Disconnected => println!("Event stream ended"),
    }

    let session = state.finish();
    stats.record_key_events(session.events().len() as u64);
    if session.is_empty() {
        eprintln!("Warning: No key events were captured");
    }

    let session_path = config.sessions_dir().join(format!(
        "keystroke_data_{}_{}.csv",
        file_safe(&label),
        session.id()
    ));
    session.save_csv(&session_path)?;
    println!("Data saved to {session_path:?}");
    stats.record_session();

    let outcome = pipeline.run(&SourceInput::Session(session))?;
    report_outcome(&outcome, pipeline.store());
    if outcome.stored {
        stats.record_appended();
    }

    if let Err(e) = stats.save() {
        eprintln!("Warning: Could not save collection stats: {e}");
    }
    Ok(())
}

fn cmd_extract(
    mut config: Config,
    session_path: &Path,
    pairing: Option<&str>,
    no_append: bool,
) -> anyhow::Result<()> {
    config.source = SourceMode::Capture;
    apply_pairing(&mut config, pairing)?;

    let session = Session::load_csv(session_path)?;
    println!(
        "Loaded {} key events (Cognitive Load: {})",
        session.events().len(),
        session.label()
    );

    let mut pipeline = Pipeline::from_config(&config)?;
    if no_append {
        pipeline = pipeline.without_store();
    }

    let outcome = pipeline.run(&SourceInput::Session(session))?;
    report_outcome(&outcome, pipeline.store());

    if outcome.stored {
        let stats = CollectionStats::with_persistence(config.stats_path());
        stats.record_appended();
        if let Err(e) = stats.save() {
            eprintln!("Warning: Could not save collection stats: {e}");
        }
    }
    Ok(())
}

fn cmd_analyze(
    mut config: Config,
    text: Option<String>,
    text_file: Option<PathBuf>,
    label: &str,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    let text = match (text, text_file) {
        (Some(text), _) => text,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read {path:?}"))?,
        (None, None) => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("cannot read text from stdin")?;
            buf
        }
    };

    config.source = SourceMode::Simulated;
    if seed.is_some() {
        config.seed = seed;
    }

    let mut pipeline = Pipeline::from_config(&config)?;
    let outcome = pipeline.run(&SourceInput::text(text.as_str(), label))?;

    let text_stats = TextStats::from_text(&text);
    println!(
        "Analyzed {} characters, {} words",
        text_stats.char_count, text_stats.word_count
    );
    report_outcome(&outcome, pipeline.store());

    let stats = CollectionStats::with_persistence(config.stats_path());
    stats.record_text_analysis();
    if outcome.stored {
        stats.record_appended();
    }
    if let Err(e) = stats.save() {
        eprintln!("Warning: Could not save collection stats: {e}");
    }
    Ok(())
}

fn cmd_summary(config: &Config, tail: usize) -> anyhow::Result<()> {
    let store = FeatureStore::open(config.summary_path());
    let records = match store.read_all() {
        Ok(records) => records,
        Err(PipelineError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            println!("{:?} not found.", store.path());
            println!("Run 'typing-load record' or 'typing-load analyze' to collect data.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    println!("Feature Summary ({} records)", records.len());
    println!("===============");
    println!();

    println!(
        "{:>9} {:>10} {:>6} {:>6} {:>6}  label",
        "avg_dwell", "avg_flight", "speed", "pauses", "errors"
    );
    for record in records.iter().skip(records.len().saturating_sub(tail)) {
        println!(
            "{:>9.3} {:>10.3} {:>6.2} {:>6} {:>6}  {}",
            record.avg_dwell,
            record.avg_flight,
            record.speed,
            record.pauses,
            record.errors,
            record.label
        );
    }
    println!();

    println!("Class Distribution / Feature Means:");
    for (label, summary) in summarize(&records) {
        println!(
            "  {label}: {} records | dwell {:.3} | flight {:.3} | speed {:.2} | pauses {:.2} | errors {:.2}",
            summary.count,
            summary.avg_dwell,
            summary.avg_flight,
            summary.speed,
            summary.pauses,
            summary.errors
        );
    }
    Ok(())
}

fn cmd_status(config: &Config) {
    println!("Typing Load Agent Status");
    println!("========================");
    println!();

    println!("Configuration:");
    println!("  Feature source: {:?}", config.source);
    println!("  Stop key: {}", config.stop_key);
    println!("  Pause threshold: {}s", config.pause_threshold_secs);
    println!("  Dwell pairing: {:?}", config.dwell_pairing);
    match config.model_path {
        Some(ref path) => println!("  Model: {path:?}"),
        None => println!("  Model: none (classification disabled)"),
    }
    println!("  Feature summary: {:?}", config.summary_path());
    println!();

    let stats_path = config.stats_path();
    if stats_path.exists() {
        println!("{}", CollectionStats::with_persistence(stats_path).summary());
    } else {
        println!("No previous collection data found.");
    }
}

fn cmd_config(config: &Config) -> anyhow::Result<()> {
    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

fn apply_pairing(config: &mut Config, pairing: Option<&str>) -> anyhow::Result<()> {
    if let Some(name) = pairing {
        config.dwell_pairing = match name.trim().to_lowercase().replace('_', "-").as_str() {
            "per-key" | "stack" => DwellPairing::PerKey,
            "positional" => DwellPairing::Positional,
            other => anyhow::bail!("unknown pairing strategy '{other}'"),
        };
    }
    Ok(())
}

fn report_outcome(outcome: &Outcome, store: Option<&FeatureStore>) {
    println!();
    println!("Extracted Features:");
    let f = &outcome.features;
    println!("  avg_dwell: {}", f.avg_dwell);
    println!("  avg_flight: {}", f.avg_flight);
    println!("  speed: {}", f.speed);
    println!("  pauses: {}", f.pauses);
    println!("  errors: {}", f.errors);
    println!("  label: {}", f.label);

    if let Some(class) = outcome.prediction {
        println!();
        println!("Predicted cognitive load: {} ({})", class, class.as_u8());
    }

    if !outcome.observations.is_empty() {
        println!();
        println!("Observations:");
        for observation in &outcome.observations {
            println!("  - {}", observation.message());
        }
    }

    if let (true, Some(store)) = (outcome.stored, store) {
        println!();
        println!("Features saved to {:?}", store.path());
    }
}

fn file_safe(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}
