//! gtvault: state export command-line interface
//!
//! Offline commands (key from the environment, no daemon needed):
//!   keygen                         - print a fresh base64 envelope key
//!   seal <json> [-o out.gt]        - seal a JSON document into a .gt export
//!   open <file.gt>                 - open a .gt export and print its JSON
//!
//! Daemon commands (talk to gtvaultd at transfer.endpoint):
//!   save --state <json>            - export watchlist/lesson state
//!   load <file.gt> --state <json>  - import an export, merging or replacing
//!   config show                    - display current configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use gtvault_core::{config::GtvaultConfig, naming::export_filename, StateSnapshot};
use gtvault_crypto::{EnvelopeCodec, KeyProvider};
use gtvault_pipeline::{handlers, Deadline, PipelineError};
use gtvault_transfer::{file, HttpExportApi, LoadFlow, MergeStrategy, TransferClient};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "gtvault",
    version,
    about = "gtvault state export client",
    long_about = "gtvault: seal, open, save and load encrypted .gt state exports"
)]
struct Cli {
    /// Path to gtvault.toml configuration file
    #[arg(long, short = 'c', env = "GTVAULT_CONFIG", default_value = "/etc/gtvault/config.toml")]
    config: PathBuf,

    /// Log level for diagnostics on stderr
    #[arg(long, env = "GTVAULT_LOG", default_value = "warn")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a random 32-byte envelope key (base64)
    Keygen,

    /// Seal a JSON document into a .gt export, offline
    ///
    /// The key is read from the variable named by crypto.key_env
    /// (default GTVAULT_ENCRYPTION_KEY).
    Seal {
        /// JSON file to seal
        input: PathBuf,
        /// Output path (default: <file_base>-<timestamp>.<ext> in the current dir)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Open a .gt export offline and print its JSON
    Open {
        /// Export file
        input: PathBuf,
    },

    /// Export watchlist and lesson progress through the daemon
    Save {
        /// JSON state file ({"watchList": [...], "completedLessons": [...]})
        #[arg(long, short = 's')]
        state: PathBuf,
        /// Directory for the export file
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Import a .gt export through the daemon into a state file
    ///
    /// If the state file holds data and no --strategy is given, the command
    /// reports what the export contains and exits without changes.
    Load {
        /// Export file
        input: PathBuf,
        /// JSON state file to update (created if missing)
        #[arg(long, short = 's')]
        state: PathBuf,
        /// How to combine with existing state
        #[arg(long)]
        strategy: Option<Strategy>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Strategy {
    /// Ordered union of current and loaded lists
    Merge,
    /// Discard current state and adopt the export
    Replace,
}

impl From<Strategy> for MergeStrategy {
    fn from(s: Strategy) -> Self {
        match s {
            Strategy::Merge => MergeStrategy::Merge,
            Strategy::Replace => MergeStrategy::Replace,
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log);
    let config = load_config(&cli.config).await?;
    config.validate().context("invalid configuration")?;

    match cli.command {
        Commands::Keygen => cmd_keygen(),
        Commands::Seal { input, output } => cmd_seal(&config, &input, output.as_deref()).await,
        Commands::Open { input } => cmd_open(&config, &input).await,
        Commands::Save { state, out_dir } => cmd_save(&config, &state, &out_dir).await,
        Commands::Load {
            input,
            state,
            strategy,
        } => cmd_load(&config, &input, &state, strategy.map(Into::into)).await,
        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(&config, &cli.config),
    }
}

fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// ── Config loading ────────────────────────────────────────────────────────────

async fn load_config(path: &Path) -> Result<GtvaultConfig> {
    if path.exists() {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading config: {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing config: {}", path.display()))
    } else {
        Ok(GtvaultConfig::default())
    }
}

fn codec_from_env(config: &GtvaultConfig) -> Result<EnvelopeCodec> {
    let provider = KeyProvider::from_config(&config.crypto);
    let key = provider.resolve().with_context(|| {
        format!(
            "envelope key not available\n\
             Set {} to a base64 or hex encoded 32-byte key.\n\
             Generate one with: gtvault keygen",
            provider.env_var()
        )
    })?;
    Ok(EnvelopeCodec::new(Arc::new(key), config.crypto.cipher))
}

/// Render a pipeline rejection the way the HTTP API would describe it.
fn pipeline_error(err: PipelineError) -> anyhow::Error {
    match err.details {
        Some(details) => anyhow::anyhow!("{}: {} ({details})", err.kind, err.message),
        None => anyhow::anyhow!("{}: {}", err.kind, err.message),
    }
}

fn offline_deadline(config: &GtvaultConfig) -> Deadline {
    Deadline::from_limits(Instant::now(), &config.limits)
}

// ── `gtvault keygen` ──────────────────────────────────────────────────────────

fn cmd_keygen() -> Result<()> {
    println!("{}", gtvault_crypto::generate_key());
    Ok(())
}

// ── `gtvault seal` ────────────────────────────────────────────────────────────

async fn cmd_seal(config: &GtvaultConfig, input: &Path, output: Option<&Path>) -> Result<()> {
    let codec = codec_from_env(config)?;
    let content = tokio::fs::read(input)
        .await
        .with_context(|| format!("reading {}", input.display()))?;
    let data: serde_json::Value = serde_json::from_slice(&content)
        .with_context(|| format!("{} is not valid JSON", input.display()))?;

    let sealed = handlers::seal_value(&codec, &config.limits, &data, &offline_deadline(config))
        .map_err(pipeline_error)?;

    let output = match output {
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(export_filename(
            &config.transfer.file_base,
            &config.transfer.file_extension,
            chrono::Utc::now(),
        )),
    };
    tokio::fs::write(&output, &sealed.envelope)
        .await
        .with_context(|| format!("writing {}", output.display()))?;

    println!("Sealed {} → {}", input.display(), output.display());
    println!("  original:  {}", fmt_bytes(sealed.original_size as u64));
    println!("  encrypted: {}", fmt_bytes(sealed.envelope.len() as u64));
    println!("  cipher:    {} (key {})", codec.suite(), codec.key_fingerprint());
    Ok(())
}

// ── `gtvault open` ────────────────────────────────────────────────────────────

async fn cmd_open(config: &GtvaultConfig, input: &Path) -> Result<()> {
    let codec = codec_from_env(config)?;
    let bytes = file::read_export(
        input,
        &config.transfer.file_extension,
        file::max_export_size(config.limits.max_payload_bytes),
    )
    .await
    .with_context(|| format!("reading export {}", input.display()))?;

    let data = handlers::open_envelope(&codec, &config.limits, &bytes, &offline_deadline(config))
        .map_err(pipeline_error)?;

    let rendered = serde_json::to_string_pretty(&data).context("rendering JSON")?;
    println!("{rendered}");
    Ok(())
}

// ── `gtvault save` / `gtvault load` ───────────────────────────────────────────

fn transfer_client(config: &GtvaultConfig) -> Result<TransferClient<HttpExportApi>> {
    let api = HttpExportApi::new(
        config.transfer.endpoint.clone(),
        Duration::from_millis(config.transfer.request_timeout_ms),
    )
    .context("building HTTP client")?;
    Ok(TransferClient::new(api, config))
}

async fn read_state(path: &Path) -> Result<StateSnapshot> {
    match tokio::fs::read(path).await {
        Ok(content) => serde_json::from_slice(&content)
            .with_context(|| format!("parsing state file {}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StateSnapshot::default()),
        Err(e) => Err(e).with_context(|| format!("reading state file {}", path.display())),
    }
}

async fn cmd_save(config: &GtvaultConfig, state_path: &Path, out_dir: &Path) -> Result<()> {
    let state = read_state(state_path).await?;
    let client = transfer_client(config)?;

    println!(
        "Saving {} watchlist entries, {} completed lessons (endpoint: {})",
        state.watch_list.len(),
        state.completed_lessons.len(),
        client.api().endpoint(),
    );

    let saved = client
        .save(state.watch_list, state.completed_lessons, out_dir)
        .await
        .map_err(|e| anyhow::anyhow!(gtvault_transfer::status::save_failure_message(&e)))?;

    println!("  file:  {}", saved.path.display());
    println!("  size:  {}", fmt_bytes(saved.size as u64));
    Ok(())
}

async fn cmd_load(
    config: &GtvaultConfig,
    input: &Path,
    state_path: &Path,
    strategy: Option<MergeStrategy>,
) -> Result<()> {
    let current = read_state(state_path).await?;
    let client = transfer_client(config)?;

    let flow = client
        .load(input, &current)
        .await
        .map_err(|e| anyhow::anyhow!(gtvault_transfer::status::load_failure_message(&e)))?;

    let flow = if flow.is_pending() {
        if let (None, Some(loaded)) = (strategy, flow.pending_snapshot()) {
            println!(
                "{} already holds state; choose how to apply the export:",
                state_path.display()
            );
            println!(
                "  current:  {} watchlist, {} lessons",
                current.watch_list.len(),
                current.completed_lessons.len()
            );
            println!(
                "  export:   {} watchlist, {} lessons (version {}, {})",
                loaded.watch_list.len(),
                loaded.completed_lessons.len(),
                loaded.version,
                loaded.timestamp
            );
            println!("Re-run with --strategy merge or --strategy replace. No changes made.");
        }
        client.resolve(flow, strategy)?
    } else {
        flow
    };

    match flow {
        LoadFlow::Done { applied } => {
            write_state(state_path, &applied).await?;
            println!("Loaded {} into {}", input.display(), state_path.display());
            println!(
                "  watchlist: {}  lessons: {}",
                applied.watch_list.len(),
                applied.completed_lessons.len()
            );
            Ok(())
        }
        _ => Ok(()),
    }
}

async fn write_state(path: &Path, state: &StateSnapshot) -> Result<()> {
    let rendered = serde_json::to_string_pretty(state).context("rendering state")?;
    tokio::fs::write(path, rendered)
        .await
        .with_context(|| format!("writing state file {}", path.display()))
}

// ── `gtvault config show` ─────────────────────────────────────────────────────

fn cmd_config_show(config: &GtvaultConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}

fn fmt_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
