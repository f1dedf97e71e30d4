//! aeg: password-based file encryption
//!
//! Commands:
//!   seal <file>      - encrypt a file into a self-describing .aeg container
//!   open <file.aeg>  - decrypt and authenticate a container
//!   inspect <file>   - show container metadata without decrypting
//!   autotune         - recommend a PBKDF2 iteration count for this host
//!   passgen          - generate a random password
//!   config show      - display the effective configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use aeg_core::config::AegConfig;
use aeg_crypto::{
    autotune_in_background, generate_password, inspect_only, open_in_background,
    seal_in_background, EnvelopeMetadata, Hooks, ProgressFn, SealOptions, Strength,
};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "aeg",
    version,
    about = "Password-based file encryption (AES-256-GCM, PBKDF2-SHA256)",
    long_about = "aeg: seal files into authenticated, self-describing containers and open them again"
)]
struct Cli {
    /// Path to aeg configuration file
    #[arg(long, short = 'c', env = "AEG_CONFIG", default_value = "~/.config/aeg/config.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides config
    #[arg(long, env = "AEG_LOG")]
    log: Option<String>,

    /// Log format; overrides config
    #[arg(long, env = "AEG_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt a file
    Seal {
        /// File to encrypt
        input: PathBuf,
        /// Output path (default: <input>.<extension>)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// PBKDF2 iteration count (50000-5000000, overrides config)
        #[arg(long, short = 'i')]
        iterations: Option<u32>,
        /// Calibrate the iteration count on this host before sealing
        #[arg(long, conflicts_with = "iterations")]
        autotune: bool,
        /// Do not record the original filename in the container
        #[arg(long)]
        hide_name: bool,
        /// Overwrite the output file if it exists
        #[arg(long)]
        force: bool,
        /// Password (prompted for when unset)
        #[arg(long, env = "AEG_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Decrypt a container
    Open {
        /// Container to decrypt
        input: PathBuf,
        /// Output path (default: embedded filename next to the container)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Overwrite the output file if it exists
        #[arg(long)]
        force: bool,
        /// Password (prompted for when unset)
        #[arg(long, env = "AEG_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Show container metadata without decrypting
    Inspect {
        /// Container to inspect
        input: PathBuf,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Recommend a PBKDF2 iteration count for this host (~500 ms per derivation)
    Autotune,

    /// Generate a random password
    Passgen {
        /// Password length
        #[arg(long, short = 'l', default_value_t = aeg_crypto::passphrase::DEFAULT_PASSWORD_LEN)]
        length: usize,
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

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = expand_tilde(&cli.config);
    let config = AegConfig::load(&config_path)
        .with_context(|| format!("loading config: {}", config_path.display()))?;

    let level = cli.log.clone().unwrap_or_else(|| config.logging.level.clone());
    let format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| parse_log_format(&config.logging.format));
    init_logging(&level, &format);

    match cli.command {
        Commands::Seal { input, output, iterations, autotune, hide_name, force, password } => {
            let args = SealArgs { input, output, iterations, autotune, hide_name, force };
            cmd_seal(&config, args, password).await
        }
        Commands::Open { input, output, force, password } => {
            cmd_open(&config, &input, output, force, password).await
        }
        Commands::Inspect { input, json } => cmd_inspect(&input, json).await,
        Commands::Autotune => cmd_autotune().await,
        Commands::Passgen { length } => cmd_passgen(length),
        Commands::Config { action: ConfigAction::Show } => cmd_config_show(&config, &config_path),
    }
}

fn parse_log_format(s: &str) -> LogFormat {
    match s {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Expand `~` in path to the user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_default();
        PathBuf::from(format!("{home}/{rest}"))
    } else {
        path.to_path_buf()
    }
}

// ── Password, progress and cancellation helpers ───────────────────────────────

/// Use the supplied password, or prompt on the terminal (twice when sealing).
fn read_password(supplied: Option<String>, confirm: bool) -> Result<SecretString> {
    if let Some(password) = supplied {
        anyhow::ensure!(!password.is_empty(), "password must not be empty");
        return Ok(SecretString::from(password));
    }

    let first = Zeroizing::new(rpassword::prompt_password("Password: ").context("reading password")?);
    anyhow::ensure!(!first.is_empty(), "password must not be empty");

    if confirm {
        let second = Zeroizing::new(
            rpassword::prompt_password("Confirm password: ").context("reading password")?,
        );
        anyhow::ensure!(*first == *second, "passwords do not match");
    }

    Ok(SecretString::from(first.as_str()))
}

fn make_progress_bar(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::with_template("{prefix:.bold} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn make_spinner(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{prefix:.bold} {spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn progress_to(pb: &ProgressBar) -> ProgressFn {
    let pb = pb.clone();
    Box::new(move |stage, percent| {
        pb.set_position(u64::from(percent));
        pb.set_message(stage.to_string());
    })
}

/// A token that fires on Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });
    token
}

fn ensure_writable(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "refusing to overwrite {} (use --force)",
            path.display()
        );
    }
    Ok(())
}

fn warn_if_large(config: &AegConfig, path: &Path, len: u64) {
    let limit = config.output.large_file_warn_bytes();
    if len > limit {
        warn!(
            path = %path.display(),
            bytes = len,
            limit,
            "large input is processed entirely in memory"
        );
        eprintln!(
            "warning: {} is {}; the whole file is held in memory while processing",
            path.display(),
            fmt_bytes(len)
        );
    }
}

/// `<input>.<extension>`
fn sealed_path(input: &Path, extension: &str) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

/// Output filename for an opened container. Only the final component of an
/// embedded name is used, so a crafted header cannot escape the directory.
fn recovered_name(meta: &EnvelopeMetadata, fallback: &str) -> String {
    if meta.is_hidden() {
        return fallback.to_string();
    }
    meta.filename
        .as_deref()
        .and_then(|name| Path::new(name).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| fallback.to_string())
}

// ── `aeg seal` ────────────────────────────────────────────────────────────────

struct SealArgs {
    input: PathBuf,
    output: Option<PathBuf>,
    iterations: Option<u32>,
    autotune: bool,
    hide_name: bool,
    force: bool,
}

async fn cmd_seal(config: &AegConfig, args: SealArgs, password: Option<String>) -> Result<()> {
    let out_path = args
        .output
        .clone()
        .unwrap_or_else(|| sealed_path(&args.input, &config.output.extension));
    ensure_writable(&out_path, args.force)?;

    let plaintext = tokio::fs::read(&args.input)
        .await
        .with_context(|| format!("reading {}", args.input.display()))?;
    warn_if_large(config, &args.input, plaintext.len() as u64);

    let iterations = if args.autotune || config.crypto.autotune_on_seal {
        let spinner = make_spinner("autotune");
        spinner.set_message("calibrating PBKDF2...");
        let tuned = autotune_in_background().await.context("autotune")?;
        spinner.finish_with_message(format!("{} iterations", tuned.recommended));
        tuned.recommended
    } else {
        args.iterations.unwrap_or(config.crypto.iterations)
    };

    let password = read_password(password, true)?;
    if Strength::of(password.expose_secret()) == Strength::Weak {
        eprintln!("warning: weak password; consider `aeg passgen`");
    }

    let options = SealOptions {
        iterations,
        filename: args
            .input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned()),
        hide_name: args.hide_name || config.crypto.hide_name,
    };
    debug!(?options, "sealing");

    let pb = make_progress_bar("seal");
    let hooks = Hooks::default()
        .with_progress(progress_to(&pb))
        .with_cancel(cancel_on_ctrl_c());

    let sealed = match seal_in_background(plaintext, password, options, hooks).await {
        Ok(sealed) => sealed,
        Err(e) => {
            pb.abandon_with_message("failed");
            return Err(e).with_context(|| format!("sealing {}", args.input.display()));
        }
    };
    pb.finish_with_message("done");

    tokio::fs::write(&out_path, &sealed)
        .await
        .with_context(|| format!("writing {}", out_path.display()))?;

    println!("Sealed {} → {}", args.input.display(), out_path.display());
    println!("  size:       {}", fmt_bytes(sealed.len() as u64));
    println!("  iterations: {iterations}");
    Ok(())
}

// ── `aeg open` ────────────────────────────────────────────────────────────────

async fn cmd_open(
    config: &AegConfig,
    input: &Path,
    output: Option<PathBuf>,
    force: bool,
    password: Option<String>,
) -> Result<()> {
    let container = tokio::fs::read(input)
        .await
        .with_context(|| format!("reading {}", input.display()))?;
    warn_if_large(config, input, container.len() as u64);

    let meta = inspect_only(&container)
        .with_context(|| format!("reading container header: {}", input.display()))?;
    println!("{meta}");

    let out_path = output.unwrap_or_else(|| {
        input.with_file_name(recovered_name(&meta, &config.output.fallback_name))
    });
    ensure_writable(&out_path, force)?;

    let password = read_password(password, false)?;

    let pb = make_progress_bar("open");
    let hooks = Hooks::default()
        .with_progress(progress_to(&pb))
        .with_cancel(cancel_on_ctrl_c());

    let plaintext = match open_in_background(container, password, hooks).await {
        Ok(plaintext) => plaintext,
        Err(e) => {
            pb.abandon_with_message("failed");
            return Err(e).with_context(|| format!("opening {}", input.display()));
        }
    };
    pb.finish_with_message("done");

    tokio::fs::write(&out_path, plaintext.as_slice())
        .await
        .with_context(|| format!("writing {}", out_path.display()))?;

    println!("Opened {} → {}", input.display(), out_path.display());
    println!("  size: {}", fmt_bytes(plaintext.len() as u64));
    Ok(())
}

// ── `aeg inspect` ─────────────────────────────────────────────────────────────

async fn cmd_inspect(input: &Path, json: bool) -> Result<()> {
    let container = tokio::fs::read(input)
        .await
        .with_context(|| format!("reading {}", input.display()))?;
    let meta = inspect_only(&container)
        .with_context(|| format!("reading container header: {}", input.display()))?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&meta).context("serializing metadata")?
        );
        return Ok(());
    }

    println!("file:       {}", meta.display_name());
    println!("size:       {} ({} bytes)", fmt_bytes(meta.plaintext_size), meta.plaintext_size);
    println!("version:    {}", meta.version);
    println!("kdf:        PBKDF2-SHA256, {} iterations", meta.iterations);
    println!("cipher:     AES-256-GCM, {}-bit tag", meta.tag_bits);
    println!("salt/nonce: {} B / {} B", meta.salt_len, meta.nonce_len);
    Ok(())
}

// ── `aeg autotune` ────────────────────────────────────────────────────────────

async fn cmd_autotune() -> Result<()> {
    let spinner = make_spinner("autotune");
    spinner.set_message("calibrating PBKDF2...");
    let tuned = autotune_in_background().await.context("autotune")?;
    spinner.finish_and_clear();

    println!(
        "Recommended iterations: {} (baseline {} took {:.1} ms)",
        tuned.recommended,
        tuned.baseline,
        tuned.elapsed.as_secs_f64() * 1000.0
    );
    Ok(())
}

// ── `aeg passgen` ─────────────────────────────────────────────────────────────

fn cmd_passgen(length: usize) -> Result<()> {
    anyhow::ensure!(length > 0, "length must be at least 1");
    let password = generate_password(length);
    let bits = aeg_crypto::estimate_entropy_bits(password.expose_secret());
    println!("{}", password.expose_secret());
    eprintln!("strength: {} (~{bits:.0} bits)", Strength::from_bits(bits));
    Ok(())
}

// ── `aeg config show` ─────────────────────────────────────────────────────────

fn cmd_config_show(config: &AegConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = config.to_toml().context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}

fn fmt_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
