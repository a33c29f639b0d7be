//! Screen lock administration CLI
//!
//! Drives a [`ScreenLock`] over a SQLite lock store. One-shot subcommands
//! change persisted settings; `shell` keeps a session mounted so lock state,
//! keypad attempts and reveal gates survive between commands.

mod authenticator;

use anyhow::{bail, Context};
use authenticator::{BiometricMode, TerminalAuthenticator, TerminalInput};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use easycard_lock::{
    press_digit_paced, settle_rejected_entry, ActivitySignal, GateOutcome, LockOptions,
    LockTimeout, PasscodeGate, RevealGate, RevealRequest, ScreenLock,
};
use easycard_storage_sqlite::SqliteLockStore;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "easycard-lock")]
#[command(about = "Easy Card screen lock administration", long_about = None)]
struct Cli {
    /// Lock store database (defaults to the platform data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// JSON options file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// How biometric prompts are answered
    #[arg(long, global = true, value_enum, default_value = "prompt")]
    biometric: BiometricMode,

    #[command(subcommand)]
    command: Commands,
}

/// A line typed inside `shell`
#[derive(Parser)]
#[command(no_binary_name = true)]
struct ShellLine {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show lock state and configuration
    Status,

    /// Enroll a passcode and enable the lock
    Enable {
        /// New passcode
        passcode: String,
    },

    /// Disable the lock and delete all lock and biometric data
    Disable {
        /// Current passcode; required unless --force
        #[arg(short, long)]
        passcode: Option<String>,

        /// Skip passcode confirmation
        #[arg(long)]
        force: bool,
    },

    /// Suspend the lock, keeping the passcode
    Pause,

    /// Resume a paused lock
    Resume,

    /// Lock now
    Lock,

    /// Unlock with the passcode
    Unlock {
        /// Passcode
        passcode: String,
    },

    /// Check a passcode without unlocking
    Verify {
        /// Passcode
        passcode: String,
    },

    /// Replace the passcode
    ChangePasscode {
        /// Current passcode
        old: String,
        /// New passcode
        new: String,
    },

    /// Set the idle timeout (immediately, 1min, 5min, 15min, 30min, never)
    SetTimeout {
        /// Timeout policy
        #[arg(value_parser = parse_timeout)]
        timeout: LockTimeout,
    },

    /// Switch biometric unlock on or off
    SetBiometric {
        /// true or false
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },

    /// Switch sensitive data masking on or off
    SetHideData {
        /// true or false
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },

    /// Deliver an environment signal
    Signal {
        /// Signal kind
        #[arg(value_enum)]
        signal: SignalArg,
    },

    /// Enroll a biometric credential and switch biometric unlock on
    EnrollBiometric {
        /// Identity bound to the credential (phone number)
        identity: String,

        /// Secondary secret to bind to the credential
        #[arg(long)]
        secret: Option<String>,
    },

    /// Unlock with a biometric prompt
    UnlockBiometric,

    /// Reveal masked data
    Reveal {
        /// Passcode; a biometric prompt is used when omitted
        #[arg(short, long)]
        passcode: Option<String>,
    },

    /// Mask revealed data again
    Conceal,

    /// Interactive session (`exit` to quit)
    Shell,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SignalArg {
    Interaction,
    Hidden,
    Visible,
    Pagehide,
    FocusLost,
}

impl From<SignalArg> for ActivitySignal {
    fn from(signal: SignalArg) -> Self {
        match signal {
            SignalArg::Interaction => ActivitySignal::Interaction,
            SignalArg::Hidden => ActivitySignal::Hidden,
            SignalArg::Visible => ActivitySignal::Visible,
            SignalArg::Pagehide => ActivitySignal::PageHide,
            SignalArg::FocusLost => ActivitySignal::FocusLost,
        }
    }
}

fn parse_timeout(raw: &str) -> Result<LockTimeout, String> {
    raw.parse::<LockTimeout>().map_err(|e| e.to_string())
}

/// Mounted lock plus the reveal gate of the current screen
struct App {
    lock: ScreenLock,
    gate: RevealGate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let options = match &cli.config {
        Some(path) => LockOptions::load(path)
            .with_context(|| format!("Failed to load options from {}", path.display()))?,
        None => LockOptions::default(),
    };
    let db_path = match cli.db {
        Some(path) => path,
        None => default_db_path()?,
    };
    info!("Using lock store {}", db_path.display());

    let store = Arc::new(SqliteLockStore::open(&db_path)?);
    let input = TerminalInput::stdin();
    let lock = ScreenLock::new(
        store,
        Arc::new(TerminalAuthenticator::new(cli.biometric, input.clone())),
        options,
    );
    let gate = lock.new_reveal_gate();
    let mut app = App { lock, gate };

    match cli.command {
        Commands::Shell => run_shell(&mut app, &input).await,
        command => run(&mut app, command).await,
    }
}

fn default_db_path() -> anyhow::Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("com", "EasyCard", "easycard")
        .context("Cannot determine a data directory; pass --db")?;
    let dir = dirs.data_dir();
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    Ok(dir.join("lock.db"))
}

async fn run_shell(app: &mut App, input: &TerminalInput) -> anyhow::Result<()> {
    println!("easycard-lock shell; `help` for commands, `exit` to quit");

    while let Some(line) = input.next_line().await? {
        let line = line.trim();
        match line {
            "" => continue,
            "exit" | "quit" => break,
            _ => {}
        }

        let parsed = match ShellLine::try_parse_from(line.split_whitespace()) {
            Ok(parsed) => parsed,
            Err(e) => {
                let _ = e.print();
                continue;
            }
        };
        if matches!(parsed.command, Commands::Shell) {
            println!("Already in a shell");
            continue;
        }
        if let Err(e) = run(app, parsed.command).await {
            println!("error: {:#}", e);
        }
    }
    Ok(())
}

async fn run(app: &mut App, command: Commands) -> anyhow::Result<()> {
    let lock = &mut app.lock;

    match command {
        Commands::Status => print_status(app).await?,
        Commands::Enable { passcode } => {
            lock.enable_screen_lock(&passcode)?;
            println!("Screen lock enabled");
        }
        Commands::Disable { passcode, force } => {
            if force {
                lock.disable_screen_lock()?;
            } else {
                let Some(passcode) = passcode else {
                    bail!("Disabling requires --passcode (or --force)");
                };
                if !lock.session_mut().disable_with_passcode(&passcode)? {
                    bail!("Wrong passcode");
                }
            }
            app.gate.conceal();
            println!("Screen lock disabled");
        }
        Commands::Pause => {
            lock.pause_screen_lock()?;
            println!("Screen lock paused");
        }
        Commands::Resume => {
            lock.resume_screen_lock()?;
            println!("Screen lock resumed");
        }
        Commands::Lock => {
            if !lock.is_enabled() {
                bail!("Screen lock is not enabled");
            }
            lock.lock();
            println!("Locked");
        }
        Commands::Unlock { passcode } => {
            enter_passcode(lock.session_mut(), &passcode).await?;
            println!("Unlocked");
        }
        Commands::Verify { passcode } => {
            if !lock.verify_passcode(&passcode) {
                bail!("Passcode does not match");
            }
            println!("Passcode matches");
        }
        Commands::ChangePasscode { old, new } => {
            if !lock.change_passcode(&old, &new)? {
                bail!("Current passcode is wrong");
            }
            println!("Passcode changed");
        }
        Commands::SetTimeout { timeout } => {
            lock.set_lock_timeout(timeout)?;
            println!("Lock timeout set to {}", timeout);
        }
        Commands::SetBiometric { enabled } => {
            lock.set_biometric_enabled(enabled)?;
            println!("Biometric unlock {}", on_off(enabled));
        }
        Commands::SetHideData { enabled } => {
            lock.set_hide_data_enabled(enabled)?;
            println!("Hide sensitive data {}", on_off(enabled));
        }
        Commands::Signal { signal } => {
            let locked = lock.handle_signal(signal.into());
            println!("{}", if locked { "Locked" } else { "Unlocked" });
        }
        Commands::EnrollBiometric { identity, secret } => {
            if !lock.enroll_biometric(&identity, secret.as_deref()).await? {
                bail!("Biometric enrollment failed");
            }
            println!("{} enrolled", lock.biometric_kind().label());
        }
        Commands::UnlockBiometric => {
            if !lock.is_locked() {
                println!("Not locked");
            } else if lock.unlock_with_biometric().await {
                println!("Unlocked");
            } else {
                warn!("Biometric unlock failed; use the passcode");
                bail!("Biometric unlock failed");
            }
        }
        Commands::Reveal { passcode } => {
            let gate = &mut app.gate;
            let revealed = match gate.request_reveal() {
                RevealRequest::Revealed => true,
                RevealRequest::VerificationRequired => match passcode {
                    Some(passcode) => {
                        enter_passcode(gate, &passcode).await?;
                        true
                    }
                    None => lock.reveal_with_biometric(gate).await,
                },
            };
            if !revealed {
                bail!("Verification failed; data stays masked");
            }
            println!("Sensitive data revealed");
        }
        Commands::Conceal => {
            app.gate.conceal();
            println!("Sensitive data masked");
        }
        Commands::Shell => bail!("Already in a shell"),
    }
    Ok(())
}

/// Type `passcode` on the gate's keypad, honouring its delays
async fn enter_passcode<G: PasscodeGate>(gate: &mut G, passcode: &str) -> anyhow::Result<()> {
    let length = gate.keypad_mut().length();
    if passcode.len() != length || !passcode.chars().all(|c| c.is_ascii_digit()) {
        bail!("Passcode must be {} digits", length);
    }

    gate.keypad_mut().clear_rejected();
    let mut outcome = GateOutcome::Pending;
    for digit in passcode.chars() {
        outcome = press_digit_paced(gate, digit).await;
    }

    match outcome {
        GateOutcome::Granted => Ok(()),
        GateOutcome::Rejected { attempts } => {
            let show_attempts = gate.keypad_mut().show_attempts();
            settle_rejected_entry(gate).await;
            if show_attempts {
                bail!("Wrong passcode ({} attempts)", attempts);
            }
            bail!("Wrong passcode")
        }
        GateOutcome::Ignored | GateOutcome::Pending => bail!("Passcode entry incomplete"),
    }
}

async fn print_status(app: &App) -> anyhow::Result<()> {
    let lock = &app.lock;
    let biometrics = lock.biometrics();
    let fingerprint = biometrics
        .vault()
        .load()
        .map(|credential| credential_fingerprint(&credential.credential_id));

    let status = serde_json::json!({
        "state": format!("{:?}", lock.state()),
        "configuration": lock.configuration(),
        "revealed": app.gate.revealed(),
        "biometric": {
            "available": biometrics.is_available().await,
            "kind": lock.biometric_kind().label(),
            "credential": fingerprint,
        },
    });
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

/// Short non-reversible fingerprint of a credential reference
fn credential_fingerprint(credential_id: &str) -> String {
    let digest = Sha256::digest(credential_id.as_bytes());
    format!("sha256:{}", hex::encode(&digest[..8]))
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}
