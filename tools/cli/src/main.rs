//! saltseal CLI - seal files under a password.
//!
//! A thin caller around `saltseal-crypto`: it reads passwords from the
//! terminal, runs key derivation off the async executor and moves blobs
//! to and from files.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use zeroize::Zeroizing;

use saltseal_common::{Error, Password};
use saltseal_crypto::{
    open_with_deriver, seal_with_deriver, KdfParams, KeyDeriver, Salt, SecretBlob,
};

const MIB: u64 = 1024 * 1024;

#[derive(Parser)]
#[command(name = "saltseal")]
#[command(about = "saltseal - Password-sealed secret files")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    kdf: KdfArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Key derivation settings. Opening must use the same settings as sealing.
#[derive(Args, Debug, Clone)]
struct KdfArgs {
    /// KDF strength: "interactive", "moderate", or "sensitive".
    #[arg(short, long, global = true, default_value = "interactive")]
    strength: String,

    /// Override the work factor as log2(N).
    #[arg(long, global = true)]
    log_n: Option<u8>,

    /// Override the block size r.
    #[arg(long, global = true)]
    block_size: Option<u32>,

    /// Override the parallelism p.
    #[arg(long, global = true)]
    parallelism: Option<u32>,

    /// Refuse derivations that need more memory than this (MiB).
    #[arg(long, global = true)]
    memory_limit_mib: Option<u64>,

    /// Give up on key derivation after this many seconds.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive a key under a fresh salt and print both.
    Derive,

    /// Seal a file into a blob.
    Seal {
        /// File to seal.
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the blob.
        #[arg(short, long, default_value = "secretmessage")]
        output: PathBuf,
    },

    /// Open a blob back into a file.
    Open {
        /// Blob to open.
        #[arg(short, long, default_value = "secretmessage")]
        input: PathBuf,

        /// Where to write the recovered plaintext.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show blob information. Needs no password.
    Info {
        /// Blob to inspect.
        #[arg(short, long, default_value = "secretmessage")]
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let builder = FmtSubscriber::builder().with_target(false).compact();
    match EnvFilter::try_from_default_env() {
        Ok(filter) => {
            tracing::subscriber::set_global_default(builder.with_env_filter(filter).finish())?
        }
        Err(_) => tracing::subscriber::set_global_default(builder.with_max_level(level).finish())?,
    }

    let result = match cli.command {
        Commands::Derive => cmd_derive(&cli.kdf).await,
        Commands::Seal { input, output } => cmd_seal(&cli.kdf, &input, &output).await,
        Commands::Open { input, output } => cmd_open(&cli.kdf, &input, &output).await,
        Commands::Info { input } => cmd_info(&input).await,
    };

    if let Err(e) = result {
        // Exit now rather than wait on a derivation thread a deadline left behind.
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

/// Build KDF parameters from a strength preset plus overrides.
fn kdf_params(args: &KdfArgs) -> Result<KdfParams> {
    let mut params = match args.strength.as_str() {
        "interactive" => KdfParams::interactive(),
        "moderate" => KdfParams::moderate(),
        "sensitive" => KdfParams::sensitive(),
        _ => {
            anyhow::bail!("Invalid strength. Use: interactive, moderate, or sensitive");
        }
    };

    if let Some(log_n) = args.log_n {
        params.work_factor = 1u64
            .checked_shl(u32::from(log_n))
            .filter(|n| *n != 0)
            .context("log-n is too large")?;
    }
    if let Some(r) = args.block_size {
        params.block_size = r;
    }
    if let Some(p) = args.parallelism {
        params.parallelism = p;
    }

    params.validate().context("Invalid KDF parameters")?;
    Ok(params)
}

fn key_deriver(args: &KdfArgs) -> Result<KeyDeriver> {
    let deriver = KeyDeriver::new(kdf_params(args)?);
    Ok(match args.memory_limit_mib {
        Some(mib) => deriver.with_memory_limit(mib.saturating_mul(MIB)),
        None => deriver,
    })
}

/// Run a derivation-bound job on the blocking pool, under the deadline.
async fn derive_off_thread<T, F>(args: &KdfArgs, job: F) -> Result<T>
where
    F: FnOnce() -> saltseal_common::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let task = tokio::task::spawn_blocking(job);
    let joined = match args.timeout_secs {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), task)
            .await
            .with_context(|| format!("Key derivation did not finish within {}s", secs))?,
        None => task.await,
    };

    let result = joined.context("Key derivation task failed")?;
    Ok(result?)
}

/// Prompt for password securely.
fn prompt_password(prompt: &str) -> Result<Password> {
    let password = rpassword::prompt_password(prompt).context("Failed to read password")?;
    Ok(Password::from(password))
}

/// Prompt twice and require both entries to match.
fn prompt_new_password() -> Result<Password> {
    let password = prompt_password("Enter password: ")?;
    let confirm = prompt_password("Confirm password: ")?;

    if password != confirm {
        anyhow::bail!("Passwords do not match");
    }

    if password.is_empty() {
        anyhow::bail!("Password cannot be empty");
    }

    Ok(password)
}

/// Derive a key under a fresh salt and print it.
async fn cmd_derive(args: &KdfArgs) -> Result<()> {
    let deriver = key_deriver(args)?;
    let password = prompt_password("Enter password: ")?;

    let salt = Salt::generate().context("Failed to generate salt")?;
    debug!(params = ?deriver.params(), "deriving key");

    let key = derive_off_thread(args, move || deriver.derive(password.as_bytes(), &salt))
        .await
        .context("Failed to derive key")?;

    println!("Salt:       {}", hex::encode(salt.as_bytes()));
    println!("Secret key: {}", hex::encode(key.as_bytes()));

    Ok(())
}

/// Seal a file into a blob.
async fn cmd_seal(args: &KdfArgs, input: &Path, output: &Path) -> Result<()> {
    info!("Sealing {} into {}", input.display(), output.display());

    let deriver = key_deriver(args)?;
    let params = *deriver.params();

    let plaintext = Zeroizing::new(
        tokio::fs::read(input)
            .await
            .context("Failed to read input file")?,
    );
    let password = prompt_new_password()?;

    let len = plaintext.len();
    let blob = derive_off_thread(args, move || {
        seal_with_deriver(password.as_bytes(), &deriver, &plaintext)
    })
    .await
    .context("Failed to seal")?;

    tokio::fs::write(output, &blob)
        .await
        .context("Failed to write output file")?;

    println!(
        "Sealed {} ({} bytes) into {} ({} bytes)",
        input.display(),
        len,
        output.display(),
        blob.len()
    );
    println!(
        "  Open with the same KDF settings: N={}, r={}, p={}",
        params.work_factor, params.block_size, params.parallelism
    );

    Ok(())
}

/// Open a blob back into a file.
async fn cmd_open(args: &KdfArgs, input: &Path, output: &Path) -> Result<()> {
    info!("Opening {} into {}", input.display(), output.display());

    let deriver = key_deriver(args)?;
    let blob = tokio::fs::read(input)
        .await
        .context("Failed to read blob")?;
    let password = prompt_password("Enter password: ")?;

    let opened = derive_off_thread(args, move || {
        open_with_deriver(password.as_bytes(), &deriver, &blob)
    })
    .await;

    let plaintext = match opened {
        Ok(plaintext) => Zeroizing::new(plaintext),
        Err(e) if matches!(e.downcast_ref::<Error>(), Some(Error::AuthenticationFailure)) => {
            anyhow::bail!("Wrong password, wrong KDF settings, or corrupted blob");
        }
        Err(e) => return Err(e.context("Failed to open blob")),
    };

    tokio::fs::write(output, plaintext.as_slice())
        .await
        .context("Failed to write output file")?;

    println!("Opened {} ({} bytes)", output.display(), plaintext.len());

    Ok(())
}

/// Show blob information.
async fn cmd_info(input: &Path) -> Result<()> {
    let bytes = tokio::fs::read(input)
        .await
        .context("Failed to read blob")?;
    let blob = SecretBlob::decode(&bytes).context("Not a saltseal blob")?;

    println!("Blob: {}", input.display());
    println!("  Salt: {}", hex::encode(blob.salt.as_bytes()));
    println!("  Ciphertext: {} bytes", blob.ciphertext.len());
    println!("  Plaintext: {} bytes", blob.plaintext_len());

    Ok(())
}
