use anyhow::Result;
use clap::{Parser, Subcommand};
use cr_cli::commands::{backup, bench, keys, ledger, migrate, Context};
use cr_migrate::DEFAULT_SOURCE;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Tamper-evident registry of file checksums.
#[derive(Parser, Debug)]
#[command(name = "cr", version)]
struct Cli {
    /// Registry root directory.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,
    /// Config file; defaults to `<root>/registry.toml` when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Print machine-readable JSON.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the ledger with a signed genesis block.
    Init,
    /// Generate the Ed25519 signing keypair.
    Keygen {
        /// Replace existing key files.
        #[arg(long)]
        force: bool,
    },
    /// Register a file version.
    Register {
        file: PathBuf,
        #[arg(long)]
        name: String,
        #[arg(long)]
        version: String,
    },
    /// Check a file against the registered records.
    Check {
        file: PathBuf,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        version: Option<String>,
    },
    /// List registered records.
    List,
    /// Verify the hash chain and every signature.
    Verify,
    /// Show the latest anchor.
    Anchor,
    /// Show the public key and its id.
    Pubkey,
    /// Snapshot the registry files.
    Backup {
        /// Directory receiving timestamped snapshots, relative to the root.
        #[arg(long, default_value = "backups")]
        out: PathBuf,
    },
    /// Restore a snapshot and verify the result.
    Restore {
        backup_dir: PathBuf,
        /// Also restore the backed-up public key.
        #[arg(long)]
        restore_public_key: bool,
    },
    /// Rebuild a v0.1 ledger as a signed v0.2 ledger.
    Migrate {
        /// v0.1 ledger, relative to the root.
        #[arg(long, default_value = DEFAULT_SOURCE)]
        src: PathBuf,
        /// Replace an existing ledger.
        #[arg(long)]
        force: bool,
    },
    /// Measure SHA-256 throughput on a file.
    Bench {
        file: PathBuf,
        #[arg(long, default_value_t = 1)]
        iterations: u32,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let ctx = Context::load(&cli.root, cli.config.as_deref(), cli.json)?;

    match cli.command {
        Commands::Init => ledger::cmd_init(&ctx),
        Commands::Keygen { force } => keys::cmd_keygen(&ctx, force),
        Commands::Register {
            file,
            name,
            version,
        } => ledger::cmd_register(&ctx, &file, &name, &version),
        Commands::Check {
            file,
            name,
            version,
        } => ledger::cmd_check(&ctx, &file, name.as_deref(), version.as_deref()),
        Commands::List => ledger::cmd_list(&ctx),
        Commands::Verify => ledger::cmd_verify(&ctx),
        Commands::Anchor => ledger::cmd_anchor(&ctx),
        Commands::Pubkey => ledger::cmd_pubkey(&ctx),
        Commands::Backup { out } => backup::cmd_backup(&ctx, &out),
        Commands::Restore {
            backup_dir,
            restore_public_key,
        } => backup::cmd_restore(&ctx, &backup_dir, restore_public_key),
        Commands::Migrate { src, force } => migrate::cmd_migrate(&ctx, &src, force),
        Commands::Bench { file, iterations } => bench::cmd_bench(&ctx, &file, iterations),
    }
}
