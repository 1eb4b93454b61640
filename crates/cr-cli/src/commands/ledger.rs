//! Ledger and record commands.

use super::{print_json, Context};
use anyhow::{bail, Context as _, Result};
use colored::Colorize;
use cr_ledger::LedgerEngine;
use cr_registry::Registry;
use std::fs::File;
use std::path::Path;

fn registry(ctx: &Context) -> Registry {
    Registry::new(ctx.config.clone())
}

fn open(path: &Path) -> Result<File> {
    File::open(path).with_context(|| format!("failed to open {}", path.display()))
}

/// Create the ledger with a signed genesis block if it does not exist.
pub fn cmd_init(ctx: &Context) -> Result<()> {
    let engine = LedgerEngine::new(ctx.config.clone());
    engine
        .ensure_initialized()
        .context("failed to initialize ledger")?;
    let anchor = engine.latest_anchor()?;

    println!(
        "{} Ledger ready at {}",
        "✓".green().bold(),
        ctx.config.ledger_path.display()
    );
    println!("  {}: {}", "Latest index".bold(), anchor.latest_index);
    println!("  {}: {}", "Head hash".bold(), anchor.block_hash);
    Ok(())
}

pub fn cmd_register(ctx: &Context, file: &Path, name: &str, version: &str) -> Result<()> {
    let original_filename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());
    let block = registry(ctx)
        .register_record(name, version, &original_filename, open(file)?)
        .with_context(|| format!("failed to register {name} {version}"))?;

    if ctx.json {
        return print_json(&block);
    }
    let record = block.record();
    println!(
        "{} Registered {} {} at block {}",
        "✓".green().bold(),
        name.bold(),
        version.bold(),
        block.index
    );
    if let Some(record) = record {
        println!("  {}: {}", "SHA-256".bold(), record.file_sha256);
        println!("  {}: {}", "Size".bold(), record.file_size_bytes);
    }
    println!("  {}: {}", "Block hash".bold(), block.block_hash);
    Ok(())
}

/// Check a file against the ledger. Fails when the content does not match.
pub fn cmd_check(
    ctx: &Context,
    file: &Path,
    name: Option<&str>,
    version: Option<&str>,
) -> Result<()> {
    let result = registry(ctx)
        .verify_record(name, version, open(file)?)
        .context("verification failed")?;

    if ctx.json {
        print_json(&result)?;
    } else {
        let verdict = if result.matched {
            "MATCH".green().bold()
        } else {
            "MISMATCH".red().bold()
        };
        println!("{} ({})", verdict, result.match_mode);
        println!(
            "  {}: {} {} at block {}",
            "Record".bold(),
            result.name,
            result.version,
            result.index
        );
        println!("  {}: {}", "Registered".bold(), result.timestamp_utc);
        println!("  {}: {}", "File SHA-256".bold(), result.sha256);
        if !result.matched {
            println!("  {}: {}", "Ledger SHA-256".bold(), result.recorded_sha256);
        }
    }

    if !result.matched {
        bail!("{} does not match the registered content", file.display());
    }
    Ok(())
}

/// First 16 characters of a digest for tabular output.
fn short_digest(digest: &str) -> String {
    digest.chars().take(16).collect()
}

pub fn cmd_list(ctx: &Context) -> Result<()> {
    let items = registry(ctx).list_records()?;
    if ctx.json {
        return print_json(&items);
    }
    if items.is_empty() {
        println!("{}", "No records registered".yellow());
        return Ok(());
    }
    println!("{}", "Registered records".bold().underline());
    for item in &items {
        println!(
            "{:>5}  {}  {} {}  {}  {}",
            item.index.to_string().cyan(),
            item.timestamp_utc,
            item.name.bold(),
            item.version,
            short_digest(&item.sha256),
            item.original_filename
        );
    }
    println!();
    println!("{}: {}", "Total".bold(), items.len());
    Ok(())
}

/// Verify the whole chain. Fails when it is invalid.
pub fn cmd_verify(ctx: &Context) -> Result<()> {
    let report = registry(ctx).verify_ledger()?;

    if ctx.json {
        print_json(&report)?;
    } else if report.valid {
        println!(
            "{} Ledger valid ({} blocks)",
            "✓".green().bold(),
            report.checked_blocks
        );
    } else {
        println!("{} Ledger INVALID", "✗".red().bold());
        if let Some(fault) = &report.failure {
            println!("  {}: {}", "Block".bold(), fault.index);
            println!("  {}: {}", "Reason".bold(), fault.reason.to_string().red());
        }
    }

    match report.failure {
        Some(fault) => bail!(fault),
        None => Ok(()),
    }
}

pub fn cmd_anchor(ctx: &Context) -> Result<()> {
    let anchor = registry(ctx).latest_anchor()?;
    if ctx.json {
        return print_json(&anchor);
    }
    println!("{}", "Latest anchor".bold().underline());
    println!("  {}: {}", "Ledger".bold(), anchor.ledger_path);
    println!("  {}: {}", "Index".bold(), anchor.latest_index);
    println!("  {}: {}", "Block hash".bold(), anchor.block_hash);
    println!("  {}: {}", "Timestamp".bold(), anchor.timestamp_utc);
    println!("  {}: {}", "Key id".bold(), anchor.signing_key_id);
    println!("  {}: {}", "Signature".bold(), anchor.signature);
    Ok(())
}

pub fn cmd_pubkey(ctx: &Context) -> Result<()> {
    let info = registry(ctx).public_key_info()?;
    if ctx.json {
        return print_json(&info);
    }
    println!("{}: {}", "Key id".bold(), info.key_id);
    print!("{}", info.public_key_pem);
    Ok(())
}
