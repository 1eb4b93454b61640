//! Backup and restore commands.

use super::{print_json, Context};
use anyhow::{Context as _, Result};
use colored::Colorize;
use cr_backup::{restore, snapshot, verify_backup};
use serde_json::json;
use std::path::Path;

pub fn cmd_backup(ctx: &Context, out: &Path) -> Result<()> {
    let backup_root = ctx.resolve(out);
    let backup_dir = snapshot(&ctx.config, &backup_root)
        .with_context(|| format!("failed to back up into {}", backup_root.display()))?;
    let manifest = verify_backup(&backup_dir)?;

    if ctx.json {
        return print_json(&json!({
            "backup_dir": backup_dir,
            "manifest": manifest,
        }));
    }
    println!(
        "{} Backup created at {}",
        "✓".green().bold(),
        backup_dir.display()
    );
    for (path, digest) in &manifest.files {
        println!("  {}  {} bytes  {}", digest.sha256, digest.size_bytes, path);
    }
    Ok(())
}

pub fn cmd_restore(ctx: &Context, backup_dir: &Path, restore_public_key: bool) -> Result<()> {
    let report = restore(&ctx.config, backup_dir, restore_public_key)
        .with_context(|| format!("failed to restore from {}", backup_dir.display()))?;

    if ctx.json {
        return print_json(&json!({
            "restored": report.restored,
            "anchor_rebuilt": report.anchor_rebuilt,
            "verified_blocks": report.verified_blocks,
        }));
    }
    for path in &report.restored {
        println!("  {} {}", "restored".cyan(), path.display());
    }
    if report.anchor_rebuilt {
        println!("  {} anchor rebuilt from ledger", "note".yellow());
    }
    println!(
        "{} Restore completed; {} blocks verified",
        "✓".green().bold(),
        report.verified_blocks
    );
    Ok(())
}
