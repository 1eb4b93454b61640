//! Ledger format migration command.

use super::{print_json, Context};
use anyhow::{Context as _, Result};
use colored::Colorize;
use cr_migrate::migrate_v01_to_v02;
use serde_json::json;
use std::path::Path;

pub fn cmd_migrate(ctx: &Context, src: &Path, force: bool) -> Result<()> {
    let src = ctx.resolve(src);
    let summary = migrate_v01_to_v02(&ctx.config, &src, force)
        .with_context(|| format!("failed to migrate {}", src.display()))?;

    if ctx.json {
        return print_json(&json!({
            "source": summary.source,
            "ledger_path": summary.ledger_path,
            "anchor_path": summary.anchor_path,
            "records_migrated": summary.records_migrated,
            "latest_index": summary.latest_index,
            "latest_block_hash": summary.latest_block_hash,
        }));
    }
    println!(
        "{} Migrated {} records from {}",
        "✓".green().bold(),
        summary.records_migrated,
        summary.source.display()
    );
    println!("  {}: {}", "Ledger".bold(), summary.ledger_path.display());
    println!("  {}: {}", "Anchor".bold(), summary.anchor_path.display());
    println!("  {}: {}", "Latest index".bold(), summary.latest_index);
    Ok(())
}
