//! Key management commands.

use super::{print_json, Context};
use anyhow::{Context as _, Result};
use colored::Colorize;
use cr_keys::{generate_keypair, key_id};
use serde_json::json;

/// Generate the registry signing keypair at the configured paths.
pub fn cmd_keygen(ctx: &Context, force: bool) -> Result<()> {
    let config = &ctx.config;
    let public_key = generate_keypair(&config.private_key_path, &config.public_key_path, force)
        .context("failed to generate keypair")?;
    let id = key_id(&public_key)?;

    if ctx.json {
        return print_json(&json!({
            "key_id": id,
            "private_key_path": config.private_key_path,
            "public_key_path": config.public_key_path,
        }));
    }
    println!("{} Generated Ed25519 keypair", "✓".green().bold());
    println!("  {}: {}", "Key id".bold(), id);
    println!(
        "  {}: {}",
        "Private key".bold().red(),
        config.private_key_path.display()
    );
    println!(
        "  {}: {}",
        "Public key".bold().green(),
        config.public_key_path.display()
    );
    println!();
    println!("{}", "Keep the private key secret.".yellow().bold());
    Ok(())
}
