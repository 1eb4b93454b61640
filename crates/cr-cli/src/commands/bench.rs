//! Hash throughput benchmark.

use super::{print_json, Context};
use anyhow::{bail, Context as _, Result};
use colored::Colorize;
use cr_canon::{sha256_file, CHUNK_SIZE};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;

const MIB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Serialize)]
struct BenchReport {
    file: String,
    size_bytes: u64,
    sha256: String,
    chunk_size: usize,
    iterations: u32,
    elapsed_sec: f64,
    throughput_mib_per_sec: f64,
}

/// Hash `file` `iterations` times and report the mean throughput.
pub fn cmd_bench(ctx: &Context, file: &Path, iterations: u32) -> Result<()> {
    if !file.is_file() {
        bail!("benchmark file not found at {}", file.display());
    }
    let iterations = iterations.max(1);

    let mut digest = None;
    let start = Instant::now();
    for _ in 0..iterations {
        digest = Some(
            sha256_file(file).with_context(|| format!("failed to hash {}", file.display()))?,
        );
    }
    let elapsed = start.elapsed().as_secs_f64() / f64::from(iterations);
    let Some(digest) = digest else {
        bail!("no iterations ran");
    };

    let throughput = if elapsed > 0.0 {
        digest.size_bytes as f64 / MIB / elapsed
    } else {
        0.0
    };
    let report = BenchReport {
        file: file.display().to_string(),
        size_bytes: digest.size_bytes,
        sha256: digest.sha256,
        chunk_size: CHUNK_SIZE,
        iterations,
        elapsed_sec: elapsed,
        throughput_mib_per_sec: throughput,
    };

    if ctx.json {
        return print_json(&report);
    }
    println!("{}", "Hash benchmark".bold().underline());
    println!("  {}: {}", "File".bold(), report.file);
    println!("  {}: {}", "Size".bold(), report.size_bytes);
    println!("  {}: {}", "SHA-256".bold(), report.sha256);
    println!("  {}: {:.4}s", "Elapsed (mean)".bold(), report.elapsed_sec);
    println!(
        "  {}: {}",
        "Throughput".bold(),
        format!("{:.2} MiB/s", report.throughput_mib_per_sec).green()
    );
    Ok(())
}
