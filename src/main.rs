use anyhow::{bail, Context, Result};
use std::env;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use trust_wallet::{Cabinet, DocumentReader, LoadReport, PersistConfig};

const USAGE: &str = "\
Usage:
  trust-wallet check <file> [--config <config.json>]
  trust-wallet rewrite <in> <out> [--config <config.json>]

Logging follows RUST_LOG (default: info).";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let (command, rest) = match args.split_first() {
        Some((command, rest)) => (command.as_str(), rest),
        None => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    };

    let (paths, config_path) = split_config_flag(rest)?;
    let config = PersistConfig::load_or_default(config_path.as_deref())
        .context("failed to load config")?;

    match (command, paths.as_slice()) {
        ("check", [file]) => run_check(Path::new(file), &config),
        ("rewrite", [input, output]) => run_rewrite(Path::new(input), Path::new(output), &config),
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }
}

/// Pull `--config <path>` out of the arguments
fn split_config_flag(args: &[String]) -> Result<(Vec<String>, Option<PathBuf>)> {
    let mut paths = Vec::new();
    let mut config = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            match iter.next() {
                Some(path) => config = Some(PathBuf::from(path)),
                None => bail!("--config needs a path"),
            }
        } else {
            paths.push(arg.clone());
        }
    }
    Ok((paths, config))
}

fn load(path: &Path, config: &PersistConfig) -> Result<(Cabinet, LoadReport)> {
    let input = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;

    // Log every 10%, whatever the granule count
    let mut next_mark = 0.1;
    let mut reader = DocumentReader::new(config.reader.clone()).with_progress(|fraction| {
        if fraction >= next_mark {
            info!("loading {:.0}%", fraction * 100.0);
            while next_mark <= fraction {
                next_mark += 0.1;
            }
        }
        ControlFlow::Continue(())
    });

    let loaded = Cabinet::load_with(&input, &mut reader)
        .with_context(|| format!("{} is not a readable cabinet", path.display()))?;
    if loaded.repaired_links > 0 {
        info!(added = loaded.repaired_links, "repaired one-sided links");
    }
    Ok((loaded.object, loaded.report))
}

fn run_check(path: &Path, config: &PersistConfig) -> Result<()> {
    println!("🔍 Checking {}", path.display());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let (mut cabinet, report) = load(path, config)?;
    let wallet = &cabinet.wallet;
    println!("✓ {} accounts, {} transactions", wallet.accounts.len(), wallet.transaction_count());
    println!("✓ {} groups, {} filters", wallet.groups.len(), wallet.filters.len());
    println!("✓ {} categories, {} tags", wallet.categories.len(), wallet.tags.len());
    println!("✓ {} documents", cabinet.documents.len());

    let graph = cabinet.link_graph();
    println!("✓ {} links between {} entities", graph.edge_count(), graph.node_count());

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    if report.is_clean() {
        println!("✅ {}", report.summary());
    } else {
        println!("⚠️  {}", report.summary());
        for issue in &report.issues {
            println!("   - {}", issue);
        }
    }
    Ok(())
}

fn run_rewrite(input: &Path, output: &Path, config: &PersistConfig) -> Result<()> {
    let (mut cabinet, report) = load(input, config)?;
    if !report.is_clean() {
        println!("⚠️  {}", report.summary());
    }

    cabinet
        .save_file(output, &config.writer)
        .with_context(|| format!("cannot write {}", output.display()))?;
    println!("✅ Wrote {}", output.display());
    Ok(())
}
