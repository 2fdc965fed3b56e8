use anyhow::{Context, Result};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::{fs, io::Write};
use structopt::StructOpt;
use testxml::ser::TestSuites;
use testxml::Suite;

#[derive(StructOpt, Debug)]
#[structopt(about = "Merges the test.xml reports of a sharded test target into one report.")]
struct Opt {
    /// Silence all output
    #[structopt(short = "q", long)]
    quiet: bool,

    /// Verbose mode (-v, -vv, -vvv, -vvvv). The levels are warnings, informational, debugging, and trace message.
    #[structopt(short = "v", long, parse(from_occurrences))]
    verbose: usize,

    /// Timestamp (sec, ms, ns, none)
    #[structopt(short = "t", long = "timestamp")]
    ts: Option<stderrlog::Timestamp>,

    /// An optional target file to write the merged report to.
    #[structopt(short = "o", long, parse(from_os_str))]
    output: Option<PathBuf>,

    /// Leave out shards that cannot be read or parsed instead of failing.
    #[structopt(short = "k", long)]
    keep_going: bool,

    /// Shard reports, in shard order.
    #[structopt(parse(from_os_str))]
    shards: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let opt = Opt::from_args();

    stderrlog::new()
        .module(module_path!())
        .quiet(opt.quiet)
        .verbosity(opt.verbose)
        .timestamp(opt.ts.unwrap_or(stderrlog::Timestamp::Off))
        .init()?;

    if opt.shards.is_empty() {
        return Ok(());
    }

    // Shards are read concurrently but collected in argument order, which fixes the
    // order of the merged children.
    let handles: Vec<_> = opt
        .shards
        .iter()
        .cloned()
        .map(|path| tokio::spawn(read_shard(path)))
        .collect();

    let mut shards: Vec<Suite> = Vec::with_capacity(handles.len());
    for (path, handle) in opt.shards.iter().zip(handles) {
        match handle.await? {
            Ok(suite) => shards.push(suite),
            Err(err) if opt.keep_going => {
                warn!("Leaving out shard {}: {:#}", path.display(), err)
            }
            Err(err) => return Err(err),
        }
    }

    let shard_count = shards.len();
    let merged = testxml::merge_suites(shards);
    info!("{}", summarize(&merged, shard_count));

    let yaserde_cfg = yaserde::ser::Config {
        perform_indent: true,
        ..Default::default()
    };
    let output = testxml::ser::to_string_with_config(&TestSuites(&merged), &yaserde_cfg)?;

    let mut out_writer = match &opt.output {
        Some(path) => Box::new(
            fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?,
        ) as Box<dyn Write>,
        None => Box::new(std::io::stdout()) as Box<dyn Write>,
    };
    out_writer
        .write_all(output.as_bytes())
        .context("Failed to output merged report")?;
    out_writer.flush()?;

    Ok(())
}

async fn read_shard(path: PathBuf) -> Result<Suite> {
    let bytes = tokio::fs::read(&path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_shard(&path, &bytes)
}

fn parse_shard(path: &Path, bytes: &[u8]) -> Result<Suite> {
    let suite =
        testxml::parse(bytes).with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(suite)
}

/// One-line totals over the top-level suites of a merged report.
fn summarize(merged: &Suite, shard_count: usize) -> String {
    let (mut tests, mut failures, mut errors, mut skipped) = (0u64, 0u64, 0u64, 0u64);
    let mut time = 0.0;
    for suite in &merged.suites {
        tests += u64::from(suite.tests);
        failures += u64::from(suite.failures);
        errors += u64::from(suite.errors);
        skipped += u64::from(suite.skipped);
        time += suite.time;
    }
    format!(
        "Merged {shard_count} shard(s) into {} suite(s): {tests} tests, {failures} failures, {errors} errors, {skipped} skipped in {time:.3}s",
        merged.suites.len()
    )
}
