// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Two subcommands share the same target selection flags:
// - scan: find (or take) the targets and crawl them
// - urls: only print the targets that `scan` would crawl
//
// The parsed flags are turned into CrawlConfig / DomainFilter values once,
// in main.rs; nothing reads them after that.
// =============================================================================

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "vhost-probe",
    version,
    about = "Discovers a host's webserver vhosts and crawls every one of them",
    long_about = "vhost-probe finds the webservers running on this host, asks them which domains \
                  they serve, and fetches every one of those domains (optionally through a fixed IP) \
                  to check that they still answer. Handy right after a webserver config change."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Print debugging information
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "debug")]
    pub quiet: bool,

    /// Write log output to this file instead of stderr
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Discover (or take) the targets and crawl them
    ///
    /// Example: vhost-probe scan --recursive --ignore-remote
    Scan(ScanArgs),

    /// Print the targets that would be scanned, without scanning
    ///
    /// Example: vhost-probe urls --domain-match '*.example.com'
    Urls(TargetArgs),
}

/// Which domains to look at
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Skip discovery and use this list: DOMAIN[:IP[:PORT]] or URL[:IP[:PORT]], space separated
    #[arg(long, value_name = "LIST")]
    pub domains: Option<String>,

    /// Ignore http:// targets
    #[arg(long)]
    pub ignore_http: bool,

    /// Ignore https:// targets
    #[arg(long)]
    pub ignore_https: bool,

    /// Ignore targets matching GLOB (pipe separated list)
    #[arg(long, value_name = "GLOB", default_value = "")]
    pub domain_ignore: String,

    /// Only keep targets matching GLOB (pipe separated list)
    #[arg(long, value_name = "GLOB", default_value = "")]
    pub domain_match: String,
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    #[command(flatten)]
    pub targets: TargetArgs,

    /// Number of targets fetched at once (0 = half the cores)
    #[arg(long, default_value_t = 0)]
    pub threads: usize,

    /// Wait this long before each target is fetched (e.g. 100ms, 5s, 1m)
    #[arg(long, value_parser = parse_duration, default_value = "0s")]
    pub delay: Duration,

    /// Per-request timeout
    #[arg(long, value_parser = parse_duration, default_value = "10s")]
    pub timeout: Duration,

    /// Also fetch the assets (css/js/images) of each page
    #[arg(short, long)]
    pub recursive: bool,

    /// Don't fetch assets hosted on other domains (use with --recursive)
    #[arg(long)]
    pub ignore_remote: bool,

    /// Fetch assets from this remote host even with --ignore-remote (repeatable)
    #[arg(long, value_name = "HOST")]
    pub allow_remote_host: Vec<String>,

    /// Output results in JSON format instead of a table
    #[arg(long)]
    pub json: bool,
}

// "250ms" / "5s" / "2m"; a bare number is seconds
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    let (number, unit) = match input.find(|c: char| !c.is_ascii_digit()) {
        Some(index) => input.split_at(index),
        None => (input, "s"),
    };

    let value: u64 = number
        .parse()
        .map_err(|_| format!("invalid duration {:?} (expected e.g. 250ms, 5s, 1m)", input))?;

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => value
            .checked_mul(60)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("duration {:?} is too large", input)),
        _ => Err(format!("invalid duration unit {:?} in {:?} (use ms, s or m)", unit, input)),
    }
}
