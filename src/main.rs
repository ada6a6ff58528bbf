// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap, set up logging
// 2. Collect targets: discovered vhosts, or the manual --domains list
// 3. Filter them, then either print them (urls) or crawl them (scan)
// 4. Print the results and exit with a code:
//    0 = every target answered, 1 = some targets failed, 2 = error
// =============================================================================

mod cli;
mod config;
mod crawl;
mod discovery;
mod logger;
mod target;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Commands, ScanArgs, TargetArgs};
use config::CrawlConfig;
use crawl::{Crawler, FetchOutcome, ResultSet};
use discovery::{DiscoveryError, ProcFs};
use log::{error, info, warn};
use target::{DomainFilter, DomainTarget};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logger::init(cli.debug, cli.quiet, cli.log_file.as_deref()) {
        eprintln!("Error: {:#}", e);
        std::process::exit(2);
    }

    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Urls(args) => handle_urls(&args),
        Commands::Scan(args) => handle_scan(args),
    }
}

// Handles the 'urls' subcommand: print what 'scan' would crawl
fn handle_urls(args: &TargetArgs) -> Result<i32> {
    let targets = collect_targets(args)?;

    for target in &targets {
        let ip = target.override_ip().map(|ip| ip.to_string()).unwrap_or_default();
        println!("{:<40} {}", target.url(), ip);
    }

    Ok(0)
}

// Handles the 'scan' subcommand
fn handle_scan(args: ScanArgs) -> Result<i32> {
    let targets = collect_targets(&args.targets)?;

    let config = CrawlConfig {
        threads: config::resolve_threads(args.threads, num_cpus::get()),
        timeout: args.timeout,
        recursive: args.recursive,
        follow_remote: !args.ignore_remote,
        allowed_remote_hosts: args.allow_remote_host,
        delay: args.delay,
        ..CrawlConfig::default()
    };
    info!("using {} threads (max {})", config.threads, num_cpus::get());

    // The crawl is the only concurrent stage; discovery above ran before
    // the runtime existed
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.threads)
        .thread_name("vhost-probe-worker")
        .enable_all()
        .build()
        .context("unable to start the async runtime")?;

    if !args.json {
        println!("🌐 Starting scan on {} domain(s)...\n", targets.len());
    }

    let crawler = Crawler::new(config);
    let results = runtime.block_on(crawler.crawl(targets));

    print_results(&results, args.json)?;

    if results.failures() > 0 {
        Ok(1)
    } else {
        Ok(0)
    }
}

// Manual list if given, discovery otherwise; both go through the filter
fn collect_targets(args: &TargetArgs) -> Result<Vec<DomainTarget>> {
    let filter = DomainFilter::new(args.ignore_http, args.ignore_https, &args.domain_ignore, &args.domain_match)
        .context("invalid domain glob")?;

    let targets = match &args.domains {
        Some(list) => {
            info!("manually supplied url list");
            target::parse_manual_list(list).context("unable to parse --domains")?
        }
        None => discover_targets()?,
    };

    let targets = filter.apply(targets);
    if targets.is_empty() {
        bail!("no domains found to scan");
    }

    Ok(targets)
}

fn discover_targets() -> Result<Vec<DomainTarget>> {
    info!("checking for running webservers");
    let procfs = ProcFs::default();

    let webservers =
        discovery::find_webservers(&procfs).map_err(|e| discovery_error("unable to find running webservers", e))?;
    if let Some(main) = webservers.iter().find(|ws| ws.is_main) {
        info!(
            "main webserver: {} (exe: {}, pid: {}, user: {})",
            main.kind,
            main.process.exe.display(),
            main.process.pid,
            main.process.user
        );
    }

    let entries =
        discovery::find_vhosts(&webservers).map_err(|e| discovery_error("unable to fetch domains from the webserver", e))?;

    let mut targets = Vec::with_capacity(entries.len());
    for entry in &entries {
        match DomainTarget::from_vhost(entry) {
            Ok(target) => targets.push(target),
            Err(e) => warn!("skipping vhost {}: {}", entry.url, e),
        }
    }

    Ok(targets)
}

fn discovery_error(stage: &str, err: DiscoveryError) -> anyhow::Error {
    let hint = if err.is_fatal() { " (use --domains to list targets manually)" } else { "" };
    anyhow::Error::new(err).context(format!("{}{}", stage, hint))
}

// Prints the results either as a table or JSON
fn print_results(results: &ResultSet, json: bool) -> Result<()> {
    if json {
        let json_output = serde_json::to_string_pretty(results)?;
        println!("{}", json_output);
    } else {
        print_table(results);
    }
    Ok(())
}

// Prints results as a human-readable table in the terminal
fn print_table(results: &ResultSet) {
    println!(
        "{:<12} {:<6} {:<15} {:<10} {:>8}  {}",
        "RESULT", "CODE", "IP", "RESOURCES", "TIME", "URL"
    );
    println!("{}", "=".repeat(100));

    for outcome in results {
        println!("{}", format_outcome(outcome));
    }

    println!();

    let failed = results.failures();
    println!("📊 Summary:");
    println!("   ✅ OK: {}", results.len() - failed);
    println!("   ❌ Failed: {}", failed);
    println!("   📋 Total: {}", results.len());
}

fn format_outcome(outcome: &FetchOutcome) -> String {
    let target = outcome.target();
    let ip = target.override_ip().map(|ip| ip.to_string()).unwrap_or_else(|| "-".to_string());
    let time = format!("{}ms", outcome.elapsed().as_millis());

    match (outcome.response(), outcome.error()) {
        (Some(response), _) => {
            let mut url = target.url().to_string();
            if response.final_url != *target.url() {
                url = format!("{} (result: {})", url, response.final_url);
            }
            format!(
                "{:<12} {:<6} {:<15} {:<10} {:>8}  {}",
                "✅ SUCCESS",
                response.status,
                ip,
                outcome.resources().len(),
                time,
                url
            )
        }
        (None, Some(err)) => format!(
            "{:<12} {:<6} {:<15} {:<10} {:>8}  {} ({})",
            "❌ FAILURE", "---", ip, 0, time, target.url(), err
        ),
        (None, None) => format!("{:<12} {}", "⚠️  UNKNOWN", target.url()),
    }
}
