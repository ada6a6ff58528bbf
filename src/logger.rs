// src/logger.rs
// =============================================================================
// Logging setup.
//
// Log lines go to stderr (or a file with --log-file) so that stdout only
// carries the results table or JSON. Format:
//   [2026-10-18 14:03:11] [INFO] found 12 vhosts on apache (exe: /usr/sbin/httpd, pid: 812)
// RUST_LOG still overrides the level picked from the flags.
// =============================================================================

use anyhow::{Context, Result};
use chrono::Local;
use env_logger::{Builder, Target};
use log::{info, LevelFilter};
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub fn init(debug: bool, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if debug {
        LevelFilter::Debug
    } else if quiet {
        LevelFilter::Error
    } else {
        LevelFilter::Info
    };

    let mut builder = Builder::new();
    builder.filter_level(level);
    // Dependencies (hyper, rustls, html5ever) are noisy at debug level
    builder.filter_module("hyper", LevelFilter::Warn);
    builder.filter_module("rustls", LevelFilter::Warn);
    builder.filter_module("html5ever", LevelFilter::Warn);
    builder.parse_env("RUST_LOG");

    match log_file {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("unable to create log file {}", path.display()))?;
            builder.target(Target::Pipe(Box::new(file)));
        }
        None => {
            builder.target(Target::Stderr);
        }
    }

    builder.format(|buf, record| {
        writeln!(
            buf,
            "[{}] [{}] {}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.args()
        )
    });

    builder.try_init()?;

    if let Some(path) = log_file {
        info!("logging to file: {}", path.display());
    }
    Ok(())
}
