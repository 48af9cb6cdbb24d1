// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API which lets us define the CLI structure using
// Rust structs and attributes (the #[...] things). The parsed Cli is turned
// into a Settings value (src/config.rs) so the rest of the program never
// deals with flags directly.
//
// Rust concepts:
// - Structs: Custom data types that group related data
// - Derive macros: Automatically generate code for our types
// - From trait: Converting one type into another
// =============================================================================

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::{
    self, FailurePolicy, FetchOptions, Settings, DEFAULT_LOG_FILE, DEFAULT_OUTPUT_DIR,
    DEFAULT_PACKAGES,
};

// This struct represents our entire CLI application
//
// #[derive(Parser)] tells clap to automatically generate parsing code.
// A missing --url is a usage error: clap prints help and exits with code 2
// before any of our own code runs.
#[derive(Parser, Debug)]
#[command(
    name = "tunnel-downloader",
    version,
    about = "Download every audio item listed on a web page",
    long_about = "tunnel-downloader fetches a page, reads the <audio> item records embedded in it, \
                  and downloads each item's file into an output directory using a fixed pool of \
                  concurrent workers."
)]
pub struct Cli {
    /// Page URL listing the audio items
    #[arg(short, long)]
    pub url: String,

    /// Directory the <title>.mp3 files are written to (created if missing)
    #[arg(short = 'd', long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Number of concurrent download workers (default: number of CPUs)
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    pub workers: Option<u64>,

    /// Environment directory to activate before downloading
    ///
    /// Relative paths are resolved against the current directory.
    #[arg(short, long)]
    pub environment: Option<PathBuf>,

    /// File inside the environment directory holding KEY=VALUE pairs
    #[arg(short, long, default_value = DEFAULT_PACKAGES)]
    pub packages: PathBuf,

    /// Accept invalid TLS certificates (self-signed, expired, wrong host)
    #[arg(long)]
    pub insecure: bool,

    /// Stop starting new downloads after the first failure
    #[arg(long)]
    pub fail_fast: bool,

    /// Per-request timeout in seconds (default: no timeout)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Log file location; falls back to the temp directory on permission errors
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// Verbose console output and full error chains in the log
    #[arg(long)]
    pub debug: bool,

    /// Print the batch report as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

impl From<Cli> for Settings {
    fn from(cli: Cli) -> Self {
        let workers = cli
            .workers
            .map(|w| w as usize)
            .unwrap_or_else(config::default_workers);

        Settings {
            url: cli.url,
            output_dir: cli.output_dir,
            workers,
            environment: cli.environment,
            packages: cli.packages,
            failure_policy: if cli.fail_fast {
                FailurePolicy::Abort
            } else {
                FailurePolicy::Continue
            },
            fetch: FetchOptions {
                accept_invalid_certs: cli.insecure,
                timeout: cli.timeout.map(Duration::from_secs),
                user_agent: Some(config::default_user_agent()),
            },
            log_file: cli.log_file,
            debug: cli.debug,
            json: cli.json,
        }
    }
}
