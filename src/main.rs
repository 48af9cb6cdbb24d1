// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap (a missing --url exits with 2)
// 2. Set up the log file and, if asked for, activate the environment
// 3. Fetch the page, parse the items and download them (src/app.rs)
// 4. Print the batch report as a table or JSON
// 5. Exit with proper code (0 = everything downloaded, 1 = anything failed)
//
// Rust concepts used:
// - async/await: the downloads run concurrently on the tokio runtime
// - Result<T, E>: For error handling (T = success type, E = error type)
// - Drop: the log handle flushes the log file when run() returns
// =============================================================================

// Module declarations - tells Rust about our other source files
mod app;           // src/app.rs - page → items → pool
mod cli;           // src/cli.rs - command-line parsing
mod config;        // src/config.rs - resolved settings
mod environment;   // src/environment.rs - environment activation
mod error;         // src/error.rs - typed errors
mod fetch;         // src/fetch/ - HTTP requests
mod logging;       // src/logging.rs - console + file logs
mod page;          // src/page/ - item records from the page
mod pool;          // src/pool/ - concurrent downloads

#[cfg(test)]
mod test_support;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use cli::Cli;
use config::Settings;
use fetch::Fetcher;
use logging::LogHandle;
use pool::{BatchReport, TaskOutcome};

#[tokio::main]
async fn main() {
    // Parsing happens before anything else, so usage errors never touch
    // the log file or the network
    let settings = Settings::from(Cli::parse());

    let exit_code = run(settings).await;

    std::process::exit(exit_code);
}

// Returns the process exit code. The log handle lives inside this function,
// so it is dropped (and the file flushed) before main calls exit().
async fn run(settings: Settings) -> i32 {
    let log = match logging::init(&settings.log_file, settings.debug) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    info!("logging to {}", log.path().display());

    match execute(&settings, &log).await {
        Ok(report) => {
            if let Err(e) = print_report(&report, settings.json) {
                error!("printing report error: {}", e);
                return 1;
            }
            exit_code(&report)
        }
        Err(e) => {
            // anyhow's own {:#} would print causes that reqwest and dotenvy
            // already embed in their messages
            error!("{}", error::render(&*e, settings.debug));
            1
        }
    }
}

// 0 only when every item was stored; an empty page counts as success
fn exit_code(report: &BatchReport) -> i32 {
    if report.is_success() {
        0
    } else {
        1
    }
}

async fn execute(settings: &Settings, log: &LogHandle) -> Result<BatchReport> {
    if let Some(env_dir) = &settings.environment {
        environment::activate(env_dir, &settings.packages)
            .context("activating environment")?;
    }

    if settings.fetch.accept_invalid_certs {
        warn!("TLS certificate verification is disabled (--insecure)");
    }

    let fetcher = Fetcher::new(&settings.fetch)
        .context("creating HTTP client")?
        .with_debug(settings.debug)
        .with_exit_hook(log.exit_hook());

    app::download_page(settings, fetcher).await
}

// Prints the report either as a table or JSON
fn print_report(report: &BatchReport, json: bool) -> Result<()> {
    if json {
        let json_output = serde_json::to_string_pretty(report)?;
        println!("{}", json_output);
    } else {
        print_table(report);
    }
    Ok(())
}

// Prints the report as a human-readable table in the terminal
fn print_table(report: &BatchReport) {
    println!("{:<40} {:<12} {:<50}", "TITLE", "RESULT", "DETAIL");
    println!("{}", "=".repeat(102));

    for task in &report.tasks {
        let (result, detail) = match &task.outcome {
            TaskOutcome::Completed { path, bytes, status } => (
                "OK",
                format!("{} ({} bytes, HTTP {})", path.display(), bytes, status),
            ),
            TaskOutcome::Failed { error } => ("FAILED", error.clone()),
            TaskOutcome::Skipped => ("SKIPPED", "not started after an earlier failure".to_string()),
        };

        // Truncate long titles so the columns stay aligned
        let title = if task.title.chars().count() > 37 {
            format!("{}...", task.title.chars().take(37).collect::<String>())
        } else {
            task.title.clone()
        };

        println!("{:<40} {:<12} {:<50}", title, result, detail);
    }

    println!();
    println!("Summary:");
    println!("   Downloaded: {}", report.completed());
    println!("   Failed: {}", report.failed());
    println!("   Skipped: {}", report.skipped());
    println!("   Total: {}", report.tasks.len());
}
