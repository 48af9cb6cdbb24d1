// src/logging.rs
// =============================================================================
// Log setup.
//
// init() builds the tracing subscriber explicitly and hands back a LogHandle.
// main keeps the handle alive for the whole run; dropping it flushes the
// file writer. Nothing here runs at load time.
//
// Two layers:
// - console (stderr): INFO, or DEBUG with --debug
// - file: DEBUG, no colors, with thread id and file:line on every line
//
// The file layer writes through tracing-appender's non-blocking worker, so
// lines coming from many download workers at once are serialized by a
// single writer thread instead of interleaving.
// =============================================================================

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::warn;
use tracing_appender::non_blocking::{NonBlockingBuilder, WorkerGuard};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::error::SetupError;

const DEFAULT_FILTER: &str = "tunnel_downloader=debug,reqwest=warn,hyper=warn";

/// Keeps the file writer alive. Drop it last.
pub struct LogHandle {
    path: PathBuf,
    guard: Arc<Mutex<Option<WorkerGuard>>>,
}

/// Terminates the process after flushing the log file.
///
/// Handed to components that are allowed to end the whole run
/// (see `fetch::OnError::Exit`).
#[derive(Clone)]
pub struct ExitHook {
    guard: Arc<Mutex<Option<WorkerGuard>>>,
}

impl ExitHook {
    pub fn exit(&self, code: i32) -> ! {
        if let Ok(mut guard) = self.guard.lock() {
            // dropping the guard drains the non-blocking writer
            guard.take();
        }
        std::process::exit(code)
    }
}

impl std::fmt::Debug for ExitHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExitHook").finish_non_exhaustive()
    }
}

impl LogHandle {
    pub fn exit_hook(&self) -> ExitHook {
        ExitHook {
            guard: Arc::clone(&self.guard),
        }
    }

    /// Where the log file actually ended up.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub fn init(preferred: &Path, debug: bool) -> Result<LogHandle, SetupError> {
    let (file, path, fell_back) = open_log_file(preferred)?;

    let (file_writer, guard) = NonBlockingBuilder::default().lossy(false).finish(file);

    let console_level = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(io::stderr)
        .with_filter(console_level);

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(file_writer)
        .with_filter(LevelFilter::DEBUG);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    if fell_back {
        warn!(
            "cannot write log to {}, using {} instead",
            preferred.display(),
            path.display()
        );
    }

    Ok(LogHandle {
        path,
        guard: Arc::new(Mutex::new(Some(guard))),
    })
}

fn open_log_file(preferred: &Path) -> Result<(File, PathBuf, bool), SetupError> {
    open_log_file_with(preferred, try_open)
}

// Opens the preferred log file with `open`. A permission error switches to
// the temp directory; any other error is returned.
fn open_log_file_with<F>(preferred: &Path, open: F) -> Result<(File, PathBuf, bool), SetupError>
where
    F: Fn(&Path) -> io::Result<File>,
{
    match open(preferred) {
        Ok(file) => Ok((file, preferred.to_path_buf(), false)),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            let fallback = fallback_path(preferred);
            let file = open(&fallback).map_err(|source| SetupError::LogFile {
                path: fallback.clone(),
                source,
            })?;
            Ok((file, fallback, true))
        }
        Err(source) => Err(SetupError::LogFile {
            path: preferred.to_path_buf(),
            source,
        }),
    }
}

// Creates missing parent directories, then opens for appending
fn try_open(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Same file name, placed in the system temp directory.
pub fn fallback_path(preferred: &Path) -> PathBuf {
    let name = preferred
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "tunnel_downloader.log".into());
    std::env::temp_dir().join(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fallback_keeps_file_name() {
        let path = fallback_path(Path::new("/var/log/app/tunnel_downloader.log"));
        assert_eq!(path, std::env::temp_dir().join("tunnel_downloader.log"));
    }

    #[test]
    fn test_open_creates_missing_parents() {
        let dir = TempDir::new().unwrap();
        let preferred = dir.path().join("logs").join("nested").join("run.log");

        let (_file, path, fell_back) = open_log_file(&preferred).unwrap();

        assert_eq!(path, preferred);
        assert!(!fell_back);
        assert!(preferred.exists());
    }

    #[test]
    fn test_parent_that_is_a_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();

        let result = open_log_file(&blocker.join("run.log"));
        assert!(matches!(result, Err(SetupError::LogFile { .. })));
    }

    #[test]
    fn test_permission_denied_falls_back_to_temp_dir() {
        let dir = TempDir::new().unwrap();
        let name = format!("tunnel_downloader_fallback_{}.log", std::process::id());
        let preferred = dir.path().join("locked").join(&name);

        let (_file, path, fell_back) = open_log_file_with(&preferred, |p| {
            if p == preferred.as_path() {
                Err(io::Error::from(io::ErrorKind::PermissionDenied))
            } else {
                try_open(p)
            }
        })
        .unwrap();

        assert!(fell_back);
        assert_eq!(path, fallback_path(&preferred));
        assert!(path.exists());
        assert!(!preferred.exists());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_fallback_that_also_fails_names_the_fallback() {
        let preferred = Path::new("/locked/run.log");

        let result = open_log_file_with(preferred, |_| {
            Err(io::Error::from(io::ErrorKind::PermissionDenied))
        });

        match result {
            Err(SetupError::LogFile { path, .. }) => assert_eq!(path, fallback_path(preferred)),
            other => panic!("expected LogFile error, got {:?}", other.map(|(_, p, _)| p)),
        }
    }
}
