// src/error.rs
// =============================================================================
// Typed errors for every stage of a run.
//
// The modules that do the real work (fetch, page, pool, logging, environment)
// return these enums. main.rs and app.rs wrap them in anyhow with context,
// so the final log line reads like "fetching page: request error: ...".
//
// Rust concepts:
// - thiserror: derives std::error::Error and Display from attributes
// - #[source] / #[from]: keeps the underlying cause in the error chain
// =============================================================================

use std::path::PathBuf;

use thiserror::Error;
use tracing::error;

/// Failures of a single HTTP request.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The reqwest client itself could not be built (bad TLS backend, etc.)
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("invalid URL '{url}'")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Network-level failure: timeout, refused connection, DNS, TLS handshake.
    /// The reqwest source already names the URL.
    #[error("request failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// Short label for the kind of transport failure, used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Client(_) => "client",
            FetchError::InvalidUrl { .. } => "invalid url",
            FetchError::Transport { source, .. } => {
                if source.is_timeout() {
                    "timeout"
                } else if source.is_connect() {
                    "connect"
                } else if source.is_redirect() {
                    "redirect"
                } else {
                    "transport"
                }
            }
        }
    }
}

/// The page did not match the item record schema.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid page URL '{url}'")]
    PageUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("item #{index} is missing a non-empty '{attribute}' attribute")]
    MissingAttribute { index: usize, attribute: &'static str },

    #[error("item '{title}' has an unusable source '{src}'")]
    InvalidSource { title: String, src: String },
}

/// Failures of one download task. These never abort the batch on their own.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The connection broke while the body was being streamed
    #[error("reading response body failed")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("writing {} failed", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Problems preparing the process before any download starts.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("cannot create output directory {}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} exists and is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("environment activation failed for {}", path.display())]
    Environment {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("cannot open log file {}", path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("logging already initialized")]
    LogInit(#[from] tracing_subscriber::util::TryInitError),
}

/// Writes one error line: "<message> error: <summary>".
///
/// With `debug` set, every cause in the source chain is appended on its own
/// line, which is as close to a traceback as a Rust error gets.
pub fn log_error(message: &str, err: &(dyn std::error::Error + 'static), debug: bool) {
    let rendered = render(err, debug);
    error!("{} error: {}", message, rendered);
}

/// Summary on one line, or the top message plus one "caused by" line per
/// cause when `debug` is set.
pub fn render(err: &(dyn std::error::Error + 'static), debug: bool) -> String {
    if debug {
        format!("{}\n{}", err, source_chain(err))
    } else {
        summary(err)
    }
}

/// The error and each of its causes once, joined with ": ".
pub fn summary(err: &(dyn std::error::Error + 'static)) -> String {
    causes(err).join(": ")
}

fn source_chain(err: &(dyn std::error::Error + 'static)) -> String {
    causes(err)
        .iter()
        .skip(1)
        .map(|cause| format!("  caused by: {}", cause))
        .collect::<Vec<_>>()
        .join("\n")
}

// reqwest and dotenvy already print their source inside their own message,
// so a cause whose text the previous message contains is dropped.
fn causes(err: &(dyn std::error::Error + 'static)) -> Vec<String> {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(cause) = current {
        let text = cause.to_string();
        if !parts.last().map_or(false, |prev| prev.contains(&text)) {
            parts.push(text);
        }
        current = cause.source();
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_chain_lists_causes() {
        let err = DownloadError::Io {
            path: PathBuf::from("out/a.mp3"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        };
        assert_eq!(source_chain(&err), "  caused by: disk full");
    }

    #[test]
    fn test_summary_names_each_cause_once() {
        let err = DownloadError::Io {
            path: PathBuf::from("out/a.mp3"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        };
        assert_eq!(summary(&err), "writing out/a.mp3 failed: disk full");
    }

    #[test]
    fn test_context_chain_does_not_repeat_cause() {
        let err = SetupError::Environment {
            path: PathBuf::from("/work/nope/.env"),
            source: dotenvy::Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "No such file or directory",
            )),
        };
        let err = anyhow::Error::new(err).context("activating environment");
        let rendered = summary(&*err);

        assert_eq!(rendered.matches("No such file or directory").count(), 1);
        assert!(rendered.starts_with(
            "activating environment: environment activation failed for /work/nope/.env"
        ));
    }

    #[test]
    fn test_debug_render_lists_causes_on_own_lines() {
        let err = DownloadError::Io {
            path: PathBuf::from("out/a.mp3"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        };
        assert_eq!(
            render(&err, true),
            "writing out/a.mp3 failed\n  caused by: disk full"
        );
    }

    #[test]
    fn test_missing_attribute_message() {
        let err = ParseError::MissingAttribute {
            index: 2,
            attribute: "src",
        };
        assert_eq!(
            err.to_string(),
            "item #2 is missing a non-empty 'src' attribute"
        );
    }

    #[test]
    fn test_io_error_names_path() {
        let err = DownloadError::Io {
            path: PathBuf::from("mp3/song.mp3"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().starts_with("writing mp3/song.mp3 failed"));
    }

    #[test]
    fn test_invalid_url_kind() {
        let source = url::Url::parse("not a url").unwrap_err();
        let err = FetchError::InvalidUrl {
            url: "not a url".to_string(),
            source,
        };
        assert_eq!(err.kind(), "invalid url");
    }
}
