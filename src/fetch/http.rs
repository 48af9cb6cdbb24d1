// src/fetch/http.rs
// =============================================================================
// The Fetcher issues requests and decides what a failure means.
//
// Key functionality:
// - Builds a single reqwest Client (connection pooling) shared by all workers
// - Leaves response bodies unread, so callers can stream large files
// - Logs non-200 responses without turning them into errors
// - OnError::Exit ends the whole process on a transport failure
//
// Rust concepts:
// - async/await: For network I/O
// - Clone: reqwest::Client is an Arc inside, cloning it is cheap
// - The never type (!): a function that does not return
// =============================================================================

use reqwest::{Client, Method, Response, StatusCode};
use tracing::{debug, error};
use url::Url;

use crate::config::FetchOptions;
use crate::error::{log_error, FetchError};
use crate::logging::ExitHook;

/// Longest body echoed into the log for a failed buffered request.
const MAX_LOGGED_BODY: usize = 80;

/// What a transport failure does to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnError {
    /// Log it and hand the error back
    Return,
    /// Log it, log "Error termination", and exit the process with code 1
    Exit,
}

#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    debug: bool,
    exit_hook: Option<ExitHook>,
}

impl Fetcher {
    pub fn new(options: &FetchOptions) -> Result<Self, FetchError> {
        let mut builder = Client::builder().danger_accept_invalid_certs(options.accept_invalid_certs);

        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(agent) = &options.user_agent {
            builder = builder.user_agent(agent.clone());
        }

        let client = builder.build().map_err(FetchError::Client)?;

        Ok(Self {
            client,
            debug: false,
            exit_hook: None,
        })
    }

    /// Log full error chains instead of one-line summaries.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Used by OnError::Exit so the log file is flushed before exiting.
    pub fn with_exit_hook(mut self, hook: ExitHook) -> Self {
        self.exit_hook = Some(hook);
        self
    }

    // Sends a request and returns the response with its body untouched.
    //
    // The body is consumed by the caller, typically chunk by chunk with
    // bytes_stream(). A non-200 status is logged here and nothing more.
    pub async fn fetch(
        &self,
        method: Method,
        url: &str,
        on_error: OnError,
    ) -> Result<Response, FetchError> {
        let response = self.send(method, url, on_error).await?;

        let status = response.status();
        if status != StatusCode::OK {
            error!(
                "request error: HTTP {} ({}) from {}",
                status.as_u16(),
                reason(status),
                url
            );
        }

        Ok(response)
    }

    // GETs a URL and reads the whole body as text. Used for the page, which
    // is small enough to buffer. A non-200 body is echoed into the log when
    // it is short.
    pub async fn fetch_text(&self, url: &str, on_error: OnError) -> Result<String, FetchError> {
        let response = self.send(Method::GET, url, on_error).await?;
        let status = response.status();

        let text = match response.text().await {
            Ok(text) => text,
            Err(source) => {
                let err = FetchError::Transport {
                    url: url.to_string(),
                    source,
                };
                return Err(self.fail(err, on_error));
            }
        };

        if status != StatusCode::OK {
            error!("request error: {} ({})", body_for_log(&text), reason(status));
        }

        Ok(text)
    }

    async fn send(&self, method: Method, url: &str, on_error: OnError) -> Result<Response, FetchError> {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(source) => {
                let err = FetchError::InvalidUrl {
                    url: url.to_string(),
                    source,
                };
                return Err(self.fail(err, on_error));
            }
        };

        debug!("{} {}", method, url);

        match self.client.request(method, parsed).send().await {
            Ok(response) => Ok(response),
            Err(source) => {
                let err = FetchError::Transport {
                    url: url.to_string(),
                    source,
                };
                Err(self.fail(err, on_error))
            }
        }
    }

    fn fail(&self, err: FetchError, on_error: OnError) -> FetchError {
        log_error(&format!("request ({})", err.kind()), &err, self.debug);

        if on_error == OnError::Exit {
            error!("Error termination");
            match &self.exit_hook {
                Some(hook) => hook.exit(1),
                None => std::process::exit(1),
            }
        }

        err
    }
}

fn reason(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("unknown")
}

fn body_for_log(text: &str) -> &str {
    if text.chars().count() <= MAX_LOGGED_BODY {
        text
    } else {
        "long response"
    }
}
