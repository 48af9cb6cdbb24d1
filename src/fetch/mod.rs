// src/fetch/mod.rs
// =============================================================================
// This module performs the HTTP requests: the page itself and every audio
// file listed on it.
//
// Submodules:
// - http: the Fetcher (one pooled reqwest client plus the error policy)
//
// Status codes are observability only: anything other than 200 is logged as
// an error, but the response still goes back to the caller. Only a transport
// failure (no response at all) is an error.
// =============================================================================

mod http;

pub use http::{Fetcher, OnError};
