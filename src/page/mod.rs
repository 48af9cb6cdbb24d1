// src/page/mod.rs
// =============================================================================
// This module turns the listing page into item records.
//
// Submodules:
// - parse: finds the <audio> item elements and validates their attributes
//
// The rest of the program only sees ItemDescriptor values; how they were
// found in the markup stays in here.
// =============================================================================

mod parse;

pub use parse::{parse_items, ItemDescriptor};
