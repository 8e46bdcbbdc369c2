#![deny(warnings)]
#![deny(rust_2018_idioms)]

//! Implements a binary that continuously consumes a line-delimited position
//! feed and applies it to the in-memory tracking core, fanning change events
//! out to subscribers.

pub mod consumer;
pub mod error;
pub mod feed;
pub mod models;
pub mod settings;
pub mod startup;
