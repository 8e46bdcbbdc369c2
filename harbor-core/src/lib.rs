#![deny(warnings)]
#![deny(rust_2018_idioms)]

//! Domain types, ports and errors shared by the HarborFlow vessel tracking
//! crates.

mod domain;
mod error;
mod ports;

pub use domain::*;
pub use error::*;
pub use ports::*;
