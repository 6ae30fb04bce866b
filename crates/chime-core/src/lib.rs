//! # chime-core
//!
//! Core types and error handling for the chime streaming audio demultiplexer.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
