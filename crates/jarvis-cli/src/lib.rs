//! # jarvis-cli
//!
//! The `jarvis` binary: runs the voice bridge server and exposes a couple of
//! helper commands for picking a synthesis voice and a live model.

pub mod commands;
pub mod handlers;
pub mod logging;
pub mod parser;

pub use commands::Commands;
pub use parser::Cli;
