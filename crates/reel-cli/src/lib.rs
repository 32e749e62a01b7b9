//! Operator CLI for the StoryReel production tracker.
//!
//! Commands are thin callers of `reel-store` and `reel-scheduler`; this
//! crate only parses arguments, wires the file store and config together,
//! and prints results.

pub mod cli;
pub mod commands;
pub mod stories;
pub mod telemetry;

pub use cli::{Cli, Commands};
pub use commands::run;
