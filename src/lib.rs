#![deny(missing_docs)]
//! Reel relay library.
//!
//! Resolves Instagram post links to direct video URLs through a lookup service,
//! downloads the video within a size budget and hands it to the Telegram bot.

/// Telegram transport: handlers, resilient replies and dispatcher.
pub mod bot;
/// Configuration management.
pub mod config;
/// Link → lookup → media URL → download pipeline.
pub mod relay;
/// Utility functions.
pub mod utils;
