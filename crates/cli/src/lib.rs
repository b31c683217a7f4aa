//! wgprov CLI
//!
//! Command-line interface for issuing WireGuard client configurations
//! and inspecting the client registry.

pub mod commands;
pub mod config;
pub mod output;
pub mod prompt;
