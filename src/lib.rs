//! Trackswitch - default audio track switching for video files
//!
//! This library crate exposes the command implementations for integration
//! testing; the binary in `main.rs` only parses arguments and wires stdout.

pub mod commands;
pub mod config;
pub mod message;
