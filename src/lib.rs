//! hopbox - relaunch a command-line agent inside a sandbox before it does any work
//!
//! This crate provides:
//! - Sandbox backend resolution (docker, podman, macOS sandbox-exec)
//! - Container image probing and one-shot pulls
//! - Bundled Seatbelt profiles rendered to a temp file per launch
//! - Process replacement (`execve`) into the chosen sandbox
//! - Settings file and CLI glue

pub mod cli;
pub mod config;
pub mod paths;
pub mod sandbox;

pub use config::Config;
