//! # asset-ledger
//!
//! Server, CLI and configuration around `ledger_core`.

pub mod api;
pub mod cli;
pub mod config;
