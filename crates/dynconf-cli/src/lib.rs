//! Operator CLI for the dynconf configuration cache.
//!
//! The binary lives in `main.rs`; this library exposes the pieces it is built
//! from so they can be tested without a database.

pub mod cli;
pub mod commands;
pub mod config;
pub mod observability;
pub mod output;
