//! Domain models for MyBank.
//!
//! These are the core types shared across all crates.

pub mod account;
pub mod session;
pub mod user;
