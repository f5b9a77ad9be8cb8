//! Core types, trait contracts, and the resolution engine for reroute.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod cache;
pub mod engine;
pub mod error;
pub mod failure;
pub mod index;
pub mod redirect;
pub mod store;
pub mod suggest;

pub use error::{Error, Result};
