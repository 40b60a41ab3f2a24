//! Core types, traits and store-agnostic algorithms for the chatd presence
//! service.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! reconciliation and session-tracking algorithms are written against the
//! [`store::StoreTx`] primitives so that every backend runs the same logic
//! inside its own transaction.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod event;
pub mod presence;
pub mod reconcile;
pub mod room;
pub mod snapshot;
pub mod store;
pub mod tenant;
pub mod user;

pub use error::{Error, Result};
