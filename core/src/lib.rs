//! Food import shock risk engine.
//!
//! Turns production/trade/consumption tables into shock-adjusted shortfalls,
//! merges them with upstream risk scores, and serves ranked, filtered views.

pub mod cache;
pub mod config;
pub mod country;
pub mod engine;
pub mod error;
pub mod output;
pub mod query;
pub mod ranking;
pub mod records;
pub mod region;
pub mod response;
pub mod shock;
pub mod snapshot;
pub mod store;
pub mod table;
pub mod types;
