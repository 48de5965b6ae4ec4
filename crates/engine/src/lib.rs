//! Arbitrage detection engine.
//!
//! Owns the shared quote transport and the world view, runs the periodic
//! detection pass on a dedicated thread, and publishes opportunity
//! snapshots for passive readers.

pub mod detector;
pub mod engine;

pub use detector::*;
pub use engine::*;
