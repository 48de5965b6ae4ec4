//! Instrumented quote transport.
//!
//! The ingest-to-signal hot path: a calibrated cycle-counter timebase, a
//! per-producer push-latency tracker, and the bounded MPSC transport that
//! carries quotes from venue producer threads to the single detection
//! thread. Two transport variants share one interface — a lock-free ring
//! (default) and a mutex-guarded baseline selected by the
//! `mutex-transport` feature — so the two can be A/B compared under
//! identical load.

pub mod error;
pub mod queue;
pub mod ring;
pub mod timebase;
pub mod tracker;

pub use error::*;
pub use queue::*;
pub use ring::*;
pub use timebase::*;
pub use tracker::*;
