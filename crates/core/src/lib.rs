//! Core data types for the cross-venue quote scanner.

pub mod opportunity;
pub mod quote;
pub mod symbol;
pub mod venue;
pub mod world;

pub use opportunity::*;
pub use quote::*;
pub use symbol::*;
pub use venue::*;
pub use world::*;
