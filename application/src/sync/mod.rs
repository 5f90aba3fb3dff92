//! Synchronization primitives for concurrent agent execution.

pub mod barrier;
