//! # ML N-Puzzle
//!
//! Learns a cost-to-go heuristic for the sliding-tile puzzle by approximate
//! value iteration, using the Burn ML framework.
//!
//! ## Modules
//!
//! - [`puzzle`]: Board, moves, and the environment abstraction (scramble, successors, encoding)
//! - [`ai`]: Cost network, labeling rule, state encoding, target synchronization
//! - [`training`]: Parallel data generation, batch loader, learner, epoch loop, metrics
//! - [`checkpoint`]: Periodic model persistence
//! - [`config`]: TOML configuration loading and validation
//! - [`error`]: Structured error types

#![recursion_limit = "256"]

pub mod ai;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod puzzle;
pub mod training;

#[cfg(test)]
pub mod testing;
