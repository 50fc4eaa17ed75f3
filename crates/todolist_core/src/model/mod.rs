//! Domain model for the to-do list.
//!
//! # Invariants
//! - Every persisted task has non-null text.
//! - Task ids are assigned by storage and never negative.

pub mod task;
