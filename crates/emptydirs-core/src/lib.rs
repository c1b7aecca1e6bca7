//! Core library for `emptydirs` — find and remove empty directories in large
//! trees without holding the tree in memory.
//!
//! A [`traverse::Traverser`] yields empty directories bottom-up, a
//! [`coordinator::BatchCoordinator`] groups them into batches, and an
//! [`action::Executor`] lists, counts, or trashes each one.

pub mod action;
pub mod classify;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod progress;
pub mod trash;
pub mod traverse;
