//! Repository implementations module.
//!
//! This module contains the implementations of the `HistoryRepository` trait:
//! - `memory`: In-memory implementation for tests and ephemeral deployments
//! - `jsonl`: Append-only JSON-lines file, one sample per line
pub mod jsonl;
pub mod memory;

pub use jsonl::JsonLinesRepository;
pub use memory::InMemoryRepository;
