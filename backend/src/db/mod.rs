//! History storage.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Orchestrator / HTTP layer                              │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  HistoryStore (history_store.rs)                        │
//! │  - per-section locked series, retention-bounded         │
//! │  - similar-time queries, resampling                     │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │ write-through / hydrate
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  HistoryRepository trait (repository.rs)                │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!     ┌───────────────┴──────────────┐
//!     │  InMemory  │  JSON-lines file │
//!     └──────────────────────────────┘
//! ```

pub mod factory;
pub mod history_store;
pub mod repositories;
pub mod repository;

pub use factory::{RepositoryFactory, RepositoryType};
pub use history_store::{HistoryStore, ResampledWindow, RetentionPolicy};
pub use repositories::{InMemoryRepository, JsonLinesRepository};
pub use repository::HistoryRepository;
