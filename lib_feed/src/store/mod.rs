//! # Content Store Module
//!
//! Durable state: items, interests, shelves, per-user state, summaries, saved
//! threads and search results. The engine talks to the relational store only
//! through the [`ContentBackend`] contract; the [`ItemStore`] adds the
//! fingerprinting upsert protocol on top of it.

/// Repository contract and `StoreError`.
pub mod backend;
/// Canonical-JSON SHA-256 fingerprints.
pub mod fingerprint;
/// The idempotent, change-detecting upsert.
pub mod items;
/// Per-key async mutual exclusion.
pub mod keyed;
/// In-memory backend.
pub mod memory;
/// Durable record types.
pub mod models;
/// PostgreSQL backend.
#[cfg(feature = "connections")]
pub mod postgres;

pub use backend::{ContentBackend, StoreError};
pub use fingerprint::fingerprint;
pub use items::{ItemStore, Upserted};
pub use keyed::KeyedLocks;
pub use memory::MemoryContentStore;
pub use models::{
    Interest, Item, SavedThread, SearchRecord, ShelfEntry, StoredSummary, TargetKind, ThreadEntry,
    UserItemState,
};

#[cfg(feature = "connections")]
pub use postgres::PgContentStore;
