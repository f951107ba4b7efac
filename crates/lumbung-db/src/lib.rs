//! # Lumbung POS Database Layer & Engine
//!
//! SQLite persistence and the transactional stock/posting engine for
//! Lumbung POS.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           lumbung-db                                    │
//! │                                                                         │
//! │  ┌────────────┐   ┌─────────────────────────────────────────────┐      │
//! │  │  Database  │──►│  Repositories (reads, master data)          │      │
//! │  │  (pool.rs) │   │  product / stock / shift / transaction      │      │
//! │  └─────┬──────┘   └─────────────────────────────────────────────┘      │
//! │        │                                                                │
//! │        │          ┌─────────────────────────────────────────────┐      │
//! │        └─────────►│  Engine services (atomic units of work)     │      │
//! │                   │  InventoryService (ops.rs)                  │      │
//! │                   │  SalesService     (posting.rs)              │      │
//! │                   │  VoidEngine       (void.rs)                 │      │
//! │                   └───────────────┬─────────────────────────────┘      │
//! │                                   │                                    │
//! │                   ┌───────────────▼─────────────────────────────┐      │
//! │                   │  Shared internals                           │      │
//! │                   │  UnitGraphResolver (resolver.rs)            │      │
//! │                   │  StockLedger       (ledger.rs)              │      │
//! │                   └─────────────────────────────────────────────┘      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Services take a pooled connection, `BEGIN` one SQLite transaction, and
//! run the entire operation inside it: any error rolls back every write.
//! Repositories serve reads and never open transactions.

pub mod error;
pub mod ledger;
pub mod migrations;
pub mod ops;
pub mod page;
pub mod pool;
pub mod posting;
pub mod repository;
pub mod resolver;
pub mod void;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export main types for convenience
pub use error::{DbError, DbResult};
pub use page::{Page, PageMeta, PageRequest};
pub use pool::{Database, DbConfig};

// Re-export core so downstream crates don't need a separate dependency
pub use lumbung_core as core;
