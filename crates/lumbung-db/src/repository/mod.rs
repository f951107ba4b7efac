//! # Repository Layer
//!
//! Data access for reads and master-data writes.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Repository Responsibilities                         │
//! │                                                                         │
//! │  Repositories (this module)          Engine services (ops/posting/void)│
//! │  ──────────────────────────          ──────────────────────────────────│
//! │  • Single-entity reads               • Multi-step atomic mutations     │
//! │  • Paginated listings                • Own the BEGIN/COMMIT            │
//! │  • Master-data writes                • Use the pub(crate) fetch        │
//! │    (products, variants, shifts)        helpers below inside their     │
//! │  • No explicit transactions            transaction                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every query takes `tenant_id` as a mandatory parameter and filters on it;
//! a row belonging to another tenant is indistinguishable from a missing row.

pub mod product;
pub mod shift;
pub mod stock;
pub mod transaction;

pub use product::ProductRepository;
pub use shift::ShiftRepository;
pub use stock::StockRepository;
pub use transaction::TransactionRepository;
