//! Redraft Store
//!
//! The persistence boundary of the engine.
//!
//! # Architecture
//!
//! ```text
//! domain type ──Record──▶ Collection<R> ──JSON──▶ dyn DocumentStore ──▶ MemoryStore / remote
//!                              ▲ validate on write and read
//! ```
//!
//! Time-dependent behavior reads [`Clock`] instead of the wall clock.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod clock;
pub mod error;
pub mod memory;
pub mod record;
pub mod store;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use record::{Collection, Record};
pub use store::{Direction, DocumentStore, Filter, Query, StoredRecord};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
