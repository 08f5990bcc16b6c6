//! # dswarm memorydb
//!
//! In-process triple store keyed by `(resource, configuration)`, used in place
//! of an external graph database for tests and single-process runs.
//!
//! ```rust,ignore
//! use dswarm_memorydb::{MemoryDb, MemoryDbSink};
//!
//! let db = Arc::new(MemoryDb::new());
//! let sink = MemoryDbSink::new(Arc::clone(&db), "resource", "configuration");
//! runner = TaskRunner::new(Arc::new(sink), publisher);
//! ```
//!
//! Nothing here is durable. Finer-grained (per-key) locking would be a
//! possible optimization, not a correctness requirement.

pub mod db;
pub mod sink;

pub use db::{MemoryDb, Row, StoreKey, Table};
pub use sink::MemoryDbSink;
