//! Persistence collaborators.
//!
//! Nothing in here is needed by the [`Catalog`](crate::Catalog) itself; these
//! types only read records into it and write its contents back out.

pub mod records;
pub use records::{import, ExportError, ImportError, RecordFile};

/// JSON snapshots of a whole catalog.
pub mod store;
pub use store::{Store, StoreError};
