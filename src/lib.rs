//! Library catalog management
//!
//! Books, a ledger of borrow/return/renew transactions and the users who
//! perform them, held in memory by a [`Catalog`].

pub mod domain;
pub use domain::{
    Book, BookId, BookRecord, BookUpdate, Catalog, Config, LoadSummary, ReadErrorPolicy,
    RecordError, ReportEntry, Role, SearchCriterion, Task, Transaction, TransactionKind, User,
    UserId, LOAN_DAYS,
};

/// File-backed import, export and snapshots.
pub mod storage;
pub use storage::{ExportError, ImportError, RecordFile, Store, StoreError};

/// Shared access for multi-threaded hosts.
pub mod sync;
pub use sync::SharedCatalog;
