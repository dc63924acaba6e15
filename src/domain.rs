//! Domain models for the library catalog.
//!
//! This module contains the core domain types: books, the transaction
//! ledger, users and the catalog that owns them, plus configuration.

/// Books and partial book updates.
pub mod book;
pub use book::{Book, BookId, BookUpdate};

/// The catalog and its operations.
pub mod catalog;
pub use catalog::{
    Catalog, LoadSummary, SearchCriterion, SkippedRecord, UnknownCriterion, LOAN_DAYS,
};

mod config;
pub use config::{Config, ConfigError, ReadErrorPolicy};

pub mod record;
pub use record::{BookRecord, RecordError};

/// Borrow, return and renew records.
pub mod transaction;
pub use transaction::{
    ReportEntry, Transaction, TransactionId, TransactionKind, UnknownTransactionKind,
};

/// Users, roles and the authorization policy.
pub mod user;
pub use user::{InvalidUserId, Role, Task, UnknownRole, User, UserId};
