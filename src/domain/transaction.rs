use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{BookId, UserId};

/// Unique identifier of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(Uuid);

impl TransactionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of event a [`Transaction`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// A book left the shelf.
    Borrow,
    /// A book came back.
    Return,
    /// A loan was extended; the book stays borrowed.
    Renew,
}

impl TransactionKind {
    /// The lowercase name used in reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Borrow => "borrow",
            Self::Return => "return",
            Self::Renew => "renew",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown transaction kind.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown transaction kind '{0}' (expected borrow, return or renew)")]
pub struct UnknownTransactionKind(String);

impl FromStr for TransactionKind {
    type Err = UnknownTransactionKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "borrow" => Ok(Self::Borrow),
            "return" => Ok(Self::Return),
            "renew" => Ok(Self::Renew),
            _ => Err(UnknownTransactionKind(s.to_string())),
        }
    }
}

/// An immutable record of a borrow, return or renewal.
///
/// The referenced book and user may later be deleted; the transaction is a
/// historical fact and stays in the ledger regardless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    id: TransactionId,
    user_id: UserId,
    book_id: BookId,
    kind: TransactionKind,
    timestamp: DateTime<Utc>,
}

impl Transaction {
    pub(crate) fn new(user_id: UserId, book_id: BookId, kind: TransactionKind) -> Self {
        Self {
            id: TransactionId::new(),
            user_id,
            book_id,
            kind,
            timestamp: Utc::now(),
        }
    }

    /// The transaction's identifier.
    #[must_use]
    pub const fn id(&self) -> TransactionId {
        self.id
    }

    /// The user who performed the transaction.
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// The book the transaction refers to.
    #[must_use]
    pub const fn book_id(&self) -> BookId {
        self.book_id
    }

    /// What happened.
    #[must_use]
    pub const fn kind(&self) -> TransactionKind {
        self.kind
    }

    /// When it happened.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// A report line for this transaction.
    #[must_use]
    pub const fn report_entry(&self) -> ReportEntry {
        ReportEntry {
            kind: self.kind,
            timestamp: self.timestamp,
        }
    }
}

/// One line of the transaction report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    /// The kind of transaction.
    pub kind: TransactionKind,
    /// When the transaction was recorded.
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for ReportEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Transaction: {} | Date: {}",
            self.kind,
            self.timestamp.format("%Y-%m-%d %H:%M:%S")
        )
    }
}
