//! A JSON snapshot of a whole catalog.
//!
//! The [`Store`] keeps books (with their ids), the transaction ledger and
//! the users in a single file so that a command-line session can pick up
//! where the previous one left off. It is a convenience for the front end,
//! not a durable log: the file is rewritten in full on every save.

use std::{
    collections::BTreeSet,
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::{Book, BookId, Catalog, Transaction, User, UserId};

/// Errors that can occur when loading or saving a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The snapshot file could not be read or written.
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        /// The snapshot path.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },
    /// The snapshot file is not valid.
    #[error("failed to parse {}: {source}", .path.display())]
    Json {
        /// The snapshot path.
        path: PathBuf,
        /// The underlying parse error.
        source: serde_json::Error,
    },
    /// Two books in the snapshot share an id.
    #[error("{} lists book {id} more than once", .path.display())]
    DuplicateBook {
        /// The snapshot path.
        path: PathBuf,
        /// The repeated id.
        id: BookId,
    },
    /// Two users in the snapshot share an id.
    #[error("{} lists user {id} more than once", .path.display())]
    DuplicateUser {
        /// The snapshot path.
        path: PathBuf,
        /// The repeated id.
        id: UserId,
    },
}

/// A snapshot file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    /// Refers to the snapshot at `path`. Nothing is opened yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The location of the snapshot.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` if a snapshot has been saved at this location.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Loads the catalog. A missing snapshot is an empty catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if it lists the same book or user id twice.
    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> Result<Catalog, StoreError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("no snapshot yet, starting with an empty catalog");
                return Ok(Catalog::new());
            }
            Err(source) => return Err(self.io_error(source)),
        };

        let snapshot: Snapshot =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| StoreError::Json {
                path: self.path.clone(),
                source,
            })?;

        let Snapshot {
            books,
            transactions,
            users,
        } = snapshot;
        if let Some(id) = first_duplicate(books.iter().map(Book::id)) {
            return Err(StoreError::DuplicateBook {
                path: self.path.clone(),
                id,
            });
        }
        if let Some(id) = first_duplicate(users.iter().map(User::id)) {
            return Err(StoreError::DuplicateUser {
                path: self.path.clone(),
                id: id.clone(),
            });
        }
        debug!(
            books = books.len(),
            transactions = transactions.len(),
            users = users.len(),
            "loaded snapshot"
        );
        Ok(Catalog::from_parts(books, transactions, users))
    }

    /// Writes the whole catalog to the snapshot file.
    ///
    /// Parent directories are created automatically if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written to.
    #[instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    pub fn save(&self, catalog: &Catalog) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let snapshot = SnapshotRef {
            books: catalog.books().collect(),
            transactions: catalog.transactions(),
            users: catalog.users(),
        };

        let file = File::create(&self.path).map_err(|e| self.io_error(e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &Versions::V1(snapshot)).map_err(|source| {
            StoreError::Json {
                path: self.path.clone(),
                source,
            }
        })?;
        writer.flush().map_err(|e| self.io_error(e))?;
        debug!("saved snapshot");
        Ok(())
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

fn first_duplicate<T: Ord + Copy>(ids: impl IntoIterator<Item = T>) -> Option<T> {
    let mut seen = BTreeSet::new();
    ids.into_iter().find(|id| !seen.insert(*id))
}

#[derive(Debug, Deserialize)]
#[serde(from = "Versions<SnapshotV1>")]
struct Snapshot {
    books: Vec<Book>,
    transactions: Vec<Transaction>,
    users: Vec<User>,
}

#[derive(Debug, Serialize)]
struct SnapshotRef<'a> {
    books: Vec<&'a Book>,
    transactions: &'a [Transaction],
    users: &'a [User],
}

/// The serialized versions of the snapshot.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions<T> {
    #[serde(rename = "1")]
    V1(T),
}

#[derive(Debug, Deserialize)]
struct SnapshotV1 {
    #[serde(default)]
    books: Vec<Book>,
    #[serde(default)]
    transactions: Vec<Transaction>,
    #[serde(default)]
    users: Vec<User>,
}

impl From<Versions<SnapshotV1>> for Snapshot {
    fn from(versions: Versions<SnapshotV1>) -> Self {
        match versions {
            Versions::V1(SnapshotV1 {
                books,
                transactions,
                users,
            }) => Self {
                books,
                transactions,
                users,
            },
        }
    }
}
