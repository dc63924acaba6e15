//! The in-memory catalog and transaction ledger.
//!
//! The [`Catalog`] knows nothing about files, databases or terminals. It
//! owns the books, the append-only ledger of transactions, and the set of
//! known users, and it is the only thing that changes a book's
//! availability.
//!
//! Every operation is total: a missing book or a borrow of an already
//! borrowed book is reported as `false`, `None` or an empty iterator, never
//! as an error.

use std::{fmt, str::FromStr};

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, instrument, warn};

use crate::domain::{
    Book, BookId, BookRecord, BookUpdate, RecordError, ReportEntry, Transaction, TransactionKind,
    User, UserId,
};

/// Length of a loan, in days.
pub const LOAN_DAYS: i64 = 28;

/// The field a [`Catalog::search_books`] query matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchCriterion {
    /// Case-insensitive substring of the title.
    Title,
    /// Case-insensitive substring of the author.
    Author,
    /// Case-insensitive exact genre.
    Genre,
}

impl SearchCriterion {
    /// `needle` must already be lowercase.
    fn matches(self, book: &Book, needle: &str) -> bool {
        match self {
            Self::Title => book.title().to_lowercase().contains(needle),
            Self::Author => book.author().to_lowercase().contains(needle),
            Self::Genre => book.genre().to_lowercase() == needle,
        }
    }
}

impl fmt::Display for SearchCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Title => "title",
            Self::Author => "author",
            Self::Genre => "genre",
        })
    }
}

/// Error returned when parsing an unknown search criterion.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown search criterion '{0}' (expected title, author or genre)")]
pub struct UnknownCriterion(String);

impl FromStr for SearchCriterion {
    type Err = UnknownCriterion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "title" => Ok(Self::Title),
            "author" => Ok(Self::Author),
            "genre" => Ok(Self::Genre),
            _ => Err(UnknownCriterion(s.to_string())),
        }
    }
}

/// A record that was skipped during a bulk load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    /// 1-based position of the record in the input.
    pub line: usize,
    /// The raw record as supplied.
    pub content: String,
    /// Why it was rejected.
    pub error: RecordError,
}

impl fmt::Display for SkippedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {} ({:?})", self.line, self.error, self.content)
    }
}

/// The outcome of a bulk load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Ids of the books that were added, in input order.
    pub loaded: Vec<BookId>,
    /// Records that were malformed and skipped.
    pub skipped: Vec<SkippedRecord>,
}

impl LoadSummary {
    /// Number of books added.
    #[must_use]
    pub fn loaded(&self) -> usize {
        self.loaded.len()
    }

    /// Number of records skipped.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped.len()
    }
}

/// The owning collection of books, transactions and users.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    books: Vec<Book>,
    transactions: Vec<Transaction>,
    users: Vec<User>,
}

impl Catalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog seeded with three classic titles, all available.
    #[must_use]
    pub fn with_samples() -> Self {
        let mut catalog = Self::new();
        catalog.add_book("The Great Gatsby", "F. Scott Fitzgerald", "Fiction", true);
        catalog.add_book("1984", "George Orwell", "Dystopian", true);
        catalog.add_book("Moby Dick", "Herman Melville", "Adventure", true);
        catalog
    }

    /// Reassembles a catalog from previously saved parts.
    pub(crate) const fn from_parts(
        books: Vec<Book>,
        transactions: Vec<Transaction>,
        users: Vec<User>,
    ) -> Self {
        Self {
            books,
            transactions,
            users,
        }
    }

    /// Number of books in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.books.len()
    }

    /// Returns `true` if the catalog holds no books.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// All books, in catalog order.
    pub fn books(&self) -> impl Iterator<Item = &Book> + '_ {
        self.books.iter()
    }

    /// The full ledger, oldest first.
    #[must_use]
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Every transaction that refers to `id`, oldest first.
    ///
    /// This still works after the book itself has been deleted.
    pub fn history(&self, id: BookId) -> impl DoubleEndedIterator<Item = &Transaction> + '_ {
        self.transactions
            .iter()
            .filter(move |transaction| transaction.book_id() == id)
    }

    /// When a borrowed book is due back.
    ///
    /// A loan runs for [`LOAN_DAYS`] from the most recent borrow or renewal.
    /// Returns `None` for unknown or available books, and for books marked
    /// unavailable without a borrow on record.
    #[must_use]
    pub fn due_date(&self, id: BookId) -> Option<DateTime<Utc>> {
        if self.book(id)?.is_available() {
            return None;
        }
        let started = self
            .history(id)
            .rev()
            .map_while(|transaction| match transaction.kind() {
                TransactionKind::Return => None,
                TransactionKind::Borrow | TransactionKind::Renew => Some(transaction.timestamp()),
            })
            .next()?;
        Some(started + TimeDelta::days(LOAN_DAYS))
    }

    /// The books as plain records, suitable for export.
    pub fn records(&self) -> impl Iterator<Item = BookRecord> + '_ {
        self.books.iter().map(BookRecord::from)
    }

    /// Adds a book and returns its freshly generated id.
    pub fn add_book(
        &mut self,
        title: impl Into<String>,
        author: impl Into<String>,
        genre: impl Into<String>,
        available: bool,
    ) -> BookId {
        let book = Book::new(title.into(), author.into(), genre.into(), available);
        let id = book.id();
        debug!(%id, title = book.title(), "added book");
        self.books.push(book);
        id
    }

    /// Adds every well-formed record in `lines`.
    ///
    /// Malformed records are skipped with a warning and listed in the
    /// returned summary; loading carries on with the remaining records.
    /// Blank lines are ignored.
    #[instrument(skip_all)]
    pub fn bulk_load<I>(&mut self, lines: I) -> LoadSummary
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut summary = LoadSummary::default();
        for (index, line) in lines.into_iter().enumerate() {
            self.load_line(index + 1, line.as_ref(), &mut summary);
        }
        debug!(
            loaded = summary.loaded(),
            skipped = summary.skipped(),
            "bulk load finished"
        );
        summary
    }

    /// Parses and adds a single record line, recording the outcome in
    /// `summary`.
    pub(crate) fn load_line(&mut self, number: usize, line: &str, summary: &mut LoadSummary) {
        if line.trim().is_empty() {
            return;
        }

        match line.parse::<BookRecord>() {
            Ok(record) => {
                let id = self.add_record(record);
                summary.loaded.push(id);
            }
            Err(error) => {
                warn!(line = number, content = line, "skipping invalid book record: {error}");
                summary.skipped.push(SkippedRecord {
                    line: number,
                    content: line.to_string(),
                    error,
                });
            }
        }
    }

    /// Adds a book from a parsed record.
    pub fn add_record(&mut self, record: BookRecord) -> BookId {
        let BookRecord {
            title,
            author,
            genre,
            available,
        } = record;
        self.add_book(title, author, genre, available)
    }

    /// Removes every book whose title matches `title`, ignoring case.
    ///
    /// Returns the number of books removed.
    #[instrument(level = "debug", skip(self))]
    pub fn delete_books_by_title(&mut self, title: &str) -> usize {
        let before = self.books.len();
        self.books.retain(|book| !eq_ignore_case(book.title(), title));
        let removed = before - self.books.len();
        debug!(removed, "deleted books by title");
        removed
    }

    /// Removes the book with the given id, returning it if it existed.
    #[instrument(level = "debug", skip(self))]
    pub fn delete_book_by_id(&mut self, id: BookId) -> Option<Book> {
        let position = self.books.iter().position(|book| book.id() == id)?;
        Some(self.books.remove(position))
    }

    /// Applies the fields present in `update` to the book with `id`.
    ///
    /// Returns `false`, and changes nothing, if there is no such book.
    /// Setting `available` here is an administrative override and is not
    /// recorded in the ledger.
    #[instrument(level = "debug", skip(self))]
    pub fn update_book(&mut self, id: BookId, update: BookUpdate) -> bool {
        let Some(book) = self.book_mut(id) else {
            debug!("no such book");
            return false;
        };
        book.apply(update);
        true
    }

    /// Lends an available book to `user`.
    ///
    /// Fails, with no side effects, if the book does not exist or is already
    /// borrowed.
    pub fn borrow_book(&mut self, user: &UserId, id: BookId) -> bool {
        self.record(user, id, TransactionKind::Borrow)
    }

    /// Takes a borrowed book back.
    ///
    /// Fails, with no side effects, if the book does not exist or is already
    /// on the shelf.
    pub fn return_book(&mut self, user: &UserId, id: BookId) -> bool {
        self.record(user, id, TransactionKind::Return)
    }

    /// Extends a loan. The book stays borrowed.
    ///
    /// Fails, with no side effects, if the book does not exist or is not
    /// currently borrowed.
    pub fn renew_book(&mut self, user: &UserId, id: BookId) -> bool {
        self.record(user, id, TransactionKind::Renew)
    }

    #[instrument(level = "debug", skip(self, user), fields(user = %user))]
    fn record(&mut self, user: &UserId, id: BookId, kind: TransactionKind) -> bool {
        let Some(book) = self.books.iter_mut().find(|book| book.id() == id) else {
            debug!("no such book");
            return false;
        };

        let permitted = match kind {
            TransactionKind::Borrow => book.is_available(),
            TransactionKind::Return | TransactionKind::Renew => !book.is_available(),
        };
        if !permitted {
            debug!(available = book.is_available(), "rejected {kind}");
            return false;
        }

        match kind {
            TransactionKind::Borrow => book.set_available(false),
            TransactionKind::Return => book.set_available(true),
            TransactionKind::Renew => {}
        }

        self.transactions.push(Transaction::new(user.clone(), id, kind));
        debug!("recorded {kind}");
        true
    }

    /// Finds books by title, author or genre.
    ///
    /// Title and author match on a case-insensitive substring, genre on a
    /// case-insensitive exact match. The iterator is lazy and each call is a
    /// fresh query.
    pub fn search_books<'a>(
        &'a self,
        criterion: SearchCriterion,
        value: &str,
    ) -> impl Iterator<Item = &'a Book> + use<'a> {
        let needle = value.to_lowercase();
        self.books
            .iter()
            .filter(move |book| criterion.matches(book, &needle))
    }

    /// Like [`Catalog::search_books`], with the criterion given by name.
    ///
    /// An unrecognised key yields no results.
    pub fn search_books_by_key<'a>(
        &'a self,
        key: &str,
        value: &str,
    ) -> impl Iterator<Item = &'a Book> + use<'a> {
        let criterion = key
            .parse::<SearchCriterion>()
            .inspect_err(|e| warn!("{e}"))
            .ok();
        let needle = value.to_lowercase();
        self.books
            .iter()
            .filter(move |book| criterion.is_some_and(|c| c.matches(book, &needle)))
    }

    /// Looks up a book by id.
    #[must_use]
    pub fn book(&self, id: BookId) -> Option<&Book> {
        self.books.iter().find(|book| book.id() == id)
    }

    fn book_mut(&mut self, id: BookId) -> Option<&mut Book> {
        self.books.iter_mut().find(|book| book.id() == id)
    }

    /// The first book, in catalog order, whose title equals `title`
    /// ignoring case.
    #[must_use]
    pub fn search_book_by_title(&self, title: &str) -> Option<&Book> {
        self.books
            .iter()
            .find(|book| eq_ignore_case(book.title(), title))
    }

    /// The transaction log as `(kind, timestamp)` pairs, oldest first.
    pub fn generate_report(&self) -> impl Iterator<Item = ReportEntry> + '_ {
        self.transactions.iter().map(Transaction::report_entry)
    }

    /// Registers a user.
    ///
    /// Returns `false`, leaving the existing user in place, if the id is
    /// already taken.
    #[instrument(level = "debug", skip(self))]
    pub fn add_user(&mut self, user: User) -> bool {
        if self.user(user.id()).is_some() {
            debug!("user id already taken");
            return false;
        }
        self.users.push(user);
        true
    }

    /// Removes a user, returning it if it existed.
    ///
    /// Transactions referring to the user are kept.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_user(&mut self, id: &UserId) -> Option<User> {
        let position = self.users.iter().position(|user| user.id() == id)?;
        Some(self.users.remove(position))
    }

    /// Looks up a user by id.
    #[must_use]
    pub fn user(&self, id: &UserId) -> Option<&User> {
        self.users.iter().find(|user| user.id() == id)
    }

    /// All registered users.
    #[must_use]
    pub fn users(&self) -> &[User] {
        &self.users
    }

    /// The first user whose credentials match.
    #[must_use]
    pub fn login(&self, username: &str, password: &str) -> Option<&User> {
        self.users
            .iter()
            .find(|user| user.authenticate(username, password))
    }
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}
