use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Globally unique, perpetually stable identifier of a book.
///
/// Generated by the catalog when a book is created and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(Uuid);

impl BookId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    #[must_use]
    pub const fn uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BookId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// A single item in the catalog.
///
/// Books are owned by a [`Catalog`](crate::Catalog). Outside the catalog they
/// are only ever seen by shared reference, so the availability flag can only
/// change through catalog operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    id: BookId,
    title: String,
    author: String,
    genre: String,
    available: bool,
}

impl Book {
    pub(crate) fn new(title: String, author: String, genre: String, available: bool) -> Self {
        Self {
            id: BookId::new(),
            title,
            author,
            genre,
            available,
        }
    }

    /// The book's identifier.
    #[must_use]
    pub const fn id(&self) -> BookId {
        self.id
    }

    /// The title of the book.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The author of the book.
    #[must_use]
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Free-text genre, e.g. "Fiction".
    #[must_use]
    pub fn genre(&self) -> &str {
        &self.genre
    }

    /// Whether the book is on the shelf (`true`) or borrowed (`false`).
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.available
    }

    pub(crate) const fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    /// Applies the fields present in `update`, leaving the rest untouched.
    pub(crate) fn apply(&mut self, update: BookUpdate) {
        let BookUpdate {
            title,
            author,
            genre,
            available,
        } = update;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(author) = author {
            self.author = author;
        }
        if let Some(genre) = genre {
            self.genre = genre;
        }
        if let Some(available) = available {
            self.available = available;
        }
    }
}

/// A partial update to a [`Book`].
///
/// Every field is independently optional. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookUpdate {
    /// Replacement title.
    pub title: Option<String>,
    /// Replacement author.
    pub author: Option<String>,
    /// Replacement genre.
    pub genre: Option<String>,
    /// Replacement availability flag.
    pub available: Option<bool>,
}

impl BookUpdate {
    /// Sets the replacement title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the replacement author.
    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Sets the replacement genre.
    #[must_use]
    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    /// Sets the replacement availability.
    #[must_use]
    pub const fn with_available(mut self, available: bool) -> Self {
        self.available = Some(available);
        self
    }

    /// Returns `true` if the update would change nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.genre.is_none()
            && self.available.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gatsby() -> Book {
        Book::new(
            "The Great Gatsby".to_string(),
            "F. Scott Fitzgerald".to_string(),
            "Fiction".to_string(),
            true,
        )
    }

    #[test]
    fn new_books_get_distinct_ids() {
        assert_ne!(gatsby().id(), gatsby().id());
    }

    #[test]
    fn book_id_parses_its_display_form() {
        let id = BookId::new();
        let parsed: BookId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn book_id_rejects_garbage() {
        assert!("not-a-book".parse::<BookId>().is_err());
    }

    #[test]
    fn title_only_update_leaves_other_fields() {
        let mut book = gatsby();
        let id = book.id();

        book.apply(BookUpdate::default().with_title("Gatsby"));

        assert_eq!(book.id(), id);
        assert_eq!(book.title(), "Gatsby");
        assert_eq!(book.author(), "F. Scott Fitzgerald");
        assert_eq!(book.genre(), "Fiction");
        assert!(book.is_available());
    }

    #[test]
    fn empty_update_is_a_no_op() {
        let mut book = gatsby();
        let before = book.clone();

        let update = BookUpdate::default();
        assert!(update.is_empty());
        book.apply(update);

        assert_eq!(book, before);
    }

    #[test]
    fn update_can_flip_availability() {
        let mut book = gatsby();
        book.apply(BookUpdate::default().with_available(false));
        assert!(!book.is_available());
    }
}
