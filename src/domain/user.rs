use std::{fmt, str::FromStr};

use non_empty_string::NonEmptyString;
use serde::{Deserialize, Serialize};

use crate::domain::TransactionKind;

/// Caller-supplied identifier of a user.
///
/// Unlike book ids these are not generated by the catalog; any non-empty
/// string is accepted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(NonEmptyString);

impl UserId {
    /// Creates a user id.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidUserId`] if the string is empty or only whitespace.
    pub fn new(id: String) -> Result<Self, InvalidUserId> {
        if id.trim().is_empty() {
            return Err(InvalidUserId);
        }
        NonEmptyString::new(id).map(Self).map_err(|_| InvalidUserId)
    }

    /// Returns the string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Error returned for an empty user id.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("user id must not be empty")]
pub struct InvalidUserId;

impl TryFrom<String> for UserId {
    type Error = InvalidUserId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.as_str().to_string()
    }
}

impl FromStr for UserId {
    type Err = InvalidUserId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a user is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// May perform every task.
    Admin,
    /// May perform every task except deleting users.
    Librarian,
    /// A patron. Authorized for nothing.
    #[serde(alias = "customer")]
    Member,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Admin => "admin",
            Self::Librarian => "librarian",
            Self::Member => "member",
        })
    }
}

/// Error returned when parsing an unknown role.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown role '{0}' (expected admin, librarian or member)")]
pub struct UnknownRole(String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "librarian" => Ok(Self::Librarian),
            "member" | "customer" => Ok(Self::Member),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// The named tasks front ends check before calling mutating operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    /// Add a book.
    AddBook,
    /// Delete one or more books.
    DeleteBook,
    /// Edit a book's fields.
    UpdateBook,
    /// Borrow a book.
    BorrowBook,
    /// Return a book.
    ReturnBook,
    /// Renew a loan.
    RenewBook,
    /// Import book records from an external source.
    LoadBooks,
    /// Register a user.
    AddUser,
    /// Remove a user.
    DeleteUser,
}

impl Task {
    /// The literal task name passed to [`User::authorize`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AddBook => "addBook",
            Self::DeleteBook => "deleteBook",
            Self::UpdateBook => "updateBook",
            Self::BorrowBook => "borrowBook",
            Self::ReturnBook => "returnBook",
            Self::RenewBook => "renewBook",
            Self::LoadBooks => "loadBooks",
            Self::AddUser => "addUser",
            Self::DeleteUser => "deleteUser",
        }
    }
}

/// The task that must be authorized before recording a transaction.
impl From<TransactionKind> for Task {
    fn from(kind: TransactionKind) -> Self {
        match kind {
            TransactionKind::Borrow => Self::BorrowBook,
            TransactionKind::Return => Self::ReturnBook,
            TransactionKind::Renew => Self::RenewBook,
        }
    }
}

impl AsRef<str> for Task {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A person who can borrow books or administer the catalog.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    name: String,
    role: Role,
    password: String,
}

// The password never appears in logs.
impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl User {
    /// Creates a user.
    #[must_use]
    pub fn new(
        id: UserId,
        name: impl Into<String>,
        role: Role,
        password: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            role,
            password: password.into(),
        }
    }

    /// The user's identifier.
    #[must_use]
    pub const fn id(&self) -> &UserId {
        &self.id
    }

    /// The user's display name, also used as the login name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The user's role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Returns `true` iff both `username` and `password` exactly match the
    /// stored values. Comparison is case-sensitive.
    #[must_use]
    pub fn authenticate(&self, username: &str, password: &str) -> bool {
        self.name == username && self.password == password
    }

    /// Checks whether this user may perform `task`.
    ///
    /// Admins may do anything, librarians anything but `deleteUser`, and
    /// everyone else nothing.
    #[must_use]
    pub fn authorize(&self, task: impl AsRef<str>) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Librarian => task.as_ref() != Task::DeleteUser.as_str(),
            Role::Member => false,
        }
    }
}
