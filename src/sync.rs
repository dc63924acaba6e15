//! Shared access to a catalog from several threads.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::Catalog;

/// A catalog behind a single lock.
///
/// Reads and writes are serialized against each other, so a borrow and a
/// concurrent return on the same book can never interleave. Cloning is cheap
/// and every clone refers to the same catalog.
#[derive(Debug, Clone, Default)]
pub struct SharedCatalog {
    inner: Arc<Mutex<Catalog>>,
}

impl SharedCatalog {
    /// Wraps a catalog for shared use.
    #[must_use]
    pub fn new(catalog: Catalog) -> Self {
        Self {
            inner: Arc::new(Mutex::new(catalog)),
        }
    }

    /// Runs `f` with shared access to the catalog.
    pub fn read<T>(&self, f: impl FnOnce(&Catalog) -> T) -> T {
        f(&self.lock())
    }

    /// Runs `f` with exclusive access to the catalog.
    pub fn write<T>(&self, f: impl FnOnce(&mut Catalog) -> T) -> T {
        f(&mut self.lock())
    }

    /// Catalog operations never panic half-way through a mutation, so a
    /// poisoned lock still guards a consistent catalog.
    fn lock(&self) -> MutexGuard<'_, Catalog> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes the catalog back out, if this is the last handle.
    ///
    /// # Errors
    ///
    /// Returns `self` unchanged if other handles are still alive.
    pub fn try_into_inner(self) -> Result<Catalog, Self> {
        Arc::try_unwrap(self.inner)
            .map(|mutex| mutex.into_inner().unwrap_or_else(PoisonError::into_inner))
            .map_err(|inner| Self { inner })
    }
}

impl From<Catalog> for SharedCatalog {
    fn from(catalog: Catalog) -> Self {
        Self::new(catalog)
    }
}
