//! Line-oriented book record files.
//!
//! Each line holds one `title,author,genre,true|false` record. Malformed
//! lines are skipped by the catalog; read failures are reported here, with
//! the configured [`ReadErrorPolicy`] deciding what happens to the books
//! already added.

use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use tracing::{debug, info, instrument, warn};

use crate::domain::{Catalog, LoadSummary, ReadErrorPolicy};

/// Errors that can occur when importing book records.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// The source could not be opened. The catalog is unchanged.
    #[error("failed to open {}: {source}", .path.display())]
    Open {
        /// The path that could not be opened.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },
    /// The source failed part-way through.
    #[error("failed to read line {line}: {source}")]
    Read {
        /// 1-based number of the line that could not be read.
        line: usize,
        /// Records processed before the failure.
        ///
        /// If `rolled_back` is `true`, the books listed as loaded have
        /// already been removed again.
        summary: LoadSummary,
        /// Whether the books added before the failure were removed.
        rolled_back: bool,
        /// The underlying I/O error.
        source: io::Error,
    },
}

/// Errors that can occur when exporting book records.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// A book has a line break in one of its fields, which a line-oriented
    /// record file cannot hold. Nothing is written.
    #[error("'{title}' cannot be exported: fields must not contain line breaks")]
    LineBreak {
        /// Title of the offending book.
        title: String,
    },
    /// The file could not be created or written to.
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        /// The path being written.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },
}

/// Streams records from `reader` into `catalog`.
///
/// # Errors
///
/// Returns [`ImportError::Read`] if the reader fails. Books already added are
/// then removed or kept according to `policy`.
#[instrument(skip(catalog, reader))]
pub fn import<R: BufRead>(
    catalog: &mut Catalog,
    reader: R,
    policy: ReadErrorPolicy,
) -> Result<LoadSummary, ImportError> {
    let mut summary = LoadSummary::default();

    for (index, line) in reader.lines().enumerate() {
        let number = index + 1;
        match line {
            Ok(line) => catalog.load_line(number, &line, &mut summary),
            Err(source) => {
                let rolled_back = policy == ReadErrorPolicy::RollBack;
                if rolled_back {
                    for id in &summary.loaded {
                        catalog.delete_book_by_id(*id);
                    }
                    warn!(
                        line = number,
                        removed = summary.loaded(),
                        "read failed, rolled back import"
                    );
                } else {
                    warn!(
                        line = number,
                        kept = summary.loaded(),
                        "read failed, keeping partial import"
                    );
                }
                return Err(ImportError::Read {
                    line: number,
                    summary,
                    rolled_back,
                    source,
                });
            }
        }
    }

    info!(
        loaded = summary.loaded(),
        skipped = summary.skipped(),
        "books loaded"
    );
    Ok(summary)
}

/// A file of book records on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFile {
    path: PathBuf,
}

impl RecordFile {
    /// Refers to the record file at `path`. Nothing is opened yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The location of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Imports every record in the file into `catalog`.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Open`] if the file cannot be opened, leaving
    /// the catalog untouched, or [`ImportError::Read`] if reading fails
    /// part-way through.
    pub fn import_into(
        &self,
        catalog: &mut Catalog,
        policy: ReadErrorPolicy,
    ) -> Result<LoadSummary, ImportError> {
        let file = File::open(&self.path).map_err(|source| ImportError::Open {
            path: self.path.clone(),
            source,
        })?;
        debug!("importing records from {}", self.path.display());
        import(catalog, BufReader::new(file), policy)
    }

    /// Writes every book in `catalog` to the file, one record per line.
    ///
    /// Fields holding commas or quotes are quoted. Parent directories are
    /// created automatically if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::LineBreak`], before touching the file, if any
    /// book cannot be written as a single line, or [`ExportError::Io`] if the
    /// file cannot be created or written to.
    pub fn export(&self, catalog: &Catalog) -> Result<usize, ExportError> {
        if let Some(record) = catalog.records().find(|record| !record.is_single_line()) {
            return Err(ExportError::LineBreak {
                title: record.title,
            });
        }

        let count = self.write(catalog).map_err(|source| ExportError::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!(count, "exported records to {}", self.path.display());
        Ok(count)
    }

    fn write(&self, catalog: &Catalog) -> io::Result<usize> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut writer = BufWriter::new(File::create(&self.path)?);
        let mut count = 0;
        for record in catalog.records() {
            writeln!(writer, "{record}")?;
            count += 1;
        }
        writer.flush()?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use super::*;

    /// A reader that yields `data` and then fails.
    struct FailingReader {
        data: Cursor<Vec<u8>>,
    }

    impl FailingReader {
        fn new(data: &str) -> BufReader<Self> {
            BufReader::new(Self {
                data: Cursor::new(data.as_bytes().to_vec()),
            })
        }
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.data.read(buf)? {
                0 => Err(io::Error::other("disk on fire")),
                n => Ok(n),
            }
        }
    }

    #[test]
    fn import_reports_loaded_and_skipped() {
        let mut catalog = Catalog::new();
        let input = "A,B,C,true\nbad-line\nD,E,F,false\n";

        let summary = import(&mut catalog, Cursor::new(input), ReadErrorPolicy::RollBack).unwrap();

        assert_eq!(summary.loaded(), 2);
        assert_eq!(summary.skipped(), 1);
        assert_eq!(summary.skipped[0].content, "bad-line");
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn read_failure_rolls_back_by_default() {
        let mut catalog = Catalog::with_samples();
        let reader = FailingReader::new("A,B,C,true\nD,E,F,false\n");

        let error = import(&mut catalog, reader, ReadErrorPolicy::default()).unwrap_err();

        match error {
            ImportError::Read {
                line,
                summary,
                rolled_back,
                ..
            } => {
                assert_eq!(line, 3);
                assert_eq!(summary.loaded(), 2);
                assert!(rolled_back);
            }
            other @ ImportError::Open { .. } => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(catalog.len(), 3);
        assert!(catalog.search_book_by_title("A").is_none());
    }

    #[test]
    fn read_failure_can_keep_partial_import() {
        let mut catalog = Catalog::new();
        let reader = FailingReader::new("A,B,C,true\nD,E,F,false\n");

        let error = import(&mut catalog, reader, ReadErrorPolicy::KeepPartial).unwrap_err();

        assert!(matches!(
            error,
            ImportError::Read {
                rolled_back: false,
                ..
            }
        ));
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn missing_file_leaves_catalog_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let mut catalog = Catalog::with_samples();

        let error = RecordFile::new(tmp.path().join("nonexistent_file.csv"))
            .import_into(&mut catalog, ReadErrorPolicy::default())
            .unwrap_err();

        assert!(matches!(error, ImportError::Open { .. }));
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn export_then_import() {
        let tmp = tempfile::tempdir().unwrap();
        let file = RecordFile::new(tmp.path().join("out").join("books.csv"));
        let mut source = Catalog::with_samples();
        let id = source.search_book_by_title("1984").unwrap().id();
        assert!(source.borrow_book(&"u1".parse().unwrap(), id));

        assert_eq!(file.export(&source).unwrap(), 3);

        let mut target = Catalog::new();
        let summary = file
            .import_into(&mut target, ReadErrorPolicy::default())
            .unwrap();
        assert_eq!(summary.loaded(), 3);
        assert!(!target.search_book_by_title("1984").unwrap().is_available());
        assert_eq!(
            target.records().collect::<Vec<_>>(),
            source.records().collect::<Vec<_>>()
        );
    }

    #[test]
    fn titles_with_commas_survive_export_and_import() {
        let tmp = tempfile::tempdir().unwrap();
        let file = RecordFile::new(tmp.path().join("books.csv"));
        let mut source = Catalog::new();
        source.add_book("Dune, Part One", "Herbert", "SF", true);
        source.add_book("Emma", "Jane \"J.\" Austen", "Romance", false);

        assert_eq!(file.export(&source).unwrap(), 2);

        let mut target = Catalog::new();
        let summary = file
            .import_into(&mut target, ReadErrorPolicy::default())
            .unwrap();
        assert_eq!(summary.loaded(), 2);
        assert_eq!(summary.skipped(), 0);
        assert_eq!(
            target.records().collect::<Vec<_>>(),
            source.records().collect::<Vec<_>>()
        );
    }

    #[test]
    fn export_refuses_line_breaks() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("books.csv");
        let mut catalog = Catalog::with_samples();
        catalog.add_book("Two\nLines", "Someone", "Poetry", true);

        let error = RecordFile::new(&path).export(&catalog).unwrap_err();

        assert!(matches!(error, ExportError::LineBreak { ref title } if title == "Two\nLines"));
        assert!(!path.exists());
    }
}
