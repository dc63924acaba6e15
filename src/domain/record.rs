//! Book records as supplied by an external source.
//!
//! A record is the four-field `title,author,genre,availability` line used
//! by import files. Parsing is strict about the field count and the
//! boolean, and lenient about surrounding whitespace.
//!
//! A field may be wrapped in double quotes so that it can hold commas,
//! with `""` standing for a literal quote. Records are written back the same
//! way, quoting only the fields that need it.

use std::{borrow::Cow, fmt, str::FromStr};

use crate::domain::Book;

/// One `(title, author, genre, availability)` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookRecord {
    /// Title of the book.
    pub title: String,
    /// Author of the book.
    pub author: String,
    /// Genre of the book.
    pub genre: String,
    /// Whether the book starts out on the shelf.
    pub available: bool,
}

/// Why a record line could not be parsed.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum RecordError {
    /// The line did not split into exactly four comma-separated fields.
    #[error("expected 4 comma-separated fields, found {0}")]
    FieldCount(usize),
    /// The availability field was neither `true` nor `false`.
    #[error("availability must be 'true' or 'false', found '{0}'")]
    Availability(String),
    /// A quoted field was not closed, or was followed by something other
    /// than a comma.
    #[error("unbalanced quotes")]
    Quote,
}

impl FromStr for BookRecord {
    type Err = RecordError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields = split_fields(line)?;

        let [title, author, genre, available] = fields.as_slice() else {
            return Err(RecordError::FieldCount(fields.len()));
        };

        let available = parse_availability(available)?;

        Ok(Self {
            title: title.clone(),
            author: author.clone(),
            genre: genre.clone(),
            available,
        })
    }
}

impl BookRecord {
    /// Returns `true` if no field contains a line break.
    ///
    /// Record files are read line by line, so only single-line records can
    /// be written to one.
    #[must_use]
    pub fn is_single_line(&self) -> bool {
        [&self.title, &self.author, &self.genre]
            .iter()
            .all(|field| !field.contains(['\n', '\r']))
    }
}

/// Splits a record line on commas, honouring double-quoted fields.
fn split_fields(line: &str) -> Result<Vec<String>, RecordError> {
    let mut fields = Vec::new();
    let mut rest = line;

    loop {
        let Some(quoted) = rest.trim_start().strip_prefix('"') else {
            match rest.split_once(',') {
                Some((field, next)) => {
                    fields.push(field.trim().to_string());
                    rest = next;
                    continue;
                }
                None => {
                    fields.push(rest.trim().to_string());
                    return Ok(fields);
                }
            }
        };

        let (field, after) = take_quoted(quoted)?;
        fields.push(field);

        let after = after.trim_start();
        if after.is_empty() {
            return Ok(fields);
        }
        rest = after.strip_prefix(',').ok_or(RecordError::Quote)?;
    }
}

/// Reads a quoted field up to its closing quote, returning the unescaped
/// field and the text after the quote.
fn take_quoted(s: &str) -> Result<(String, &str), RecordError> {
    let mut field = String::new();
    let mut chars = s.char_indices().peekable();

    while let Some((index, c)) = chars.next() {
        if c != '"' {
            field.push(c);
        } else if chars.next_if(|&(_, next)| next == '"').is_some() {
            field.push('"');
        } else {
            return Ok((field, &s[index + 1..]));
        }
    }
    Err(RecordError::Quote)
}

fn escape(field: &str) -> Cow<'_, str> {
    let needs_quotes = field.contains([',', '"', '\n', '\r']) || field.trim() != field;
    if needs_quotes {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

fn parse_availability(s: &str) -> Result<bool, RecordError> {
    if s.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if s.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(RecordError::Availability(s.to_string()))
    }
}

impl From<&Book> for BookRecord {
    fn from(book: &Book) -> Self {
        Self {
            title: book.title().to_string(),
            author: book.author().to_string(),
            genre: book.genre().to_string(),
            available: book.is_available(),
        }
    }
}

impl fmt::Display for BookRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            escape(&self.title),
            escape(&self.author),
            escape(&self.genre),
            self.available
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_line() {
        let record: BookRecord = "Moby Dick, Herman Melville , Adventure,TRUE".parse().unwrap();
        assert_eq!(
            record,
            BookRecord {
                title: "Moby Dick".to_string(),
                author: "Herman Melville".to_string(),
                genre: "Adventure".to_string(),
                available: true,
            }
        );
    }

    #[test]
    fn rejects_wrong_field_count() {
        assert_eq!(
            "bad-line".parse::<BookRecord>(),
            Err(RecordError::FieldCount(1))
        );
        assert_eq!(
            "a,b,c,true,extra".parse::<BookRecord>(),
            Err(RecordError::FieldCount(5))
        );
    }

    #[test]
    fn rejects_unparsable_availability() {
        assert_eq!(
            "A,B,C,yes".parse::<BookRecord>(),
            Err(RecordError::Availability("yes".to_string()))
        );
    }

    #[test]
    fn quoted_fields_may_hold_commas_and_quotes() {
        let record: BookRecord = r#""Dune, Part One", "Frank ""Fh"" Herbert" ,SF,true"#
            .parse()
            .unwrap();

        assert_eq!(record.title, "Dune, Part One");
        assert_eq!(record.author, r#"Frank "Fh" Herbert"#);
        assert_eq!(record.genre, "SF");
    }

    #[test]
    fn fields_with_commas_survive_display_and_parse() {
        let record = BookRecord {
            title: "Dune, Part One".to_string(),
            author: r#"Frank "Fh" Herbert"#.to_string(),
            genre: " padded ".to_string(),
            available: false,
        };

        let line = record.to_string();
        assert_eq!(
            line,
            r#""Dune, Part One","Frank ""Fh"" Herbert"," padded ",false"#
        );
        assert_eq!(line.parse::<BookRecord>(), Ok(record));
    }

    #[test]
    fn rejects_unbalanced_quotes() {
        assert_eq!(
            r#""Dune, Part One,Herbert,SF,true"#.parse::<BookRecord>(),
            Err(RecordError::Quote)
        );
        assert_eq!(
            r#""Dune" Part One,Herbert,SF,true"#.parse::<BookRecord>(),
            Err(RecordError::Quote)
        );
    }

    #[test]
    fn line_breaks_are_detected() {
        let mut record: BookRecord = "A,B,C,true".parse().unwrap();
        assert!(record.is_single_line());
        record.genre = "Poetry\nand Verse".to_string();
        assert!(!record.is_single_line());
    }

    #[test]
    fn display_matches_import_format() {
        let line = "1984,George Orwell,Dystopian,false";
        let record: BookRecord = line.parse().unwrap();
        assert_eq!(record.to_string(), line);
    }
}
