use std::{cmp::Ordering, fmt};

use anyhow::Context;
use bookshelf::{Book, Catalog, ReportEntry, SearchCriterion};
use clap::{Parser, ValueEnum};
use tracing::instrument;

use super::{
    terminal::{self, Colorize},
    Session,
};

/// Widest a title or author column may grow on a narrow terminal.
const NARROW_TEXT_WIDTH: usize = 24;

/// Command arguments for `shelf list`.
#[derive(Debug, Default, Parser)]
pub struct List {
    /// Output format
    #[arg(long, value_enum, default_value_t)]
    format: OutputFormat,

    /// Sort field (default: catalog order)
    #[arg(long, value_enum)]
    sort: Option<SortField>,

    /// Only show books that are on the shelf
    #[arg(long)]
    available: bool,

    /// Limit number of rows returned
    #[arg(long)]
    limit: Option<usize>,
}

/// Command arguments for `shelf search`.
#[derive(Debug, Parser)]
pub struct Search {
    /// What to match against: title, author or genre
    criterion: SearchCriterion,

    /// Titles and authors match on a substring, genres match exactly
    value: String,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    format: OutputFormat,
}

/// Command arguments for `shelf report`.
#[derive(Debug, Default, Parser)]
pub struct Report {
    /// Output format
    #[arg(long, value_enum, default_value_t)]
    format: OutputFormat,
}

/// Supported output formats.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Sortable fields.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum SortField {
    Title,
    Author,
    Genre,
}

impl List {
    #[instrument(skip(session))]
    pub fn run(self, session: &Session) -> anyhow::Result<()> {
        let catalog = session.load()?;
        render_books(self.select(&catalog), self.format)
    }

    fn select<'a>(&self, catalog: &'a Catalog) -> Vec<&'a Book> {
        let mut books: Vec<_> = catalog
            .books()
            .filter(|book| !self.available || book.is_available())
            .collect();

        if let Some(field) = self.sort {
            books.sort_by(|a, b| field.compare(a, b));
        }
        if let Some(limit) = self.limit {
            books.truncate(limit);
        }
        books
    }
}

impl Search {
    #[instrument(skip(session))]
    pub fn run(self, session: &Session) -> anyhow::Result<()> {
        let catalog = session.load()?;
        let books: Vec<_> = catalog.search_books(self.criterion, &self.value).collect();

        if books.is_empty() && self.format == OutputFormat::Table {
            println!(
                "{}",
                format!("No books with {} matching '{}'.", self.criterion, self.value).dim()
            );
            return Ok(());
        }
        render_books(books, self.format)
    }
}

impl Report {
    #[instrument(skip(session))]
    pub fn run(self, session: &Session) -> anyhow::Result<()> {
        let catalog = session.load()?;
        let entries: Vec<ReportEntry> = catalog.generate_report().collect();

        match self.format {
            OutputFormat::Table => {
                if entries.is_empty() {
                    println!("{}", "No transactions recorded.".dim());
                }
                for entry in entries {
                    println!("{entry}");
                }
                Ok(())
            }
            OutputFormat::Json => print_json(&entries),
        }
    }
}

fn render_books(books: Vec<&Book>, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => {
            if books.is_empty() {
                println!("{}", "The catalog is empty.".dim());
            }
            for line in table(&books, text_width()) {
                println!("{line}");
            }
            Ok(())
        }
        OutputFormat::Json => print_json(&books),
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(std::io::stdout(), value)
        .context("failed to render json output")?;
    println!();
    Ok(())
}

fn text_width() -> Option<usize> {
    terminal::is_narrow().then_some(NARROW_TEXT_WIDTH)
}

const HEADERS: [&str; 5] = ["ID", "Title", "Author", "Genre", "Status"];

/// Width of the longest availability label.
const STATUS_WIDTH: usize = "available".len();

/// Lays out `books` as aligned rows, headers first.
///
/// Title and author are cut to `max_text` characters when given. Widths are
/// measured before colouring so escape codes never skew the alignment.
fn table(books: &[&Book], max_text: Option<usize>) -> Vec<String> {
    if books.is_empty() {
        return Vec::new();
    }

    let clip = |text: &str| match max_text {
        Some(max) => terminal::truncate(text, max),
        None => text.to_string(),
    };

    let rows: Vec<[String; 4]> = books
        .iter()
        .map(|book| {
            [
                book.id().to_string(),
                clip(book.title()),
                clip(book.author()),
                book.genre().to_string(),
            ]
        })
        .collect();

    let mut widths = [0; 4];
    for (width, header) in widths.iter_mut().zip(HEADERS) {
        *width = header.chars().count();
    }
    for row in &rows {
        for (width, value) in widths.iter_mut().zip(row) {
            *width = (*width).max(value.chars().count());
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 2);
    let headers = HEADERS.map(String::from);
    lines.push(format!("{}  {}", join_padded(headers[..4].iter(), &widths), headers[4]));
    let rule: Vec<_> = widths.iter().map(|width| "-".repeat(*width)).collect();
    lines.push(format!("{}  {}", rule.join("  "), "-".repeat(STATUS_WIDTH)));

    for (row, book) in rows.iter().zip(books) {
        let mut line = join_padded(row.iter(), &widths);
        line.push_str("  ");
        line.push_str(&terminal::availability(book.is_available()));
        lines.push(line);
    }
    lines
}

fn join_padded<'a>(values: impl Iterator<Item = &'a String>, widths: &[usize]) -> String {
    values
        .zip(widths)
        .map(|(value, width)| {
            let pad = width.saturating_sub(value.chars().count());
            format!("{value}{}", " ".repeat(pad))
        })
        .collect::<Vec<_>>()
        .join("  ")
}

impl SortField {
    fn compare(self, a: &Book, b: &Book) -> Ordering {
        let key = |book: &Book| match self {
            Self::Title => book.title().to_lowercase(),
            Self::Author => book.author().to_lowercase(),
            Self::Genre => book.genre().to_lowercase(),
        };
        key(a).cmp(&key(b))
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Table => "table",
            Self::Json => "json",
        })
    }
}
