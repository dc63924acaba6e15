use anyhow::{bail, Context};
use bookshelf::{Book, Catalog, Transaction};
use clap::Parser;
use tracing::instrument;

use super::{resolve_book, terminal, terminal::Colorize, Session};

#[derive(Debug, Parser)]
#[command(about = "Display a book and its transaction history")]
pub struct Show {
    /// Id or exact title of the book to display
    book: String,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "pretty")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Pretty,
    Json,
}

impl Show {
    #[instrument(level = "debug", skip(session))]
    pub fn run(self, session: &Session) -> anyhow::Result<()> {
        let catalog = session.load()?;

        let Some(book) = resolve_book(&catalog, &self.book).and_then(|id| catalog.book(id)) else {
            bail!("book '{}' not found", self.book);
        };

        match self.output {
            OutputFormat::Pretty => {
                for line in pretty(&catalog, book) {
                    println!("{line}");
                }
            }
            OutputFormat::Json => output_json(&catalog, book)?,
        }
        Ok(())
    }
}

fn pretty(catalog: &Catalog, book: &Book) -> Vec<String> {
    let mut lines = vec![
        format!("# {}", book.title()),
        String::new(),
        "Details".dim(),
        format!("  ID:     {}", book.id()),
        format!("  Author: {}", book.author()),
        format!("  Genre:  {}", book.genre()),
        format!("  Status: {}", terminal::availability(book.is_available())),
    ];
    if let Some(due) = catalog.due_date(book.id()) {
        lines.push(format!("  Due:    {}", due.format("%Y-%m-%d")));
    }

    let history: Vec<&Transaction> = catalog.history(book.id()).collect();
    if !history.is_empty() {
        lines.push(String::new());
        lines.push("History".dim());
        for transaction in history {
            lines.push(format!(
                "  • {} {:<6} by {}",
                transaction.timestamp().format("%Y-%m-%d %H:%M:%S"),
                transaction.kind().as_str(),
                transaction.user_id()
            ));
        }
    }
    lines
}

fn output_json(catalog: &Catalog, book: &Book) -> anyhow::Result<()> {
    use serde_json::json;

    let history: Vec<&Transaction> = catalog.history(book.id()).collect();
    let output = json!({
        "book": book,
        "due": catalog.due_date(book.id()),
        "history": history,
    });

    println!(
        "{}",
        serde_json::to_string_pretty(&output).context("failed to render json output")?
    );
    Ok(())
}
