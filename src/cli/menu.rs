//! The interactive `shelf menu` loop.
//!
//! Prompts are kept apart from their effect: [`Action::prompt`] talks to the
//! terminal, [`Action::apply`] only touches the catalog.

use std::path::PathBuf;

use anyhow::{bail, Context};
use bookshelf::{BookId, BookUpdate, Catalog, ReadErrorPolicy, RecordFile, Task, UserId};
use dialoguer::{Input, Select};
use tracing::{debug, instrument};

use super::{terminal::Colorize, Session};

const ENTRIES: [&str; 10] = [
    "Load books from file",
    "Add a book",
    "Remove books by title",
    "Remove a book by id",
    "Update a book",
    "Show all books",
    "Check out a book",
    "Check in a book",
    "Transaction report",
    "Exit",
];

pub struct Menu;

impl Menu {
    #[instrument(skip(session))]
    pub fn run(session: &Session) -> anyhow::Result<()> {
        let mut catalog = session.load()?;

        loop {
            let choice = Select::new()
                .with_prompt("Library Management System")
                .items(&ENTRIES)
                .default(0)
                .interact()?;

            let action = match Action::prompt(choice) {
                Ok(Action::Exit) => break,
                Ok(action) => action,
                Err(error) => {
                    eprintln!("{}", format!("{error:#}").error());
                    continue;
                }
            };
            debug!(?action, "menu action");

            if let Some(task) = action.task() {
                if let Err(error) = session.authorize(&catalog, task) {
                    eprintln!("{}", format!("{error:#}").error());
                    continue;
                }
            }

            let mutates = action.task().is_some();
            match action.apply(&mut catalog, session.read_error_policy()) {
                Ok(lines) => {
                    for line in lines {
                        println!("{line}");
                    }
                }
                Err(error) => eprintln!("{}", format!("{error:#}").error()),
            }
            if mutates {
                session.save(&catalog)?;
            }
        }
        Ok(())
    }
}

/// One menu choice, with everything it needs already asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    Load(PathBuf),
    Add {
        title: String,
        author: String,
        genre: String,
        available: bool,
    },
    RemoveByTitle(String),
    RemoveById(BookId),
    Update(BookId, BookUpdate),
    ShowAll,
    CheckOut { title: String, user: UserId },
    CheckIn { title: String, user: UserId },
    Report,
    Exit,
}

impl Action {
    /// Asks for whatever the entry at `choice` needs.
    fn prompt(choice: usize) -> anyhow::Result<Self> {
        let action = match choice {
            0 => Self::Load(PathBuf::from(text("Enter the file path")?)),
            1 => Self::Add {
                title: text("Enter the title")?,
                author: text("Enter the author")?,
                genre: text("Enter the genre")?,
                available: Select::new()
                    .with_prompt("Availability")
                    .items(&["available", "borrowed"])
                    .default(0)
                    .interact()?
                    == 0,
            },
            2 => Self::RemoveByTitle(text("Enter the title of the book to remove")?),
            3 => Self::RemoveById(book_id()?),
            4 => {
                let id = book_id()?;
                let mut update = BookUpdate::default();
                update.title = optional("New title (blank to keep)")?;
                update.author = optional("New author (blank to keep)")?;
                update.genre = optional("New genre (blank to keep)")?;
                update.available = match Select::new()
                    .with_prompt("Availability")
                    .items(&["unchanged", "available", "borrowed"])
                    .default(0)
                    .interact()?
                {
                    1 => Some(true),
                    2 => Some(false),
                    _ => None,
                };
                Self::Update(id, update)
            }
            5 => Self::ShowAll,
            6 => Self::CheckOut {
                title: text("Enter the title of the book to check out")?,
                user: user_id()?,
            },
            7 => Self::CheckIn {
                title: text("Enter the title of the book to check in")?,
                user: user_id()?,
            },
            8 => Self::Report,
            _ => Self::Exit,
        };
        Ok(action)
    }

    /// The task a user must be authorized for, if the action changes the
    /// catalog.
    const fn task(&self) -> Option<Task> {
        match self {
            Self::Load(_) => Some(Task::LoadBooks),
            Self::Add { .. } => Some(Task::AddBook),
            Self::RemoveByTitle(_) | Self::RemoveById(_) => Some(Task::DeleteBook),
            Self::Update(..) => Some(Task::UpdateBook),
            Self::CheckOut { .. } => Some(Task::BorrowBook),
            Self::CheckIn { .. } => Some(Task::ReturnBook),
            Self::ShowAll | Self::Report | Self::Exit => None,
        }
    }

    /// Performs the action, returning the lines to print.
    fn apply(self, catalog: &mut Catalog, policy: ReadErrorPolicy) -> anyhow::Result<Vec<String>> {
        let lines = match self {
            Self::Load(path) => {
                let summary = RecordFile::new(&path)
                    .import_into(catalog, policy)
                    .with_context(|| format!("failed to load {}", path.display()))?;
                let mut lines: Vec<_> = summary
                    .skipped
                    .iter()
                    .map(|skipped| format!("{} {skipped}", "Invalid book data:".warning()))
                    .collect();
                lines.push(format!(
                    "{} ({} loaded, {} skipped)",
                    "Books loaded successfully.".success(),
                    summary.loaded(),
                    summary.skipped()
                ));
                lines
            }
            Self::Add {
                title,
                author,
                genre,
                available,
            } => {
                let id = catalog.add_book(title, author, genre, available);
                vec![format!("{} {id}", "Book added successfully.".success())]
            }
            Self::RemoveByTitle(title) => match catalog.delete_books_by_title(&title) {
                0 => bail!("no book titled '{title}'"),
                n => vec![format!("{} {n} book(s)", "Removed".success())],
            },
            Self::RemoveById(id) => match catalog.delete_book_by_id(id) {
                Some(book) => vec![format!("{} '{}'", "Removed".success(), book.title())],
                None => bail!("book {id} not found"),
            },
            Self::Update(id, update) => {
                if !catalog.update_book(id, update) {
                    bail!("book {id} not found");
                }
                vec![format!("{} {id}", "Updated".success())]
            }
            Self::CheckOut { title, user } => {
                let Some(id) = catalog.search_book_by_title(&title).map(|b| b.id()) else {
                    bail!("no book titled '{title}'");
                };
                if !catalog.borrow_book(&user, id) {
                    bail!("'{title}' is not available");
                }
                vec![format!("{} '{title}'", "Checked out".success())]
            }
            Self::CheckIn { title, user } => {
                let Some(id) = catalog.search_book_by_title(&title).map(|b| b.id()) else {
                    bail!("no book titled '{title}'");
                };
                if !catalog.return_book(&user, id) {
                    bail!("'{title}' is not checked out");
                }
                vec![format!("{} '{title}'", "Checked in".success())]
            }
            Self::Report => {
                let lines: Vec<_> = catalog
                    .generate_report()
                    .map(|entry| entry.to_string())
                    .collect();
                if lines.is_empty() {
                    vec!["No transactions recorded.".dim()]
                } else {
                    lines
                }
            }
            Self::ShowAll => catalog
                .books()
                .map(|book| {
                    format!(
                        "Title: {}, Author: {}, Genre: {}, Available: {}",
                        book.title(),
                        book.author(),
                        book.genre(),
                        book.is_available()
                    )
                })
                .collect(),
            Self::Exit => Vec::new(),
        };
        Ok(lines)
    }
}

fn text(prompt: &str) -> anyhow::Result<String> {
    Ok(Input::<String>::new()
        .with_prompt(prompt)
        .interact_text()?
        .trim()
        .to_string())
}

fn optional(prompt: &str) -> anyhow::Result<Option<String>> {
    let value: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;
    let value = value.trim();
    Ok((!value.is_empty()).then(|| value.to_string()))
}

fn book_id() -> anyhow::Result<BookId> {
    let raw = text("Enter the book id")?;
    raw.parse()
        .with_context(|| format!("'{raw}' is not a valid book id"))
}

fn user_id() -> anyhow::Result<UserId> {
    let raw = text("Enter your user id")?;
    raw.parse()
        .with_context(|| format!("'{raw}' is not a valid user id"))
}

#[cfg(test)]
mod tests {
    use bookshelf::TransactionKind;

    use super::*;

    fn apply(action: Action, catalog: &mut Catalog) -> anyhow::Result<Vec<String>> {
        action.apply(catalog, ReadErrorPolicy::default())
    }

    #[test]
    fn add_then_show_all() {
        let mut catalog = Catalog::new();
        apply(
            Action::Add {
                title: "Test Book".to_string(),
                author: "Test Author".to_string(),
                genre: "Test Genre".to_string(),
                available: true,
            },
            &mut catalog,
        )
        .unwrap();

        let lines = apply(Action::ShowAll, &mut catalog).unwrap();
        assert_eq!(
            lines,
            ["Title: Test Book, Author: Test Author, Genre: Test Genre, Available: true"]
        );
    }

    #[test]
    fn check_out_and_in_by_title() {
        let mut catalog = Catalog::with_samples();
        let user: UserId = "u1".parse().unwrap();
        let check_out = || Action::CheckOut {
            title: "1984".to_string(),
            user: user.clone(),
        };

        apply(check_out(), &mut catalog).unwrap();
        assert!(apply(check_out(), &mut catalog).is_err());
        apply(
            Action::CheckIn {
                title: "1984".to_string(),
                user: user.clone(),
            },
            &mut catalog,
        )
        .unwrap();

        let kinds: Vec<_> = catalog.transactions().iter().map(|t| t.kind()).collect();
        assert_eq!(kinds, [TransactionKind::Borrow, TransactionKind::Return]);

        let report = apply(Action::Report, &mut catalog).unwrap();
        assert_eq!(report.len(), 2);
        assert!(report[0].starts_with("Transaction: borrow | Date: "));
    }

    #[test]
    fn unknown_titles_are_errors() {
        let mut catalog = Catalog::with_samples();
        assert!(apply(Action::RemoveByTitle("Missing".to_string()), &mut catalog).is_err());
        assert!(
            apply(
                Action::CheckIn {
                    title: "Missing".to_string(),
                    user: "u1".parse().unwrap(),
                },
                &mut catalog,
            )
            .is_err()
        );
        assert_eq!(catalog.len(), 3);
        assert!(catalog.transactions().is_empty());
    }

    #[test]
    fn remove_and_update_by_id() {
        let mut catalog = Catalog::with_samples();
        let gatsby = catalog.search_book_by_title("The Great Gatsby").unwrap().id();
        let moby = catalog.search_book_by_title("Moby Dick").unwrap().id();

        apply(
            Action::Update(gatsby, BookUpdate::default().with_genre("Jazz Age")),
            &mut catalog,
        )
        .unwrap();
        apply(Action::RemoveById(moby), &mut catalog).unwrap();

        assert_eq!(catalog.book(gatsby).unwrap().genre(), "Jazz Age");
        assert!(apply(Action::RemoveById(moby), &mut catalog).is_err());
        assert!(
            apply(Action::Update(moby, BookUpdate::default().with_title("X")), &mut catalog)
                .is_err()
        );
    }

    #[test]
    fn load_reports_skipped_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("books.csv");
        std::fs::write(&path, "A,B,C,true\nbad-line\nD,E,F,false\n").unwrap();
        let mut catalog = Catalog::new();

        let lines = apply(Action::Load(path), &mut catalog).unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("bad-line"));
        assert!(lines[1].contains("2 loaded, 1 skipped"));
    }

    #[test]
    fn only_mutations_need_authorization() {
        assert_eq!(Action::Report.task(), None);
        assert_eq!(Action::ShowAll.task(), None);
        assert_eq!(
            Action::RemoveByTitle(String::new()).task(),
            Some(Task::DeleteBook)
        );
    }
}
