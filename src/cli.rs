use std::path::PathBuf;

mod list;
mod menu;
mod show;
mod terminal;
mod user;

use anyhow::{bail, Context};
use bookshelf::{
    BookId, BookUpdate, Catalog, Config, ImportError, ReadErrorPolicy, RecordFile, Store, Task,
    TransactionKind, UserId,
};
use clap::ArgAction;
use list::{List, Report, Search};
use menu::Menu;
use show::Show;
use terminal::Colorize;
use tracing::instrument;
use user::UserCommand;

const DEFAULT_DATA: &str = "catalog.json";

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// The catalog snapshot to operate on [default: catalog.json]
    #[arg(short, long, global = true)]
    data: Option<PathBuf>,

    /// The configuration file
    #[arg(short, long, default_value = "shelf.toml", global = true)]
    config: PathBuf,

    /// Log in as this user (required when authorization is enabled)
    #[arg(short, long, global = true, requires = "password")]
    user: Option<String>,

    /// Password for --user
    #[arg(long, global = true, requires = "user")]
    password: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        let session = Session::open(self.config, self.data, self.user.zip(self.password))?;

        self.command
            .unwrap_or_else(|| Command::List(List::default()))
            .run(&session)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false)
            .with_writer(std::io::stderr);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

/// Everything a command needs to find, load, save and guard the catalog.
#[derive(Debug)]
pub struct Session {
    store: Store,
    config_path: PathBuf,
    config: Config,
    credentials: Option<(String, String)>,
}

impl Session {
    /// Reads the configuration and works out where the snapshot lives.
    ///
    /// An explicit `data` path wins over the one in the configuration.
    fn open(
        config_path: PathBuf,
        data: Option<PathBuf>,
        credentials: Option<(String, String)>,
    ) -> anyhow::Result<Self> {
        let config = Config::load_or_default(&config_path)
            .with_context(|| format!("invalid configuration in {}", config_path.display()))?;
        let data = data
            .or_else(|| config.data.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA));

        Ok(Self {
            store: Store::new(data),
            config_path,
            config,
            credentials,
        })
    }

    fn load(&self) -> anyhow::Result<Catalog> {
        self.store
            .load()
            .with_context(|| format!("failed to load catalog from {}", self.store.path().display()))
    }

    fn save(&self, catalog: &Catalog) -> anyhow::Result<()> {
        self.store
            .save(catalog)
            .with_context(|| format!("failed to save catalog to {}", self.store.path().display()))
    }

    /// Fails unless the logged-in user may perform `task`.
    ///
    /// A no-op when authorization is disabled in the configuration.
    fn authorize(&self, catalog: &Catalog, task: Task) -> anyhow::Result<()> {
        if !self.config.require_authorization {
            return Ok(());
        }

        let Some((name, password)) = &self.credentials else {
            bail!("'{task}' requires --user and --password");
        };
        let Some(user) = catalog.login(name, password) else {
            bail!("invalid credentials for '{name}'");
        };
        if !user.authorize(task) {
            bail!("user '{}' ({}) may not perform '{task}'", user.name(), user.role());
        }
        Ok(())
    }

    const fn read_error_policy(&self) -> ReadErrorPolicy {
        self.config.on_read_error
    }
}

/// Resolves a book given either its id or its exact (case-insensitive)
/// title.
fn resolve_book(catalog: &Catalog, reference: &str) -> Option<BookId> {
    if let Ok(id) = reference.parse::<BookId>() {
        return catalog.book(id).map(|book| book.id());
    }
    catalog.search_book_by_title(reference).map(|book| book.id())
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Create a configuration file and an empty catalog
    Init(Init),

    /// Add a book
    Add(Add),

    /// Remove books by title or by id
    Remove(Remove),

    /// Change some of a book's fields
    Update(Update),

    /// Lend a book to a user
    Borrow(Loan),

    /// Take a borrowed book back
    Return(Loan),

    /// Extend a loan
    Renew(Loan),

    /// List the books in the catalog (default)
    List(List),

    /// Search by title, author or genre
    Search(Search),

    /// Show a book and its transaction history
    Show(Show),

    /// Load books from a comma-separated file
    Import(Import),

    /// Write all books to a comma-separated file
    Export(Export),

    /// Print the transaction report
    Report(Report),

    /// Manage users
    #[command(subcommand)]
    User(UserCommand),

    /// Interactive menu
    Menu,
}

impl Command {
    fn run(self, session: &Session) -> anyhow::Result<()> {
        match self {
            Self::Init(command) => command.run(session)?,
            Self::Add(command) => command.run(session)?,
            Self::Remove(command) => command.run(session)?,
            Self::Update(command) => command.run(session)?,
            Self::Borrow(command) => command.run(session, TransactionKind::Borrow)?,
            Self::Return(command) => command.run(session, TransactionKind::Return)?,
            Self::Renew(command) => command.run(session, TransactionKind::Renew)?,
            Self::List(command) => command.run(session)?,
            Self::Search(command) => command.run(session)?,
            Self::Show(command) => command.run(session)?,
            Self::Import(command) => command.run(session)?,
            Self::Export(command) => command.run(session)?,
            Self::Report(command) => command.run(session)?,
            Self::User(command) => command.run(session)?,
            Self::Menu => Menu::run(session)?,
        }
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Init {
    /// Seed the catalog with three sample books
    #[arg(long)]
    samples: bool,

    /// Overwrite an existing catalog
    #[arg(long)]
    force: bool,
}

impl Init {
    #[instrument(skip(session))]
    fn run(self, session: &Session) -> anyhow::Result<()> {
        if session.store.exists() && !self.force {
            bail!(
                "catalog already exists at {} (use --force to overwrite)",
                session.store.path().display()
            );
        }

        if !session.config_path.exists() {
            session
                .config
                .save(&session.config_path)
                .context("failed to write configuration")?;
            println!("Created {}", session.config_path.display());
        }

        let catalog = if self.samples {
            Catalog::with_samples()
        } else {
            Catalog::new()
        };
        session.save(&catalog)?;

        println!(
            "Initialized catalog with {} book(s) in {}",
            catalog.len(),
            session.store.path().display()
        );
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Add {
    /// Title of the book
    title: String,

    /// Author of the book
    author: String,

    /// Genre of the book
    genre: String,

    /// Add the book as already borrowed
    #[arg(long)]
    borrowed: bool,
}

impl Add {
    #[instrument(skip(session))]
    fn run(self, session: &Session) -> anyhow::Result<()> {
        let mut catalog = session.load()?;
        session.authorize(&catalog, Task::AddBook)?;

        let id = catalog.add_book(self.title, self.author, self.genre, !self.borrowed);
        session.save(&catalog)?;

        println!("{} {id}", "Added".success());
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
#[command(group(clap::ArgGroup::new("target").required(true).args(["title", "id"])))]
pub struct Remove {
    /// Remove every book with this title (case-insensitive)
    #[arg(long)]
    title: Option<String>,

    /// Remove the book with this id
    #[arg(long)]
    id: Option<BookId>,
}

impl Remove {
    #[instrument(skip(session))]
    fn run(self, session: &Session) -> anyhow::Result<()> {
        let mut catalog = session.load()?;
        session.authorize(&catalog, Task::DeleteBook)?;

        let removed = match (self.title, self.id) {
            (Some(title), _) => catalog.delete_books_by_title(&title),
            (None, Some(id)) => usize::from(catalog.delete_book_by_id(id).is_some()),
            (None, None) => 0,
        };

        if removed == 0 {
            println!("{}", "No matching books.".warning());
            return Ok(());
        }

        session.save(&catalog)?;
        println!("{} {removed} book(s)", "Removed".success());
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Update {
    /// Id of the book to update
    id: BookId,

    /// New title
    #[arg(long)]
    title: Option<String>,

    /// New author
    #[arg(long)]
    author: Option<String>,

    /// New genre
    #[arg(long)]
    genre: Option<String>,

    /// New availability (true or false)
    #[arg(long)]
    available: Option<bool>,
}

impl Update {
    #[instrument(skip(session))]
    fn run(self, session: &Session) -> anyhow::Result<()> {
        let mut catalog = session.load()?;
        session.authorize(&catalog, Task::UpdateBook)?;

        if catalog.book(self.id).is_none() {
            bail!("book {} not found", self.id);
        }

        let update = BookUpdate {
            title: self.title,
            author: self.author,
            genre: self.genre,
            available: self.available,
        };
        if update.is_empty() {
            println!("Nothing to update.");
            return Ok(());
        }

        catalog.update_book(self.id, update);
        session.save(&catalog)?;
        println!("{} {}", "Updated".success(), self.id);
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Loan {
    /// Id or exact title of the book
    book: String,

    /// The user performing the transaction
    #[arg(long = "by", value_name = "USER_ID")]
    user: UserId,
}

impl Loan {
    #[instrument(skip(session))]
    fn run(self, session: &Session, kind: TransactionKind) -> anyhow::Result<()> {
        let mut catalog = session.load()?;
        session.authorize(&catalog, Task::from(kind))?;

        let Some(id) = resolve_book(&catalog, &self.book) else {
            bail!("book '{}' not found", self.book);
        };

        let (succeeded, done, refused) = match kind {
            TransactionKind::Borrow => (
                catalog.borrow_book(&self.user, id),
                "Checked out",
                "is already borrowed",
            ),
            TransactionKind::Return => (
                catalog.return_book(&self.user, id),
                "Checked in",
                "is not borrowed",
            ),
            TransactionKind::Renew => (
                catalog.renew_book(&self.user, id),
                "Renewed",
                "is not borrowed",
            ),
        };

        if !succeeded {
            bail!("book '{}' {refused}", self.book);
        }

        session.save(&catalog)?;
        println!("{} {id}", done.success());
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Import {
    /// The file to read, one `title,author,genre,true|false` record per line
    file: PathBuf,

    /// Keep books read before a read error instead of rolling them back
    #[arg(long)]
    keep_partial: bool,
}

impl Import {
    #[instrument(skip(session))]
    fn run(self, session: &Session) -> anyhow::Result<()> {
        let mut catalog = session.load()?;
        session.authorize(&catalog, Task::LoadBooks)?;

        let policy = if self.keep_partial {
            ReadErrorPolicy::KeepPartial
        } else {
            session.read_error_policy()
        };

        match RecordFile::new(&self.file).import_into(&mut catalog, policy) {
            Ok(summary) => {
                for skipped in &summary.skipped {
                    eprintln!("{} {skipped}", "Skipped".warning());
                }
                session.save(&catalog)?;
                println!(
                    "{} {} book(s), skipped {}",
                    "Loaded".success(),
                    summary.loaded(),
                    summary.skipped()
                );
                Ok(())
            }
            Err(error @ ImportError::Read { rolled_back: false, .. }) => {
                session.save(&catalog)?;
                Err(error).context("import stopped early; books read so far were kept")
            }
            Err(error) => {
                Err(error).with_context(|| format!("failed to import {}", self.file.display()))
            }
        }
    }
}

#[derive(Debug, clap::Parser)]
pub struct Export {
    /// The file to write
    file: PathBuf,
}

impl Export {
    #[instrument(skip(session))]
    fn run(self, session: &Session) -> anyhow::Result<()> {
        let catalog = session.load()?;
        let count = RecordFile::new(&self.file)
            .export(&catalog)
            .with_context(|| format!("failed to write {}", self.file.display()))?;
        println!(
            "{} {count} book(s) to {}",
            "Exported".success(),
            self.file.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bookshelf::{Role, User};
    use tempfile::TempDir;

    use super::*;

    fn session(tmp: &TempDir) -> Session {
        Session {
            store: Store::new(tmp.path().join("catalog.json")),
            config_path: tmp.path().join("shelf.toml"),
            config: Config::default(),
            credentials: None,
        }
    }

    fn seeded(tmp: &TempDir) -> Session {
        let session = session(tmp);
        Init {
            samples: true,
            force: false,
        }
        .run(&session)
        .expect("init should succeed");
        session
    }

    fn id_of(session: &Session, title: &str) -> BookId {
        session
            .load()
            .unwrap()
            .search_book_by_title(title)
            .expect("book should exist")
            .id()
    }

    #[test]
    fn init_writes_config_and_refuses_to_clobber() {
        let tmp = tempfile::tempdir().unwrap();
        let session = seeded(&tmp);

        assert!(session.config_path.exists());
        assert_eq!(session.load().unwrap().len(), 3);

        let again = Init {
            samples: false,
            force: false,
        };
        assert!(again.run(&session).is_err());

        Init {
            samples: false,
            force: true,
        }
        .run(&session)
        .unwrap();
        assert!(session.load().unwrap().is_empty());
    }

    #[test]
    fn add_persists_book() {
        let tmp = tempfile::tempdir().unwrap();
        let session = session(&tmp);

        Add {
            title: "Test Book".to_string(),
            author: "Test Author".to_string(),
            genre: "Test Genre".to_string(),
            borrowed: false,
        }
        .run(&session)
        .unwrap();

        let catalog = session.load().unwrap();
        let book = catalog.search_book_by_title("Test Book").unwrap();
        assert_eq!(book.author(), "Test Author");
        assert!(book.is_available());
    }

    #[test]
    fn remove_by_title_and_by_id() {
        let tmp = tempfile::tempdir().unwrap();
        let session = seeded(&tmp);

        Remove {
            title: Some("moby dick".to_string()),
            id: None,
        }
        .run(&session)
        .unwrap();
        assert_eq!(session.load().unwrap().len(), 2);

        let id = id_of(&session, "1984");
        Remove {
            title: None,
            id: Some(id),
        }
        .run(&session)
        .unwrap();
        let catalog = session.load().unwrap();
        assert!(catalog.book(id).is_none());
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn update_changes_only_given_fields() {
        let tmp = tempfile::tempdir().unwrap();
        let session = seeded(&tmp);
        let id = id_of(&session, "The Great Gatsby");

        Update {
            id,
            title: Some("Updated Title".to_string()),
            author: None,
            genre: None,
            available: Some(false),
        }
        .run(&session)
        .unwrap();

        let catalog = session.load().unwrap();
        let book = catalog.book(id).unwrap();
        assert_eq!(book.title(), "Updated Title");
        assert_eq!(book.author(), "F. Scott Fitzgerald");
        assert!(!book.is_available());
    }

    #[test]
    fn update_of_unknown_book_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let session = seeded(&tmp);
        let id = id_of(&session, "1984");
        Remove {
            title: None,
            id: Some(id),
        }
        .run(&session)
        .unwrap();

        let update = Update {
            id,
            title: Some("Ghost".to_string()),
            author: None,
            genre: None,
            available: None,
        };
        assert!(update.run(&session).is_err());
    }

    #[test]
    fn borrow_by_title_then_return_by_id() {
        let tmp = tempfile::tempdir().unwrap();
        let session = seeded(&tmp);
        let id = id_of(&session, "1984");

        let loan = |book: String, user: &str| Loan {
            book,
            user: user.parse().unwrap(),
        };

        loan("1984".to_string(), "u1")
            .run(&session, TransactionKind::Borrow)
            .unwrap();
        assert!(
            loan("1984".to_string(), "u2")
                .run(&session, TransactionKind::Borrow)
                .is_err()
        );
        loan(id.to_string(), "u1")
            .run(&session, TransactionKind::Renew)
            .unwrap();
        loan(id.to_string(), "u1")
            .run(&session, TransactionKind::Return)
            .unwrap();

        let catalog = session.load().unwrap();
        assert!(catalog.book(id).unwrap().is_available());
        let kinds: Vec<_> = catalog.history(id).map(|t| t.kind()).collect();
        assert_eq!(
            kinds,
            [
                TransactionKind::Borrow,
                TransactionKind::Renew,
                TransactionKind::Return
            ]
        );
    }

    #[test]
    fn import_loads_good_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let session = session(&tmp);
        let file = tmp.path().join("books.csv");
        std::fs::write(&file, "A,B,C,true\nbad-line\nD,E,F,false\n").unwrap();

        Import {
            file,
            keep_partial: false,
        }
        .run(&session)
        .unwrap();

        assert_eq!(session.load().unwrap().len(), 2);
    }

    #[test]
    fn import_of_missing_file_changes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let session = seeded(&tmp);

        let result = Import {
            file: tmp.path().join("nonexistent_file.csv"),
            keep_partial: false,
        }
        .run(&session);

        assert!(result.is_err());
        assert_eq!(session.load().unwrap().len(), 3);
    }

    #[test]
    fn export_writes_records() {
        let tmp = tempfile::tempdir().unwrap();
        let session = seeded(&tmp);
        let file = tmp.path().join("out.csv");

        Export { file: file.clone() }.run(&session).unwrap();

        let written = std::fs::read_to_string(file).unwrap();
        assert_eq!(written.lines().count(), 3);
        assert!(written.contains("1984,George Orwell,Dystopian,true"));
    }

    #[test]
    fn authorization_is_enforced_when_enabled() {
        let tmp = tempfile::tempdir().unwrap();
        let mut catalog = Catalog::with_samples();
        catalog.add_user(User::new(
            "lib".parse().unwrap(),
            "Libby",
            Role::Librarian,
            "pw",
        ));
        catalog.add_user(User::new(
            "mem".parse().unwrap(),
            "Mo",
            Role::Member,
            "pw",
        ));

        let mut session = session(&tmp);
        session.save(&catalog).unwrap();
        session.config.require_authorization = true;

        let add = || Add {
            title: "New".to_string(),
            author: "Someone".to_string(),
            genre: "Essay".to_string(),
            borrowed: false,
        };

        assert!(add().run(&session).is_err());

        session.credentials = Some(("Mo".to_string(), "pw".to_string()));
        assert!(add().run(&session).is_err());

        session.credentials = Some(("Libby".to_string(), "wrong".to_string()));
        assert!(add().run(&session).is_err());

        session.credentials = Some(("Libby".to_string(), "pw".to_string()));
        add().run(&session).unwrap();
        assert_eq!(session.load().unwrap().len(), 4);
    }

    #[test]
    fn resolve_book_accepts_id_or_title() {
        let catalog = Catalog::with_samples();
        let id = catalog.search_book_by_title("Moby Dick").unwrap().id();

        assert_eq!(resolve_book(&catalog, "moby dick"), Some(id));
        assert_eq!(resolve_book(&catalog, &id.to_string()), Some(id));
        assert_eq!(resolve_book(&catalog, "Missing"), None);
    }

    #[test]
    fn open_refuses_invalid_config() {
        let tmp = tempfile::tempdir().unwrap();
        let config = tmp.path().join("shelf.toml");
        std::fs::write(
            &config,
            "_version = \"1\"\nrequire_authorization = true\non_read_error = \"rollback\"\n",
        )
        .unwrap();

        let error = Session::open(config, None, None).unwrap_err();
        assert!(format!("{error:#}").contains("invalid configuration"));
    }

    #[test]
    fn open_without_config_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();

        let session = Session::open(tmp.path().join("shelf.toml"), None, None).unwrap();

        assert_eq!(session.config, Config::default());
        assert_eq!(session.store.path(), std::path::Path::new(DEFAULT_DATA));
    }

    #[test]
    fn open_prefers_explicit_data_path() {
        let tmp = tempfile::tempdir().unwrap();
        let config = tmp.path().join("shelf.toml");
        std::fs::write(&config, "_version = \"1\"\ndata = \"from-config.json\"\n").unwrap();

        let session = Session::open(config.clone(), None, None).unwrap();
        assert_eq!(session.store.path(), std::path::Path::new("from-config.json"));

        let explicit = tmp.path().join("explicit.json");
        let session = Session::open(config, Some(explicit.clone()), None).unwrap();
        assert_eq!(session.store.path(), explicit);
    }
}
