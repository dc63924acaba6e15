use anyhow::bail;
use bookshelf::{Role, Task, User, UserId};
use clap::Parser;
use tracing::instrument;

use super::{terminal::Colorize, Session};

#[derive(Debug, clap::Subcommand)]
pub enum UserCommand {
    /// Register a user
    Add(Add),

    /// Remove a user
    Remove(Remove),

    /// List registered users
    List,
}

impl UserCommand {
    pub fn run(self, session: &Session) -> anyhow::Result<()> {
        match self {
            Self::Add(command) => command.run(session),
            Self::Remove(command) => command.run(session),
            Self::List => list(session),
        }
    }
}

#[derive(Debug, Parser)]
pub struct Add {
    /// Unique identifier for the user
    id: UserId,

    /// Display name, also used to log in
    name: String,

    /// admin, librarian or member
    #[arg(long, default_value = "member")]
    role: Role,

    /// Login password
    #[arg(long = "new-password", value_name = "PASSWORD")]
    password: String,
}

impl Add {
    #[instrument(skip(session, self), fields(id = %self.id))]
    fn run(self, session: &Session) -> anyhow::Result<()> {
        let mut catalog = session.load()?;
        // An empty registry cannot authorize anyone, so the first user is
        // always let in.
        if !catalog.users().is_empty() {
            session.authorize(&catalog, Task::AddUser)?;
        }

        let id = self.id.clone();
        if !catalog.add_user(User::new(self.id, self.name, self.role, self.password)) {
            bail!("user '{id}' already exists");
        }

        session.save(&catalog)?;
        println!("{} user {id}", "Added".success());
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct Remove {
    /// Identifier of the user to remove
    id: UserId,
}

impl Remove {
    #[instrument(skip(session))]
    fn run(self, session: &Session) -> anyhow::Result<()> {
        let mut catalog = session.load()?;
        session.authorize(&catalog, Task::DeleteUser)?;

        if catalog.remove_user(&self.id).is_none() {
            bail!("user '{}' not found", self.id);
        }

        session.save(&catalog)?;
        println!("{} user {}", "Removed".success(), self.id);
        Ok(())
    }
}

fn list(session: &Session) -> anyhow::Result<()> {
    let catalog = session.load()?;
    if catalog.users().is_empty() {
        println!("{}", "No users registered.".dim());
    }
    for user in catalog.users() {
        println!("{:<12} {:<10} {}", user.id().as_str(), user.role().to_string(), user.name());
    }
    Ok(())
}
