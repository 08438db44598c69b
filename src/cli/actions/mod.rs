pub mod session;
pub mod users;

// Interpreter for `Action`, kept apart so this module only holds the variants.
mod run;

use crate::cli::globals::GlobalArgs;

#[derive(Debug)]
pub enum Action {
    Login(session::LoginArgs),
    Register(session::RegisterArgs),
    Logout,
    WhoAmI { refresh: bool },
    Users(users::Args),
}

impl Action {
    /// Execute the action against the configured backend and credentials file.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self, globals: &GlobalArgs) -> anyhow::Result<()> {
        run::execute(self, globals).await
    }
}
