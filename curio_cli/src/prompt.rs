//! Interactive credential prompt for catalog logins

use async_trait::async_trait;
use curio_fetch_core::credentials::{CredentialPrompt, SecureString};
use curio_fetch_core::error::{FetchError, Result};
use dialoguer::{Input, Password};

/// Asks on the terminal, with the password masked.
pub struct TerminalPrompt {
    /// Pre-filled username from configuration, if any
    default_user: Option<String>,
}

impl TerminalPrompt {
    pub fn new(default_user: Option<String>) -> Self {
        Self { default_user }
    }
}

#[async_trait]
impl CredentialPrompt for TerminalPrompt {
    async fn prompt(&self, source: &str) -> Result<(String, SecureString)> {
        println!("{source} requires a login");

        let mut input = Input::new().with_prompt("Username");
        if let Some(user) = &self.default_user {
            input = input.default(user.clone());
        }
        let username: String = input
            .interact_text()
            .map_err(|e| FetchError::auth(format!("could not read username: {e}")))?;

        let password = Password::new()
            .with_prompt("Password")
            .interact()
            .map_err(|e| FetchError::auth(format!("could not read password: {e}")))?;

        Ok((username, SecureString::new(password)))
    }
}
