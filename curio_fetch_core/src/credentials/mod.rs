//! Credential handling for authenticated sources
//!
//! Three authentication shapes cover every source: a static API key sent as
//! a query parameter or header, a bearer token with an expiry that must be
//! refreshed ahead of use, and interactive username/password pairs gathered
//! through a prompt seam. Secrets are held in [`SecureString`] so they are
//! zeroized on drop and never appear in debug output.

mod api_key;
mod basic;
mod secure;
mod token;

pub use api_key::ApiKey;
pub use basic::{BasicAuthManager, CredentialPrompt};
pub use secure::SecureString;
pub use token::{TokenManager, TokenState};
