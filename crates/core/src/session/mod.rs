//! Session lifecycle: configuration, bootstrap resolution, the OAuth
//! handshake and the session state machine itself.

pub mod bootstrap;
pub mod config;
pub mod manager;
pub mod oauth;

pub use bootstrap::BootstrapResolver;
pub use config::SessionConfig;
pub use manager::Session;
pub use oauth::{HttpOAuthFlow, OAuthFlow, TemporaryCredential};
