//! Session configuration supplied by the embedding application.

use quillpad_domain::constants::SANDBOX_HOST;
use quillpad_domain::{QuillpadError, Result, ServiceFamily};

/// Consumer identity and target deployment for a session.
///
/// Obtained when registering the application with the service. The host is
/// usually [`PRODUCTION_HOST`](quillpad_domain::constants::PRODUCTION_HOST);
/// use [`SANDBOX_HOST`] while developing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Service host to bootstrap against.
    pub host: String,
    /// Consumer key issued to the application.
    pub consumer_key: String,
    /// Consumer secret issued to the application.
    pub consumer_secret: String,
    /// Which deployment(s) the application supports.
    pub service_family: ServiceFamily,
}

impl SessionConfig {
    /// Create a configuration.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        service_family: ServiceFamily,
    ) -> Self {
        Self {
            host: host.into(),
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            service_family,
        }
    }

    /// Sandbox configuration shorthand for development builds.
    #[must_use]
    pub fn sandbox(consumer_key: impl Into<String>, consumer_secret: impl Into<String>) -> Self {
        Self::new(SANDBOX_HOST, consumer_key, consumer_secret, ServiceFamily::International)
    }

    /// Check the consumer identity before any handshake is attempted.
    ///
    /// # Errors
    /// `Config` when the host or either consumer credential is missing or
    /// malformed.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(QuillpadError::Config("host must not be empty".into()));
        }
        if self.host.contains("://") {
            return Err(QuillpadError::Config(
                "host must be a bare hostname, not a URL".into(),
            ));
        }
        if self.consumer_key.trim().is_empty() {
            return Err(QuillpadError::Config("consumer key must not be empty".into()));
        }
        if self.consumer_secret.trim().is_empty() {
            return Err(QuillpadError::Config("consumer secret must not be empty".into()));
        }
        Ok(())
    }

    /// Redirect target registered for this consumer, received by the
    /// embedding application after the user authorizes.
    #[must_use]
    pub fn callback_url(&self) -> String {
        format!("{}://oauth-callback", self.consumer_key)
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for session configuration.
    use super::*;

    /// Validates `SessionConfig::validate` behavior for the missing
    /// credential scenarios.
    ///
    /// Assertions:
    /// - Ensures empty host, key and secret each fail with `Config`.
    /// - Ensures a URL-shaped host fails with `Config`.
    #[test]
    fn validate_rejects_incomplete_configs() {
        let valid = SessionConfig::sandbox("my-app", "s3cret");
        assert!(valid.validate().is_ok());

        let cases = [
            SessionConfig::new("", "k", "s", ServiceFamily::International),
            SessionConfig::new("https://sandbox.quillpad.com", "k", "s", ServiceFamily::Both),
            SessionConfig::new(SANDBOX_HOST, "", "s", ServiceFamily::International),
            SessionConfig::new(SANDBOX_HOST, "k", "", ServiceFamily::International),
        ];
        for config in cases {
            assert!(
                matches!(config.validate(), Err(QuillpadError::Config(_))),
                "expected Config error for {config:?}"
            );
        }
    }

    #[test]
    fn callback_url_derives_from_consumer_key() {
        let config = SessionConfig::sandbox("my-app", "s3cret");
        assert_eq!(config.callback_url(), "my-app://oauth-callback");
    }
}
