//! The three-legged OAuth handshake against a resolved bootstrap profile.
//!
//! The flow is behind a trait so session tests can script it; the
//! production implementation speaks HTTP through `reqwest`. The service
//! uses the PLAINTEXT signature over TLS, so no digest crates are involved;
//! what matters here is the leg sequencing and the structured error
//! mapping (wrong service family vs. rejected consumer vs. transport).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::debug;

use quillpad_domain::constants::WRONG_SERVICE_MARKER;
use quillpad_domain::{
    AuthFailure, AuthenticationResult, BootstrapProfile, QuillpadError, Result,
};

use super::config::SessionConfig;

/// Temporary credential from the first OAuth leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemporaryCredential {
    /// Temporary token, carried into the authorization URL.
    pub token: String,
    /// Secret paired with the temporary token, used in the exchange leg.
    pub secret: String,
}

/// Drives the OAuth handshake for one bootstrap profile.
#[async_trait]
pub trait OAuthFlow: Send + Sync {
    /// First leg: obtain a temporary credential from the profile's token
    /// endpoint.
    ///
    /// # Errors
    /// `Transport` for network failure; `Auth` for rejections, with
    /// `WrongServiceFamily` kept distinct so the session can fall through
    /// to the next profile.
    async fn request_temporary_credential(
        &self,
        profile: &BootstrapProfile,
        config: &SessionConfig,
    ) -> Result<TemporaryCredential>;

    /// Second leg: the URL the user must authorize at.
    fn authorization_url(
        &self,
        profile: &BootstrapProfile,
        temporary: &TemporaryCredential,
    ) -> String;

    /// Third leg: exchange the authorized temporary credential and verifier
    /// for the final token and derived store URLs.
    ///
    /// # Errors
    /// `Transport` for network failure; `Auth(HandshakeFailed)` when the
    /// response is rejected or incomplete.
    async fn exchange_for_token(
        &self,
        profile: &BootstrapProfile,
        config: &SessionConfig,
        temporary: &TemporaryCredential,
        verifier: &str,
    ) -> Result<AuthenticationResult>;
}

/// Production OAuth flow over HTTP.
pub struct HttpOAuthFlow {
    client: reqwest::Client,
}

impl Default for HttpOAuthFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpOAuthFlow {
    /// Create a flow with a 30 second request timeout.
    #[must_use]
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }

    fn nonce() -> String {
        rand::thread_rng().sample_iter(&Alphanumeric).take(16).map(char::from).collect()
    }

    fn base_params(config: &SessionConfig, token_secret: &str) -> Vec<(String, String)> {
        vec![
            ("oauth_consumer_key".into(), config.consumer_key.clone()),
            ("oauth_signature".into(), format!("{}&{token_secret}", config.consumer_secret)),
            ("oauth_signature_method".into(), "PLAINTEXT".into()),
            ("oauth_timestamp".into(), Utc::now().timestamp().to_string()),
            ("oauth_nonce".into(), Self::nonce()),
        ]
    }

    async fn post_form(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> Result<HashMap<String, String>> {
        let response = self
            .client
            .post(url)
            .form(params)
            .send()
            .await
            .map_err(|e| QuillpadError::Transport(format!("handshake request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| QuillpadError::Transport(format!("handshake response unreadable: {e}")))?;

        if !status.is_success() {
            return Err(Self::classify_rejection(status, &body));
        }

        Ok(url::form_urlencoded::parse(body.as_bytes()).into_owned().collect())
    }

    fn classify_rejection(status: reqwest::StatusCode, body: &str) -> QuillpadError {
        if body.contains(WRONG_SERVICE_MARKER) {
            return QuillpadError::Auth(AuthFailure::WrongServiceFamily);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return QuillpadError::Auth(AuthFailure::InvalidConsumerCredentials);
        }
        QuillpadError::Auth(AuthFailure::HandshakeFailed(format!(
            "token endpoint returned {status}"
        )))
    }

    fn required<'a>(fields: &'a HashMap<String, String>, name: &str) -> Result<&'a str> {
        fields.get(name).map(String::as_str).filter(|v| !v.is_empty()).ok_or_else(|| {
            QuillpadError::Auth(AuthFailure::HandshakeFailed(format!(
                "token response missing {name}"
            )))
        })
    }
}

#[async_trait]
impl OAuthFlow for HttpOAuthFlow {
    async fn request_temporary_credential(
        &self,
        profile: &BootstrapProfile,
        config: &SessionConfig,
    ) -> Result<TemporaryCredential> {
        let mut params = Self::base_params(config, "");
        params.push(("oauth_callback".into(), config.callback_url()));

        debug!(host = %profile.settings.service_host, "requesting temporary credential");
        let fields = self.post_form(&profile.settings.token_url, &params).await?;

        Ok(TemporaryCredential {
            token: Self::required(&fields, "oauth_token")?.to_string(),
            secret: fields.get("oauth_token_secret").cloned().unwrap_or_default(),
        })
    }

    fn authorization_url(
        &self,
        profile: &BootstrapProfile,
        temporary: &TemporaryCredential,
    ) -> String {
        format!(
            "{}?oauth_token={}",
            profile.settings.authorize_url,
            urlencoding::encode(&temporary.token)
        )
    }

    async fn exchange_for_token(
        &self,
        profile: &BootstrapProfile,
        config: &SessionConfig,
        temporary: &TemporaryCredential,
        verifier: &str,
    ) -> Result<AuthenticationResult> {
        let mut params = Self::base_params(config, &temporary.secret);
        params.push(("oauth_token".into(), temporary.token.clone()));
        params.push(("oauth_verifier".into(), verifier.to_string()));

        debug!(host = %profile.settings.service_host, "exchanging authorized credential");
        let fields = self.post_form(&profile.settings.token_url, &params).await?;

        let user_id = Self::required(&fields, "user_id")?
            .parse::<i64>()
            .map_err(|_| {
                QuillpadError::Auth(AuthFailure::HandshakeFailed(
                    "token response carried a non-numeric user_id".into(),
                ))
            })?;
        let expiration = fields
            .get("expires")
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or_default();

        Ok(AuthenticationResult {
            auth_token: Self::required(&fields, "oauth_token")?.to_string(),
            note_store_url: Self::required(&fields, "note_store_url")?.to_string(),
            web_api_url_prefix: Self::required(&fields, "web_api_url_prefix")?.to_string(),
            user_id,
            expiration,
        })
    }
}

#[cfg(test)]
mod tests {
    //! Handshake tests against a local wiremock server.
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use quillpad_domain::{BootstrapSettings, ServiceFamily};

    use super::*;

    fn profile_for(server: &MockServer) -> BootstrapProfile {
        BootstrapProfile {
            name: "Quillpad".into(),
            settings: BootstrapSettings {
                service_host: "localhost".into(),
                user_store_url: format!("{}/rpc/userstore", server.uri()),
                token_url: format!("{}/oauth/token", server.uri()),
                authorize_url: format!("{}/oauth/authorize", server.uri()),
            },
        }
    }

    fn test_config() -> SessionConfig {
        SessionConfig::new("sandbox.quillpad.com", "my-app", "s3cret", ServiceFamily::International)
    }

    /// Validates the first leg for the temporary credential scenario.
    ///
    /// Assertions:
    /// - Ensures the request carries the consumer key and callback.
    /// - Confirms the parsed temporary token and secret.
    #[tokio::test]
    async fn temporary_credential_leg() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("oauth_consumer_key=my-app"))
            .and(body_string_contains("oauth_callback=my-app%3A%2F%2Foauth-callback"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("oauth_token=tmp-1&oauth_token_secret=tmp-secret"),
            )
            .mount(&server)
            .await;

        let flow = HttpOAuthFlow::new();
        let temporary = flow
            .request_temporary_credential(&profile_for(&server), &test_config())
            .await
            .unwrap();
        assert_eq!(temporary.token, "tmp-1");
        assert_eq!(temporary.secret, "tmp-secret");
    }

    #[tokio::test]
    async fn authorization_url_carries_temporary_token() {
        let server = MockServer::start().await;
        let flow = HttpOAuthFlow::new();
        let temporary = TemporaryCredential { token: "tmp token".into(), secret: String::new() };

        let url = flow.authorization_url(&profile_for(&server), &temporary);
        assert!(url.starts_with(&format!("{}/oauth/authorize?", server.uri())));
        assert!(url.ends_with("oauth_token=tmp%20token"));
    }

    /// Validates the exchange leg for the derived-URL scenario.
    #[tokio::test]
    async fn exchange_leg_parses_derived_urls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("oauth_verifier=v-9"))
            .and(body_string_contains("oauth_token=tmp-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "oauth_token=S%3Ds1%3Atok&note_store_url=https%3A%2F%2Fh%2Fshard%2Fs1%2Fnotestore\
                 &web_api_url_prefix=https%3A%2F%2Fh%2Fshard%2Fs1%2F&user_id=42&expires=1900000000000",
            ))
            .mount(&server)
            .await;

        let flow = HttpOAuthFlow::new();
        let temporary = TemporaryCredential { token: "tmp-1".into(), secret: "tmp-secret".into() };
        let auth = flow
            .exchange_for_token(&profile_for(&server), &test_config(), &temporary, "v-9")
            .await
            .unwrap();

        assert_eq!(auth.auth_token, "S=s1:tok");
        assert_eq!(auth.note_store_url, "https://h/shard/s1/notestore");
        assert_eq!(auth.web_api_url_prefix, "https://h/shard/s1/");
        assert_eq!(auth.user_id, 42);
        assert_eq!(auth.expiration, 1_900_000_000_000);
    }

    /// Validates rejection classification for the wrong-service scenario.
    ///
    /// Assertions:
    /// - Ensures a wrong-service body maps to `AuthFailure::WrongServiceFamily`.
    /// - Ensures a plain 401 maps to `InvalidConsumerCredentials`.
    #[tokio::test]
    async fn rejection_classification() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string("error=unsupported_service_family"),
            )
            .mount(&server)
            .await;

        let flow = HttpOAuthFlow::new();
        let err = flow
            .request_temporary_credential(&profile_for(&server), &test_config())
            .await
            .unwrap_err();
        assert_eq!(err, QuillpadError::Auth(AuthFailure::WrongServiceFamily));

        server.reset().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(401).set_body_string("error=invalid_consumer"))
            .mount(&server)
            .await;

        let err = flow
            .request_temporary_credential(&profile_for(&server), &test_config())
            .await
            .unwrap_err();
        assert_eq!(err, QuillpadError::Auth(AuthFailure::InvalidConsumerCredentials));
    }

    /// An incomplete exchange response fails with `HandshakeFailed` rather
    /// than a partial result.
    #[tokio::test]
    async fn incomplete_exchange_response_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("oauth_token=S%3Ds1%3Atok"))
            .mount(&server)
            .await;

        let flow = HttpOAuthFlow::new();
        let temporary = TemporaryCredential { token: "tmp-1".into(), secret: String::new() };
        let err = flow
            .exchange_for_token(&profile_for(&server), &test_config(), &temporary, "v")
            .await
            .unwrap_err();
        assert!(matches!(err, QuillpadError::Auth(AuthFailure::HandshakeFailed(_))));
    }
}
