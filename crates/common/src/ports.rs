//! Injectable capability seams.
//!
//! These traits abstract the SDK's external collaborators so tests can
//! substitute scripted implementations: the blocking RPC stub supplied by
//! the wire layer, and the browser/redirect surface that drives the OAuth
//! authorization step.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use quillpad_domain::Result;

/// A store endpoint a transport gets bound to: URL plus the token every
/// call on that transport will carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEndpoint {
    /// Store URL (user store, personal/business/linked note store).
    pub url: String,
    /// Authentication token for calls through this binding.
    pub auth_token: String,
}

impl StoreEndpoint {
    /// Bind a URL and token together.
    #[must_use]
    pub fn new(url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self { url: url.into(), auth_token: auth_token.into() }
    }
}

/// The opaque blocking RPC stub.
///
/// `call` blocks the current thread until the remote answers; the SDK only
/// ever invokes it through the dispatch bridge. Params and results are the
/// codec's JSON view of the wire structs; this crate never defines wire
/// bytes.
pub trait RpcTransport: Send + Sync {
    /// Execute one remote call and block until its result or fault.
    ///
    /// # Errors
    /// `Transport` for network/IO failure, `Server` for remote rejections.
    fn call(&self, method: &str, params: Value) -> Result<Value>;
}

/// Builds transports bound to a specific endpoint.
///
/// Each `connect` yields an independent binding; client factories call it
/// once per derived client, so two clients never share a transport.
pub trait RpcConnector: Send + Sync {
    /// Open a transport bound to `endpoint`.
    ///
    /// # Errors
    /// `Transport` when the endpoint is unreachable or the URL is invalid.
    fn connect(&self, endpoint: &StoreEndpoint) -> Result<Arc<dyn RpcTransport>>;
}

/// Outcome of presenting the authorization page to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationOutcome {
    /// The user granted access; the redirect carried this verifier.
    Authorized {
        /// Verification code to exchange for the final token.
        verifier: String,
    },
    /// The user dismissed the page without granting access.
    Cancelled,
}

/// The external browser/redirect capability used during the OAuth
/// handshake.
///
/// The SDK never renders UI; it hands the authorization URL to this
/// capability and waits for the redirect outcome.
#[async_trait]
pub trait AuthorizationUi: Send + Sync {
    /// Present `url` to the user and resolve with the redirect outcome.
    ///
    /// # Errors
    /// `Transport` when the surface itself fails (e.g. the embedder could
    /// not open a browser). User dismissal is not an error; it is
    /// [`AuthorizationOutcome::Cancelled`].
    async fn present_authorization(&self, url: &str) -> Result<AuthorizationOutcome>;
}
