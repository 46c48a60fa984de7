//! Async wrappers over the user-store stub.
//!
//! Everything here follows the same shape: build params, run the blocking
//! call on the dispatch bridge, decode the result. No retries, no caching.

use std::sync::Arc;

use serde_json::json;
use tracing::debug;

use quillpad_common::dispatch::dispatch_blocking;
use quillpad_common::ports::RpcTransport;
use quillpad_domain::constants::{rpc, CLIENT_PROTOCOL_MAJOR, CLIENT_PROTOCOL_MINOR};
use quillpad_domain::{AuthenticationResult, BootstrapInfo, Result, User};

use crate::rpc::decode;

/// Client for the account-level (user store) operations.
///
/// Instances are independent and not meant to be shared across concurrent
/// callers; derive one per use via the session or [`crate::ClientFactory`].
pub struct UserStoreClient {
    transport: Arc<dyn RpcTransport>,
}

impl UserStoreClient {
    pub(crate) fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self { transport }
    }

    /// Whether the service accepts this SDK's protocol version.
    ///
    /// # Errors
    /// Transport or server faults from the underlying call.
    pub async fn check_version(&self, client_name: &str) -> Result<bool> {
        let transport = Arc::clone(&self.transport);
        let params = json!({
            "clientName": client_name,
            "major": CLIENT_PROTOCOL_MAJOR,
            "minor": CLIENT_PROTOCOL_MINOR,
        });
        let value =
            dispatch_blocking(move || transport.call(rpc::CHECK_VERSION, params)).await?;
        decode(value, "version check result")
    }

    /// Fetch the authenticated account.
    ///
    /// # Errors
    /// Transport or server faults from the underlying call.
    pub async fn get_user(&self) -> Result<User> {
        let transport = Arc::clone(&self.transport);
        let value = dispatch_blocking(move || transport.call(rpc::GET_USER, json!({}))).await?;
        decode(value, "user record")
    }

    /// Fetch server-advertised bootstrap profiles.
    ///
    /// # Errors
    /// Transport or server faults from the underlying call.
    pub async fn get_bootstrap_info(&self) -> Result<BootstrapInfo> {
        let transport = Arc::clone(&self.transport);
        let value =
            dispatch_blocking(move || transport.call(rpc::GET_BOOTSTRAP_INFO, json!({}))).await?;
        decode(value, "bootstrap info")
    }

    /// Obtain a business token for the account's tenancy.
    ///
    /// # Errors
    /// `Server(PermissionDenied)` when the account is not a business member;
    /// transport faults otherwise.
    pub async fn authenticate_to_business(&self) -> Result<AuthenticationResult> {
        let transport = Arc::clone(&self.transport);
        debug!("authenticating to business note store");
        let value =
            dispatch_blocking(move || transport.call(rpc::AUTHENTICATE_TO_BUSINESS, json!({})))
                .await?;
        decode(value, "business authentication result")
    }

    /// Revoke the current long session server-side.
    ///
    /// `Session::logout` clears local state only; call this first when the
    /// token itself should stop working.
    ///
    /// # Errors
    /// Transport or server faults from the underlying call.
    pub async fn revoke_long_session(&self) -> Result<()> {
        let transport = Arc::clone(&self.transport);
        dispatch_blocking(move || transport.call(rpc::REVOKE_LONG_SESSION, json!({}))).await?;
        Ok(())
    }
}
