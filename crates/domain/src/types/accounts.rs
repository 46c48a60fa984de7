//! Account, session and foreign-store descriptors.

use serde::{Deserialize, Serialize};

use super::entities::Guid;

/// The authenticated account as reported by the user store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Numeric account id.
    pub id: i64,
    /// Login name.
    pub username: String,
    /// Contact address, when the account shares it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Business tenancy membership, when the account has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_user_info: Option<BusinessUserInfo>,
}

/// Identifies the business tenancy an account belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessUserInfo {
    /// Numeric tenancy id.
    pub business_id: i32,
    /// Tenancy display name.
    pub business_name: String,
    /// The account's address within the tenancy.
    pub email: String,
}

/// A notebook shared into this account by another account.
///
/// Carries its own note-store URL: sync operations against it require a
/// client bound to that URL, never the personal note-store client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedNotebook {
    /// Server-assigned identifier.
    pub guid: Guid,
    /// Name the owner shared the notebook under.
    pub share_name: String,
    /// Owner's username.
    pub username: String,
    /// Note-store endpoint of the owning account.
    pub note_store_url: String,
    /// Web prefix of the owning account, for constructed links.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_api_url_prefix: Option<String>,
    /// Capability key granted by the share.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_key: Option<String>,
    /// Revision marker in the local account's changelog.
    pub update_sequence_num: i32,
}

/// What a completed authentication yields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationResult {
    /// Token to pass with every store call.
    pub auth_token: String,
    /// Note-store endpoint assigned to the account.
    pub note_store_url: String,
    /// Prefix for constructing web links into the account.
    pub web_api_url_prefix: String,
    /// Numeric account id.
    pub user_id: i64,
    /// Token expiration, epoch milliseconds.
    pub expiration: i64,
}

/// The persisted credential record.
///
/// Atomically replaced on successful authentication, atomically cleared on
/// logout; the session never writes individual fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    /// Host the handshake succeeded against.
    pub host: String,
    /// Numeric account id.
    pub user_id: i64,
    /// Personal authentication token.
    pub auth_token: String,
    /// User-store endpoint for this host.
    pub user_store_url: String,
    /// Note-store endpoint assigned to the account.
    pub note_store_url: String,
    /// Prefix for constructing web links into the account.
    pub web_api_url_prefix: String,
    /// Personal token expiration, epoch milliseconds.
    pub expiration: i64,
    /// Business token, present after `authenticate_to_business`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_auth_token: Option<String>,
    /// Business note-store endpoint, paired with `business_auth_token`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_note_store_url: Option<String>,
}

impl Credentials {
    /// Build the persisted record from a personal authentication outcome.
    #[must_use]
    pub fn from_authentication(
        host: &str,
        user_store_url: &str,
        auth: &AuthenticationResult,
    ) -> Self {
        Self {
            host: host.to_string(),
            user_id: auth.user_id,
            auth_token: auth.auth_token.clone(),
            user_store_url: user_store_url.to_string(),
            note_store_url: auth.note_store_url.clone(),
            web_api_url_prefix: auth.web_api_url_prefix.clone(),
            expiration: auth.expiration,
            business_auth_token: None,
            business_note_store_url: None,
        }
    }

    /// Fold a business authentication outcome into the record.
    #[must_use]
    pub fn with_business(mut self, auth: &AuthenticationResult) -> Self {
        self.business_auth_token = Some(auth.auth_token.clone());
        self.business_note_store_url = Some(auth.note_store_url.clone());
        self
    }
}
