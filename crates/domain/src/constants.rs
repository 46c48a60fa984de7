//! Service-wide constants: well-known hosts, handshake paths, sync defaults.

/// Production host for the international deployment.
pub const PRODUCTION_HOST: &str = "www.quillpad.com";

/// Production host for the regionally partitioned deployment.
pub const REGIONAL_HOST: &str = "app.quillpad.cn";

/// Sandbox host. Use this for development and testing; accounts there are
/// disposable and rate limits are relaxed.
pub const SANDBOX_HOST: &str = "sandbox.quillpad.com";

/// Path of the user-store RPC endpoint, relative to a service host.
pub const USER_STORE_PATH: &str = "/rpc/userstore";

/// Path of the OAuth temporary-credential and token-exchange endpoint.
pub const OAUTH_TOKEN_PATH: &str = "/oauth/token";

/// Path of the browser-facing OAuth authorization page.
pub const OAUTH_AUTHORIZE_PATH: &str = "/oauth/authorize";

/// Error marker returned by a host when the account lives on the other
/// service family. Seeing this (and only this) justifies retrying the
/// handshake against the next bootstrap profile.
pub const WRONG_SERVICE_MARKER: &str = "unsupported_service_family";

/// Default page size for sync chunk requests.
pub const DEFAULT_MAX_ENTRIES: i32 = 100;

/// Protocol version advertised to the user store by `check_version`.
pub const CLIENT_PROTOCOL_MAJOR: i16 = 1;
/// Minor protocol version advertised alongside [`CLIENT_PROTOCOL_MAJOR`].
pub const CLIENT_PROTOCOL_MINOR: i16 = 28;

/// Bootstrap profile names, as advertised by the service.
pub const PROFILE_NAME_INTERNATIONAL: &str = "Quillpad";
/// Profile name of the regional deployment.
pub const PROFILE_NAME_REGIONAL: &str = "Quillpad-China";

/// RPC method names understood by the store endpoints.
pub mod rpc {
    /// Note-store: fetch the account sync watermark.
    pub const GET_SYNC_STATE: &str = "NoteStore.getSyncState";
    /// Note-store: fetch one sync chunk.
    pub const GET_SYNC_CHUNK: &str = "NoteStore.getSyncChunk";
    /// Note-store: fetch one sync chunk with a server-side filter.
    pub const GET_FILTERED_SYNC_CHUNK: &str = "NoteStore.getFilteredSyncChunk";
    /// Note-store: list all notebooks.
    pub const LIST_NOTEBOOKS: &str = "NoteStore.listNotebooks";
    /// Note-store: fetch one notebook by GUID.
    pub const GET_NOTEBOOK: &str = "NoteStore.getNotebook";
    /// Note-store: fetch the account's default notebook.
    pub const GET_DEFAULT_NOTEBOOK: &str = "NoteStore.getDefaultNotebook";
    /// Note-store: create a notebook.
    pub const CREATE_NOTEBOOK: &str = "NoteStore.createNotebook";
    /// Note-store: update a notebook, returning the new USN.
    pub const UPDATE_NOTEBOOK: &str = "NoteStore.updateNotebook";
    /// Note-store: expunge a notebook, returning the new USN.
    pub const EXPUNGE_NOTEBOOK: &str = "NoteStore.expungeNotebook";
    /// User-store: protocol version acceptance check.
    pub const CHECK_VERSION: &str = "UserStore.checkVersion";
    /// User-store: fetch the authenticated account.
    pub const GET_USER: &str = "UserStore.getUser";
    /// User-store: fetch server-advertised bootstrap profiles.
    pub const GET_BOOTSTRAP_INFO: &str = "UserStore.getBootstrapInfo";
    /// User-store: obtain a business token for the account's tenancy.
    pub const AUTHENTICATE_TO_BUSINESS: &str = "UserStore.authenticateToBusiness";
    /// User-store: revoke the current long session server-side.
    pub const REVOKE_LONG_SESSION: &str = "UserStore.revokeLongSession";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hosts_are_distinct() {
        assert_ne!(PRODUCTION_HOST, REGIONAL_HOST);
        assert_ne!(PRODUCTION_HOST, SANDBOX_HOST);
    }

    #[test]
    fn paths_are_absolute() {
        for path in [USER_STORE_PATH, OAUTH_TOKEN_PATH, OAUTH_AUTHORIZE_PATH] {
            assert!(path.starts_with('/'));
        }
    }
}
