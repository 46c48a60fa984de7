//! Pre-authentication endpoint discovery types.

use serde::{Deserialize, Serialize};

use crate::constants::{
    OAUTH_AUTHORIZE_PATH, OAUTH_TOKEN_PATH, PRODUCTION_HOST, PROFILE_NAME_INTERNATIONAL,
    PROFILE_NAME_REGIONAL, REGIONAL_HOST, USER_STORE_PATH,
};

/// Which service deployment(s) an integration supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceFamily {
    /// The international deployment only.
    International,
    /// The regionally partitioned deployment only.
    Regional,
    /// Either deployment; bootstrap resolution orders the candidates.
    Both,
}

impl ServiceFamily {
    /// The well-known production host of a concrete family.
    ///
    /// `Both` has no single host; resolution expands it to an ordered list
    /// of concrete profiles first.
    #[must_use]
    pub fn default_host(self) -> Option<&'static str> {
        match self {
            Self::International => Some(PRODUCTION_HOST),
            Self::Regional => Some(REGIONAL_HOST),
            Self::Both => None,
        }
    }
}

/// Endpoint settings of one bootstrap candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapSettings {
    /// Host the profile speaks for.
    pub service_host: String,
    /// User-store RPC endpoint.
    pub user_store_url: String,
    /// OAuth temporary-credential and token-exchange endpoint.
    pub token_url: String,
    /// Browser-facing authorization page.
    pub authorize_url: String,
}

/// One candidate service endpoint, ordered by preference.
///
/// Produced by bootstrap resolution, consumed once during the OAuth
/// handshake, cached read-only on the session afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapProfile {
    /// Profile name as advertised by the service.
    pub name: String,
    /// Endpoint settings for the profile's host.
    pub settings: BootstrapSettings,
}

impl BootstrapProfile {
    /// Build a profile for a host using the well-known endpoint paths.
    #[must_use]
    pub fn for_host(name: &str, host: &str) -> Self {
        let base = format!("https://{host}");
        Self {
            name: name.to_string(),
            settings: BootstrapSettings {
                service_host: host.to_string(),
                user_store_url: format!("{base}{USER_STORE_PATH}"),
                token_url: format!("{base}{OAUTH_TOKEN_PATH}"),
                authorize_url: format!("{base}{OAUTH_AUTHORIZE_PATH}"),
            },
        }
    }

    /// The concrete family this profile belongs to, judged by its host.
    #[must_use]
    pub fn family(&self) -> ServiceFamily {
        if self.settings.service_host == REGIONAL_HOST
            || self.name == PROFILE_NAME_REGIONAL
        {
            ServiceFamily::Regional
        } else {
            ServiceFamily::International
        }
    }
}

/// Server-advertised bootstrap information (`get_bootstrap_info`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapInfo {
    /// Candidate profiles in server-preferred order.
    pub profiles: Vec<BootstrapProfile>,
}
