//! Pre-authentication endpoint resolution.
//!
//! Turns the configured service family into an ordered list of candidate
//! profiles. The OAuth handshake walks the list; it moves past a profile
//! only on an explicit wrong-service-family rejection from that host.

use quillpad_domain::constants::{
    PRODUCTION_HOST, PROFILE_NAME_INTERNATIONAL, PROFILE_NAME_REGIONAL, REGIONAL_HOST,
};
use quillpad_domain::{BootstrapProfile, ServiceFamily};

use super::config::SessionConfig;

/// Resolves bootstrap candidates for a configuration.
pub struct BootstrapResolver;

impl BootstrapResolver {
    /// Produce candidate profiles in the order they should be tried.
    ///
    /// A single-family configuration yields one profile, built from the
    /// configured host (so sandbox hosts resolve to sandbox endpoints).
    /// `Both` yields one profile per family, international first unless
    /// `known_family` — learned from persisted credentials or a previous
    /// wrong-service rejection — says the account lives on the regional
    /// deployment.
    #[must_use]
    pub fn resolve(
        config: &SessionConfig,
        known_family: Option<ServiceFamily>,
    ) -> Vec<BootstrapProfile> {
        let configured_family = Self::family_of_host(&config.host);

        let international = BootstrapProfile::for_host(
            PROFILE_NAME_INTERNATIONAL,
            if configured_family == ServiceFamily::International {
                &config.host
            } else {
                PRODUCTION_HOST
            },
        );
        let regional = BootstrapProfile::for_host(
            PROFILE_NAME_REGIONAL,
            if configured_family == ServiceFamily::Regional { &config.host } else { REGIONAL_HOST },
        );

        match config.service_family {
            ServiceFamily::International => vec![international],
            ServiceFamily::Regional => vec![regional],
            ServiceFamily::Both => {
                if known_family == Some(ServiceFamily::Regional) {
                    vec![regional, international]
                } else {
                    vec![international, regional]
                }
            }
        }
    }

    /// Judge which family a bare host belongs to. Anything that is not the
    /// well-known regional host (sandbox included) counts as international.
    #[must_use]
    pub fn family_of_host(host: &str) -> ServiceFamily {
        if host == REGIONAL_HOST {
            ServiceFamily::Regional
        } else {
            ServiceFamily::International
        }
    }
}
