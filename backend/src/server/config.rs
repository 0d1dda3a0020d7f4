//! Process configuration read from the environment at startup.
//!
//! All settings are resolved once into an explicit value object; nothing
//! reads the environment after boot and there are no package-level
//! mutable globals. The signing secret never appears in logs or errors.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::outbound::images::CloudinaryConfig;
use crate::outbound::security::{SigningSecret, DEFAULT_TOKEN_TTL};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Errors raised while resolving configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required variable is absent or empty.
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    /// A variable is present but unparsable.
    #[error("invalid value for {variable}: {reason}")]
    Invalid {
        /// Offending variable name.
        variable: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigError {
    fn invalid(variable: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            variable,
            reason: reason.into(),
        }
    }
}

/// Resolved process configuration.
#[derive(Debug)]
pub struct AppConfig {
    /// Socket address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// HMAC secret for session tokens.
    pub signing_secret: SigningSecret,
    /// Session token lifetime.
    pub token_ttl: Duration,
    /// Image host settings; uploads are disabled when absent.
    pub cloudinary: Option<CloudinaryConfig>,
}

impl AppConfig {
    /// Resolve configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_owned())
            .parse::<SocketAddr>()
            .map_err(|err| ConfigError::invalid("BIND_ADDR", err.to_string()))?;

        let database_url = required(&lookup, "DATABASE_URL")?;
        let signing_secret = SigningSecret::new(required(&lookup, "JWT_SECRET")?.into_bytes());

        let token_ttl = match lookup("TOKEN_TTL_HOURS") {
            None => DEFAULT_TOKEN_TTL,
            Some(raw) => {
                let hours: u64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::invalid("TOKEN_TTL_HOURS", "expected a whole number of hours"))?;
                if hours == 0 {
                    return Err(ConfigError::invalid("TOKEN_TTL_HOURS", "must be at least 1"));
                }
                Duration::from_secs(hours * 60 * 60)
            }
        };

        let cloudinary = match (
            nonempty(lookup("CLOUDINARY_CLOUD_NAME")),
            nonempty(lookup("CLOUDINARY_UPLOAD_PRESET")),
        ) {
            (Some(cloud_name), Some(upload_preset)) => Some(CloudinaryConfig {
                cloud_name,
                upload_preset,
                folder: nonempty(lookup("CLOUDINARY_FOLDER")),
            }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::Missing("CLOUDINARY_UPLOAD_PRESET"));
            }
            (None, Some(_)) => {
                return Err(ConfigError::Missing("CLOUDINARY_CLOUD_NAME"));
            }
        };

        Ok(Self {
            bind_addr,
            database_url,
            signing_secret,
            token_ttl,
            cloudinary,
        })
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<String, ConfigError> {
    nonempty(lookup(key)).ok_or(ConfigError::Missing(key))
}

fn nonempty(value: Option<String>) -> Option<String> {
    value.filter(|raw| !raw.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect()
    }

    fn resolve(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars = env(pairs);
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    const MINIMAL: &[(&str, &str)] = &[
        ("DATABASE_URL", "postgres://localhost/club"),
        ("JWT_SECRET", "super-secret"),
    ];

    #[rstest]
    fn minimal_environment_resolves_with_defaults() {
        let config = resolve(MINIMAL).expect("minimal config resolves");
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.token_ttl, DEFAULT_TOKEN_TTL);
        assert!(config.cloudinary.is_none());
    }

    #[rstest]
    #[case("DATABASE_URL")]
    #[case("JWT_SECRET")]
    fn required_variables_are_enforced(#[case] missing: &str) {
        let pairs: Vec<(&str, &str)> = MINIMAL
            .iter()
            .copied()
            .filter(|(key, _)| *key != missing)
            .collect();
        let err = resolve(&pairs).expect_err("missing variable rejected");
        assert!(matches!(err, ConfigError::Missing(_)));
    }

    #[rstest]
    fn token_ttl_override_is_parsed() {
        let mut pairs = MINIMAL.to_vec();
        pairs.push(("TOKEN_TTL_HOURS", "2"));
        let config = resolve(&pairs).expect("config resolves");
        assert_eq!(config.token_ttl, Duration::from_secs(2 * 60 * 60));
    }

    #[rstest]
    #[case("0")]
    #[case("soon")]
    fn bad_token_ttls_are_rejected(#[case] raw: &str) {
        let mut pairs = MINIMAL.to_vec();
        pairs.push(("TOKEN_TTL_HOURS", raw));
        let err = resolve(&pairs).expect_err("bad ttl rejected");
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[rstest]
    fn cloudinary_requires_both_cloud_name_and_preset() {
        let mut pairs = MINIMAL.to_vec();
        pairs.push(("CLOUDINARY_CLOUD_NAME", "demo"));
        let err = resolve(&pairs).expect_err("half-configured host rejected");
        assert_eq!(err, ConfigError::Missing("CLOUDINARY_UPLOAD_PRESET"));

        let mut pairs = MINIMAL.to_vec();
        pairs.push(("CLOUDINARY_CLOUD_NAME", "demo"));
        pairs.push(("CLOUDINARY_UPLOAD_PRESET", "club-unsigned"));
        let config = resolve(&pairs).expect("full host config resolves");
        let cloudinary = config.cloudinary.expect("cloudinary configured");
        assert_eq!(cloudinary.cloud_name, "demo");
    }

    #[rstest]
    fn invalid_bind_addr_is_rejected() {
        let mut pairs = MINIMAL.to_vec();
        pairs.push(("BIND_ADDR", "not-an-addr"));
        let err = resolve(&pairs).expect_err("bad bind addr rejected");
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }
}
