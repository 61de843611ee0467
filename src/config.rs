use std::time::Duration;
use thiserror::Error;

use crate::spotify::Credentials;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing spotify credentials")]
    MissingCredentials,
    #[error("Invalid {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Environment-sourced application configuration, validated once at startup.
///
/// Missing credentials are fatal-to-render: the caller latches the display
/// into error mode before the loop starts and never polls.
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    /// Minimum spacing between playback polls.
    pub poll_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an injected lookup so tests avoid process-global env state.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let client_id = get("SPOTIFY_CLIENT_ID");
        let client_secret = get("SPOTIFY_CLIENT_SECRET");
        let refresh_token = get("SPOTIFY_REFRESH_TOKEN");
        let (Some(client_id), Some(client_secret), Some(refresh_token)) =
            (client_id, client_secret, refresh_token)
        else {
            return Err(ConfigError::MissingCredentials);
        };

        let poll_secs = match get("SPOTIFY_POLL_INTERVAL") {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::Invalid {
                    name: "SPOTIFY_POLL_INTERVAL",
                    value,
                })?,
            None => DEFAULT_POLL_INTERVAL_SECS,
        };

        Ok(Self {
            credentials: Credentials {
                client_id,
                client_secret,
                refresh_token,
            },
            poll_interval: Duration::from_secs(poll_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    const FULL: &[(&str, &str)] = &[
        ("SPOTIFY_CLIENT_ID", "id"),
        ("SPOTIFY_CLIENT_SECRET", "secret"),
        ("SPOTIFY_REFRESH_TOKEN", "refresh"),
    ];

    #[test]
    fn loads_with_default_interval() {
        let cfg = Config::from_lookup(env(FULL)).unwrap();
        assert_eq!(cfg.credentials.client_id, "id");
        assert_eq!(cfg.poll_interval, Duration::from_secs(5));
    }

    #[test]
    fn interval_override_is_honored() {
        let mut pairs = FULL.to_vec();
        pairs.push(("SPOTIFY_POLL_INTERVAL", "30"));
        let cfg = Config::from_lookup(env(&pairs)).unwrap();
        assert_eq!(cfg.poll_interval, Duration::from_secs(30));
    }

    #[test]
    fn any_missing_credential_is_fatal() {
        for skip in [
            "SPOTIFY_CLIENT_ID",
            "SPOTIFY_CLIENT_SECRET",
            "SPOTIFY_REFRESH_TOKEN",
        ] {
            let pairs: Vec<_> = FULL.iter().copied().filter(|(k, _)| *k != skip).collect();
            assert!(matches!(
                Config::from_lookup(env(&pairs)),
                Err(ConfigError::MissingCredentials)
            ));
        }
    }

    #[test]
    fn bad_interval_is_a_validation_error() {
        let mut pairs = FULL.to_vec();
        pairs.push(("SPOTIFY_POLL_INTERVAL", "soon"));
        assert!(matches!(
            Config::from_lookup(env(&pairs)),
            Err(ConfigError::Invalid {
                name: "SPOTIFY_POLL_INTERVAL",
                ..
            })
        ));
    }
}
