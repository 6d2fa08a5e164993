//! Agent configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use msel_core::types::EntityId;
use msel_realtime::{Area, BackoffPolicy, SyncConfig};

const DEFAULT_RECONNECT_MAX_SECS: u64 = 60;
const DEFAULT_RECONNECT_JITTER_SECS: u64 = 5;
const DEFAULT_KEEPALIVE_SECS: u64 = 15;
const DEFAULT_TOKEN_POLL_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// REST base URL, e.g. `https://host/api`.
    pub api_url: String,
    /// Realtime hub URL, e.g. `wss://host/hubs/main`.
    pub hub_url: String,
    pub token: String,
    /// The signed-in user, used for capability checks.
    pub user_id: EntityId,
    /// MSEL to open on start; the first of the user's MSELs when unset.
    pub msel_id: Option<EntityId>,
    pub area: Area,
    pub reconnect_max: Duration,
    pub reconnect_jitter: Duration,
    pub keepalive: Duration,
    /// File re-read periodically for a rotated token.
    pub token_file: Option<PathBuf>,
    pub token_poll: Duration,
}

impl AgentConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                      | Default |
    /// |------------------------------|---------|
    /// | `MSEL_API_URL`               | required |
    /// | `MSEL_HUB_URL`               | required |
    /// | `MSEL_TOKEN`                 | required |
    /// | `MSEL_USER_ID`               | required |
    /// | `MSEL_ID`                    | unset   |
    /// | `MSEL_AREA`                  | `home`  |
    /// | `MSEL_RECONNECT_MAX_SECS`    | `60`    |
    /// | `MSEL_RECONNECT_JITTER_SECS` | `5`     |
    /// | `MSEL_KEEPALIVE_SECS`        | `15`    |
    /// | `MSEL_TOKEN_FILE`            | unset   |
    /// | `MSEL_TOKEN_POLL_SECS`       | `30`    |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup` instead of the environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        let seconds = |name: &'static str, default: u64| -> Result<Duration, ConfigError> {
            match lookup(name) {
                None => Ok(Duration::from_secs(default)),
                Some(value) => value
                    .trim()
                    .parse()
                    .map(Duration::from_secs)
                    .map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                        var: name,
                        value,
                        reason: e.to_string(),
                    }),
            }
        };

        let user_id_raw = required("MSEL_USER_ID")?;
        let user_id = user_id_raw
            .trim()
            .parse::<EntityId>()
            .map_err(|e| ConfigError::Invalid {
                var: "MSEL_USER_ID",
                value: user_id_raw.clone(),
                reason: e.to_string(),
            })?;

        let msel_id = match lookup("MSEL_ID").filter(|value| !value.trim().is_empty()) {
            None => None,
            Some(value) => Some(value.trim().parse::<EntityId>().map_err(|e| ConfigError::Invalid {
                var: "MSEL_ID",
                value: value.clone(),
                reason: e.to_string(),
            })?),
        };

        let area = match lookup("MSEL_AREA") {
            None => Area::default(),
            Some(value) => value.parse::<Area>().map_err(|e| ConfigError::Invalid {
                var: "MSEL_AREA",
                value: value.clone(),
                reason: e.to_string(),
            })?,
        };

        Ok(Self {
            api_url: required("MSEL_API_URL")?,
            hub_url: required("MSEL_HUB_URL")?,
            token: required("MSEL_TOKEN")?.trim().to_string(),
            user_id,
            msel_id,
            area,
            reconnect_max: seconds("MSEL_RECONNECT_MAX_SECS", DEFAULT_RECONNECT_MAX_SECS)?,
            reconnect_jitter: seconds("MSEL_RECONNECT_JITTER_SECS", DEFAULT_RECONNECT_JITTER_SECS)?,
            keepalive: seconds("MSEL_KEEPALIVE_SECS", DEFAULT_KEEPALIVE_SECS)?,
            token_file: lookup("MSEL_TOKEN_FILE")
                .filter(|path| !path.trim().is_empty())
                .map(PathBuf::from),
            token_poll: seconds("MSEL_TOKEN_POLL_SECS", DEFAULT_TOKEN_POLL_SECS)?,
        })
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            hub_url: self.hub_url.clone(),
            backoff: BackoffPolicy {
                max_delay: self.reconnect_max,
                max_jitter: self.reconnect_jitter,
                ..BackoffPolicy::default()
            },
            keepalive_interval: self.keepalive,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    const USER: &str = "7c9e6679-7425-40de-944b-e07fc1f90ae7";

    fn required() -> Vec<(&'static str, &'static str)> {
        vec![
            ("MSEL_API_URL", "http://localhost:4300/api"),
            ("MSEL_HUB_URL", "ws://localhost:4300/hubs/main"),
            ("MSEL_TOKEN", "token\n"),
            ("MSEL_USER_ID", USER),
        ]
    }

    #[test]
    fn defaults_apply() {
        let config = AgentConfig::from_lookup(env(&required())).unwrap();

        assert_eq!(config.token, "token");
        assert_eq!(config.user_id.to_string(), USER);
        assert_eq!(config.area, Area::Home);
        assert!(config.msel_id.is_none());
        assert_eq!(config.reconnect_max, Duration::from_secs(60));
        assert_eq!(config.reconnect_jitter, Duration::from_secs(5));
        assert_eq!(config.keepalive, Duration::from_secs(15));
        assert!(config.token_file.is_none());

        let sync = config.sync_config();
        assert_eq!(sync.backoff.max_delay, Duration::from_secs(60));
        assert_eq!(sync.keepalive_interval, Duration::from_secs(15));
    }

    #[test]
    fn overrides_apply() {
        let mut pairs = required();
        pairs.extend([
            ("MSEL_AREA", "admin"),
            ("MSEL_ID", USER),
            ("MSEL_RECONNECT_MAX_SECS", "30"),
            ("MSEL_TOKEN_FILE", "/run/secrets/msel-token"),
        ]);
        let config = AgentConfig::from_lookup(env(&pairs)).unwrap();

        assert_eq!(config.area, Area::Admin);
        assert_eq!(config.msel_id.map(|id| id.to_string()).as_deref(), Some(USER));
        assert_eq!(config.reconnect_max, Duration::from_secs(30));
        assert_eq!(config.token_file, Some(PathBuf::from("/run/secrets/msel-token")));
    }

    #[test]
    fn missing_required_variable_is_reported() {
        let pairs: Vec<_> = required()
            .into_iter()
            .filter(|(k, _)| *k != "MSEL_HUB_URL")
            .collect();
        assert_matches!(
            AgentConfig::from_lookup(env(&pairs)),
            Err(ConfigError::Missing("MSEL_HUB_URL"))
        );
    }

    #[test]
    fn invalid_values_are_reported() {
        let mut pairs = required();
        pairs.push(("MSEL_KEEPALIVE_SECS", "soon"));
        assert_matches!(
            AgentConfig::from_lookup(env(&pairs)),
            Err(ConfigError::Invalid { var: "MSEL_KEEPALIVE_SECS", .. })
        );

        let mut pairs = required();
        pairs.retain(|(k, _)| *k != "MSEL_USER_ID");
        pairs.push(("MSEL_USER_ID", "42"));
        assert_matches!(
            AgentConfig::from_lookup(env(&pairs)),
            Err(ConfigError::Invalid { var: "MSEL_USER_ID", .. })
        );
    }
}
