use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Environment variable holding the API origin.
pub const BASE_URL_ENV: &str = "API_BASE_URL";
/// Name used by the original web front-end build, accepted as a fallback.
pub const LEGACY_BASE_URL_ENV: &str = "VITE_API_BASE_URL";
/// Environment variable holding the per-request deadline in seconds.
pub const TIMEOUT_ENV: &str = "API_TIMEOUT_SECS";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

fn default_timeout() -> Option<Duration> {
    Some(DEFAULT_TIMEOUT)
}

/// Client configuration, passed explicitly to [`crate::ApiClient::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Origin prepended to every path; `None` keeps paths relative.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Per-request deadline; `None` waits indefinitely.
    #[serde(rename = "timeout_secs", default = "default_timeout", with = "timeout_secs")]
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: default_timeout(),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the deadline; a zero duration disables it.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use travel_order_client::config::ClientConfig;
    ///
    /// let config = ClientConfig::default().with_timeout(Duration::from_millis(500));
    /// assert_eq!(config.timeout(), Some(Duration::from_millis(500)));
    /// assert_eq!(ClientConfig::default().with_timeout(Duration::ZERO).timeout(), None);
    /// ```
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidConfig`] when the timeout is not a whole number.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Empty values count as unset. A timeout of `0` disables the deadline.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use travel_order_client::config::ClientConfig;
    ///
    /// let vars = HashMap::from([("API_BASE_URL", "http://localhost:8000")]);
    /// let config = ClientConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
    /// assert_eq!(config.base_url.as_deref(), Some("http://localhost:8000"));
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let base_url = non_empty(BASE_URL_ENV).or_else(|| non_empty(LEGACY_BASE_URL_ENV));
        let timeout = match non_empty(TIMEOUT_ENV) {
            None => default_timeout(),
            Some(raw) => {
                let secs = raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|err| ClientError::InvalidConfig {
                        field: TIMEOUT_ENV.to_string(),
                        reason: format!("expected whole seconds, got {raw:?}: {err}"),
                    })?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
        };

        Ok(Self {
            base_url,
            timeout,
        })
    }

    /// Joins `path` onto the base URL.
    ///
    /// # Examples
    ///
    /// ```
    /// use travel_order_client::config::ClientConfig;
    ///
    /// let config = ClientConfig::default().with_base_url("http://localhost:8000/");
    /// assert_eq!(config.resolve_url("api/sncf/find-route"), "http://localhost:8000/api/sncf/find-route");
    /// assert_eq!(ClientConfig::default().resolve_url("/api/audio-to-text"), "/api/audio-to-text");
    /// ```
    pub fn resolve_url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        match &self.base_url {
            Some(base) => format!("{}/{path}", base.trim_end_matches('/')),
            None => format!("/{path}"),
        }
    }
}

/// Wire form of the deadline: whole seconds, `0` or `null` for none.
mod timeout_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(timeout: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match timeout {
            Some(timeout) => serializer.serialize_some(&timeout.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        let secs = Option::<f64>::deserialize(deserializer)?;
        match secs {
            None => Ok(None),
            Some(secs) if secs == 0.0 => Ok(None),
            Some(secs) => Duration::try_from_secs_f64(secs)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}
