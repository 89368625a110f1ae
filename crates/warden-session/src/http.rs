//! Identity confirmation over HTTP.
//!
//! The stock [`IdentityConfirmer`]: `GET {base_url}{me_path}` with the
//! token as a bearer credential, the same convention every other API call
//! of the application uses.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ConfirmationError, ConfirmedIdentity, IdentityConfirmer};

/// Where and how to reach the identity endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfirmerConfig {
    /// Scheme, host and optional prefix, e.g. `https://api.example.com`.
    pub base_url: String,

    /// Path of the "who am I" endpoint. Default: `/auth/me`.
    pub me_path: String,

    /// Whole-request timeout. A timeout counts as a failed confirmation.
    /// Default: 10 seconds.
    #[serde(with = "millis")]
    pub timeout: Duration,
}

impl Default for HttpConfirmerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".into(),
            me_path: "/auth/me".into(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl HttpConfirmerConfig {
    /// Default config pointed at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// The full endpoint URL, without doubled or missing slashes.
    pub fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = self.me_path.trim_start_matches('/');
        format!("{base}/{path}")
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Confirms tokens against an HTTP identity endpoint.
#[derive(Debug, Clone)]
pub struct HttpConfirmer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpConfirmer {
    /// # Errors
    /// [`ConfirmationError::Client`] if the TLS backend fails to initialize.
    pub fn new(config: &HttpConfirmerConfig) -> Result<Self, ConfirmationError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ConfirmationError::Client)?;
        Ok(Self::with_client(client, config))
    }

    /// Reuses an existing client (connection pool, proxies, etc.).
    pub fn with_client(client: reqwest::Client, config: &HttpConfirmerConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl IdentityConfirmer for HttpConfirmer {
    async fn confirm(&self, token: &str) -> Result<ConfirmedIdentity, ConfirmationError> {
        let response = self
            .client
            .get(&self.endpoint)
            .bearer_auth(token)
            .send()
            .await
            .map_err(ConfirmationError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConfirmationError::Status(status.as_u16()));
        }

        let identity = response
            .json::<ConfirmedIdentity>()
            .await
            .map_err(ConfirmationError::Body)?;
        debug!(role = ?identity.role, "identity confirmed");
        Ok(identity)
    }
}
