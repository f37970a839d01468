//! Connection settings for the SCM server
//!
//! The password travels as a [`Secret`]: it can only be read back through an
//! explicit [`Secret::reveal`] call, and every formatting path redacts it.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::ConfigError;

/// Opaque credential
///
/// Serialized in its encoded (base64) form so persisted configuration never
/// carries the plaintext.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Secret(String);

impl Secret {
    /// Wraps a plaintext value
    pub fn new(plain: impl Into<String>) -> Self {
        Self(plain.into())
    }

    /// Decodes a persisted (base64) value
    pub fn from_encoded(encoded: &str) -> Result<Self, ConfigError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| ConfigError::InvalidSecret(e.to_string()))?;
        let plain = String::from_utf8(bytes).map_err(|e| ConfigError::InvalidSecret(e.to_string()))?;
        Ok(Self(plain))
    }

    /// Returns the persisted (base64) form
    pub fn encoded(&self) -> String {
        STANDARD.encode(self.0.as_bytes())
    }

    /// Returns the plaintext. Only call this at the point of use.
    pub fn reveal(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(****)")
    }
}

impl std::fmt::Display for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("****")
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encoded())
    }
}

impl<'de> Deserialize<'de> for Secret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Secret::from_encoded(&encoded).map_err(serde::de::Error::custom)
    }
}

/// Everything needed to open a session against the SCM server
///
/// Built once per run from the descriptor defaults and the step overrides,
/// then treated as immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Integration point host; empty means "talk to the server directly"
    pub integration_host: String,
    pub integration_port: u16,
    /// SCM server host
    pub host: String,
    pub port: u16,
    pub user_name: String,
    #[serde(rename = "encrypted_password")]
    pub password: Secret,
    /// Use an encrypted channel
    pub secure: bool,
    pub configuration_name: String,
}

impl ConnectionSettings {
    /// Host and port the API session connects to
    ///
    /// The integration point is preferred; without one the SCM server itself
    /// is used.
    pub fn api_endpoint(&self) -> (&str, u16) {
        if self.integration_host.trim().is_empty() {
            (self.host.as_str(), self.port)
        } else {
            (self.integration_host.as_str(), self.integration_port)
        }
    }

    /// URL scheme implied by the `secure` flag
    pub fn scheme(&self) -> &'static str {
        if self.secure { "https" } else { "http" }
    }
}
