//! Service and user credentials, and minting of the service credential.
//!
//! The service credential (Apple's "developer token") is an ES256 JWT:
//! header `{alg, kid}`, claims `{iss, iat, exp}`. It is never valid for more
//! than [`MAX_VALIDITY_DAYS`].

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::core::config::{AppleMusicConfig, PrivateKeySource};
use crate::domains::api::{ApiError, ApiResult};

/// Upper bound on a service credential's lifetime accepted by Apple.
pub const MAX_VALIDITY_DAYS: i64 = 180;

/// Signed assertion identifying this service to the upstream API.
#[derive(Clone, PartialEq, Eq)]
pub struct ServiceCredential {
    token: String,
    issued_at: DateTime<Utc>,
}

impl ServiceCredential {
    pub fn new(token: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            issued_at,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// The latest instant the credential can be valid.
    pub fn not_after(&self) -> DateTime<Utc> {
        self.issued_at + Duration::days(MAX_VALIDITY_DAYS)
    }
}

impl std::fmt::Debug for ServiceCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCredential")
            .field("token", &"[REDACTED]")
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// Opaque Music User Token, obtained out of band.
#[derive(Clone, PartialEq, Eq)]
pub struct UserCredential {
    token: String,
    issued_at: DateTime<Utc>,
}

impl UserCredential {
    pub fn new(token: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            issued_at,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }
}

impl std::fmt::Debug for UserCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserCredential")
            .field("token", &"[REDACTED]")
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// Mints service credentials.
pub trait CredentialSigner: Send + Sync {
    /// Produce a credential issued at `issued_at`.
    fn sign(&self, issued_at: DateTime<Utc>) -> ApiResult<ServiceCredential>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    iat: i64,
    exp: i64,
}

/// Issuer/key identity plus the ES256 private key used to sign.
#[derive(Clone)]
pub struct SigningIdentity {
    team_id: String,
    key_id: String,
    key: EncodingKey,
}

impl std::fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("team_id", &self.team_id)
            .field("key_id", &self.key_id)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl SigningIdentity {
    /// Build an identity from PEM-encoded PKCS#8 key material.
    pub fn new(
        team_id: impl Into<String>,
        key_id: impl Into<String>,
        private_key_pem: &str,
    ) -> ApiResult<Self> {
        let team_id = team_id.into();
        let key_id = key_id.into();

        if team_id.trim().is_empty() {
            return Err(ApiError::configuration("Team ID must not be empty"));
        }
        if key_id.trim().is_empty() {
            return Err(ApiError::configuration("Key ID must not be empty"));
        }

        let key = EncodingKey::from_ec_pem(private_key_pem.as_bytes()).map_err(|e| {
            ApiError::configuration(format!(
                "Private key is not a valid PKCS#8 EC (P-256) PEM key: {e}"
            ))
        })?;

        Ok(Self {
            team_id,
            key_id,
            key,
        })
    }

    /// Build an identity from configuration, failing fast on anything missing.
    pub fn from_config(config: &AppleMusicConfig) -> ApiResult<Self> {
        let team_id = config.team_id.as_deref().ok_or_else(|| {
            ApiError::configuration(
                "APPLE_MUSIC_TEAM_ID environment variable is required. \
                 Set it to your Apple Developer Team ID.",
            )
        })?;
        let key_id = config.key_id.as_deref().ok_or_else(|| {
            ApiError::configuration(
                "APPLE_MUSIC_KEY_ID environment variable is required. \
                 Set it to your MusicKit Key ID from the Apple Developer Portal.",
            )
        })?;
        let source = config.private_key.as_ref().ok_or_else(|| {
            ApiError::configuration(
                "APPLE_MUSIC_PRIVATE_KEY_PATH (path to your MusicKit .p8 key) or \
                 APPLE_MUSIC_PRIVATE_KEY (base64-encoded .p8 key) is required.",
            )
        })?;

        let pem = read_private_key(source)?;
        Self::new(team_id, key_id, &pem)
    }

    pub fn team_id(&self) -> &str {
        &self.team_id
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }
}

impl CredentialSigner for SigningIdentity {
    fn sign(&self, issued_at: DateTime<Utc>) -> ApiResult<ServiceCredential> {
        let iat = issued_at.timestamp();
        let claims = Claims {
            iss: self.team_id.clone(),
            iat,
            exp: iat + Duration::days(MAX_VALIDITY_DAYS).num_seconds(),
        };

        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(self.key_id.clone());

        let token = jsonwebtoken::encode(&header, &claims, &self.key)?;
        Ok(ServiceCredential::new(token, issued_at))
    }
}

/// Resolve a key source into PEM text.
fn read_private_key(source: &PrivateKeySource) -> ApiResult<String> {
    match source {
        PrivateKeySource::Pem(pem) => Ok(pem.clone()),
        PrivateKeySource::Path(path) => std::fs::read_to_string(path).map_err(|e| {
            ApiError::configuration(format!(
                "Failed to read private key file {}: {e}",
                path.display()
            ))
        }),
        PrivateKeySource::Base64(encoded) => {
            let bytes = STANDARD.decode(encoded.trim()).map_err(|e| {
                ApiError::configuration(format!("APPLE_MUSIC_PRIVATE_KEY is not valid base64: {e}"))
            })?;
            String::from_utf8(bytes).map_err(|_| {
                ApiError::configuration("APPLE_MUSIC_PRIVATE_KEY does not decode to PEM text")
            })
        }
    }
}
