//! Durable record of the latest service and user credentials.
//!
//! The file is JSON, rewritten in full on every update through a temporary
//! file and a rename, and restricted to the owning user. A missing or
//! unreadable file yields an empty store rather than an error.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use super::credential::{ServiceCredential, UserCredential};

/// File name inside the configuration directory.
pub const TOKENS_FILE: &str = "tokens.json";

/// On-disk layout. Timestamps are milliseconds since the Unix epoch.
///
/// The `developerToken`/`musicUserToken` names written by earlier releases
/// are still accepted on read.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCredentials {
    #[serde(default, alias = "developerToken", skip_serializing_if = "Option::is_none")]
    pub service_credential: Option<String>,
    #[serde(
        default,
        alias = "developerTokenCreatedAt",
        skip_serializing_if = "Option::is_none"
    )]
    pub service_credential_issued_at: Option<i64>,
    #[serde(default, alias = "musicUserToken", skip_serializing_if = "Option::is_none")]
    pub user_credential: Option<String>,
    #[serde(
        default,
        alias = "musicUserTokenCreatedAt",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_credential_issued_at: Option<i64>,
}

impl std::fmt::Debug for StoredCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredCredentials")
            .field(
                "service_credential",
                &self.service_credential.as_ref().map(|_| "[REDACTED]"),
            )
            .field("service_credential_issued_at", &self.service_credential_issued_at)
            .field(
                "user_credential",
                &self.user_credential.as_ref().map(|_| "[REDACTED]"),
            )
            .field("user_credential_issued_at", &self.user_credential_issued_at)
            .finish()
    }
}

/// A missing stamp reads as the epoch, which every staleness check treats as stale.
fn from_millis(millis: Option<i64>) -> DateTime<Utc> {
    millis
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Credential store, optionally backed by a file.
#[derive(Debug)]
pub struct CredentialStore {
    path: Option<PathBuf>,
    data: StoredCredentials,
}

impl CredentialStore {
    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: StoredCredentials::default(),
        }
    }

    /// Open (or start) the store in `dir`, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        if let Err(e) = fs::create_dir_all(dir) {
            warn!("Failed to create config directory {}: {}", dir.display(), e);
        }

        let path = dir.join(TOKENS_FILE);
        let data = Self::load(&path);
        Self {
            path: Some(path),
            data,
        }
    }

    fn load(path: &Path) -> StoredCredentials {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No credential file at {}, starting empty", path.display());
                return StoredCredentials::default();
            }
            Err(e) => {
                warn!("Failed to read {}, starting fresh: {}", path.display(), e);
                return StoredCredentials::default();
            }
        };

        serde_json::from_str(&contents).unwrap_or_else(|e| {
            warn!("Failed to parse {}, starting fresh: {}", path.display(), e);
            StoredCredentials::default()
        })
    }

    /// Rewrite the whole file: temp file with owner-only permissions, then rename.
    fn save(&self) -> std::io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let json = serde_json::to_string_pretty(&self.data)?;
        let tmp = path.with_extension("json.tmp");

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&tmp)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        drop(file);

        // The temp file may predate this process with looser permissions.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))?;
        }

        fs::rename(&tmp, path)
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            error!("Failed to save credential file: {}", e);
        }
    }

    /// Location of the backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn data(&self) -> &StoredCredentials {
        &self.data
    }

    pub fn service_credential(&self) -> Option<ServiceCredential> {
        self.data.service_credential.as_ref().map(|token| {
            ServiceCredential::new(
                token.clone(),
                from_millis(self.data.service_credential_issued_at),
            )
        })
    }

    pub fn set_service_credential(&mut self, credential: &ServiceCredential) {
        self.data.service_credential = Some(credential.token().to_string());
        self.data.service_credential_issued_at = Some(credential.issued_at().timestamp_millis());
        self.persist();
    }

    pub fn user_credential(&self) -> Option<UserCredential> {
        self.data.user_credential.as_ref().map(|token| {
            UserCredential::new(token.clone(), from_millis(self.data.user_credential_issued_at))
        })
    }

    pub fn set_user_credential(&mut self, credential: &UserCredential) {
        self.data.user_credential = Some(credential.token().to_string());
        self.data.user_credential_issued_at = Some(credential.issued_at().timestamp_millis());
        self.persist();
    }
}
