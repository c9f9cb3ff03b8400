//! Credential lifecycle: minting, caching and staleness of credentials.
//!
//! Two independent timers are kept on purpose:
//! - the *process-local* refresh interval (23h) decides when a warm process
//!   re-signs its service credential;
//! - the *staleness threshold* (170 days) decides when a persisted credential
//!   is considered too old to keep using.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, SubsecRound, Utc};
use tracing::{debug, info, instrument, warn};

use super::credential::{CredentialSigner, ServiceCredential, SigningIdentity, UserCredential};
use super::store::CredentialStore;
use crate::core::config::{AppleMusicConfig, CredentialMode};
use crate::domains::api::ApiResult;

/// Age after which a credential is treated as stale (Apple's ceiling is 180 days).
pub const STALENESS_THRESHOLD_DAYS: i64 = 170;

/// How long a warm process reuses its service credential before re-signing.
pub const PROCESS_REFRESH_HOURS: i64 = 23;

#[derive(Debug, Clone)]
struct ProcessLocalEntry {
    credential: ServiceCredential,
    refresh_at: DateTime<Utc>,
}

#[derive(Debug)]
struct ManagerState {
    store: CredentialStore,
    process_local: Option<ProcessLocalEntry>,
}

/// Owns every credential the pipeline needs.
///
/// All state sits behind one mutex so a credential update and the file
/// rewrite it triggers cannot interleave with another update.
pub struct CredentialManager {
    signer: Arc<dyn CredentialSigner>,
    mode: CredentialMode,
    staleness_threshold: Duration,
    process_refresh: Duration,
    state: Mutex<ManagerState>,
}

impl std::fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialManager")
            .field("mode", &self.mode)
            .field("staleness_threshold", &self.staleness_threshold)
            .field("process_refresh", &self.process_refresh)
            .finish_non_exhaustive()
    }
}

/// Current time at the millisecond precision the store keeps, so a fresh
/// credential compares equal to the same credential read back later.
fn stamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

impl CredentialManager {
    pub fn new(
        signer: Arc<dyn CredentialSigner>,
        store: CredentialStore,
        mode: CredentialMode,
    ) -> Self {
        Self {
            signer,
            mode,
            staleness_threshold: Duration::days(STALENESS_THRESHOLD_DAYS),
            process_refresh: Duration::hours(PROCESS_REFRESH_HOURS),
            state: Mutex::new(ManagerState {
                store,
                process_local: None,
            }),
        }
    }

    /// Build the manager described by `config`.
    ///
    /// Fails with a configuration error when the signing identity is
    /// incomplete. In persistent mode the service credential is loaded (or
    /// minted) immediately so a bad key surfaces at startup.
    pub fn from_config(config: &AppleMusicConfig) -> ApiResult<Self> {
        let identity = SigningIdentity::from_config(config)?;
        let store = match config.credential_mode {
            CredentialMode::Persistent => CredentialStore::open(&config.config_dir),
            CredentialMode::ProcessLocal => CredentialStore::in_memory(),
        };

        let manager = Self::new(Arc::new(identity), store, config.credential_mode);

        if let Some(token) = &config.user_token {
            let known = manager
                .user_credential()
                .is_some_and(|existing| existing.token() == token);
            // Keep the original stamp when the same token is provided again.
            if !known {
                manager.set_user_credential(token.clone());
            }
        }

        if manager.mode == CredentialMode::Persistent {
            manager.load_or_refresh_service_credential()?;
        }

        Ok(manager)
    }

    /// Override the staleness threshold.
    pub fn with_staleness_threshold(mut self, threshold: Duration) -> Self {
        self.staleness_threshold = threshold;
        self
    }

    /// Override the process-local refresh interval.
    pub fn with_process_refresh(mut self, interval: Duration) -> Self {
        self.process_refresh = interval;
        self
    }

    pub fn mode(&self) -> CredentialMode {
        self.mode
    }

    fn lock(&self) -> MutexGuard<'_, ManagerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_stale(&self, issued_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - issued_at > self.staleness_threshold
    }

    /// The service credential for the configured deployment mode.
    pub fn current_service_credential(&self) -> ApiResult<ServiceCredential> {
        match self.mode {
            CredentialMode::Persistent => self.load_or_refresh_service_credential(),
            CredentialMode::ProcessLocal => self.process_local_service_credential(),
        }
    }

    /// Reuse the in-process credential until its refresh stamp, then re-sign.
    ///
    /// Never touches disk.
    pub fn process_local_service_credential(&self) -> ApiResult<ServiceCredential> {
        let now = stamp_now();
        let mut state = self.lock();

        if let Some(entry) = &state.process_local {
            if now < entry.refresh_at {
                return Ok(entry.credential.clone());
            }
        }

        debug!("Signing a new process-local developer token");
        let credential = self.signer.sign(now)?;
        state.process_local = Some(ProcessLocalEntry {
            credential: credential.clone(),
            refresh_at: now + self.process_refresh,
        });
        Ok(credential)
    }

    /// Return the persisted credential unless it is missing or stale, in which
    /// case a new one is minted and written out before returning.
    #[instrument(skip(self))]
    pub fn load_or_refresh_service_credential(&self) -> ApiResult<ServiceCredential> {
        let now = stamp_now();
        let mut state = self.lock();

        if let Some(credential) = state.store.service_credential() {
            if !self.is_stale(credential.issued_at(), now) {
                return Ok(credential);
            }
            info!(
                "Developer token is older than {} days, regenerating",
                self.staleness_threshold.num_days()
            );
        } else {
            info!("Generating new developer token");
        }

        let credential = self.signer.sign(now)?;
        state.store.set_service_credential(&credential);
        Ok(credential)
    }

    pub fn service_credential_issued_at(&self) -> Option<DateTime<Utc>> {
        self.lock().store.service_credential().map(|c| c.issued_at())
    }

    /// Store an externally obtained service credential, stamped now.
    pub fn set_service_credential(&self, token: impl Into<String>) {
        let now = stamp_now();
        let credential = ServiceCredential::new(token, now);
        let mut state = self.lock();
        state.store.set_service_credential(&credential);
        if self.mode == CredentialMode::ProcessLocal {
            state.process_local = Some(ProcessLocalEntry {
                credential,
                refresh_at: now + self.process_refresh,
            });
        }
    }

    pub fn user_credential(&self) -> Option<UserCredential> {
        self.lock().store.user_credential()
    }

    /// Store a user credential, stamped now.
    pub fn set_user_credential(&self, token: impl Into<String>) {
        let credential = UserCredential::new(token, stamp_now());
        self.lock().store.set_user_credential(&credential);
    }

    /// Heuristic only: `true` when absent or older than the staleness threshold.
    pub fn is_user_credential_stale(&self) -> bool {
        match self.user_credential() {
            None => true,
            Some(credential) => self.is_stale(credential.issued_at(), Utc::now()),
        }
    }

    /// Warn at startup about a missing or aging user credential.
    pub fn log_user_credential_status(&self) {
        if self.user_credential().is_none() {
            warn!(
                "No Music User Token found. Library/playlist tools will be unavailable. \
                 Set APPLE_MUSIC_USER_TOKEN to enable them."
            );
        } else if self.is_user_credential_stale() {
            warn!(
                "Music User Token may be expired. Re-authorize and update \
                 APPLE_MUSIC_USER_TOKEN if library calls fail."
            );
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::config::PrivateKeySource;
    use crate::domains::api::ApiError;
    use crate::domains::auth::credential::tests::TEST_PRIVATE_KEY;
    use crate::domains::auth::store::{StoredCredentials, TOKENS_FILE};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Signer that hands out `minted-N` tokens and counts calls.
    #[derive(Debug, Default)]
    pub(crate) struct CountingSigner {
        pub(crate) calls: AtomicUsize,
    }

    impl CredentialSigner for CountingSigner {
        fn sign(&self, issued_at: DateTime<Utc>) -> ApiResult<ServiceCredential> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(ServiceCredential::new(format!("minted-{n}"), issued_at))
        }
    }

    struct FailingSigner;

    impl CredentialSigner for FailingSigner {
        fn sign(&self, _issued_at: DateTime<Utc>) -> ApiResult<ServiceCredential> {
            Err(ApiError::configuration("bad key"))
        }
    }

    fn write_store(dir: &TempDir, data: &StoredCredentials) {
        std::fs::write(
            dir.path().join(TOKENS_FILE),
            serde_json::to_string(data).unwrap(),
        )
        .unwrap();
    }

    fn persisted_service(token: &str, days_ago: i64) -> StoredCredentials {
        StoredCredentials {
            service_credential: Some(token.to_string()),
            service_credential_issued_at: Some(
                (Utc::now() - Duration::days(days_ago)).timestamp_millis(),
            ),
            ..Default::default()
        }
    }

    fn persistent_manager(dir: &TempDir, signer: Arc<CountingSigner>) -> CredentialManager {
        CredentialManager::new(signer, CredentialStore::open(dir.path()), CredentialMode::Persistent)
    }

    #[test]
    fn test_stale_persisted_credential_is_reminted_and_rewritten() {
        let dir = TempDir::new().unwrap();
        write_store(&dir, &persisted_service("old-token", 171));

        let signer = Arc::new(CountingSigner::default());
        let manager = persistent_manager(&dir, signer.clone());
        let credential = manager.load_or_refresh_service_credential().unwrap();

        assert_eq!(credential.token(), "minted-1");
        assert_eq!(signer.calls.load(Ordering::SeqCst), 1);

        let on_disk = CredentialStore::open(dir.path());
        assert_eq!(on_disk.service_credential().unwrap().token(), "minted-1");
    }

    #[test]
    fn test_fresh_persisted_credential_is_returned_unchanged() {
        let dir = TempDir::new().unwrap();
        let stored = persisted_service("recent-token", 1);
        write_store(&dir, &stored);

        let signer = Arc::new(CountingSigner::default());
        let manager = persistent_manager(&dir, signer.clone());
        let credential = manager.load_or_refresh_service_credential().unwrap();

        assert_eq!(credential.token(), "recent-token");
        assert_eq!(
            credential.issued_at().timestamp_millis(),
            stored.service_credential_issued_at.unwrap()
        );
        assert_eq!(signer.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_missing_persisted_credential_is_minted_once() {
        let dir = TempDir::new().unwrap();
        let signer = Arc::new(CountingSigner::default());
        let manager = persistent_manager(&dir, signer.clone());

        let first = manager.current_service_credential().unwrap();
        let second = manager.current_service_credential().unwrap();
        assert_eq!(first, second);
        assert_eq!(signer.calls.load(Ordering::SeqCst), 1);
        assert!(dir.path().join(TOKENS_FILE).exists());
    }

    #[test]
    fn test_process_local_reuses_until_refresh() {
        let signer = Arc::new(CountingSigner::default());
        let manager = CredentialManager::new(
            signer.clone(),
            CredentialStore::in_memory(),
            CredentialMode::ProcessLocal,
        );

        let first = manager.current_service_credential().unwrap();
        let second = manager.current_service_credential().unwrap();
        assert_eq!(first.token(), "minted-1");
        assert_eq!(second.token(), "minted-1");
        assert_eq!(signer.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_process_local_resigns_after_refresh_interval() {
        let signer = Arc::new(CountingSigner::default());
        let manager = CredentialManager::new(
            signer.clone(),
            CredentialStore::in_memory(),
            CredentialMode::ProcessLocal,
        )
        .with_process_refresh(Duration::zero());

        manager.process_local_service_credential().unwrap();
        let second = manager.process_local_service_credential().unwrap();
        assert_eq!(second.token(), "minted-2");
    }

    #[test]
    fn test_process_local_mode_never_writes() {
        let dir = TempDir::new().unwrap();
        let signer = Arc::new(CountingSigner::default());
        let manager = CredentialManager::new(
            signer,
            CredentialStore::open(dir.path()),
            CredentialMode::ProcessLocal,
        );
        manager.current_service_credential().unwrap();
        assert!(!dir.path().join(TOKENS_FILE).exists());
    }

    #[test]
    fn test_signing_failure_propagates() {
        let manager = CredentialManager::new(
            Arc::new(FailingSigner),
            CredentialStore::in_memory(),
            CredentialMode::ProcessLocal,
        );
        assert!(matches!(
            manager.current_service_credential(),
            Err(ApiError::Configuration(_))
        ));
    }

    #[test]
    fn test_user_credential_staleness() {
        let dir = TempDir::new().unwrap();
        let signer = Arc::new(CountingSigner::default());

        let manager = persistent_manager(&dir, signer.clone());
        assert!(manager.user_credential().is_none());
        assert!(manager.is_user_credential_stale());

        manager.set_user_credential("user-token");
        assert!(!manager.is_user_credential_stale());

        write_store(
            &dir,
            &StoredCredentials {
                user_credential: Some("old-user".into()),
                user_credential_issued_at: Some(
                    (Utc::now() - Duration::days(171)).timestamp_millis(),
                ),
                ..Default::default()
            },
        );
        let manager = persistent_manager(&dir, signer);
        assert_eq!(manager.user_credential().unwrap().token(), "old-user");
        assert!(manager.is_user_credential_stale());
    }

    #[test]
    fn test_set_credentials_rewrite_store() {
        let dir = TempDir::new().unwrap();
        let manager = persistent_manager(&dir, Arc::new(CountingSigner::default()));
        manager.set_service_credential("external-dev");
        manager.set_user_credential("external-user");

        let on_disk = CredentialStore::open(dir.path());
        assert_eq!(on_disk.service_credential().unwrap().token(), "external-dev");
        assert_eq!(on_disk.user_credential().unwrap().token(), "external-user");
        assert!(manager.service_credential_issued_at().is_some());
    }

    #[test]
    fn test_fresh_credentials_match_their_persisted_copies() {
        let dir = TempDir::new().unwrap();
        let manager = persistent_manager(&dir, Arc::new(CountingSigner::default()));

        let minted = manager.load_or_refresh_service_credential().unwrap();
        manager.set_user_credential("user-token");
        let user = manager.user_credential().unwrap();

        let on_disk = CredentialStore::open(dir.path());
        assert_eq!(on_disk.service_credential().unwrap(), minted);
        assert_eq!(on_disk.user_credential().unwrap().issued_at(), user.issued_at());
        assert_eq!(minted.issued_at().timestamp_subsec_nanos() % 1_000_000, 0);
    }

    #[test]
    fn test_custom_staleness_threshold() {
        let dir = TempDir::new().unwrap();
        write_store(&dir, &persisted_service("token", 2));

        let signer = Arc::new(CountingSigner::default());
        let manager =
            persistent_manager(&dir, signer.clone()).with_staleness_threshold(Duration::days(1));
        assert_eq!(
            manager.load_or_refresh_service_credential().unwrap().token(),
            "minted-1"
        );
    }

    fn config_for(dir: &TempDir, mode: CredentialMode) -> AppleMusicConfig {
        AppleMusicConfig {
            team_id: Some("TEAM".into()),
            key_id: Some("KEY".into()),
            private_key: Some(PrivateKeySource::Pem(TEST_PRIVATE_KEY.into())),
            config_dir: dir.path().to_path_buf(),
            credential_mode: mode,
            ..Default::default()
        }
    }

    #[test]
    fn test_from_config_persistent_mints_at_startup() {
        let dir = TempDir::new().unwrap();
        let manager =
            CredentialManager::from_config(&config_for(&dir, CredentialMode::Persistent)).unwrap();
        assert_eq!(manager.mode(), CredentialMode::Persistent);
        assert!(CredentialStore::open(dir.path()).service_credential().is_some());
    }

    #[test]
    fn test_from_config_keeps_stamp_of_known_user_token() {
        let dir = TempDir::new().unwrap();
        let old_stamp = (Utc::now() - Duration::days(10)).timestamp_millis();
        write_store(
            &dir,
            &StoredCredentials {
                user_credential: Some("same-token".into()),
                user_credential_issued_at: Some(old_stamp),
                ..Default::default()
            },
        );

        let config = AppleMusicConfig {
            user_token: Some("same-token".into()),
            ..config_for(&dir, CredentialMode::Persistent)
        };
        let manager = CredentialManager::from_config(&config).unwrap();
        assert_eq!(
            manager.user_credential().unwrap().issued_at().timestamp_millis(),
            old_stamp
        );
    }

    #[test]
    fn test_from_config_process_local_uses_configured_user_token() {
        let dir = TempDir::new().unwrap();
        let config = AppleMusicConfig {
            user_token: Some("env-user".into()),
            ..config_for(&dir, CredentialMode::ProcessLocal)
        };
        let manager = CredentialManager::from_config(&config).unwrap();
        assert_eq!(manager.user_credential().unwrap().token(), "env-user");
        assert!(!dir.path().join(TOKENS_FILE).exists());
    }

    #[test]
    fn test_from_config_missing_identity_fails_fast() {
        let config = AppleMusicConfig::default();
        assert!(matches!(
            CredentialManager::from_config(&config),
            Err(ApiError::Configuration(_))
        ));
    }
}
