//! Credential lifecycle domain.
//!
//! - `credential`: service/user credential types and ES256 minting
//! - `store`: the persisted credential file
//! - `manager`: [`CredentialManager`], the single owner of credential state

pub mod credential;
pub mod manager;
pub mod store;

pub use credential::{
    CredentialSigner, MAX_VALIDITY_DAYS, ServiceCredential, SigningIdentity, UserCredential,
};
pub use manager::{CredentialManager, PROCESS_REFRESH_HOURS, STALENESS_THRESHOLD_DAYS};
pub use store::{CredentialStore, StoredCredentials, TOKENS_FILE};
