//! Test doubles shared by pipeline and tool tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::client::AppleMusicClient;
use super::error::{ApiError, ApiResult};
use super::upstream::{Upstream, UpstreamRequest, UpstreamResponse};
use crate::core::config::CredentialMode;
use crate::domains::auth::manager::tests::CountingSigner;
use crate::domains::auth::{CredentialManager, CredentialStore};

/// Upstream that replays a fixed script and records every request it sees.
#[derive(Default)]
pub(crate) struct ScriptedUpstream {
    responses: Mutex<VecDeque<ApiResult<UpstreamResponse>>>,
    requests: Mutex<Vec<UpstreamRequest>>,
}

impl ScriptedUpstream {
    pub(crate) fn new(responses: Vec<UpstreamResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn push_error(&self, error: ApiError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn requests(&self) -> Vec<UpstreamRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Upstream for ScriptedUpstream {
    async fn send(&self, request: UpstreamRequest) -> ApiResult<UpstreamResponse> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Transport("script exhausted".to_string())))
    }
}

/// Credential manager with a counting signer and no disk access.
pub(crate) fn test_credentials(user_token: Option<&str>) -> Arc<CredentialManager> {
    let manager = CredentialManager::new(
        Arc::new(CountingSigner::default()),
        CredentialStore::in_memory(),
        CredentialMode::ProcessLocal,
    );
    if let Some(token) = user_token {
        manager.set_user_credential(token);
    }
    Arc::new(manager)
}

/// Client wired to a scripted upstream, returned alongside it.
pub(crate) fn scripted_client(
    responses: Vec<UpstreamResponse>,
    user_token: Option<&str>,
) -> (AppleMusicClient, Arc<ScriptedUpstream>) {
    let upstream = Arc::new(ScriptedUpstream::new(responses));
    let client = AppleMusicClient::new(test_credentials(user_token), upstream.clone(), "us");
    (client, upstream)
}
