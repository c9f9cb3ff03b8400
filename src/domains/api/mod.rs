//! Apple Music API domain.
//!
//! - `client`: [`AppleMusicClient`], the authenticated request pipeline
//! - `cache`: bounded TTL cache for read responses
//! - `upstream`: the single-exchange HTTP primitive
//! - `endpoints`/`types`: URLs and response shapes
//! - `error`: [`ApiError`] and its rendering

pub mod cache;
pub mod client;
pub mod endpoints;
pub mod error;
pub mod types;
pub mod upstream;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{DEFAULT_CAPACITY, ResponseCache};
pub use client::{AppleMusicClient, MAX_ATTEMPTS, RequestOptions, USER_TOKEN_HEADER, resolve_url};
pub use error::{ApiError, ApiResult, ErrorDetail, ErrorResponse};
pub use upstream::{Method, ReqwestUpstream, Upstream, UpstreamRequest, UpstreamResponse};
