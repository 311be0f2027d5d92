//! Caller metadata extractor.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRef, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::header::USER_AGENT;
use axum::http::request::Parts;
use ridash_core::models::auth::ClientInfo;

use crate::AppState;

/// Whether forwarding headers may be believed. Clients can send any
/// `X-Forwarded-For` they like, so this is only on behind a proxy that
/// rewrites it.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustProxyHeaders(pub bool);

impl FromRef<AppState> for TrustProxyHeaders {
    fn from_ref(state: &AppState) -> Self {
        TrustProxyHeaders(state.config.trust_proxy_headers)
    }
}

/// IP and user agent of the caller.
///
/// The IP is the socket peer address. With [`TrustProxyHeaders`] on, the
/// first `X-Forwarded-For` entry and then `X-Real-IP` take precedence.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta(pub ClientInfo);

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    let from_forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let from_real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    from_forwarded.or_else(from_real_ip).map(str::to_string)
}

impl<S> FromRequestParts<S> for ClientMeta
where
    S: Send + Sync,
    TrustProxyHeaders: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TrustProxyHeaders(trusted) = TrustProxyHeaders::from_ref(state);
        let peer = || {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        };
        let ip = if trusted {
            forwarded_ip(&parts.headers).or_else(peer)
        } else {
            peer()
        };
        let user_agent = parts
            .headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Ok(ClientMeta(ClientInfo { ip, user_agent }))
    }
}
