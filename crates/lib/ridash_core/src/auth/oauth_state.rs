//! Signed, time-boxed OAuth state carried in the `oauth_session` cookie.
//!
//! The state is an HS256 JWT holding the CSRF nonce, the post-login
//! redirect target and, when an authenticated user is linking a provider,
//! that user's ID. Only the bare nonce travels through the provider.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::{AuthConfig, AuthError};

const AUDIENCE: &str = "oauth_state";

#[derive(Debug, Serialize, Deserialize)]
struct StateClaims {
    state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sub: Option<String>,
    redirect_uri: String,
    aud: String,
    exp: i64,
}

/// Decoded state payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthState {
    pub nonce: String,
    /// User being linked, if the flow started from a signed-in session.
    pub link_subject: Option<i64>,
    pub redirect_uri: String,
    pub expires_at: i64,
}

/// Output of [`OAuthStateCodec::encode`].
#[derive(Debug, Clone)]
pub struct EncodedState {
    /// Signed token for the cookie.
    pub cookie_value: String,
    /// Nonce for the provider's `state` parameter.
    pub nonce: String,
}

pub struct OAuthStateCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: chrono::Duration,
}

impl OAuthStateCodec {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(&config.signing_key),
            decoding_key: DecodingKey::from_secret(&config.signing_key),
            ttl: config.oauth_state_ttl,
        }
    }

    pub fn ttl(&self) -> chrono::Duration {
        self.ttl
    }

    /// Encode a state that expires after the configured TTL.
    pub fn issue(
        &self,
        redirect_uri: &str,
        link_subject: Option<i64>,
    ) -> Result<EncodedState, AuthError> {
        self.encode(redirect_uri, Utc::now() + self.ttl, link_subject)
    }

    pub fn encode(
        &self,
        redirect_uri: &str,
        expiry: DateTime<Utc>,
        link_subject: Option<i64>,
    ) -> Result<EncodedState, AuthError> {
        let nonce = generate_nonce();
        let claims = StateClaims {
            state: nonce.clone(),
            sub: link_subject.map(|id| id.to_string()),
            redirect_uri: redirect_uri.to_string(),
            aud: AUDIENCE.to_string(),
            exp: expiry.timestamp(),
        };
        let cookie_value = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenError(format!("oauth state encode: {e}")))?;
        Ok(EncodedState {
            cookie_value,
            nonce,
        })
    }

    /// Verify signature and expiry. `None` on any failure.
    pub fn decode(&self, cookie_value: &str) -> Option<OAuthState> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[AUDIENCE]);
        validation.set_required_spec_claims(&["exp", "aud"]);
        validation.leeway = 0;

        let claims = decode::<StateClaims>(cookie_value, &self.decoding_key, &validation)
            .ok()?
            .claims;
        let link_subject = match claims.sub {
            Some(sub) => Some(sub.parse().ok()?),
            None => None,
        };
        Some(OAuthState {
            nonce: claims.state,
            link_subject,
            redirect_uri: claims.redirect_uri,
            expires_at: claims.exp,
        })
    }

    /// Decode the cookie and check it against the `state` the provider
    /// returned.
    pub fn verify(
        &self,
        cookie_value: &str,
        returned_state: &str,
    ) -> Result<OAuthState, AuthError> {
        let state = self
            .decode(cookie_value)
            .ok_or_else(|| AuthError::ValidationError("invalid or expired oauth state".into()))?;
        if !constant_time_eq(state.nonce.as_bytes(), returned_state.as_bytes()) {
            return Err(AuthError::ValidationError("oauth state mismatch".into()));
        }
        Ok(state)
    }
}

/// 24 random bytes, URL-safe base64.
fn generate_nonce() -> String {
    let mut bytes = [0u8; 24];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
