//! Access token (JWT) and refresh token issuance.

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::store::AuthStore;
use super::{AuthConfig, AuthError};
use crate::id::IdGenerator;
use crate::models::auth::{AccessTokenClaims, ClientInfo};

/// Length of the opaque refresh token secret.
const REFRESH_TOKEN_LEN: usize = 64;

/// A freshly signed access token.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    /// Lifetime in seconds.
    pub expires_in: i64,
}

/// Mints access and refresh tokens with the configured key and lifetimes.
pub struct TokenIssuer {
    config: AuthConfig,
    ids: Arc<dyn IdGenerator>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenIssuer {
    pub fn new(config: AuthConfig, ids: Arc<dyn IdGenerator>) -> Self {
        let encoding_key = EncodingKey::from_secret(&config.signing_key);
        let decoding_key = DecodingKey::from_secret(&config.signing_key);
        Self {
            config,
            ids,
            encoding_key,
            decoding_key,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn ids(&self) -> &dyn IdGenerator {
        self.ids.as_ref()
    }

    /// Sign an HS256 access token for `user_id`.
    pub fn issue_access_token(&self, user_id: i64) -> Result<AccessToken, AuthError> {
        let now = Utc::now();
        let claims = AccessTokenClaims {
            sub: user_id.to_string(),
            iss: self.config.app_name.clone(),
            iat: now.timestamp(),
            exp: (now + self.config.access_ttl).timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenError(format!("jwt encode: {e}")))?;
        Ok(AccessToken {
            token,
            expires_in: self.config.access_ttl.num_seconds(),
        })
    }

    /// Verify signature, expiry and issuer. Returns the user ID on success.
    pub fn verify_access_token(&self, token: &str) -> Option<i64> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.app_name]);
        validation.leeway = 0;
        let data = decode::<AccessTokenClaims>(token, &self.decoding_key, &validation).ok()?;
        data.claims.sub.parse().ok()
    }

    /// Generate a refresh token for `user_id` and persist its hash.
    ///
    /// Returns the plaintext secret; it is never stored.
    pub async fn issue_refresh_token<S>(
        &self,
        store: &mut S,
        user_id: i64,
        client: &ClientInfo,
    ) -> Result<String, AuthError>
    where
        S: AuthStore + ?Sized,
    {
        let id = self.ids.next_id()?;
        let secret = generate_refresh_secret();
        store
            .insert_refresh_token(id, user_id, &hash_refresh_token(&secret), client)
            .await?;
        debug!(user_id, token_id = id, "issued refresh token");
        Ok(secret)
    }
}

fn generate_refresh_secret() -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(REFRESH_TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// SHA-256 hex digest of a refresh token, used as its lookup key.
pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::auth::memory::MemoryStore;
    use crate::id::Snowflake;

    fn issuer_with(config: AuthConfig) -> TokenIssuer {
        TokenIssuer::new(config, Arc::new(Snowflake::new(1).unwrap()))
    }

    fn issuer() -> TokenIssuer {
        issuer_with(AuthConfig::new("ridash", "test-signing-key"))
    }

    #[test]
    fn access_token_round_trip() {
        let issuer = issuer();
        let token = issuer.issue_access_token(4242).unwrap();
        assert_eq!(token.expires_in, 900);
        assert_eq!(issuer.verify_access_token(&token.token), Some(4242));
    }

    #[test]
    fn access_token_rejects_other_key() {
        let token = issuer().issue_access_token(1).unwrap();
        let other = issuer_with(AuthConfig::new("ridash", "different-key"));
        assert_eq!(other.verify_access_token(&token.token), None);
    }

    #[test]
    fn access_token_rejects_other_issuer() {
        let token = issuer().issue_access_token(1).unwrap();
        let other = issuer_with(AuthConfig::new("someone-else", "test-signing-key"));
        assert_eq!(other.verify_access_token(&token.token), None);
    }

    #[test]
    fn access_token_rejects_expired() {
        let mut config = AuthConfig::new("ridash", "test-signing-key");
        config.access_ttl = Duration::seconds(-30);
        let issuer = issuer_with(config);
        let token = issuer.issue_access_token(1).unwrap();
        assert_eq!(issuer.verify_access_token(&token.token), None);
    }

    #[test]
    fn access_token_rejects_garbage() {
        assert_eq!(issuer().verify_access_token("not.a.jwt"), None);
    }

    #[test]
    fn refresh_hash_is_stable_hex() {
        let hash = hash_refresh_token("abc");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_refresh_token("abc"));
        assert_ne!(hash, hash_refresh_token("abd"));
    }

    #[tokio::test]
    async fn refresh_token_is_stored_hashed() {
        let issuer = issuer();
        let mut store = MemoryStore::new();
        let client = ClientInfo {
            ip: Some("10.0.0.1".into()),
            user_agent: Some("curl".into()),
        };
        let secret = issuer
            .issue_refresh_token(&mut store, 9, &client)
            .await
            .unwrap();

        assert_eq!(secret.len(), REFRESH_TOKEN_LEN);
        assert!(secret.chars().all(|c| c.is_ascii_alphanumeric()));

        let row = store
            .find_refresh_token(&hash_refresh_token(&secret))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.user_id, 9);
        assert_eq!(row.ip.as_deref(), Some("10.0.0.1"));
        assert!(row.used_at.is_none());
        assert!(store.find_refresh_token(&secret).await.unwrap().is_none());
    }
}
