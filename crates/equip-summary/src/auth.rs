//! Bearer token authentication
//!
//! HS256 JWTs come in two kinds: short-lived access tokens accepted by the
//! upload, history and report endpoints, and longer-lived refresh tokens that
//! can only be exchanged for a new access token.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{
    decode, encode, get_current_timestamp, Algorithm, DecodingKey, EncodingKey, Header,
    Validation,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::config::AuthConfig;
use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{AccessToken, TokenPair};

/// Kind of token carried in the claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Username
    pub sub: String,
    pub kind: TokenKind,
    /// Expiration timestamp
    pub exp: u64,
    /// Issued at timestamp
    pub iat: u64,
}

/// Issues and verifies tokens for the configured accounts
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl_secs: u64,
    refresh_ttl_secs: u64,
    /// username -> hex SHA-256 of the password
    users: HashMap<String, String>,
}

impl TokenService {
    pub fn from_config(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 5;

        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            access_ttl_secs: config.access_token_ttl_secs,
            refresh_ttl_secs: config.refresh_token_ttl_secs,
            users: config
                .users
                .iter()
                .map(|u| (u.username.clone(), u.password_sha256.to_lowercase()))
                .collect(),
        }
    }

    /// Number of accounts that can log in
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Check credentials and issue an access/refresh pair
    pub fn login(&self, username: &str, password: &str) -> Result<TokenPair> {
        let expected = self
            .users
            .get(username)
            .ok_or_else(|| Error::auth("invalid username or password"))?;

        if !constant_time_eq(expected.as_bytes(), hash_password(password).as_bytes()) {
            return Err(Error::auth("invalid username or password"));
        }

        Ok(TokenPair {
            access: self.issue(username, TokenKind::Access)?,
            refresh: self.issue(username, TokenKind::Refresh)?,
        })
    }

    /// Exchange a refresh token for a new access token
    pub fn refresh(&self, refresh_token: &str) -> Result<AccessToken> {
        let claims = self.verify(refresh_token, TokenKind::Refresh)?;
        if !self.users.contains_key(&claims.sub) {
            return Err(Error::auth("unknown user"));
        }
        Ok(AccessToken {
            access: self.issue(&claims.sub, TokenKind::Access)?,
        })
    }

    pub fn issue(&self, username: &str, kind: TokenKind) -> Result<String> {
        let now = get_current_timestamp();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl_secs,
            TokenKind::Refresh => self.refresh_ttl_secs,
        };
        let claims = Claims {
            sub: username.to_string(),
            kind,
            exp: now + ttl,
            iat: now,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| Error::internal(format!("Failed to sign token: {}", e)))
    }

    /// Validate signature, expiry and token kind
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| Error::auth(format!("invalid token: {}", e)))?;

        if data.claims.kind != expected {
            return Err(Error::auth(format!(
                "expected {:?} token, got {:?}",
                expected, data.claims.kind
            )));
        }
        Ok(data.claims)
    }
}

/// Hex-encoded SHA-256 of a password, as stored in the config
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Authenticated caller, taken from the `Authorization: Bearer` header
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub username: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| Error::auth("missing bearer token"))?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::auth("malformed authorization header"))?;

        let claims = state.tokens().verify(token, TokenKind::Access).map_err(|e| {
            tracing::warn!("Rejected request to {}: {}", parts.uri.path(), e);
            e
        })?;

        Ok(AuthUser {
            username: claims.sub,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UserCredential;

    fn service() -> TokenService {
        let config = AuthConfig {
            users: vec![UserCredential::with_password("operator", "s3cret")],
            ..AuthConfig::default()
        };
        TokenService::from_config(&config)
    }

    #[test]
    fn test_login_and_verify() {
        let tokens = service();
        let pair = tokens.login("operator", "s3cret").unwrap();

        let claims = tokens.verify(&pair.access, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, "operator");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_wrong_password_rejected() {
        let tokens = service();
        assert!(matches!(
            tokens.login("operator", "nope"),
            Err(Error::Authentication(_))
        ));
        assert!(matches!(
            tokens.login("ghost", "s3cret"),
            Err(Error::Authentication(_))
        ));
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let tokens = service();
        let pair = tokens.login("operator", "s3cret").unwrap();

        assert!(tokens.verify(&pair.refresh, TokenKind::Access).is_err());
        assert!(tokens.refresh(&pair.access).is_err());

        let fresh = tokens.refresh(&pair.refresh).unwrap();
        assert!(tokens.verify(&fresh.access, TokenKind::Access).is_ok());
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = service();
        let now = get_current_timestamp();
        let claims = Claims {
            sub: "operator".to_string(),
            kind: TokenKind::Access,
            exp: now - 3600,
            iat: now - 7200,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &tokens.encoding).unwrap();

        let err = tokens.verify(&token, TokenKind::Access).unwrap_err();
        assert!(err.to_string().contains("invalid token"));
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let other = TokenService::from_config(&AuthConfig {
            jwt_secret: "a-completely-different-secret".to_string(),
            ..AuthConfig::default()
        });
        let token = other.issue("operator", TokenKind::Access).unwrap();
        assert!(service().verify(&token, TokenKind::Access).is_err());
    }

    #[test]
    fn test_hash_password() {
        assert_eq!(
            hash_password("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
