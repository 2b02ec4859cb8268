//! Access tokens and one-time tokens
//!
//! Access tokens are HS256 JWTs. One-time tokens (email verification,
//! password reset) are random UUIDs; only their SHA-256 hex digest is kept.

use crate::config::AuthConfig;
use crate::models::{User, UserRole};
use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// JWT claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: i64,
    pub username: String,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and validates access tokens
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
}

impl JwtManager {
    pub fn new(secret: &str, lifetime_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            lifetime: Duration::hours(lifetime_hours.max(1)),
        }
    }

    /// A blank secret is never used for signing; it is swapped for a random one.
    pub fn from_config(config: &AuthConfig) -> Self {
        let mut config = config.clone();
        config.ensure_jwt_secret();
        Self::new(&config.jwt_secret, config.jwt_expiration_hours)
    }

    pub fn issue(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .context("Failed to sign access token")
    }

    /// Decode and validate signature and expiry
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .context("Invalid access token")?;
        Ok(data.claims)
    }
}

/// A freshly generated one-time token
pub struct OneTimeToken {
    /// Sent to the user
    pub plain: String,
    /// Stored in the database
    pub hash: String,
}

impl OneTimeToken {
    pub fn generate() -> Self {
        let plain = Uuid::new_v4().simple().to_string();
        let hash = hash_token(&plain);
        Self { plain, hash }
    }
}

/// SHA-256 hex digest of a one-time token
pub fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.trim().as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        let mut user = User::new(
            "alice".to_string(),
            "alice@example.com".to_string(),
            None,
            UserRole::Admin,
        );
        user.id = 42;
        user
    }

    #[test]
    fn test_issue_and_verify() {
        let jwt = JwtManager::new("secret", 1);
        let token = jwt.issue(&user()).unwrap();

        let claims = jwt.verify(&token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, UserRole::Admin);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = JwtManager::new("secret", 1).issue(&user()).unwrap();
        assert!(JwtManager::new("other", 1).verify(&token).is_err());
        assert!(JwtManager::new("secret", 1).verify("not.a.jwt").is_err());
    }

    #[test]
    fn test_blank_secret_does_not_sign_with_empty_key() {
        let jwt = JwtManager::from_config(&AuthConfig::default());
        let token = jwt.issue(&user()).unwrap();

        assert!(jwt.verify(&token).is_ok());
        assert!(JwtManager::new("", 24).verify(&token).is_err());
        let forged = JwtManager::new("", 24).issue(&user()).unwrap();
        assert!(jwt.verify(&forged).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let jwt = JwtManager::new("secret", 1);
        let past = Utc::now() - Duration::hours(2);
        let claims = Claims {
            sub: 1,
            username: "bob".to_string(),
            role: UserRole::User,
            iat: past.timestamp(),
            exp: (past + Duration::hours(1)).timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &jwt.encoding_key).unwrap();
        assert!(jwt.verify(&token).is_err());
    }

    #[test]
    fn test_one_time_token_hash() {
        let token = OneTimeToken::generate();
        assert_eq!(token.hash.len(), 64);
        assert_eq!(hash_token(&token.plain), token.hash);
        assert_ne!(OneTimeToken::generate().plain, token.plain);
    }
}
