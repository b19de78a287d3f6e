//! HS256 access tokens

use chrono::{Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::fmt::Debug;

use crate::domain::auth::{AccessClaims, IssuedToken, TokenIssuer};
use crate::domain::session::Session;
use crate::domain::user::User;
use crate::domain::{AuthFailure, DomainError};

/// Configuration for the JWT issuer
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Shared secret used to sign and verify tokens
    pub secret: String,
    /// Value of the `iss` claim, checked on decode
    pub issuer: String,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: issuer.into(),
        }
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: "change-me-in-production".to_string(),
            issuer: "identity-core".to_string(),
        }
    }
}

/// TokenIssuer backed by `jsonwebtoken` with a shared secret
#[derive(Clone)]
pub struct JwtTokenIssuer {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl Debug for JwtTokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtTokenIssuer")
            .field("issuer", &self.config.issuer)
            .field("encoding_key", &"[hidden]")
            .field("decoding_key", &"[hidden]")
            .finish()
    }
}

impl JwtTokenIssuer {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[self.config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation
    }
}

impl TokenIssuer for JwtTokenIssuer {
    fn issue_access_token(
        &self,
        user: &User,
        session: &Session,
        ttl: Duration,
    ) -> Result<IssuedToken, DomainError> {
        let claims = AccessClaims::new(user, session, &self.config.issuer, ttl);

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| DomainError::infrastructure(format!("Failed to sign access token: {}", e)))?;

        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or_else(|| DomainError::infrastructure("Access token expiry out of range"))?;

        Ok(IssuedToken { token, expires_at })
    }

    fn decode_access_token(&self, token: &str) -> Result<AccessClaims, DomainError> {
        decode::<AccessClaims>(token, &self.decoding_key, &self.validation())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                JwtErrorKind::ExpiredSignature => AuthFailure::TokenExpired.into(),
                _ => AuthFailure::TokenInvalid.into(),
            })
    }
}
