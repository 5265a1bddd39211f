//! Bearer-token verification against the shared secret.
//!
//! Verification is stateless and side-effect-free; the secret is
//! configuration resolved once at startup. Expired tokens and signature
//! failures carry distinct reasons internally but both refuse the
//! connection with the same client-visible code.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, errors::ErrorKind};
use proto::{AuthError, IdentityClaim};
use serde::{Deserialize, Serialize};

/// Claims expected in a gateway bearer token.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tenants: Option<Vec<String>>,
    exp: u64,
}

/// Validates opaque bearer tokens and extracts identity claims.
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Creates a verifier for HS256 tokens signed with `secret`.
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Verifies a token and extracts its identity claim.
    pub fn verify(&self, token: &str) -> Result<IdentityClaim, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::MissingToken);
        }
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken(e.to_string()),
            })?;
        Ok(IdentityClaim {
            subject: data.claims.sub,
            name: data.claims.name,
            tenants: data.claims.tenants,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use std::time::{SystemTime, UNIX_EPOCH};

    const SECRET: &str = "test-secret";

    fn now_secs() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_secs()
    }

    fn mint(secret: &str, exp: u64) -> String {
        let claims = Claims {
            sub: "user-1".to_string(),
            name: "Alice".to_string(),
            tenants: Some(vec!["acme".to_string()]),
            exp,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("encode token")
    }

    #[test]
    fn verify_accepts_valid_token_and_extracts_claims() {
        let verifier = TokenVerifier::new(SECRET);
        let token = mint(SECRET, now_secs() + 3600);

        let claim = verifier.verify(&token).expect("valid token");
        assert_eq!(claim.subject, "user-1");
        assert_eq!(claim.name, "Alice");
        assert_eq!(claim.tenants, Some(vec!["acme".to_string()]));
    }

    #[test]
    fn verify_rejects_empty_token_as_missing() {
        let verifier = TokenVerifier::new(SECRET);
        let err = verifier.verify("  ").expect_err("empty token");
        assert!(matches!(err, AuthError::MissingToken));
    }

    #[test]
    fn verify_rejects_expired_token_with_distinct_reason() {
        let verifier = TokenVerifier::new(SECRET);
        // Well past the default validation leeway.
        let token = mint(SECRET, now_secs() - 3600);

        let err = verifier.verify(&token).expect_err("expired token");
        assert!(matches!(err, AuthError::ExpiredToken));
        assert_eq!(err.reason_code(), "invalid_token");
    }

    #[test]
    fn verify_rejects_wrong_signature() {
        let verifier = TokenVerifier::new(SECRET);
        let token = mint("another-secret", now_secs() + 3600);

        let err = verifier.verify(&token).expect_err("wrong signature");
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[test]
    fn verify_rejects_garbage_token() {
        let verifier = TokenVerifier::new(SECRET);
        let err = verifier
            .verify("not.a.token")
            .expect_err("malformed token");
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }
}
