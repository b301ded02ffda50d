// This file is part of the product Pantry.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::types::{Claims, JwtError};
use crate::config::JwtConfig;
use crate::iam::User;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

pub struct JwtService {
    secret: String,
    issuer: String,
    audience: String,
    expiration_hours: u64,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        JwtService {
            secret: config.secret.clone(),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            expiration_hours: config.expiration_hours,
        }
    }

    /// Create a signed HS256 token for a user
    pub fn create_token(&self, user: &User) -> Result<String, JwtError> {
        let now = Utc::now();
        let expiration = now + Duration::hours(self.expiration_hours as i64);

        let claims = Claims {
            sub: user.email.clone(),
            uid: user.id,
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            jti: Uuid::new_v4().to_string(),
            password_version: user.password_version,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )
        .map_err(|e| JwtError::TokenCreationError(e.to_string()))
    }

    /// Verify signature, expiry, issuer and audience, returning the claims
    pub fn verify_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &validation,
        )
        .map_err(|e| JwtError::TokenVerificationError(e.to_string()))?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iam::types::DEFAULT_PASSWORD_VERSION;

    fn jwt_config(secret: &str, issuer: &str) -> JwtConfig {
        JwtConfig {
            secret: secret.to_string(),
            issuer: issuer.to_string(),
            audience: "test-audience".to_string(),
            expiration_hours: 2,
        }
    }

    fn test_user() -> User {
        User {
            id: 3,
            email: "test@example.com".to_string(),
            name: "Test User".to_string(),
            password_hash: None,
            is_active: true,
            is_staff: false,
            is_superuser: false,
            password_version: DEFAULT_PASSWORD_VERSION,
        }
    }

    #[test]
    fn token_round_trip_carries_user_identity() {
        let service = JwtService::new(&jwt_config("secret", "test-issuer"));
        let token = service.create_token(&test_user()).expect("token");
        let claims = service.verify_token(&token).expect("claims");

        assert_eq!(claims.sub, "test@example.com");
        assert_eq!(claims.uid, 3);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-audience");
        assert_eq!(claims.exp - claims.iat, 2 * 3600);
        assert_eq!(claims.password_version, DEFAULT_PASSWORD_VERSION);
    }

    #[test]
    fn tokens_have_unique_ids() {
        let service = JwtService::new(&jwt_config("secret", "test-issuer"));
        let first = service.create_token(&test_user()).expect("token");
        let second = service.create_token(&test_user()).expect("token");
        let first = service.verify_token(&first).expect("claims");
        let second = service.verify_token(&second).expect("claims");
        assert_ne!(first.jti, second.jti);
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let issuer = JwtService::new(&jwt_config("secret-a", "test-issuer"));
        let verifier = JwtService::new(&jwt_config("secret-b", "test-issuer"));
        let token = issuer.create_token(&test_user()).expect("token");
        assert!(verifier.verify_token(&token).is_err());
    }

    #[test]
    fn verify_rejects_wrong_issuer() {
        let issuer = JwtService::new(&jwt_config("secret", "someone-else"));
        let verifier = JwtService::new(&jwt_config("secret", "test-issuer"));
        let token = issuer.create_token(&test_user()).expect("token");
        assert!(verifier.verify_token(&token).is_err());
    }

    #[test]
    fn verify_rejects_expired_token() {
        let service = JwtService::new(&jwt_config("secret", "test-issuer"));
        let now = Utc::now();
        let claims = Claims {
            sub: "test@example.com".to_string(),
            uid: 3,
            iat: (now - Duration::hours(4)).timestamp(),
            exp: (now - Duration::hours(2)).timestamp(),
            iss: "test-issuer".to_string(),
            aud: "test-audience".to_string(),
            jti: "expired".to_string(),
            password_version: DEFAULT_PASSWORD_VERSION,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret("secret".as_ref()),
        )
        .expect("encode");

        assert!(service.verify_token(&token).is_err());
    }

    #[test]
    fn verify_rejects_garbage() {
        let service = JwtService::new(&jwt_config("secret", "test-issuer"));
        assert!(service.verify_token("not.a.token").is_err());
    }
}
