//! HS256 session tokens.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sha2::{Digest, Sha256};

use super::entities::Claims;
use super::errors::AccessError;

/// Signs and verifies session tokens.
///
/// Expiry is not checked here: sessions expire against the injected clock,
/// not the library's wall clock.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenIssuer {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn issue(&self, claims: &Claims) -> Result<String, AccessError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AccessError::Backend(format!("token signing failed: {e}")))
    }

    /// Verifies the signature and returns the claims.
    pub fn verify(&self, token: &str) -> Option<Claims> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .ok()
            .map(|data| data.claims)
    }
}

/// Session map key: hex SHA-256 of the token.
pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// First 12 hex chars of the digest, for logs.
pub fn token_fingerprint(digest: &str) -> String {
    digest.chars().take(12).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{Role, Scope};

    fn claims() -> Claims {
        Claims {
            sub: "USR_1".into(),
            username: "ops".into(),
            role: Role::Operator,
            scope: Scope::Payment,
            iat: 1_700_000_000,
            exp: 1_700_003_600,
            jti: "jti-1".into(),
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let issuer = TokenIssuer::new("s3cret-value");
        let token = issuer.issue(&claims()).unwrap();
        assert_eq!(issuer.verify(&token), Some(claims()));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = TokenIssuer::new("one").issue(&claims()).unwrap();
        assert!(TokenIssuer::new("two").verify(&token).is_none());
        assert!(TokenIssuer::new("one").verify("not.a.token").is_none());
    }

    #[test]
    fn test_digest() {
        let digest = token_digest("abc");
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(token_fingerprint(&digest), "ba7816bf8f01");
    }
}
