use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Account roles, matched exhaustively everywhere a decision depends on one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Organizer,
    Volunteer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Organizer => "organizer",
            Role::Volunteer => "volunteer",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "admin" => Some(Role::Admin),
            "organizer" => Some(Role::Organizer),
            "volunteer" => Some(Role::Volunteer),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::parse(s).ok_or(())
    }
}

/// Signed identity carried by every bearer token.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub id: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("invalid token")]
    Invalid,

    #[error("token generation failed: {0}")]
    Generation(String),
}

/// Issues and verifies signed, expiring identity tokens.
///
/// Tokens are stateless and unrevocable before expiry; the short TTL is the
/// accepted tradeoff. The signing secret is validated at startup by
/// `AppConfig::from_env`, so an instance always carries a non-empty secret.
#[derive(Clone)]
pub struct TokenService {
    secret: String,
    ttl_secs: i64,
}

impl TokenService {
    pub fn new(secret: impl Into<String>, ttl_secs: i64) -> Self {
        Self {
            secret: secret.into(),
            ttl_secs,
        }
    }

    pub fn issue(&self, subject_id: &str, role: Role) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            id: subject_id.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.ttl_secs)).timestamp(),
        };

        let key = EncodingKey::from_secret(self.secret.as_bytes());
        encode(&Header::default(), &claims, &key).map_err(|e| TokenError::Generation(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let key = DecodingKey::from_secret(self.secret.as_bytes());
        let validation = Validation::default();

        match decode::<Claims>(token, &key, &validation) {
            Ok(data) => Ok(data.claims),
            Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => Err(TokenError::Expired),
            Err(_) => Err(TokenError::Invalid),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_and_verify_round_trip() {
        let tokens = TokenService::new("test-secret", 3600);
        let token = tokens.issue("65f000000000000000000001", Role::Volunteer).unwrap();

        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.id, "65f000000000000000000001");
        assert_eq!(claims.role, Role::Volunteer);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_token_is_distinguished_from_invalid() {
        // Negative TTL puts exp well past the default validation leeway.
        let tokens = TokenService::new("test-secret", -3600);
        let token = tokens.issue("65f000000000000000000001", Role::Admin).unwrap();
        assert_eq!(tokens.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn tampered_token_is_invalid() {
        let tokens = TokenService::new("test-secret", 3600);
        let other = TokenService::new("different-secret", 3600);
        let token = other.issue("65f000000000000000000001", Role::Admin).unwrap();
        assert_eq!(tokens.verify(&token), Err(TokenError::Invalid));
        assert_eq!(tokens.verify("not-a-token"), Err(TokenError::Invalid));
    }

    #[test]
    fn role_parsing_is_closed() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("organizer"), Some(Role::Organizer));
        assert_eq!(Role::parse("volunteer"), Some(Role::Volunteer));
        assert_eq!(Role::parse("superuser"), None);
    }
}
