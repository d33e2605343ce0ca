/// JWT minting for the video platform: project tokens for REST calls and
/// client connection tokens for browser sessions.
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use rand::Rng;
use serde::{Deserialize, Serialize};

use relay_shared::errors::UpstreamError;
use relay_shared::models::Role;

/// Lifetime of a project REST token.
const PROJECT_TOKEN_TTL_SECS: i64 = 180;
/// Default lifetime of a client connection token.
const CLIENT_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;
/// Longest lifetime the platform accepts for a client token.
const CLIENT_TOKEN_MAX_TTL_SECS: i64 = 30 * 24 * 60 * 60;
const MAX_CONNECTION_DATA_BYTES: usize = 1000;

/// Claims of a project-level REST token.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectClaims {
    pub iss: String,
    pub ist: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Claims of a client connection token.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClientClaims {
    pub iss: String,
    pub ist: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub nonce: u64,
    pub scope: String,
    pub session_id: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_data: Option<String>,
    pub initial_layout_class_list: String,
}

/// Options accepted when issuing a client token.
#[derive(Debug, Clone, Default)]
pub struct TokenOptions {
    pub role: Role,
    pub data: Option<String>,
    /// Expiry as a unix timestamp (seconds).
    pub expire_time: Option<i64>,
}

impl TokenOptions {
    pub fn moderator() -> Self {
        Self {
            role: Role::Moderator,
            ..Self::default()
        }
    }

    /// Check the options against platform limits, relative to `now`.
    pub fn validate(&self, now: i64) -> Result<(), String> {
        if let Some(exp) = self.expire_time {
            if exp <= now {
                return Err("expireTime must be in the future".to_string());
            }
            if exp > now + CLIENT_TOKEN_MAX_TTL_SECS {
                return Err("expireTime must be within 30 days".to_string());
            }
        }
        if let Some(data) = &self.data {
            if data.len() > MAX_CONNECTION_DATA_BYTES {
                return Err(format!(
                    "data must be at most {} bytes",
                    MAX_CONNECTION_DATA_BYTES
                ));
            }
        }
        Ok(())
    }
}

/// Project key and secret used to sign every token.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Create a short-lived token for the `X-OPENTOK-AUTH` header.
    pub fn project_jwt(&self) -> Result<String, UpstreamError> {
        let now = Utc::now();
        let claims = ProjectClaims {
            iss: self.api_key.clone(),
            ist: "project".to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(PROJECT_TOKEN_TTL_SECS)).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };
        self.sign(&claims).map_err(UpstreamError::Auth)
    }

    /// Create a token that lets a client connect to `session_id`.
    pub fn client_token(&self, session_id: &str, opts: &TokenOptions) -> Result<String, String> {
        let now = Utc::now().timestamp();
        opts.validate(now)?;

        let claims = ClientClaims {
            iss: self.api_key.clone(),
            ist: "project".to_string(),
            iat: now,
            exp: opts.expire_time.unwrap_or(now + CLIENT_TOKEN_TTL_SECS),
            jti: uuid::Uuid::new_v4().to_string(),
            nonce: rand::thread_rng().gen(),
            scope: "session.connect".to_string(),
            session_id: session_id.to_string(),
            role: opts.role,
            connection_data: opts.data.clone().filter(|d| !d.is_empty()),
            initial_layout_class_list: String::new(),
        };
        self.sign(&claims)
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String, String> {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(self.api_secret.as_bytes()),
        )
        .map_err(|e| format!("JWT encode error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    fn decode_as<T: serde::de::DeserializeOwned>(token: &str, secret: &str) -> T {
        decode::<T>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
            .unwrap()
            .claims
    }

    #[test]
    fn test_project_jwt_claims() {
        let creds = Credentials::new("12345", "s3cret");
        let token = creds.project_jwt().unwrap();
        let claims: ProjectClaims = decode_as(&token, "s3cret");

        assert_eq!(claims.iss, "12345");
        assert_eq!(claims.ist, "project");
        assert_eq!(claims.exp - claims.iat, PROJECT_TOKEN_TTL_SECS);
    }

    #[test]
    fn test_client_token_defaults_to_publisher() {
        let creds = Credentials::new("12345", "s3cret");
        let token = creds.client_token("sess-1", &TokenOptions::default()).unwrap();
        let claims: ClientClaims = decode_as(&token, "s3cret");

        assert_eq!(claims.session_id, "sess-1");
        assert_eq!(claims.role, Role::Publisher);
        assert_eq!(claims.scope, "session.connect");
        assert_eq!(claims.connection_data, None);
        assert_eq!(claims.exp - claims.iat, CLIENT_TOKEN_TTL_SECS);
    }

    #[test]
    fn test_client_token_carries_options() {
        let creds = Credentials::new("12345", "s3cret");
        let exp = Utc::now().timestamp() + 3600;
        let opts = TokenOptions {
            role: Role::Moderator,
            data: Some("name=alice".to_string()),
            expire_time: Some(exp),
        };
        let claims: ClientClaims = decode_as(&creds.client_token("s", &opts).unwrap(), "s3cret");

        assert_eq!(claims.role, Role::Moderator);
        assert_eq!(claims.connection_data.as_deref(), Some("name=alice"));
        assert_eq!(claims.exp, exp);
    }

    #[test]
    fn test_token_options_validation() {
        let now = 1_700_000_000;
        let past = TokenOptions { expire_time: Some(now - 1), ..Default::default() };
        assert!(past.validate(now).is_err());

        let too_far = TokenOptions {
            expire_time: Some(now + CLIENT_TOKEN_MAX_TTL_SECS + 1),
            ..Default::default()
        };
        assert!(too_far.validate(now).is_err());

        let big = TokenOptions { data: Some("x".repeat(1001)), ..Default::default() };
        assert!(big.validate(now).is_err());

        assert!(TokenOptions::moderator().validate(now).is_ok());
    }
}
