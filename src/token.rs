//! Manage session tokens.

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServerError};

/// Token lifetime in seconds.
pub const EXPIRATION_TIME: u64 = 60 * 60 * 24; // 24 hours.

/// Pieces of information asserted on a session token.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Claims {
    /// User external ID.
    pub sub: String,
    /// Identifies the organization that issued the token.
    pub iss: String,
    /// Identifies the time at which the token was issued.
    pub iat: u64,
    /// Identifies the expiration time on or after which the token must not
    /// be accepted for processing.
    pub exp: u64,
    /// Role set of the user at issuance time.
    pub roles: Vec<String>,
    /// Whether the user had confirmed their email at issuance time.
    pub verified: bool,
}

/// Manage session tokens.
#[derive(Clone)]
pub struct TokenManager {
    issuer: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl TokenManager {
    /// Create a new [`TokenManager`] instance.
    pub fn new(issuer: &str, secret: &str) -> Self {
        Self {
            issuer: issuer.to_owned(),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Create a new signed token for a user.
    pub fn create(
        &self,
        user_id: &str,
        roles: &[String],
        verified: bool,
    ) -> Result<String> {
        let time = unix_now();
        let claims = Claims {
            sub: user_id.to_owned(),
            iss: self.issuer.clone(),
            iat: time,
            exp: time + EXPIRATION_TIME,
            roles: roles.to_vec(),
            verified,
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Decode and check a token.
    ///
    /// Expiry is enforced twice, by the library validation and by an
    /// explicit wall-clock comparison.
    pub fn decode(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|err| match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ServerError::ExpiredToken
                }
                _ => ServerError::InvalidTokenFormat,
            })?;

        if unix_now() >= data.claims.exp {
            return Err(ServerError::ExpiredToken);
        }

        Ok(data.claims)
    }
}
