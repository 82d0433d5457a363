//! User identity and its invariants.

mod repository;
mod service;

pub use repository::*;
pub use service::*;

use std::sync::LazyLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use crate::crypto::PasswordManager;
use crate::error::{Result, ServerError};

const MIN_USERNAME_LENGTH: usize = 4;
const MAX_USERNAME_LENGTH: usize = 20;
const MIN_EMAIL_LENGTH: usize = 4;
const MAX_EMAIL_LENGTH: usize = 100;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9_\-\.]+@[a-zA-Z0-9_\-\.]+\.[a-zA-Z]{2,7}$")
        .unwrap()
});

/// User as saved on database.
///
/// The numeric `id` is the storage key and never leaves the process;
/// clients only ever see `external_id`.
#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow,
)]
pub struct User {
    #[serde(skip)]
    pub id: i64,
    pub external_id: String,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub password: String,
    pub active: bool,
    pub verified: bool,
    pub roles: Vec<String>,
}

/// Check username length invariant.
pub fn validate_username(username: &str) -> Result<()> {
    if username.len() < MIN_USERNAME_LENGTH
        || username.len() > MAX_USERNAME_LENGTH
    {
        return Err(ServerError::InvalidUsername);
    }
    Ok(())
}

/// Check email length and shape invariants.
pub fn validate_email(email: &str) -> Result<()> {
    if email.len() < MIN_EMAIL_LENGTH
        || email.len() > MAX_EMAIL_LENGTH
        || !EMAIL_RE.is_match(email)
    {
        return Err(ServerError::InvalidEmail);
    }
    Ok(())
}

impl User {
    /// Create a new unverified, active [`User`].
    ///
    /// The password field stays empty until [`User::set_password`].
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        roles: Vec<String>,
    ) -> Result<Self> {
        let username = username.into();
        let email = email.into();

        validate_username(&username)?;
        validate_email(&email)?;

        Ok(Self {
            username,
            email,
            active: true,
            verified: false,
            roles,
            ..Default::default()
        })
    }

    /// Hash `plaintext` and store it as the credential.
    pub fn set_password(
        &mut self,
        plaintext: &str,
        hasher: &PasswordManager,
    ) -> Result<()> {
        self.password = hasher.hash(plaintext)?;
        Ok(())
    }

    /// Verify a candidate password against the stored credential.
    pub fn verify_password(
        &self,
        candidate: &str,
        hasher: &PasswordManager,
    ) -> Result<()> {
        hasher.verify(&self.password, candidate)
    }
}
