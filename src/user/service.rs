//! Account workflows over the identity, code and mail ports.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use uuid::Uuid;

use crate::cache::{CacheError, CodeStore};
use crate::crypto::PasswordManager;
use crate::error::{Result, ServerError};
use crate::mail::{MailDispatcher, Template};
use crate::token::TokenManager;
use crate::user::{User, UserStore};

const CODE_LENGTH: usize = 6;

/// Lifetime of an email confirmation code.
pub const CONFIRMATION_TTL: Duration = Duration::from_secs(60 * 15);
/// Lifetime of a password reset token.
pub const RESET_TTL: Duration = Duration::from_secs(60 * 5);

/// Token issued for a freshly registered user.
#[derive(Debug)]
pub struct Registration {
    pub user_id: String,
    pub token: String,
}

/// Account manager.
///
/// Owns every identity workflow: registration, login, email confirmation
/// and password reset. Only talks to its collaborators through ports, never
/// to a concrete backend.
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserStore>,
    codes: Arc<dyn CodeStore>,
    mail: MailDispatcher,
    token: TokenManager,
    password: PasswordManager,
}

fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| char::from(b'0' + rng.gen_range(0..10)))
        .collect()
}

impl AccountService {
    /// Create a new [`AccountService`].
    pub fn new(
        users: Arc<dyn UserStore>,
        codes: Arc<dyn CodeStore>,
        mail: MailDispatcher,
        token: TokenManager,
        password: PasswordManager,
    ) -> Self {
        Self {
            users,
            codes,
            mail,
            token,
            password,
        }
    }

    /// Register a new account.
    ///
    /// The user is authenticated immediately but unverified; a confirmation
    /// code is stored under their external ID and mailed out without
    /// blocking the request.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Registration> {
        let mut user = User::new(username, email, Vec::new())?;
        user.set_password(password, &self.password)?;

        let user_id = self.users.create(&user).await?;
        let token = self.token.create(&user_id, &user.roles, false)?;

        let code = generate_code();
        self.codes.set(CONFIRMATION_TTL, &user_id, &code).await?;
        self.mail.dispatch(Template::Confirmation, email, &code);

        Ok(Registration { user_id, token })
    }

    /// Authenticate by email or username.
    pub async fn login(
        &self,
        email: Option<&str>,
        username: Option<&str>,
        password: &str,
    ) -> Result<String> {
        let user = match (email, username) {
            (Some(email), _) if !email.is_empty() => {
                self.users.get_by_email(email).await?
            }
            (_, Some(username)) if !username.is_empty() => {
                self.users.get_by_username(username).await?
            }
            _ => return Err(ServerError::NotFound),
        };

        user.verify_password(password, &self.password)?;

        self.token
            .create(&user.external_id, &user.roles, user.verified)
    }

    /// Issue a fresh token from the current identity state.
    pub async fn refresh(&self, user_id: &str) -> Result<String> {
        let user = self.users.get_by_external_id(user_id).await?;
        self.token
            .create(&user.external_id, &user.roles, user.verified)
    }

    /// Fetch the caller's profile.
    pub async fn me(&self, user_id: &str) -> Result<User> {
        self.users.get_by_external_id(user_id).await
    }

    /// Confirm the caller's email address with the mailed code.
    ///
    /// An elapsed code is replaced and re-sent before reporting
    /// [`ServerError::CodeExpired`]; the client's recovery is to retry the
    /// flow with the new code, not the same call.
    pub async fn confirm_email(
        &self,
        user_id: &str,
        token_verified: bool,
        code: &str,
    ) -> Result<String> {
        if token_verified {
            return Err(ServerError::AlreadyVerified);
        }

        let user = self.users.get_by_external_id(user_id).await?;
        if user.verified {
            return Err(ServerError::AlreadyVerified);
        }

        let stored = match self.codes.get(&user.external_id).await {
            Ok(stored) => stored,
            Err(CacheError::NotFound) => {
                let code = generate_code();
                self.codes
                    .set(CONFIRMATION_TTL, &user.external_id, &code)
                    .await?;
                self.mail.dispatch(Template::Confirmation, &user.email, &code);

                return Err(ServerError::CodeExpired);
            }
            Err(err) => return Err(err.into()),
        };

        if stored != code {
            return Err(ServerError::InvalidCode);
        }

        self.users.verify(&user.external_id).await?;
        if let Err(err) = self.codes.delete(&user.external_id).await {
            tracing::error!(err = %err, "failed to delete consumed code");
        }

        self.token.create(&user.external_id, &user.roles, true)
    }

    /// Start a password reset for `email`.
    ///
    /// Succeeds whether or not the address is known, so responses do not
    /// leak which emails have accounts.
    pub async fn request_password_reset(&self, email: &str) -> Result<()> {
        let user = match self.users.get_by_email(email).await {
            Ok(user) => user,
            Err(ServerError::NotFound) => return Ok(()),
            Err(err) => return Err(err),
        };

        // Retry until the token does not collide with a live key.
        let mut code = Uuid::new_v4().to_string();
        loop {
            match self.codes.get(&code).await {
                Ok(_) => code = Uuid::new_v4().to_string(),
                Err(CacheError::NotFound) => break,
                Err(err) => return Err(err.into()),
            }
        }

        self.codes.set(RESET_TTL, &code, &user.external_id).await?;
        self.mail.dispatch(Template::PasswordReset, &user.email, &code);

        Ok(())
    }

    /// Consume a reset token and set a new password.
    ///
    /// The token itself is the credential here, no bearer token is
    /// required. Consumption is get-then-delete, not atomic: two
    /// concurrent resets can both read a still-live token and both
    /// succeed.
    pub async fn reset_password(
        &self,
        code: &str,
        password: &str,
    ) -> Result<()> {
        let user_id = match self.codes.get(code).await {
            Ok(user_id) => user_id,
            Err(CacheError::NotFound) => return Err(ServerError::InvalidCode),
            Err(err) => return Err(err.into()),
        };

        let hash = self.password.hash(password)?;
        self.users.update_password(&user_id, &hash).await?;

        if let Err(err) = self.codes.delete(code).await {
            tracing::error!(err = %err, "failed to delete consumed code");
        }

        Ok(())
    }

    /// Resolve a live reset token to its user without consuming it.
    pub async fn reset_status(&self, code: &str) -> Result<String> {
        match self.codes.get(code).await {
            Ok(user_id) => Ok(user_id),
            Err(CacheError::NotFound) => Err(ServerError::InvalidCode),
            Err(err) => Err(err.into()),
        }
    }

    /// Toggle the caller's active flag.
    pub async fn set_active(&self, user_id: &str, active: bool) -> Result<()> {
        self.users.set_active(user_id, active).await
    }

    /// Soft-delete a user. Administrative.
    pub async fn delete_user(&self, user_id: &str) -> Result<()> {
        self.users.delete(user_id).await
    }

    /// Grant roles to a user. Administrative.
    pub async fn add_roles(
        &self,
        user_id: &str,
        roles: &[String],
    ) -> Result<()> {
        self.users.add_roles(user_id, roles).await
    }

    /// Revoke roles from a user. Administrative.
    pub async fn remove_roles(
        &self,
        user_id: &str,
        roles: &[String],
    ) -> Result<()> {
        self.users.remove_roles(user_id, roles).await
    }
}
