//! Account routes.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::Result;
use crate::router::{AuthClaims, Valid};
use crate::user::User;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RegisterBody {
    #[validate(length(min = 4, max = 20))]
    pub username: String,
    #[validate(email(message = "Email must be formatted."))]
    pub email: String,
    // Password length is enforced by the credential component so that
    // registration and reset cannot diverge.
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub user_id: String,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Handler to register a new account.
pub async fn register(
    State(state): State<AppState>,
    Valid(body): Valid<RegisterBody>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let registration = state
        .accounts
        .register(&body.username, &body.email, &body.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: registration.user_id,
            token: registration.token,
        }),
    ))
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LoginBody {
    pub email: Option<String>,
    pub username: Option<String>,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Handler to login to an account.
pub async fn login(
    State(state): State<AppState>,
    Valid(body): Valid<LoginBody>,
) -> Result<Json<TokenResponse>> {
    let token = state
        .accounts
        .login(
            body.email.as_deref(),
            body.username.as_deref(),
            &body.password,
        )
        .await?;

    Ok(Json(TokenResponse { token }))
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CodeBody {
    #[validate(length(min = 1))]
    pub code: String,
}

/// Handler to confirm the caller's email address.
pub async fn verify_email(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
    Valid(body): Valid<CodeBody>,
) -> Result<Json<TokenResponse>> {
    let token = state
        .accounts
        .confirm_email(&claims.sub, claims.verified, &body.code)
        .await?;

    Ok(Json(TokenResponse { token }))
}

/// Handler to re-issue a token from current identity state.
pub async fn refresh_token(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
) -> Result<Json<TokenResponse>> {
    let token = state.accounts.refresh(&claims.sub).await?;
    Ok(Json(TokenResponse { token }))
}

/// Handler to fetch the caller's profile.
pub async fn me(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
) -> Result<Json<User>> {
    Ok(Json(state.accounts.me(&claims.sub).await?))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActiveBody {
    pub active: bool,
}

/// Handler to toggle the caller's active flag.
pub async fn set_active(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
    Json(body): Json<ActiveBody>,
) -> Result<StatusCode> {
    state.accounts.set_active(&claims.sub, body.active).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ResetBody {
    #[validate(email(message = "Email must be formatted."))]
    pub email: String,
}

/// Handler to start a password reset.
pub async fn request_reset(
    State(state): State<AppState>,
    Valid(body): Valid<ResetBody>,
) -> Result<StatusCode> {
    state.accounts.request_password_reset(&body.email).await?;
    Ok(StatusCode::OK)
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct PasswordBody {
    #[validate(length(min = 1))]
    pub password: String,
}

/// Handler to consume a reset token.
pub async fn change_password(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Valid(body): Valid<PasswordBody>,
) -> Result<StatusCode> {
    state.accounts.reset_password(&code, &body.password).await?;
    Ok(StatusCode::OK)
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetStatusResponse {
    pub user_id: String,
}

/// Handler to resolve a live reset token without consuming it.
pub async fn reset_status(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ResetStatusResponse>> {
    let user_id = state.accounts.reset_status(&code).await?;
    Ok(Json(ResetStatusResponse { user_id }))
}

/// Handler to soft-delete a user. Gated by the API key middleware.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.accounts.delete_user(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleMethod {
    Add,
    Remove,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RolesBody {
    #[validate(length(min = 1))]
    pub id: String,
    #[validate(length(min = 1))]
    pub roles: Vec<String>,
    pub method: RoleMethod,
}

/// Handler to mutate a user's role set. Gated by the API key middleware.
pub async fn change_roles(
    State(state): State<AppState>,
    Valid(body): Valid<RolesBody>,
) -> Result<StatusCode> {
    match body.method {
        RoleMethod::Add => {
            state.accounts.add_roles(&body.id, &body.roles).await?
        }
        RoleMethod::Remove => {
            state.accounts.remove_roles(&body.id, &body.roles).await?
        }
    }

    Ok(StatusCode::NO_CONTENT)
}
