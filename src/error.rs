//! Error handler for verdant.

use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use sqlx::Error as SQLxError;
use thiserror::Error;
use validator::ValidationErrors;

use crate::cache::CacheError;

pub type Result<T> = std::result::Result<T, ServerError>;

/// Enum representing server-side errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("validation error occurred")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Axum(#[from] JsonRejection),

    #[error("SQL request failed: {0}")]
    Sql(#[from] SQLxError),

    #[error("cache request failed: {0}")]
    Cache(#[from] CacheError),

    #[error("token signing failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("invalid username provided")]
    InvalidUsername,
    #[error("password must be between 8 and 32 characters")]
    PasswordLength,
    #[error("invalid email provided")]
    InvalidEmail,

    #[error("invalid plant name provided")]
    InvalidPlantName,
    #[error("invalid plant location provided")]
    InvalidPlantLocation,
    #[error("invalid plant care frequency provided")]
    InvalidCareFrequency,

    #[error("invalid care name provided")]
    InvalidCareName,
    #[error("invalid care notes provided")]
    InvalidCareNotes,
    #[error("invalid care date provided")]
    InvalidCareDate,

    #[error("username already exists")]
    UsernameAlreadyExists,
    #[error("email already exists")]
    EmailAlreadyExists,

    #[error("user is already verified")]
    AlreadyVerified,
    #[error("code expired, a new code was sent")]
    CodeExpired,

    #[error("invalid password provided")]
    InvalidPassword,
    #[error("invalid code provided")]
    InvalidCode,
    #[error("the token has expired")]
    ExpiredToken,
    #[error("invalid token format")]
    InvalidTokenFormat,
    #[error("missing or invalid 'Authorization' header")]
    Unauthorized,

    #[error("not found")]
    NotFound,
    #[error("storage matched multiple rows")]
    Conflict,

    #[error("internal server error, {details}")]
    Internal { details: String },
}

/// Taxonomy bucket of a [`ServerError`].
///
/// Every error crossing the core boundary belongs to exactly one bucket,
/// which fixes its transport status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Unauthorized,
    Internal,
}

impl ServerError {
    /// Build a [`ServerError::Internal`] from any displayable error.
    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal {
            details: err.to_string(),
        }
    }

    /// Classify into a taxonomy bucket.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_)
            | Self::Axum(_)
            | Self::InvalidUsername
            | Self::InvalidEmail
            | Self::PasswordLength
            | Self::InvalidPlantName
            | Self::InvalidPlantLocation
            | Self::InvalidCareFrequency
            | Self::InvalidCareName
            | Self::InvalidCareNotes
            | Self::InvalidCareDate
            | Self::UsernameAlreadyExists
            | Self::EmailAlreadyExists
            | Self::AlreadyVerified
            | Self::CodeExpired => ErrorKind::Validation,

            Self::NotFound => ErrorKind::NotFound,
            Self::Conflict => ErrorKind::Conflict,

            Self::InvalidPassword
            | Self::InvalidCode
            | Self::ExpiredToken
            | Self::InvalidTokenFormat
            | Self::Unauthorized => ErrorKind::Unauthorized,

            Self::Sql(_)
            | Self::Cache(_)
            | Self::Jwt(_)
            | Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            // A multi-row result is an internal invariant breach, not a
            // client-visible conflict.
            ErrorKind::Conflict | ErrorKind::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Structure for detailed error responses.
#[derive(Debug, Serialize)]
pub struct ResponseError {
    title: String,
    status: u16,
    detail: String,
    errors: Option<Vec<FieldError>>,
}

impl ResponseError {
    /// Update error status code.
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code.as_u16();
        self
    }

    /// Update `title` field.
    pub fn title(mut self, title: &str) -> Self {
        self.title = title.into();
        self
    }

    /// Add detailed error.
    pub fn details(mut self, description: &str) -> Self {
        self.detail = description.into();
        self
    }

    /// Automatically add errors field.
    pub fn errors(mut self, errors: &ValidationErrors) -> Self {
        self.errors = Some(parse_validation_errors(errors));
        self
    }

    /// Transform [`ResponseError`] into axum [`Response`].
    pub fn into_response(
        self,
    ) -> std::result::Result<Response, axum::http::Error> {
        if let Ok(body) = serde_json::to_string(&self) {
            Response::builder()
                .status(self.status)
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.into())
        } else {
            Ok(internal_server_error())
        }
    }
}

impl Default for ResponseError {
    fn default() -> Self {
        Self {
            title: "Internal server error.".to_owned(),
            status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            detail: String::default(),
            errors: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct FieldError {
    field: String,
    message: String,
}

fn parse_validation_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, issues)| {
            issues.iter().map(move |issue| FieldError {
                field: field.to_string(),
                message: issue.to_string(),
            })
        })
        .collect()
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let response = match &self {
            ServerError::Validation(validation_errors) => {
                ResponseError::default()
                    .title("There were validation errors with your request.")
                    .status(self.status())
                    .details(&self.to_string())
                    .errors(validation_errors)
            }

            // Backend failures never leak their details past the boundary,
            // only the classified kind.
            ServerError::Sql(_)
            | ServerError::Cache(_)
            | ServerError::Jwt(_)
            | ServerError::Conflict
            | ServerError::Internal { .. } => {
                tracing::error!(err = %self, "server returned 500 status");

                ResponseError::default()
            }

            _ => ResponseError::default()
                .title(match self.kind() {
                    ErrorKind::Validation => {
                        "There were validation errors with your request."
                    }
                    ErrorKind::NotFound => "Resource not found.",
                    ErrorKind::Unauthorized => {
                        "Missing or invalid credentials."
                    }
                    _ => "Internal server error.",
                })
                .status(self.status())
                .details(&self.to_string()),
        };

        response
            .into_response()
            .unwrap_or_else(|_| internal_server_error())
    }
}

fn internal_server_error() -> Response {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, "application/json")
        .body(
            serde_json::json!({
                "title": "Internal server error.",
                "status": StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                "detail": null,
                "errors": null,
            })
            .to_string()
            .into(),
        )
        .unwrap_or_else(|_| Response::new("Internal server error".into()))
}
