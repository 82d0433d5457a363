//! Plant routes.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::Result;
use crate::plant::Plant;
use crate::router::{AuthClaims, Valid, resolve_owner};

/// Identifier of a freshly created row.
#[derive(Debug, Serialize, Deserialize)]
pub struct Created {
    pub id: i64,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PlantBody {
    // Field invariants are enforced by the entity itself so that create
    // and update cannot diverge.
    pub name: String,
    pub location: String,
    pub acquisition_date: DateTime<Utc>,
    pub care_frequency: i32,
}

/// Handler to create a plant owned by the caller.
pub async fn create(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
    Valid(body): Valid<PlantBody>,
) -> Result<(StatusCode, Json<Created>)> {
    let owner = resolve_owner(&state, &claims).await?;

    let plant = Plant::new(
        body.name,
        body.location,
        body.acquisition_date,
        body.care_frequency,
        owner.id,
    )?;
    let id = state.plants.create(&plant).await?;

    Ok((StatusCode::CREATED, Json(Created { id })))
}

/// Handler to fetch one plant.
pub async fn get(
    State(state): State<AppState>,
    AuthClaims(_claims): AuthClaims,
    Path(id): Path<i64>,
) -> Result<Json<Plant>> {
    Ok(Json(state.plants.get(id).await?))
}

/// Handler to list the caller's plants.
pub async fn list(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
) -> Result<Json<Vec<Plant>>> {
    let owner = resolve_owner(&state, &claims).await?;
    Ok(Json(state.plants.get_by_user(owner.id).await?))
}

/// Handler to update a plant in place.
///
/// Fetch, re-validate, then persist conditionally; a plant deleted
/// between the fetch and the write surfaces NotFound.
pub async fn update(
    State(state): State<AppState>,
    AuthClaims(_claims): AuthClaims,
    Path(id): Path<i64>,
    Valid(body): Valid<PlantBody>,
) -> Result<Json<Plant>> {
    let mut plant = state.plants.get(id).await?;

    plant.update(
        body.name,
        body.location,
        body.acquisition_date,
        body.care_frequency,
    )?;

    state.plants.update(&plant).await?;

    Ok(Json(plant))
}

/// Handler to tombstone a plant.
pub async fn delete(
    State(state): State<AppState>,
    AuthClaims(_claims): AuthClaims,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    state.plants.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
