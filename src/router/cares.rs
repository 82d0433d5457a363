//! Care routes.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::care::Care;
use crate::error::Result;
use crate::router::plants::Created;
use crate::router::{AuthClaims, Valid, resolve_owner};

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCareBody {
    pub plant_id: i64,
    pub next_care: DateTime<Utc>,
    pub name: String,
    pub notes: String,
}

/// Handler to record a care on an existing plant.
pub async fn create(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
    Valid(body): Valid<CreateCareBody>,
) -> Result<(StatusCode, Json<Created>)> {
    let owner = resolve_owner(&state, &claims).await?;

    // The referenced plant must be live.
    state.plants.get(body.plant_id).await?;

    let care = Care::new(
        body.plant_id,
        owner.id,
        body.next_care,
        body.name,
        body.notes,
    )?;
    let id = state.cares.create(&care).await?;

    Ok((StatusCode::CREATED, Json(Created { id })))
}

/// Handler to fetch one care.
pub async fn get(
    State(state): State<AppState>,
    AuthClaims(_claims): AuthClaims,
    Path(id): Path<i64>,
) -> Result<Json<Care>> {
    Ok(Json(state.cares.get(id).await?))
}

/// Handler to list the cares of a plant.
pub async fn list_by_plant(
    State(state): State<AppState>,
    AuthClaims(_claims): AuthClaims,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Care>>> {
    Ok(Json(state.cares.get_by_plant(id).await?))
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCareBody {
    pub plant_id: i64,
    pub last_care: DateTime<Utc>,
    pub next_care: DateTime<Utc>,
    pub name: String,
    pub notes: String,
}

/// Handler to update a care in place.
///
/// Same protocol as plants: fetch, re-validate, persist conditionally.
pub async fn update(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
    Path(id): Path<i64>,
    Valid(body): Valid<UpdateCareBody>,
) -> Result<Json<Care>> {
    let owner = resolve_owner(&state, &claims).await?;
    let mut care = state.cares.get(id).await?;

    care.update(
        body.plant_id,
        owner.id,
        body.last_care,
        body.next_care,
        body.name,
        body.notes,
    )?;

    state.cares.update(&care).await?;

    Ok(Json(care))
}

/// Handler to remove a care. Rows are physically deleted.
pub async fn delete(
    State(state): State<AppState>,
    AuthClaims(_claims): AuthClaims,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    state.cares.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
