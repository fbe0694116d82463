/// Quadrant endpoints
///
/// - `GET /v1/quadrants?include_default=true` - List quadrants
/// - `GET /v1/quadrants/:id` - Get one quadrant
/// - `POST /v1/quadrants` - Create a custom quadrant
/// - `PUT /v1/quadrants/:id` - Partially update a custom quadrant
/// - `DELETE /v1/quadrants/:id` - Delete an unused custom quadrant
///
/// Default quadrants answer `403 Forbidden` to update and delete.
use super::deserialize_some;
use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use dothe2_shared::models::quadrant::{NewQuadrant, Quadrant, UpdateQuadrant};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ListQuadrantsQuery {
    /// Defaults to `true`
    pub include_default: Option<bool>,
}

/// Quadrant update body
///
/// Omitted fields are left alone; `null` clears `description` or `color`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateQuadrantRequest {
    pub name: Option<String>,

    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,

    #[serde(default, deserialize_with = "deserialize_some")]
    pub color: Option<Option<String>>,
}

impl From<UpdateQuadrantRequest> for UpdateQuadrant {
    fn from(req: UpdateQuadrantRequest) -> Self {
        UpdateQuadrant {
            name: req.name,
            description: req.description,
            color: req.color,
        }
    }
}

pub async fn list_quadrants(
    State(state): State<AppState>,
    Query(query): Query<ListQuadrantsQuery>,
) -> ApiResult<Json<Vec<Quadrant>>> {
    let quadrants = state
        .services
        .quadrants
        .list(query.include_default.unwrap_or(true))
        .await?;
    Ok(Json(quadrants))
}

pub async fn get_quadrant(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Quadrant>> {
    Ok(Json(state.services.quadrants.get(id).await?))
}

/// Create a custom quadrant
///
/// ```text
/// POST /v1/quadrants
///
/// { "name": "Deep Work", "description": "Focus blocks", "color": "#336699" }
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: empty or overlong name, malformed color
pub async fn create_quadrant(
    State(state): State<AppState>,
    Json(req): Json<NewQuadrant>,
) -> ApiResult<(StatusCode, Json<Quadrant>)> {
    let quadrant = state.services.quadrants.create(req).await?;
    Ok((StatusCode::CREATED, Json(quadrant)))
}

/// # Errors
///
/// - `403 Forbidden`: default quadrant
/// - `404 Not Found`: no such quadrant
/// - `422 Unprocessable Entity`: invalid field
pub async fn update_quadrant(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateQuadrantRequest>,
) -> ApiResult<Json<Quadrant>> {
    let quadrant = state.services.quadrants.update(id, req.into()).await?;
    Ok(Json(quadrant))
}

/// # Errors
///
/// - `403 Forbidden`: default quadrant
/// - `404 Not Found`: no such quadrant
/// - `409 Conflict`: visible tasks still reference it
pub async fn delete_quadrant(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.services.quadrants.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
