/// Task endpoints
///
/// - `POST /v1/tasks` - Create a task
/// - `GET /v1/tasks?quadrant_id=&completed=` - List visible tasks
/// - `GET /v1/tasks/:id` - Get one task
/// - `PUT /v1/tasks/:id` - Partially update a task
/// - `PATCH /v1/tasks/:id/quadrant` - Move a task, body `{"quadrant_id": 2}`
/// - `PATCH /v1/tasks/:id/complete` - Set completion, body `{"completed": true}`
/// - `DELETE /v1/tasks/:id` - Soft-delete a task
///
/// A `quadrant_id` that names no quadrant answers `400 Bad Request`.
use super::deserialize_some;
use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use dothe2_shared::models::task::{NewTask, Task, TaskFilter, UpdateTask};
use serde::Deserialize;

/// Task update body
///
/// Omitted fields are left alone; `null` clears `description` or `due_date`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,

    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,

    #[serde(default, deserialize_with = "deserialize_some")]
    pub due_date: Option<Option<DateTime<Utc>>>,

    pub quadrant_id: Option<i64>,
    pub completed: Option<bool>,
}

impl From<UpdateTaskRequest> for UpdateTask {
    fn from(req: UpdateTaskRequest) -> Self {
        UpdateTask {
            title: req.title,
            description: req.description,
            due_date: req.due_date,
            quadrant_id: req.quadrant_id,
            completed: req.completed,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MoveTaskRequest {
    pub quadrant_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct CompletionRequest {
    pub completed: bool,
}

/// Create a task
///
/// ```text
/// POST /v1/tasks
///
/// { "title": "Write report", "quadrant_id": 1, "due_date": "2026-01-31T17:00:00Z" }
/// ```
pub async fn create_task(
    State(state): State<AppState>,
    Json(req): Json<NewTask>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let task = state.services.tasks.create(req).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Query(filter): Query<TaskFilter>,
) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(state.services.tasks.list(filter).await?))
}

pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.services.tasks.get(id).await?))
}

pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.services.tasks.update(id, req.into()).await?))
}

pub async fn move_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<MoveTaskRequest>,
) -> ApiResult<Json<Task>> {
    Ok(Json(
        state.services.tasks.move_quadrant(id, req.quadrant_id).await?,
    ))
}

pub async fn toggle_task_completion(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<CompletionRequest>,
) -> ApiResult<Json<Task>> {
    Ok(Json(
        state.services.tasks.toggle_completion(id, req.completed).await?,
    ))
}

/// Soft-delete a task; it disappears from every read
pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.services.tasks.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
