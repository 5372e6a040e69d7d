// rest/routes/tasks.rs — Task CRUD routes.
//
// Every store failure surfaces as 500 with the error message — the contract
// makes no status-code distinction between error categories. Toggle on a
// missing id returns 200 null and delete always confirms; see DESIGN.md.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::tasks::{Task, DELETED_MESSAGE};
use crate::AppContext;

type ApiError = (StatusCode, Json<Value>);

fn internal(e: anyhow::Error) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": e.to_string() })),
    )
}

pub async fn list_tasks(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = ctx.tasks.list().await.map_err(internal)?;
    Ok(Json(tasks))
}

#[derive(Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub date: String,
}

pub async fn create_task(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<CreateTaskRequest>,
) -> Result<Json<Task>, ApiError> {
    let task = ctx
        .tasks
        .create(&body.title, &body.date)
        .await
        .map_err(internal)?;
    Ok(Json(task))
}

pub async fn toggle_task(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
) -> Result<Json<Option<Task>>, ApiError> {
    let task = ctx.tasks.toggle(id).await.map_err(internal)?;
    Ok(Json(task))
}

pub async fn delete_task(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    ctx.tasks.delete(id).await.map_err(internal)?;
    Ok(Json(json!({ "message": DELETED_MESSAGE })))
}
