//! Thin HTTP gateway to the task API.
//!
//! The UI and CLI subcommands (`taskdeck tasks ...`) use this to reach a
//! running server. One method per route, returning the parsed response body
//! directly. Transport failures propagate to the caller unmodified — no
//! retry, no timeout policy.

use anyhow::{Context as _, Result};
use serde::Deserialize;
use serde_json::json;

use crate::tasks::Task;

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
}

impl ApiClient {
    /// Create a client targeting the API at `base_url` (e.g. `http://127.0.0.1:4400`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    /// All tasks, newest first.
    pub async fn list_tasks(&self) -> Result<Vec<Task>> {
        let resp = self
            .http
            .get(format!("{}/api/tasks", self.base_url))
            .send()
            .await
            .context("GET /api/tasks failed")?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    /// Create a task; returns the created row including the generated id.
    pub async fn add_task(&self, title: &str, date: &str) -> Result<Task> {
        let resp = self
            .http
            .post(format!("{}/api/tasks", self.base_url))
            .json(&json!({ "title": title, "date": date }))
            .send()
            .await
            .context("POST /api/tasks failed")?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    /// Flip a task's completion flag; `None` when the id matched no row.
    pub async fn toggle_task(&self, id: i64) -> Result<Option<Task>> {
        let resp = self
            .http
            .put(format!("{}/api/tasks/{id}", self.base_url))
            .send()
            .await
            .context("PUT /api/tasks/{id} failed")?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    /// Delete a task. The confirmation message is fixed regardless of whether
    /// the id existed.
    pub async fn delete_task(&self, id: i64) -> Result<DeleteResponse> {
        let resp = self
            .http
            .delete(format!("{}/api/tasks/{id}", self.base_url))
            .send()
            .await
            .context("DELETE /api/tasks/{id} failed")?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    /// Check if the server is reachable (3-second timeout).
    pub async fn is_reachable(&self) -> bool {
        let req = self.http.get(format!("{}/api/health", self.base_url)).send();
        matches!(
            tokio::time::timeout(std::time::Duration::from_secs(3), req).await,
            Ok(Ok(r)) if r.status().is_success()
        )
    }
}
