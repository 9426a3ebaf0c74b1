//! Transport client for the steward API.
//!
//! All calls target `{base_url}/api/v1/{resource}` with JSON bodies and
//! the standard response envelope. Transport failures surface as typed
//! errors; they are never swallowed here.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};
use ulid::Ulid;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::session::SessionState;
use crate::types::{
    ApplyScenarioRequest, AssignTaskRequest, CreateProjectRequest, CreateScenarioRequest,
    CreateTaskRequest, Envelope, ErrorBody, Nudge, NudgeActionRequest, NudgeListResponse,
    NudgeQuery, NudgeStatus, NudgeStatusRequest, Project, ProjectListResponse, ProjectStatus,
    Scenario, SimulateScenarioRequest, Task, TaskListResponse, TeamWorkload, UpdateProjectRequest,
    UpdateTaskRequest, UpdateTaskStatusRequest,
};

/// Fixed API version prefix joined onto the base URL
pub const API_PREFIX: &str = "api/v1";

/// HTTP client bound to one API host and one session
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionState,
}

impl ApiClient {
    /// Build a client from configuration and ambient session state
    pub fn new(config: &Config, session: SessionState) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api.timeout_secs))
            .build()
            .map_err(Error::from)?;

        Ok(Self {
            http,
            base_url: config.api.base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    fn endpoint(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = &self.session.auth_token {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {token}")) {
                headers.insert(reqwest::header::AUTHORIZATION, value);
            }
        }
        if let Some(org) = &self.session.organization_id {
            if let Ok(value) = HeaderValue::from_str(org) {
                headers.insert("X-Organization-Id", value);
            }
        }
        headers
    }

    /// Issue a request and normalize the response into an envelope.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, Option<String>)],
        body: Option<serde_json::Value>,
    ) -> Result<Envelope<T>> {
        let url = self.endpoint(path);
        debug!(%method, %url, "api request");

        let mut builder = self
            .http
            .request(method.clone(), &url)
            .headers(self.headers());
        let query = filter_params(params);
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.contains("application/json"))
            .unwrap_or(false);
        let text = response.text().await?;

        if !status.is_success() {
            warn!(%method, %url, status = status.as_u16(), "api request failed");
            return Err(error_for_status(status, is_json, &text));
        }

        if text.trim().is_empty() {
            // 204-style success with no body
            return Ok(Envelope {
                success: true,
                data: None,
                error: None,
                meta: None,
            });
        }

        if !is_json {
            return Err(Error::Http {
                status: status.as_u16(),
                message: "expected JSON response".to_string(),
            });
        }

        let value: serde_json::Value = serde_json::from_str(&text)?;
        if value.get("success").is_some() {
            Ok(serde_json::from_value(value)?)
        } else {
            // Bare payload: wrap into the standard envelope
            let data: T = serde_json::from_value(value)?;
            Ok(Envelope::wrap(data, generate_request_id()))
        }
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, Option<String>)],
    ) -> Result<Envelope<T>> {
        self.request(Method::GET, path, params, None).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Envelope<T>> {
        self.request(Method::POST, path, &[], Some(serde_json::to_value(body)?))
            .await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Envelope<T>> {
        self.request(Method::PATCH, path, &[], Some(serde_json::to_value(body)?))
            .await
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        let _: Envelope<serde_json::Value> = self.request(Method::DELETE, path, &[], None).await?;
        Ok(())
    }

    // =========================================================================
    // Typed resource calls
    // =========================================================================

    pub async fn list_projects(&self, status: Option<ProjectStatus>) -> Result<ProjectListResponse> {
        self.get("projects", &[("status", status.map(|s| s.to_string()))])
            .await?
            .into_data()
    }

    pub async fn create_project(&self, request: &CreateProjectRequest) -> Result<Project> {
        self.post("projects", request).await?.into_data()
    }

    pub async fn update_project(
        &self,
        project_id: &str,
        request: &UpdateProjectRequest,
    ) -> Result<Project> {
        self.patch(&format!("projects/{project_id}"), request)
            .await?
            .into_data()
    }

    pub async fn list_tasks(&self, project_id: Option<&str>) -> Result<TaskListResponse> {
        self.get(
            "tasks",
            &[("projectId", project_id.map(|id| id.to_string()))],
        )
        .await?
        .into_data()
    }

    pub async fn get_task(&self, task_id: &str) -> Result<Task> {
        self.get(&format!("tasks/{task_id}"), &[]).await?.into_data()
    }

    pub async fn create_task(&self, request: &CreateTaskRequest) -> Result<Task> {
        self.post("tasks", request).await?.into_data()
    }

    pub async fn update_task(&self, task_id: &str, request: &UpdateTaskRequest) -> Result<Task> {
        self.patch(&format!("tasks/{task_id}"), request)
            .await?
            .into_data()
    }

    pub async fn update_task_status(
        &self,
        task_id: &str,
        request: &UpdateTaskStatusRequest,
    ) -> Result<Task> {
        self.post(&format!("tasks/{task_id}/status"), request)
            .await?
            .into_data()
    }

    pub async fn assign_task(&self, task_id: &str, request: &AssignTaskRequest) -> Result<Task> {
        self.post(&format!("tasks/{task_id}/assign"), request)
            .await?
            .into_data()
    }

    pub async fn unassign_task(&self, task_id: &str) -> Result<Task> {
        self.post(&format!("tasks/{task_id}/unassign"), &serde_json::json!({}))
            .await?
            .into_data()
    }

    pub async fn delete_task(&self, task_id: &str) -> Result<()> {
        self.delete(&format!("tasks/{task_id}")).await
    }

    pub async fn list_nudges(&self, query: &NudgeQuery) -> Result<NudgeListResponse> {
        self.get("nudges", &query.to_params()).await?.into_data()
    }

    pub async fn update_nudge_status(&self, nudge_id: &str, status: NudgeStatus) -> Result<Nudge> {
        self.patch(
            &format!("nudges/{nudge_id}/status"),
            &NudgeStatusRequest { status },
        )
        .await?
        .into_data()
    }

    pub async fn take_nudge_action(
        &self,
        nudge_id: &str,
        request: &NudgeActionRequest,
    ) -> Result<serde_json::Value> {
        self.post(&format!("nudges/{nudge_id}/actions"), request)
            .await?
            .into_data()
    }

    pub async fn team_workload(&self) -> Result<TeamWorkload> {
        self.get("workload/team", &[]).await?.into_data()
    }

    pub async fn list_scenarios(&self) -> Result<Vec<Scenario>> {
        self.get("scenarios", &[]).await?.into_data()
    }

    pub async fn create_scenario(&self, request: &CreateScenarioRequest) -> Result<Scenario> {
        self.post("scenarios", request).await?.into_data()
    }

    pub async fn simulate_scenario(
        &self,
        scenario_id: &str,
        request: &SimulateScenarioRequest,
    ) -> Result<serde_json::Value> {
        self.post(&format!("scenarios/{scenario_id}/simulate"), request)
            .await?
            .into_data()
    }

    pub async fn apply_scenario(
        &self,
        scenario_id: &str,
        request: &ApplyScenarioRequest,
    ) -> Result<serde_json::Value> {
        self.post(&format!("scenarios/{scenario_id}/apply"), request)
            .await?
            .into_data()
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}/{}",
        base.trim_end_matches('/'),
        API_PREFIX,
        path.trim_start_matches('/')
    )
}

/// Drop query parameters whose value is absent or empty.
fn filter_params(params: &[(&str, Option<String>)]) -> Vec<(String, String)> {
    params
        .iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .map(|v| (key.to_string(), v.to_string()))
        })
        .collect()
}

fn generate_request_id() -> String {
    format!("req_{}", Ulid::new())
}

fn error_for_status(status: StatusCode, is_json: bool, text: &str) -> Error {
    if is_json {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(text) {
            if let Some(error) = value.get("error") {
                if let Ok(body) = serde_json::from_value::<ErrorBody>(error.clone()) {
                    return Error::Api {
                        code: body.code,
                        message: body.message,
                        details: body.details,
                        status: status.as_u16(),
                    };
                }
            }
            if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
                return Error::Http {
                    status: status.as_u16(),
                    message: message.to_string(),
                };
            }
        }
    }

    Error::Http {
        status: status.as_u16(),
        message: status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_normalizes_slashes() {
        assert_eq!(
            join_url("http://localhost:8080/", "/tasks"),
            "http://localhost:8080/api/v1/tasks"
        );
        assert_eq!(
            join_url("http://localhost:8080", "tasks/t1/status"),
            "http://localhost:8080/api/v1/tasks/t1/status"
        );
    }

    #[test]
    fn filter_params_drops_absent_and_empty() {
        let params = [
            ("projectId", Some("p1".to_string())),
            ("status", None),
            ("assignee", Some(String::new())),
            ("cursor", Some("  ".to_string())),
        ];
        let filtered = filter_params(&params);
        assert_eq!(filtered, vec![("projectId".to_string(), "p1".to_string())]);
    }

    #[test]
    fn request_ids_have_prefix_and_vary() {
        let a = generate_request_id();
        let b = generate_request_id();
        assert!(a.starts_with("req_"));
        assert_ne!(a, b);
    }

    #[test]
    fn structured_error_body_wins_over_status() {
        let body = r#"{"success":false,"error":{"code":"VALIDATION_ERROR","message":"title required"}}"#;
        let err = error_for_status(StatusCode::UNPROCESSABLE_ENTITY, true, body);
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn unstructured_error_uses_http_code() {
        let err = error_for_status(StatusCode::BAD_GATEWAY, false, "<html>oops</html>");
        assert_eq!(err.code(), "HTTP_502");
    }
}
