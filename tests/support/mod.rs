#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use steward::config::Config;
use steward::context::SyncContext;
use steward::session::SessionState;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub struct TestApi {
    pub server: MockServer,
    pub ctx: Arc<SyncContext>,
}

impl TestApi {
    pub async fn start() -> Self {
        Self::start_with_session(SessionState::anonymous()).await
    }

    pub async fn start_with_session(session: SessionState) -> Self {
        let server = MockServer::start().await;
        let config = test_config(&server.uri());
        let ctx = SyncContext::init(&config, session).expect("init context");
        Self {
            server,
            ctx: Arc::new(ctx),
        }
    }

    /// Mount a GET list-tasks mock serving the given tasks
    pub async fn mock_task_list(&self, tasks: Vec<Value>, expect: u64) {
        let total = tasks.len();
        Mock::given(method("GET"))
            .and(path("/api/v1/tasks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
                "tasks": tasks,
                "total": total,
            }))))
            .expect(expect)
            .mount(&self.server)
            .await;
    }

    /// Mount a GET list-nudges mock serving the given nudges
    pub async fn mock_nudge_list(&self, nudges: Vec<Value>) {
        let total = nudges.len();
        let unread = nudges
            .iter()
            .filter(|n| n["status"] == "unread")
            .count();
        Mock::given(method("GET"))
            .and(path("/api/v1/nudges"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
                "nudges": nudges,
                "summary": {"total": total, "unread": unread},
            }))))
            .mount(&self.server)
            .await;
    }
}

pub fn test_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.api.base_url = base_url.to_string();
    config.wizard.generation_delay_ms = 0;
    config
}

/// Wrap a payload the way the backend envelopes responses
pub fn envelope(data: Value) -> Value {
    json!({
        "success": true,
        "data": data,
        "meta": {
            "timestamp": "2026-08-05T12:00:00Z",
            "requestId": "req_fixture",
        },
    })
}

pub fn error_body(code: &str, message: &str) -> Value {
    json!({
        "success": false,
        "error": {"code": code, "message": message},
    })
}

pub fn task_json(id: &str, project_id: &str, title: &str) -> Value {
    json!({
        "id": id,
        "projectId": project_id,
        "hierarchyLevel": 1,
        "title": title,
        "description": "",
        "status": "backlog",
        "priority": "medium",
        "priorityScore": 50.0,
        "businessValue": 50.0,
        "estimatedHours": 8.0,
        "requiredSkills": [],
        "isMilestone": false,
        "isCriticalPath": false,
    })
}

pub fn assigned_task_json(id: &str, project_id: &str, title: &str, assignee: &str) -> Value {
    let mut task = task_json(id, project_id, title);
    task["assigneeId"] = json!(assignee);
    task
}

pub fn project_json(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": "",
        "status": "active",
        "priority": 50,
        "startDate": "2026-08-01T00:00:00Z",
        "targetEndDate": "2026-11-01T00:00:00Z",
        "healthScore": 100.0,
        "progress": 0.0,
    })
}

pub fn nudge_json(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "type": "overload",
        "severity": "high",
        "status": status,
        "title": "Alice is overloaded",
        "description": "",
        "explanation": "",
        "criticalityScore": 0.9,
        "createdAt": "2026-08-04T09:00:00Z",
    })
}

/// Responds to POST /tasks by echoing the request into a created task.
///
/// Ids are assigned sequentially (`task-1`, `task-2`, ...). When
/// `fail_at` is set, that zero-based call fails with a structured
/// validation error instead.
pub struct CreateTaskEcho {
    counter: AtomicUsize,
    fail_at: Option<usize>,
}

impl CreateTaskEcho {
    pub fn new() -> Self {
        Self {
            counter: AtomicUsize::new(0),
            fail_at: None,
        }
    }

    pub fn failing_at(index: usize) -> Self {
        Self {
            counter: AtomicUsize::new(0),
            fail_at: Some(index),
        }
    }
}

impl Respond for CreateTaskEcho {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let index = self.counter.fetch_add(1, Ordering::SeqCst);
        if self.fail_at == Some(index) {
            return ResponseTemplate::new(422).set_body_json(error_body(
                "VALIDATION_ERROR",
                &format!("task at position {index} rejected"),
            ));
        }

        let body: Value = serde_json::from_slice(&request.body).expect("request body");
        let task = json!({
            "id": format!("task-{}", index + 1),
            "projectId": body["projectId"],
            "parentTaskId": body.get("parentTaskId").cloned().unwrap_or(Value::Null),
            "hierarchyLevel": body.get("hierarchyLevel").cloned().unwrap_or(json!(1)),
            "title": body["title"],
            "description": body.get("description").cloned().unwrap_or(json!("")),
            "status": "backlog",
            "priority": body.get("priority").cloned().unwrap_or(json!("medium")),
            "priorityScore": 50.0,
            "businessValue": 50.0,
            "estimatedHours": body.get("estimatedHours").cloned().unwrap_or(json!(8.0)),
            "requiredSkills": [],
            "isMilestone": false,
            "isCriticalPath": false,
        });
        ResponseTemplate::new(201).set_body_json(envelope(task))
    }
}

/// Mount the echoing POST /tasks mock
pub async fn mock_create_tasks(server: &MockServer, responder: CreateTaskEcho, expect: u64) {
    Mock::given(method("POST"))
        .and(path("/api/v1/tasks"))
        .respond_with(responder)
        .expect(expect)
        .mount(server)
        .await;
}

/// Mount a POST /projects mock returning the given project
pub async fn mock_create_project(server: &MockServer, project: Value) {
    Mock::given(method("POST"))
        .and(path("/api/v1/projects"))
        .respond_with(ResponseTemplate::new(201).set_body_json(envelope(project)))
        .mount(server)
        .await;
}
