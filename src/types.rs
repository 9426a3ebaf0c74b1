//! Wire types for the steward API.
//!
//! Entities are owned by the remote service; the client only ever holds
//! cached copies. All wire fields are camelCase JSON.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// =============================================================================
// Response envelope
// =============================================================================

/// Standard API response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

impl<T> Envelope<T> {
    /// Wrap a bare payload the way the server would
    pub fn wrap(data: T, request_id: String) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            meta: Some(ResponseMeta {
                timestamp: Utc::now(),
                request_id,
                page: None,
                per_page: None,
                total: None,
                has_more: None,
                next_cursor: None,
            }),
        }
    }

    /// Extract the payload, turning a missing body into an API error
    pub fn into_data(self) -> Result<T> {
        match self.data {
            Some(data) => Ok(data),
            None => {
                let body = self.error.unwrap_or_else(|| ErrorBody {
                    code: "EMPTY_RESPONSE".to_string(),
                    message: "response carried no data".to_string(),
                    details: None,
                });
                Err(Error::Api {
                    code: body.code,
                    message: body.message,
                    details: body.details,
                    status: 200,
                })
            }
        }
    }
}

/// Structured error body inside an envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, Vec<String>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_more: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

// =============================================================================
// Projects
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Active,
    Paused,
    Completed,
    Archived,
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectStatus::Active => write!(f, "active"),
            ProjectStatus::Paused => write!(f, "paused"),
            ProjectStatus::Completed => write!(f, "completed"),
            ProjectStatus::Archived => write!(f, "archived"),
        }
    }
}

impl FromStr for ProjectStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "active" => Ok(ProjectStatus::Active),
            "paused" => Ok(ProjectStatus::Paused),
            "completed" => Ok(ProjectStatus::Completed),
            "archived" => Ok(ProjectStatus::Archived),
            _ => Err(Error::InvalidArgument(format!(
                "Invalid project status '{s}'. Expected: active, paused, completed, archived"
            ))),
        }
    }
}

/// A project as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub status: ProjectStatus,
    pub priority: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub health_score: f64,
    #[serde(default)]
    pub progress: f64,
}

// =============================================================================
// Tasks
// =============================================================================

/// Top-level tasks are level 1; subtasks are level 2
pub const HIERARCHY_TASK: u8 = 1;
pub const HIERARCHY_SUBTASK: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Backlog,
    Ready,
    InProgress,
    Review,
    Done,
}

impl TaskStatus {
    /// Position in the board's column order
    pub fn rank(&self) -> usize {
        match self {
            TaskStatus::Backlog => 0,
            TaskStatus::Ready => 1,
            TaskStatus::InProgress => 2,
            TaskStatus::Review => 3,
            TaskStatus::Done => 4,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Backlog => write!(f, "backlog"),
            TaskStatus::Ready => write!(f, "ready"),
            TaskStatus::InProgress => write!(f, "in_progress"),
            TaskStatus::Review => write!(f, "review"),
            TaskStatus::Done => write!(f, "done"),
        }
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "backlog" => Ok(TaskStatus::Backlog),
            "ready" => Ok(TaskStatus::Ready),
            "in_progress" => Ok(TaskStatus::InProgress),
            "review" => Ok(TaskStatus::Review),
            "done" => Ok(TaskStatus::Done),
            _ => Err(Error::InvalidArgument(format!(
                "Invalid task status '{s}'. Expected: backlog, ready, in_progress, review, done"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl TaskPriority {
    /// Higher value sorts first
    pub fn rank(&self) -> u8 {
        match self {
            TaskPriority::Low => 0,
            TaskPriority::Medium => 1,
            TaskPriority::High => 2,
            TaskPriority::Critical => 3,
        }
    }
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Medium
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskPriority::Low => write!(f, "low"),
            TaskPriority::Medium => write!(f, "medium"),
            TaskPriority::High => write!(f, "high"),
            TaskPriority::Critical => write!(f, "critical"),
        }
    }
}

impl FromStr for TaskPriority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            "critical" => Ok(TaskPriority::Critical),
            _ => Err(Error::InvalidArgument(format!(
                "Invalid task priority '{s}'. Expected: low, medium, high, critical"
            ))),
        }
    }
}

/// A task as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub project_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_task_id: Option<String>,
    pub hierarchy_level: u8,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub priority_score: f64,
    #[serde(default)]
    pub business_value: f64,
    #[serde(default)]
    pub estimated_hours: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub is_milestone: bool,
    #[serde(default)]
    pub is_critical_path: bool,
}

impl Task {
    pub fn is_subtask(&self) -> bool {
        self.hierarchy_level == HIERARCHY_SUBTASK
    }
}

/// Sort tasks for board display: status column, then priority, then title.
pub fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by(|left, right| {
        left.status
            .rank()
            .cmp(&right.status.rank())
            .then_with(|| right.priority.rank().cmp(&left.priority.rank()))
            .then_with(|| left.title.cmp(&right.title))
            .then_with(|| left.id.cmp(&right.id))
    });
}

/// Check the hierarchy invariant over a set of tasks.
///
/// A level-2 task must reference a level-1 parent in the same project;
/// a level-1 task must not carry a parent reference.
pub fn validate_hierarchy(tasks: &[Task]) -> Result<()> {
    for task in tasks {
        match task.hierarchy_level {
            HIERARCHY_TASK => {
                if task.parent_task_id.is_some() {
                    return Err(Error::InvalidArgument(format!(
                        "task {} is top-level but has a parent task",
                        task.id
                    )));
                }
            }
            HIERARCHY_SUBTASK => {
                let parent_id = task.parent_task_id.as_deref().ok_or_else(|| {
                    Error::InvalidArgument(format!("subtask {} has no parent task", task.id))
                })?;
                let parent = tasks.iter().find(|t| t.id == parent_id).ok_or_else(|| {
                    Error::InvalidArgument(format!(
                        "subtask {} references unknown parent {parent_id}",
                        task.id
                    ))
                })?;
                if parent.hierarchy_level != HIERARCHY_TASK {
                    return Err(Error::InvalidArgument(format!(
                        "subtask {} has non-top-level parent {parent_id}",
                        task.id
                    )));
                }
                if parent.project_id != task.project_id {
                    return Err(Error::InvalidArgument(format!(
                        "subtask {} and parent {parent_id} belong to different projects",
                        task.id
                    )));
                }
            }
            other => {
                return Err(Error::InvalidArgument(format!(
                    "task {} has invalid hierarchy level {other}",
                    task.id
                )));
            }
        }
    }
    Ok(())
}

// =============================================================================
// Nudges
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NudgeKind {
    Overload,
    DelayRisk,
    SkillGap,
    Unassigned,
    Blocked,
    Conflict,
    DependencyBlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NudgeSeverity {
    Low,
    Medium,
    High,
}

/// Nudge lifecycle status.
///
/// `unread` is the floor of the order; once a nudge leaves it, no
/// transition ever returns there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NudgeStatus {
    Unread,
    Read,
    Dismissed,
    Acted,
}

impl NudgeStatus {
    /// Whether a transition to `next` is allowed
    pub fn can_transition_to(&self, next: NudgeStatus) -> bool {
        match (self, next) {
            (_, NudgeStatus::Unread) => *self == NudgeStatus::Unread,
            _ => true,
        }
    }
}

impl fmt::Display for NudgeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NudgeStatus::Unread => write!(f, "unread"),
            NudgeStatus::Read => write!(f, "read"),
            NudgeStatus::Dismissed => write!(f, "dismissed"),
            NudgeStatus::Acted => write!(f, "acted"),
        }
    }
}

impl FromStr for NudgeStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "unread" => Ok(NudgeStatus::Unread),
            "read" => Ok(NudgeStatus::Read),
            "dismissed" => Ok(NudgeStatus::Dismissed),
            "acted" => Ok(NudgeStatus::Acted),
            _ => Err(Error::InvalidArgument(format!(
                "Invalid nudge status '{s}'. Expected: unread, read, dismissed, acted"
            ))),
        }
    }
}

/// A server-generated advisory alert
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Nudge {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NudgeKind,
    pub severity: NudgeSeverity,
    pub status: NudgeStatus,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_person_id: Option<String>,
    #[serde(default)]
    pub criticality_score: f64,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Workload and scenarios
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadEntry {
    pub person_id: String,
    pub person_name: String,
    pub allocation_percentage: f64,
    pub assigned_tasks: u32,
    pub total_estimated_hours: f64,
    #[serde(default)]
    pub availability_this_week: f64,
    #[serde(default)]
    pub availability_next_week: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TeamWorkload {
    pub week_starting: String,
    pub team_capacity: f64,
    pub team_allocation: f64,
    pub utilization_rate: f64,
    pub members: Vec<WorkloadEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    Draft,
    Pending,
    Simulated,
    Applied,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioChange {
    EmployeeLeave,
    ScopeChange,
    Reallocation,
    PriorityShift,
    DeadlineChange,
}

/// A what-if scenario owned by the remote service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub change_type: ScenarioChange,
    pub status: ScenarioStatus,
    #[serde(default)]
    pub proposed_changes: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Request / response DTOs
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub priority: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub project_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_task_id: Option<String>,
    pub hierarchy_level: u8,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub estimated_hours: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub is_milestone: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_skills: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_milestone: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskStatusRequest {
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignTaskRequest {
    pub person_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListResponse {
    pub tasks: Vec<Task>,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectListResponse {
    pub projects: Vec<Project>,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NudgeStatusRequest {
    pub status: NudgeStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NudgeActionRequest {
    pub action_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NudgeListSummary {
    pub total: u64,
    pub unread: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NudgeListResponse {
    pub nudges: Vec<Nudge>,
    pub summary: NudgeListSummary,
}

/// Filter parameters for listing nudges
#[derive(Debug, Clone, Default)]
pub struct NudgeQuery {
    pub status: Vec<NudgeStatus>,
    pub severity: Vec<NudgeSeverity>,
    pub project_id: Option<String>,
    pub person_id: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl NudgeQuery {
    /// Flatten into query parameters; list values are comma-joined.
    pub fn to_params(&self) -> Vec<(&'static str, Option<String>)> {
        let join = |parts: Vec<String>| {
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(","))
            }
        };
        vec![
            (
                "status",
                join(self.status.iter().map(|s| s.to_string()).collect()),
            ),
            (
                "severity",
                join(
                    self.severity
                        .iter()
                        .map(|s| {
                            match s {
                                NudgeSeverity::Low => "low",
                                NudgeSeverity::Medium => "medium",
                                NudgeSeverity::High => "high",
                            }
                            .to_string()
                        })
                        .collect(),
                ),
            ),
            ("projectId", self.project_id.clone()),
            ("personId", self.person_id.clone()),
            ("limit", self.limit.map(|v| v.to_string())),
            ("offset", self.offset.map(|v| v.to_string())),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScenarioRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub change_type: ScenarioChange,
    pub proposed_changes: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateScenarioRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_recommendations: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyScenarioRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apply_recommendations: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_stakeholders: Option<bool>,
}
