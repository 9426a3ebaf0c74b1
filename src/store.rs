//! Optimistic snapshot of the entities the UI mutates directly.
//!
//! The snapshot is a cached copy, never the source of truth. Patches are
//! applied locally before the network call; the inverse patch captured at
//! apply time restores the exact pre-mutation state on rollback.
//!
//! Per-entity discipline: at most one mutation may be outstanding for an
//! entity id. A second request is rejected with `Conflict` rather than
//! stacked on top of an un-reconciled optimistic patch.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{
    Nudge, NudgeStatus, Project, ProjectStatus, Task, TaskPriority, TaskStatus,
};

// =============================================================================
// Patches
// =============================================================================

/// Field-level patch for a task.
///
/// Outer `Option` means "leave unchanged"; the nested `Option` on nullable
/// fields distinguishes "set to null" from "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<Option<f64>>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub assignee_id: Option<Option<String>>,
    pub required_skills: Option<Vec<String>>,
    pub is_milestone: Option<bool>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn assignee(assignee_id: Option<String>) -> Self {
        Self {
            assignee_id: Some(assignee_id),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge this patch into a task
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(hours) = self.estimated_hours {
            task.estimated_hours = hours;
        }
        if let Some(actual) = self.actual_hours {
            task.actual_hours = actual;
        }
        if let Some(due) = self.due_date {
            task.due_date = due;
        }
        if let Some(assignee) = &self.assignee_id {
            task.assignee_id = assignee.clone();
        }
        if let Some(skills) = &self.required_skills {
            task.required_skills = skills.clone();
        }
        if let Some(milestone) = self.is_milestone {
            task.is_milestone = milestone;
        }
    }

    /// Inverse patch capturing the task's current values for every field
    /// this patch would change
    pub fn inverse_of(&self, task: &Task) -> TaskPatch {
        TaskPatch {
            title: self.title.as_ref().map(|_| task.title.clone()),
            description: self.description.as_ref().map(|_| task.description.clone()),
            status: self.status.map(|_| task.status),
            priority: self.priority.map(|_| task.priority),
            estimated_hours: self.estimated_hours.map(|_| task.estimated_hours),
            actual_hours: self.actual_hours.map(|_| task.actual_hours),
            due_date: self.due_date.map(|_| task.due_date),
            assignee_id: self.assignee_id.as_ref().map(|_| task.assignee_id.clone()),
            required_skills: self
                .required_skills
                .as_ref()
                .map(|_| task.required_skills.clone()),
            is_milestone: self.is_milestone.map(|_| task.is_milestone),
        }
    }
}

/// Field-level patch for a project
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<u32>,
    pub target_end_date: Option<Option<DateTime<Utc>>>,
}

impl ProjectPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(&self, project: &mut Project) {
        if let Some(name) = &self.name {
            project.name = name.clone();
        }
        if let Some(description) = &self.description {
            project.description = description.clone();
        }
        if let Some(status) = self.status {
            project.status = status;
        }
        if let Some(priority) = self.priority {
            project.priority = priority;
        }
        if let Some(target) = self.target_end_date {
            project.target_end_date = target;
        }
    }

    pub fn inverse_of(&self, project: &Project) -> ProjectPatch {
        ProjectPatch {
            name: self.name.as_ref().map(|_| project.name.clone()),
            description: self
                .description
                .as_ref()
                .map(|_| project.description.clone()),
            status: self.status.map(|_| project.status),
            priority: self.priority.map(|_| project.priority),
            target_end_date: self.target_end_date.map(|_| project.target_end_date),
        }
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// In-memory copies of the entities the UI renders from
#[derive(Debug, Default, Clone)]
pub struct Snapshot {
    pub projects: Vec<Project>,
    pub tasks: Vec<Task>,
    pub nudges: Vec<Nudge>,
    unread_nudges: usize,
}

impl Snapshot {
    /// Count of nudges still unread, maintained across every nudge change
    pub fn unread_nudges(&self) -> usize {
        self.unread_nudges
    }

    fn recount_unread(&mut self) {
        self.unread_nudges = self
            .nudges
            .iter()
            .filter(|nudge| nudge.status == NudgeStatus::Unread)
            .count();
    }
}

// =============================================================================
// Store
// =============================================================================

/// Optimistic mutation store: snapshot plus the per-entity guard map
#[derive(Debug, Default)]
pub struct Store {
    snapshot: Snapshot,
    outstanding: HashMap<String, Uuid>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    // =========================================================================
    // Snapshot refresh (from fetched data)
    // =========================================================================

    pub fn set_projects(&mut self, projects: Vec<Project>) {
        self.snapshot.projects = projects;
    }

    pub fn set_tasks(&mut self, tasks: Vec<Task>) {
        self.snapshot.tasks = tasks;
    }

    pub fn set_nudges(&mut self, nudges: Vec<Nudge>) {
        self.snapshot.nudges = nudges;
        self.snapshot.recount_unread();
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.snapshot.tasks.iter().find(|t| t.id == task_id)
    }

    pub fn project(&self, project_id: &str) -> Option<&Project> {
        self.snapshot.projects.iter().find(|p| p.id == project_id)
    }

    pub fn nudge(&self, nudge_id: &str) -> Option<&Nudge> {
        self.snapshot.nudges.iter().find(|n| n.id == nudge_id)
    }

    /// Insert an entity created by a successful network call
    pub fn insert_task(&mut self, task: Task) {
        self.snapshot.tasks.push(task);
    }

    pub fn insert_project(&mut self, project: Project) {
        self.snapshot.projects.push(project);
    }

    /// Remove a task after a successful delete call
    pub fn remove_task(&mut self, task_id: &str) {
        self.snapshot.tasks.retain(|t| t.id != task_id);
    }

    // =========================================================================
    // Mutation guard
    // =========================================================================

    /// Claim the entity for a mutation, or fail with `Conflict` while an
    /// earlier mutation is still un-reconciled.
    pub fn begin_mutation(&mut self, entity_id: &str, record_id: Uuid) -> Result<()> {
        if self.outstanding.contains_key(entity_id) {
            return Err(Error::Conflict(entity_id.to_string()));
        }
        self.outstanding.insert(entity_id.to_string(), record_id);
        Ok(())
    }

    /// Whether `record_id` is still the outstanding mutation for the entity.
    /// Completions must check this before applying commit/rollback effects.
    pub fn is_outstanding(&self, entity_id: &str, record_id: Uuid) -> bool {
        self.outstanding.get(entity_id) == Some(&record_id)
    }

    /// Release the guard; returns false if this record no longer owns it
    pub fn finish_mutation(&mut self, entity_id: &str, record_id: Uuid) -> bool {
        if self.is_outstanding(entity_id, record_id) {
            self.outstanding.remove(entity_id);
            true
        } else {
            false
        }
    }

    /// Drop all state (session teardown). Outstanding resolutions become
    /// no-ops because their record ids no longer match.
    pub fn reset(&mut self) {
        self.snapshot = Snapshot::default();
        self.outstanding.clear();
    }

    // =========================================================================
    // Optimistic patch application
    // =========================================================================

    /// Apply a task patch, returning the inverse for rollback
    pub fn apply_task_patch(&mut self, task_id: &str, patch: &TaskPatch) -> Result<TaskPatch> {
        let task = self
            .snapshot
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| Error::NotFound(format!("task {task_id}")))?;
        let inverse = patch.inverse_of(task);
        patch.apply_to(task);
        Ok(inverse)
    }

    /// Revert a task to its pre-mutation state
    pub fn rollback_task(&mut self, task_id: &str, inverse: &TaskPatch) -> Result<()> {
        let task = self
            .snapshot
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| Error::NotFound(format!("task {task_id}")))?;
        inverse.apply_to(task);
        Ok(())
    }

    pub fn apply_project_patch(
        &mut self,
        project_id: &str,
        patch: &ProjectPatch,
    ) -> Result<ProjectPatch> {
        let project = self
            .snapshot
            .projects
            .iter_mut()
            .find(|p| p.id == project_id)
            .ok_or_else(|| Error::NotFound(format!("project {project_id}")))?;
        let inverse = patch.inverse_of(project);
        patch.apply_to(project);
        Ok(inverse)
    }

    pub fn rollback_project(&mut self, project_id: &str, inverse: &ProjectPatch) -> Result<()> {
        let project = self
            .snapshot
            .projects
            .iter_mut()
            .find(|p| p.id == project_id)
            .ok_or_else(|| Error::NotFound(format!("project {project_id}")))?;
        inverse.apply_to(project);
        Ok(())
    }

    /// Move a nudge to `status`, returning the previous status for rollback.
    ///
    /// Transitions back to `unread` are rejected locally; the unread
    /// counter is recomputed, so repeating a transition cannot
    /// double-decrement it.
    pub fn apply_nudge_status(&mut self, nudge_id: &str, status: NudgeStatus) -> Result<NudgeStatus> {
        let nudge = self
            .snapshot
            .nudges
            .iter_mut()
            .find(|n| n.id == nudge_id)
            .ok_or_else(|| Error::NotFound(format!("nudge {nudge_id}")))?;
        if !nudge.status.can_transition_to(status) {
            return Err(Error::InvalidArgument(format!(
                "nudge {nudge_id} cannot move from {} to {status}",
                nudge.status
            )));
        }
        let previous = nudge.status;
        nudge.status = status;
        self.snapshot.recount_unread();
        Ok(previous)
    }

    /// Revert a nudge to its pre-mutation status without transition checks
    pub fn rollback_nudge(&mut self, nudge_id: &str, previous: NudgeStatus) -> Result<()> {
        let nudge = self
            .snapshot
            .nudges
            .iter_mut()
            .find(|n| n.id == nudge_id)
            .ok_or_else(|| Error::NotFound(format!("nudge {nudge_id}")))?;
        nudge.status = previous;
        self.snapshot.recount_unread();
        Ok(())
    }
}
