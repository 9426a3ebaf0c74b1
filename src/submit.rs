//! Bulk submission of a committed draft.
//!
//! The parent entity is created first; children follow strictly in draft
//! order, one at a time, each carrying the parent's newly-assigned id.
//! On a child failure the orchestrator stops issuing further creations
//! and reports how far it got. Already-created entities are kept: there
//! is deliberately no compensating delete, so the caller can retry the
//! remaining children instead of losing finished work.

use chrono::{Duration, Utc};
use tracing::{debug, warn};

use crate::context::SyncContext;
use crate::draft::{Draft, DraftChild, DraftParent};
use crate::error::{Error, Result};
use crate::types::{
    CreateProjectRequest, CreateTaskRequest, Project, Task, HIERARCHY_SUBTASK, HIERARCHY_TASK,
};

/// The parent entity created by a submission
#[derive(Debug, Clone)]
pub enum CreatedParent {
    Project(Project),
    Task(Task),
}

impl CreatedParent {
    pub fn id(&self) -> &str {
        match self {
            CreatedParent::Project(project) => &project.id,
            CreatedParent::Task(task) => &task.id,
        }
    }
}

/// The child whose creation failed, by draft position
#[derive(Debug)]
pub struct FailedChild {
    pub index: usize,
    pub title: String,
    pub error: Error,
}

/// Outcome of a bulk submission.
///
/// `failed` is `None` on full success. On partial failure the parent and
/// the first `created.len()` children exist on the server; children after
/// the failed one were never attempted.
#[derive(Debug)]
pub struct CreationReport {
    pub parent: CreatedParent,
    pub created: Vec<Task>,
    pub failed: Option<FailedChild>,
}

impl CreationReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_none()
    }

    pub fn children_created(&self) -> usize {
        self.created.len()
    }
}

/// Create the draft's parent and children through the sync context.
///
/// A parent-creation failure aborts with zero children created. Child
/// failures produce an `Ok` report carrying the failure detail instead,
/// so the successful prefix is not lost to the caller.
pub async fn submit_draft(ctx: &SyncContext, draft: &Draft) -> Result<CreationReport> {
    draft.validate()?;

    let (parent, project_id, mut parent_for_subtasks) = match &draft.parent {
        DraftParent::Project {
            name,
            description,
            priority,
            target_days,
        } => {
            let now = Utc::now();
            let request = CreateProjectRequest {
                name: name.clone(),
                description: description.clone(),
                priority: *priority,
                start_date: Some(now),
                target_end_date: Some(now + Duration::days(*target_days)),
            };
            let project = ctx.create_project(&request).await?;
            let project_id = project.id.clone();
            (CreatedParent::Project(project), project_id, None)
        }
        DraftParent::Task {
            title,
            description,
            project_id,
            priority,
            estimated_hours,
        } => {
            let request = CreateTaskRequest {
                title: title.clone(),
                description: description.clone(),
                project_id: project_id.clone(),
                parent_task_id: None,
                hierarchy_level: HIERARCHY_TASK,
                priority: *priority,
                estimated_hours: *estimated_hours,
                due_date: None,
                assignee_id: None,
                required_skills: Vec::new(),
                is_milestone: false,
            };
            let task = ctx.create_task(&request).await?;
            let task_id = task.id.clone();
            (CreatedParent::Task(task), project_id.clone(), Some(task_id))
        }
    };

    let mut created = Vec::new();
    let mut failed = None;

    for (index, child) in draft.children.iter().enumerate() {
        let parent_task_id = match child.hierarchy_level {
            HIERARCHY_SUBTASK => parent_for_subtasks.clone(),
            _ => None,
        };
        let request = child_request(child, &project_id, parent_task_id);

        match ctx.create_task(&request).await {
            Ok(task) => {
                if task.hierarchy_level == HIERARCHY_TASK
                    && matches!(parent, CreatedParent::Project(_))
                {
                    // Subsequent subtasks hang off the most recent
                    // top-level child.
                    parent_for_subtasks = Some(task.id.clone());
                }
                created.push(task);
            }
            Err(error) => {
                warn!(
                    index,
                    title = child.title.as_str(),
                    error = %error,
                    "bulk submission stopped at failed child"
                );
                failed = Some(FailedChild {
                    index,
                    title: child.title.clone(),
                    error,
                });
                break;
            }
        }
    }

    debug!(
        parent_id = parent.id(),
        children = created.len(),
        complete = failed.is_none(),
        "bulk submission finished"
    );
    Ok(CreationReport {
        parent,
        created,
        failed,
    })
}

fn child_request(
    child: &DraftChild,
    project_id: &str,
    parent_task_id: Option<String>,
) -> CreateTaskRequest {
    CreateTaskRequest {
        title: child.title.clone(),
        description: child.description.clone(),
        project_id: project_id.to_string(),
        parent_task_id,
        hierarchy_level: child.hierarchy_level,
        priority: child.priority,
        estimated_hours: child.estimated_hours,
        due_date: None,
        assignee_id: None,
        required_skills: Vec::new(),
        is_milestone: false,
    }
}
