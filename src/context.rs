//! The sync context: one explicitly constructed object owning the
//! transport client, query cache, optimistic store, mutation log, and
//! event sink. Components receive it by reference instead of importing
//! ambient global state; `init` and `dispose` bound its lifecycle to the
//! application session.
//!
//! Locking discipline: every internal lock is taken only inside
//! synchronous sections and released before any await point, so
//! interleaved in-flight operations can make progress on one thread.

use std::sync::{Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::cache::{QueryCache, QueryKey};
use crate::client::ApiClient;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::events::{Event, EventDestination, EventKind, EventSink};
use crate::mutation::{MutationFilter, MutationKind, MutationLog, MutationRecord};
use crate::session::SessionState;
use crate::store::{ProjectPatch, Store, TaskPatch};
use crate::types::{
    ApplyScenarioRequest, AssignTaskRequest, CreateProjectRequest, CreateScenarioRequest,
    CreateTaskRequest, Nudge, NudgeActionRequest, NudgeListResponse, NudgeQuery, NudgeStatus,
    Project, ProjectListResponse, ProjectStatus, Scenario, SimulateScenarioRequest, Task,
    TaskListResponse, TaskStatus, TeamWorkload, UpdateProjectRequest, UpdateTaskRequest,
    UpdateTaskStatusRequest,
};

/// Process-wide sync engine state, constructed once per application session
#[derive(Debug)]
pub struct SyncContext {
    client: ApiClient,
    store: Mutex<Store>,
    cache: Mutex<QueryCache>,
    log: Mutex<MutationLog>,
    events: Option<Mutex<EventSink>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A poisoned lock only means a panic elsewhere; the guarded state is
    // still consistent because every critical section is short and total.
    mutex.lock().unwrap_or_else(|err| err.into_inner())
}

impl SyncContext {
    /// Initialize the context for one application session
    pub fn init(config: &Config, session: SessionState) -> Result<Self> {
        let client = ApiClient::new(config, session)?;
        let events = match EventDestination::parse(config.events.destination.as_deref()) {
            Some(destination) => Some(Mutex::new(destination.open()?)),
            None => None,
        };
        Ok(Self {
            client,
            store: Mutex::new(Store::new()),
            cache: Mutex::new(QueryCache::new()),
            log: Mutex::new(MutationLog::new()),
            events,
        })
    }

    /// Tear the context down at session end
    pub fn dispose(self) {}

    /// Clear snapshot and cache (logout). Outstanding mutation
    /// resolutions become no-ops afterwards.
    pub fn reset(&self) {
        lock(&self.store).reset();
        *lock(&self.cache) = QueryCache::new();
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    // =========================================================================
    // Snapshot access
    // =========================================================================

    pub fn snapshot_projects(&self) -> Vec<Project> {
        lock(&self.store).snapshot().projects.clone()
    }

    pub fn snapshot_tasks(&self) -> Vec<Task> {
        lock(&self.store).snapshot().tasks.clone()
    }

    pub fn snapshot_nudges(&self) -> Vec<Nudge> {
        lock(&self.store).snapshot().nudges.clone()
    }

    pub fn unread_nudges(&self) -> usize {
        lock(&self.store).snapshot().unread_nudges()
    }

    pub fn snapshot_task(&self, task_id: &str) -> Option<Task> {
        lock(&self.store).task(task_id).cloned()
    }

    pub fn snapshot_project(&self, project_id: &str) -> Option<Project> {
        lock(&self.store).project(project_id).cloned()
    }

    /// Reconciled mutations, newest first
    pub fn mutation_records(
        &self,
        filter: &MutationFilter,
        limit: Option<usize>,
    ) -> Vec<MutationRecord> {
        lock(&self.log).read_filtered(filter, limit)
    }

    /// Fresh cached value for a key, if any
    pub fn cache_get(&self, key: &QueryKey) -> Option<serde_json::Value> {
        lock(&self.cache).get(key).cloned()
    }

    /// Manually mark a collection stale
    pub fn invalidate(&self, collection: &str) {
        lock(&self.cache).invalidate_collection(collection);
    }

    // =========================================================================
    // Cached reads
    // =========================================================================

    /// List projects, serving a fresh cache entry when one exists
    pub async fn projects(&self, status: Option<ProjectStatus>) -> Result<Vec<Project>> {
        let key = match status {
            Some(status) => QueryKey::filtered("projects", [("status", status.to_string())]),
            None => QueryKey::collection("projects"),
        };
        if let Some(value) = self.cache_get(&key) {
            let cached: ProjectListResponse = serde_json::from_value(value)?;
            return Ok(cached.projects);
        }

        let response = self.client.list_projects(status).await?;
        lock(&self.cache).set(key, serde_json::to_value(&response)?);
        lock(&self.store).set_projects(response.projects.clone());
        Ok(response.projects)
    }

    /// List tasks, optionally filtered by project
    pub async fn tasks(&self, project_id: Option<&str>) -> Result<Vec<Task>> {
        let key = match project_id {
            Some(id) => QueryKey::filtered("tasks", [("projectId", id)]),
            None => QueryKey::collection("tasks"),
        };
        if let Some(value) = self.cache_get(&key) {
            let cached: TaskListResponse = serde_json::from_value(value)?;
            return Ok(cached.tasks);
        }

        let response = self.client.list_tasks(project_id).await?;
        lock(&self.cache).set(key, serde_json::to_value(&response)?);
        lock(&self.store).set_tasks(response.tasks.clone());
        Ok(response.tasks)
    }

    /// List nudges and refresh the snapshot's unread counter
    pub async fn nudges(&self, query: &NudgeQuery) -> Result<NudgeListResponse> {
        let params: Vec<(String, String)> = query
            .to_params()
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k.to_string(), v)))
            .collect();
        let key = if params.is_empty() {
            QueryKey::collection("nudges")
        } else {
            QueryKey::filtered("nudges", params)
        };
        if let Some(value) = self.cache_get(&key) {
            return Ok(serde_json::from_value(value)?);
        }

        let response = self.client.list_nudges(query).await?;
        lock(&self.cache).set(key, serde_json::to_value(&response)?);
        lock(&self.store).set_nudges(response.nudges.clone());
        Ok(response)
    }

    /// Team allocation snapshot
    pub async fn team_workload(&self) -> Result<TeamWorkload> {
        let key = QueryKey::collection("workload");
        if let Some(value) = self.cache_get(&key) {
            return Ok(serde_json::from_value(value)?);
        }

        let workload = self.client.team_workload().await?;
        lock(&self.cache).set(key, serde_json::to_value(&workload)?);
        Ok(workload)
    }

    // =========================================================================
    // Optimistic task mutations
    // =========================================================================

    /// Update a task's status optimistically
    pub async fn update_task_status(&self, task_id: &str, status: TaskStatus) -> Result<()> {
        let record = MutationRecord::new(MutationKind::UpdateTaskStatus, Some(task_id.to_string()));
        let inverse = self.apply_optimistic_task(task_id, &record, &TaskPatch::status(status))?;

        let request = UpdateTaskStatusRequest {
            status,
            progress_percentage: None,
            note: None,
        };
        let outcome = self
            .client
            .update_task_status(task_id, &request)
            .await
            .map(|_| ());
        self.reconcile_task(record, task_id, inverse, outcome, EventKind::TaskStatusChanged)
    }

    /// Update arbitrary task fields optimistically
    pub async fn update_task(&self, task_id: &str, patch: TaskPatch) -> Result<()> {
        if patch.is_empty() {
            return Err(Error::InvalidArgument("empty task patch".to_string()));
        }
        let record = MutationRecord::new(MutationKind::UpdateTask, Some(task_id.to_string()));
        let inverse = self.apply_optimistic_task(task_id, &record, &patch)?;

        let request = update_request_for(&patch);
        let outcome = self.client.update_task(task_id, &request).await.map(|_| ());
        self.reconcile_task(record, task_id, inverse, outcome, EventKind::TaskUpdated)
    }

    /// Assign a task to a person optimistically
    pub async fn assign_task(&self, task_id: &str, person_id: &str) -> Result<()> {
        let record = MutationRecord::new(MutationKind::AssignTask, Some(task_id.to_string()));
        let patch = TaskPatch::assignee(Some(person_id.to_string()));
        let inverse = self.apply_optimistic_task(task_id, &record, &patch)?;

        let request = AssignTaskRequest {
            person_id: person_id.to_string(),
            note: None,
        };
        let outcome = self
            .client
            .assign_task(task_id, &request)
            .await
            .map(|_| ());
        self.reconcile_task(record, task_id, inverse, outcome, EventKind::TaskAssigned)
    }

    /// Clear a task's assignee optimistically
    pub async fn unassign_task(&self, task_id: &str) -> Result<()> {
        let record = MutationRecord::new(MutationKind::UnassignTask, Some(task_id.to_string()));
        let inverse = self.apply_optimistic_task(task_id, &record, &TaskPatch::assignee(None))?;

        let outcome = self.client.unassign_task(task_id).await.map(|_| ());
        self.reconcile_task(record, task_id, inverse, outcome, EventKind::TaskUnassigned)
    }

    /// Create a task. Creates are not optimistic: the snapshot grows only
    /// on the server's response.
    pub async fn create_task(&self, request: &CreateTaskRequest) -> Result<Task> {
        let record = MutationRecord::new(MutationKind::CreateTask, None);
        match self.client.create_task(request).await {
            Ok(task) => {
                lock(&self.store).insert_task(task.clone());
                lock(&self.cache).apply_mutation(record.kind);
                let mut record = record;
                record.entity_id = Some(task.id.clone());
                lock(&self.log).append(record.committed());
                self.emit(EventKind::TaskCreated, Some(&task.id));
                Ok(task)
            }
            Err(err) => {
                warn!(error = %err, "task creation failed");
                lock(&self.log).append(record.rolled_back(err.to_string()));
                Err(err)
            }
        }
    }

    /// Delete a task. Deletes are not optimistic: the entity leaves the
    /// snapshot only after the delete call succeeds, so a failed delete
    /// never has to resurrect a vanished row.
    pub async fn delete_task(&self, task_id: &str) -> Result<()> {
        let record = MutationRecord::new(MutationKind::DeleteTask, Some(task_id.to_string()));
        lock(&self.store).begin_mutation(task_id, record.record_id)?;

        let outcome = self.client.delete_task(task_id).await;
        let mut store = lock(&self.store);
        let owns = store.finish_mutation(task_id, record.record_id);
        match outcome {
            Ok(()) => {
                if owns {
                    store.remove_task(task_id);
                }
                drop(store);
                lock(&self.cache).apply_mutation(record.kind);
                lock(&self.log).append(record.committed());
                self.emit(EventKind::TaskDeleted, Some(task_id));
                Ok(())
            }
            Err(err) => {
                drop(store);
                warn!(task_id, error = %err, "task delete failed");
                lock(&self.log).append(record.rolled_back(err.to_string()));
                Err(err)
            }
        }
    }

    // =========================================================================
    // Project mutations
    // =========================================================================

    /// Create a project (not optimistic, like all creates)
    pub async fn create_project(&self, request: &CreateProjectRequest) -> Result<Project> {
        let record = MutationRecord::new(MutationKind::CreateProject, None);
        match self.client.create_project(request).await {
            Ok(project) => {
                lock(&self.store).insert_project(project.clone());
                lock(&self.cache).apply_mutation(record.kind);
                let mut record = record;
                record.entity_id = Some(project.id.clone());
                lock(&self.log).append(record.committed());
                self.emit(EventKind::ProjectCreated, Some(&project.id));
                Ok(project)
            }
            Err(err) => {
                warn!(error = %err, "project creation failed");
                lock(&self.log).append(record.rolled_back(err.to_string()));
                Err(err)
            }
        }
    }

    /// Update project fields optimistically
    pub async fn update_project(&self, project_id: &str, patch: ProjectPatch) -> Result<()> {
        if patch.is_empty() {
            return Err(Error::InvalidArgument("empty project patch".to_string()));
        }
        let record = MutationRecord::new(MutationKind::UpdateProject, Some(project_id.to_string()));
        let inverse = {
            let mut store = lock(&self.store);
            store.begin_mutation(project_id, record.record_id)?;
            match store.apply_project_patch(project_id, &patch) {
                Ok(inverse) => inverse,
                Err(err) => {
                    store.finish_mutation(project_id, record.record_id);
                    return Err(err);
                }
            }
        };

        let request = UpdateProjectRequest {
            name: patch.name.clone(),
            description: patch.description.clone(),
            status: patch.status,
            priority: patch.priority,
            target_end_date: patch.target_end_date.flatten(),
        };
        let outcome = self
            .client
            .update_project(project_id, &request)
            .await
            .map(|_| ());

        let mut store = lock(&self.store);
        let owns = store.finish_mutation(project_id, record.record_id);
        match outcome {
            Ok(()) => {
                drop(store);
                lock(&self.cache).apply_mutation(record.kind);
                lock(&self.log).append(record.committed());
                self.emit(EventKind::ProjectUpdated, Some(project_id));
                Ok(())
            }
            Err(err) => {
                if owns {
                    if let Err(rollback_err) = store.rollback_project(project_id, &inverse) {
                        warn!(project_id, error = %rollback_err, "project rollback failed");
                    }
                }
                drop(store);
                warn!(project_id, error = %err, "project update rolled back");
                lock(&self.log).append(record.rolled_back(err.to_string()));
                self.emit(EventKind::MutationRolledBack, Some(project_id));
                Err(err)
            }
        }
    }

    // =========================================================================
    // Scenario mutations
    // =========================================================================

    /// Create a what-if scenario (server-owned; not optimistic)
    pub async fn create_scenario(&self, request: &CreateScenarioRequest) -> Result<Scenario> {
        let record = MutationRecord::new(MutationKind::CreateScenario, None);
        match self.client.create_scenario(request).await {
            Ok(scenario) => {
                lock(&self.cache).apply_mutation(record.kind);
                let mut record = record;
                record.entity_id = Some(scenario.id.clone());
                lock(&self.log).append(record.committed());
                Ok(scenario)
            }
            Err(err) => {
                lock(&self.log).append(record.rolled_back(err.to_string()));
                Err(err)
            }
        }
    }

    /// Run a scenario simulation on the server
    pub async fn simulate_scenario(
        &self,
        scenario_id: &str,
        request: &SimulateScenarioRequest,
    ) -> Result<serde_json::Value> {
        let record =
            MutationRecord::new(MutationKind::SimulateScenario, Some(scenario_id.to_string()));
        match self.client.simulate_scenario(scenario_id, request).await {
            Ok(analysis) => {
                lock(&self.cache).apply_mutation(record.kind);
                lock(&self.log).append(record.committed());
                Ok(analysis)
            }
            Err(err) => {
                lock(&self.log).append(record.rolled_back(err.to_string()));
                Err(err)
            }
        }
    }

    /// Apply a simulated scenario. Every dependent view goes stale.
    pub async fn apply_scenario(
        &self,
        scenario_id: &str,
        request: &ApplyScenarioRequest,
    ) -> Result<serde_json::Value> {
        let record =
            MutationRecord::new(MutationKind::ApplyScenario, Some(scenario_id.to_string()));
        match self.client.apply_scenario(scenario_id, request).await {
            Ok(result) => {
                lock(&self.cache).apply_mutation(record.kind);
                lock(&self.log).append(record.committed());
                self.emit(EventKind::ScenarioApplied, Some(scenario_id));
                Ok(result)
            }
            Err(err) => {
                lock(&self.log).append(record.rolled_back(err.to_string()));
                Err(err)
            }
        }
    }

    // =========================================================================
    // Nudge mutations
    // =========================================================================

    /// Mark a nudge read. Idempotent with respect to the unread counter.
    pub async fn mark_nudge_read(&self, nudge_id: &str) -> Result<()> {
        self.nudge_status_mutation(nudge_id, NudgeStatus::Read, EventKind::NudgeStatusChanged)
            .await
    }

    /// Dismiss a nudge
    pub async fn dismiss_nudge(&self, nudge_id: &str) -> Result<()> {
        self.nudge_status_mutation(nudge_id, NudgeStatus::Dismissed, EventKind::NudgeStatusChanged)
            .await
    }

    /// Accept a nudge's suggested action
    pub async fn take_nudge_action(&self, nudge_id: &str) -> Result<()> {
        let record = MutationRecord::new(MutationKind::TakeNudgeAction, Some(nudge_id.to_string()));
        let previous = {
            let mut store = lock(&self.store);
            store.begin_mutation(nudge_id, record.record_id)?;
            match store.apply_nudge_status(nudge_id, NudgeStatus::Acted) {
                Ok(previous) => previous,
                Err(err) => {
                    store.finish_mutation(nudge_id, record.record_id);
                    return Err(err);
                }
            }
        };

        let request = NudgeActionRequest {
            action_type: "accept_suggestion".to_string(),
            parameters: None,
        };
        let outcome = self
            .client
            .take_nudge_action(nudge_id, &request)
            .await
            .map(|_| ());
        self.reconcile_nudge(record, nudge_id, previous, outcome, EventKind::NudgeActed)
    }

    async fn nudge_status_mutation(
        &self,
        nudge_id: &str,
        status: NudgeStatus,
        event: EventKind,
    ) -> Result<()> {
        let kind = MutationKind::UpdateNudgeStatus;
        let record = MutationRecord::new(kind, Some(nudge_id.to_string()));
        let previous = {
            let mut store = lock(&self.store);
            store.begin_mutation(nudge_id, record.record_id)?;
            match store.apply_nudge_status(nudge_id, status) {
                Ok(previous) => previous,
                Err(err) => {
                    store.finish_mutation(nudge_id, record.record_id);
                    return Err(err);
                }
            }
        };

        let outcome = self
            .client
            .update_nudge_status(nudge_id, status)
            .await
            .map(|_| ());
        self.reconcile_nudge(record, nudge_id, previous, outcome, event)
    }

    // =========================================================================
    // Shared reconciliation
    // =========================================================================

    fn apply_optimistic_task(
        &self,
        task_id: &str,
        record: &MutationRecord,
        patch: &TaskPatch,
    ) -> Result<TaskPatch> {
        let mut store = lock(&self.store);
        store.begin_mutation(task_id, record.record_id)?;
        match store.apply_task_patch(task_id, patch) {
            Ok(inverse) => Ok(inverse),
            Err(err) => {
                store.finish_mutation(task_id, record.record_id);
                Err(err)
            }
        }
    }

    fn reconcile_task(
        &self,
        record: MutationRecord,
        task_id: &str,
        inverse: TaskPatch,
        outcome: Result<()>,
        event: EventKind,
    ) -> Result<()> {
        let mut store = lock(&self.store);
        let owns = store.finish_mutation(task_id, record.record_id);
        match outcome {
            Ok(()) => {
                // Local snapshot already reflects the change; keep it.
                drop(store);
                lock(&self.cache).apply_mutation(record.kind);
                lock(&self.log).append(record.committed());
                self.emit(event, Some(task_id));
                Ok(())
            }
            Err(err) => {
                if owns {
                    if let Err(rollback_err) = store.rollback_task(task_id, &inverse) {
                        warn!(task_id, error = %rollback_err, "task rollback failed");
                    }
                } else {
                    debug!(task_id, "late resolution ignored; mutation no longer outstanding");
                }
                drop(store);
                warn!(task_id, error = %err, "task mutation rolled back");
                lock(&self.log).append(record.rolled_back(err.to_string()));
                self.emit(EventKind::MutationRolledBack, Some(task_id));
                Err(err)
            }
        }
    }

    fn reconcile_nudge(
        &self,
        record: MutationRecord,
        nudge_id: &str,
        previous: NudgeStatus,
        outcome: Result<()>,
        event: EventKind,
    ) -> Result<()> {
        let mut store = lock(&self.store);
        let owns = store.finish_mutation(nudge_id, record.record_id);
        match outcome {
            Ok(()) => {
                drop(store);
                lock(&self.cache).apply_mutation(record.kind);
                lock(&self.log).append(record.committed());
                self.emit(event, Some(nudge_id));
                Ok(())
            }
            Err(err) => {
                if owns {
                    if let Err(rollback_err) = store.rollback_nudge(nudge_id, previous) {
                        warn!(nudge_id, error = %rollback_err, "nudge rollback failed");
                    }
                }
                drop(store);
                warn!(nudge_id, error = %err, "nudge mutation rolled back");
                lock(&self.log).append(record.rolled_back(err.to_string()));
                self.emit(EventKind::MutationRolledBack, Some(nudge_id));
                Err(err)
            }
        }
    }

    fn emit(&self, kind: EventKind, entity_id: Option<&str>) {
        if let Some(sink) = &self.events {
            let event = Event::new(kind, entity_id.map(|id| id.to_string()));
            if let Err(err) = lock(sink).emit(&event) {
                warn!(error = %err, "event emission failed");
            }
        }
    }
}

/// Project the wire-facing update request out of a local patch.
/// Nested set-to-null values cannot be expressed by the PATCH contract
/// and are dropped; unassignment goes through the dedicated endpoint.
fn update_request_for(patch: &TaskPatch) -> UpdateTaskRequest {
    UpdateTaskRequest {
        title: patch.title.clone(),
        description: patch.description.clone(),
        status: patch.status,
        priority: patch.priority,
        estimated_hours: patch.estimated_hours,
        actual_hours: patch.actual_hours.flatten(),
        due_date: patch.due_date.flatten(),
        assignee_id: patch.assignee_id.clone().flatten(),
        required_skills: patch.required_skills.clone(),
        is_milestone: patch.is_milestone,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_request_flattens_nullable_fields() {
        let patch = TaskPatch {
            title: Some("New".to_string()),
            assignee_id: Some(None),
            actual_hours: Some(Some(4.0)),
            ..TaskPatch::default()
        };
        let request = update_request_for(&patch);
        assert_eq!(request.title.as_deref(), Some("New"));
        assert_eq!(request.assignee_id, None);
        assert_eq!(request.actual_hours, Some(4.0));
        assert!(request.status.is_none());
    }
}
