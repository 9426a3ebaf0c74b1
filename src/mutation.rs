//! Mutation records for the optimistic store.
//!
//! Every reconciled mutation (committed or rolled back) is appended to an
//! in-memory log so callers can inspect what happened and in which order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kinds of mutations the client can issue.
///
/// Each kind owns a fixed cache-invalidation set (see `cache`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    CreateProject,
    UpdateProject,
    CreateTask,
    UpdateTask,
    UpdateTaskStatus,
    AssignTask,
    UnassignTask,
    DeleteTask,
    UpdateNudgeStatus,
    TakeNudgeAction,
    CreateScenario,
    SimulateScenario,
    ApplyScenario,
}

impl MutationKind {
    /// All kinds, for table-completeness checks
    pub const ALL: [MutationKind; 13] = [
        MutationKind::CreateProject,
        MutationKind::UpdateProject,
        MutationKind::CreateTask,
        MutationKind::UpdateTask,
        MutationKind::UpdateTaskStatus,
        MutationKind::AssignTask,
        MutationKind::UnassignTask,
        MutationKind::DeleteTask,
        MutationKind::UpdateNudgeStatus,
        MutationKind::TakeNudgeAction,
        MutationKind::CreateScenario,
        MutationKind::SimulateScenario,
        MutationKind::ApplyScenario,
    ];
}

/// Lifecycle of a single mutation.
///
/// Legal transitions:
/// Requested -> AppliedLocally -> InFlight -> Committed | RolledBack.
/// Creates and deletes skip AppliedLocally (they are not optimistic).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationState {
    Requested,
    AppliedLocally,
    InFlight,
    Committed,
    RolledBack,
}

impl MutationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MutationState::Committed | MutationState::RolledBack)
    }

    /// Whether this state may move to `next`
    pub fn can_transition_to(&self, next: MutationState) -> bool {
        use MutationState::*;
        matches!(
            (self, next),
            (Requested, AppliedLocally)
                | (Requested, InFlight)
                | (AppliedLocally, InFlight)
                | (InFlight, Committed)
                | (InFlight, RolledBack)
        )
    }
}

/// A reconciled mutation as recorded in the log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MutationRecord {
    pub record_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub kind: MutationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    pub state: MutationState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl MutationRecord {
    pub fn new(kind: MutationKind, entity_id: Option<String>) -> Self {
        Self {
            record_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            kind,
            entity_id,
            state: MutationState::Requested,
            message: None,
        }
    }

    pub fn committed(mut self) -> Self {
        self.state = MutationState::Committed;
        self
    }

    pub fn rolled_back(mut self, message: impl Into<String>) -> Self {
        self.state = MutationState::RolledBack;
        self.message = Some(message.into());
        self
    }
}

/// In-memory append-only log of reconciled mutations
#[derive(Debug, Default)]
pub struct MutationLog {
    records: Vec<MutationRecord>,
}

impl MutationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: MutationRecord) {
        self.records.push(record);
    }

    pub fn read_all(&self) -> &[MutationRecord] {
        &self.records
    }

    /// Records filtered and sorted newest first
    pub fn read_filtered(
        &self,
        filter: &MutationFilter,
        limit: Option<usize>,
    ) -> Vec<MutationRecord> {
        let mut matched: Vec<MutationRecord> = self
            .records
            .iter()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        if let Some(limit) = limit {
            matched.truncate(limit);
        }
        matched
    }
}

/// Filter for selecting mutation log entries
#[derive(Debug, Clone, Default)]
pub struct MutationFilter {
    pub kind: Option<MutationKind>,
    pub entity_id: Option<String>,
    pub state: Option<MutationState>,
}

impl MutationFilter {
    pub fn matches(&self, record: &MutationRecord) -> bool {
        if let Some(kind) = self.kind {
            if record.kind != kind {
                return false;
            }
        }
        if let Some(entity_id) = &self.entity_id {
            if record.entity_id.as_deref() != Some(entity_id.as_str()) {
                return false;
            }
        }
        if let Some(state) = self.state {
            if record.state != state {
                return false;
            }
        }
        true
    }
}
