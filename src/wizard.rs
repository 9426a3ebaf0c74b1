//! Creation wizard state machine.
//!
//! A wizard session is per-dialog ephemeral state: a conversation
//! transcript, the current phase, and the generated draft. Phases move
//! `Chat -> Review -> Editing -> Committed`; dropping the session at any
//! point discards everything, and nothing is ever persisted.
//!
//! Draft generation is synchronous business logic gated behind a
//! configured latency for pacing. Dropping the in-flight `send_message`
//! future cancels the pending delay, so a closed dialog can never
//! resolve into a discarded session.

use std::time::Duration;

use tracing::debug;

use crate::config::Config;
use crate::draft::{self, Draft};
use crate::error::{Error, Result};

const PROJECT_GREETING: &str = "Tell me about your project - what are you building, who is it \
for, and are there any requirements or deadlines?";
const SUBTASK_GREETING: &str = "Describe the task and I will break it down into subtasks.";
const FOLLOW_UP: &str = "Thanks for the details. What is the target timeline, and are any \
specific skills needed? Say 'generate' when you want a draft from what you have shared.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardPhase {
    Chat,
    Review,
    Editing,
    Committed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// What the wizard answered to a chat message
#[derive(Debug, Clone)]
pub enum WizardReply {
    /// More detail requested; no draft yet
    FollowUp(String),
    /// A draft was generated and the session moved to review
    Draft(Draft),
}

#[derive(Debug, Clone)]
enum WizardKind {
    Project,
    Subtasks { title: String, project_id: String },
}

/// Ephemeral per-dialog session driving conversation to a committed draft
#[derive(Debug)]
pub struct WizardSession {
    kind: WizardKind,
    phase: WizardPhase,
    transcript: Vec<ChatMessage>,
    draft: Option<Draft>,
    generation_delay: Duration,
}

impl WizardSession {
    /// Start a project-creation session
    pub fn project(config: &Config) -> Self {
        Self::new(WizardKind::Project, PROJECT_GREETING, config)
    }

    /// Start a subtask-breakdown session for a task inside `project_id`
    pub fn subtasks(config: &Config, title: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self::new(
            WizardKind::Subtasks {
                title: title.into(),
                project_id: project_id.into(),
            },
            SUBTASK_GREETING,
            config,
        )
    }

    fn new(kind: WizardKind, greeting: &str, config: &Config) -> Self {
        Self {
            kind,
            phase: WizardPhase::Chat,
            transcript: vec![ChatMessage {
                role: ChatRole::Assistant,
                content: greeting.to_string(),
            }],
            draft: None,
            generation_delay: Duration::from_millis(config.wizard.generation_delay_ms),
        }
    }

    pub fn phase(&self) -> WizardPhase {
        self.phase
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn draft(&self) -> Option<&Draft> {
        self.draft.as_ref()
    }

    /// Append a user message; generate a draft once the conversation
    /// carries enough signal, otherwise ask a follow-up question.
    pub async fn send_message(&mut self, text: &str) -> Result<WizardReply> {
        match self.phase {
            WizardPhase::Chat | WizardPhase::Review => {}
            other => {
                return Err(Error::InvalidTransition(format!(
                    "cannot chat in {other:?} phase"
                )))
            }
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::InvalidArgument(
                "message cannot be empty".to_string(),
            ));
        }

        self.transcript.push(ChatMessage {
            role: ChatRole::User,
            content: text.to_string(),
        });

        if !self.should_generate(text) {
            self.transcript.push(ChatMessage {
                role: ChatRole::Assistant,
                content: FOLLOW_UP.to_string(),
            });
            return Ok(WizardReply::FollowUp(FOLLOW_UP.to_string()));
        }

        // Pacing delay; cancelled by dropping this future.
        if !self.generation_delay.is_zero() {
            tokio::time::sleep(self.generation_delay).await;
        }

        let transcript_text = self.user_transcript();
        let draft = match &self.kind {
            WizardKind::Project => draft::generate_project_draft(&transcript_text),
            WizardKind::Subtasks { title, project_id } => {
                draft::generate_task_draft(&transcript_text, title, project_id)
            }
        };
        debug!(children = draft.children.len(), "wizard draft generated");

        self.transcript.push(ChatMessage {
            role: ChatRole::Assistant,
            content: summarize(&draft),
        });
        self.draft = Some(draft.clone());
        self.phase = WizardPhase::Review;
        Ok(WizardReply::Draft(draft))
    }

    /// Open the draft for direct edits. User-initiated only; the session
    /// never moves past review on its own.
    pub fn begin_editing(&mut self) -> Result<&mut Draft> {
        if self.phase != WizardPhase::Review {
            return Err(Error::InvalidTransition(format!(
                "cannot edit from {:?} phase",
                self.phase
            )));
        }
        let draft = self
            .draft
            .as_mut()
            .ok_or_else(|| Error::InvalidTransition("no draft to edit".to_string()))?;
        self.phase = WizardPhase::Editing;
        Ok(draft)
    }

    /// Mutable access to the draft while editing
    pub fn draft_mut(&mut self) -> Result<&mut Draft> {
        match (self.phase, self.draft.as_mut()) {
            (WizardPhase::Editing, Some(draft)) => Ok(draft),
            (phase, _) => Err(Error::InvalidTransition(format!(
                "draft is not editable in {phase:?} phase"
            ))),
        }
    }

    /// Validate and hand over the edited draft for submission
    pub fn commit(&mut self) -> Result<Draft> {
        if self.phase != WizardPhase::Editing {
            return Err(Error::InvalidTransition(format!(
                "cannot commit from {:?} phase",
                self.phase
            )));
        }
        let draft = self
            .draft
            .clone()
            .ok_or_else(|| Error::InvalidTransition("no draft to commit".to_string()))?;
        draft.validate()?;
        self.phase = WizardPhase::Committed;
        Ok(draft)
    }

    /// Discard the session. Dropping it has the same effect; this exists
    /// for call sites that want the discard to be explicit.
    pub fn abandon(self) {}

    fn should_generate(&self, latest: &str) -> bool {
        let lower = latest.to_lowercase();
        let keyword_hit = ["generate", "create", "build"]
            .iter()
            .any(|kw| lower.contains(kw))
            || (matches!(self.kind, WizardKind::Subtasks { .. }) && lower.contains("break"));
        if keyword_hit {
            return true;
        }
        // Enough back-and-forth: this is at least the second user message.
        self.transcript
            .iter()
            .filter(|msg| msg.role == ChatRole::User)
            .count()
            >= 2
    }

    fn user_transcript(&self) -> String {
        self.transcript
            .iter()
            .filter(|msg| msg.role == ChatRole::User)
            .map(|msg| msg.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn summarize(draft: &Draft) -> String {
    let mut lines = vec![
        format!("Proposed: {}", draft.parent.title()),
        format!(
            "{} child tasks, {} estimated hours total:",
            draft.children.len(),
            draft.total_hours()
        ),
    ];
    for (index, child) in draft.children.iter().enumerate() {
        lines.push(format!(
            "{}. {} ({}h)",
            index + 1,
            child.title,
            child.estimated_hours
        ));
    }
    lines.push("Review and edit the structure before creating it.".to_string());
    lines.join("\n")
}
