//! Draft generation for the creation wizard.
//!
//! A draft is the editable, not-yet-submitted proposal for a parent
//! entity plus its ordered child tasks. Generation is a pure function of
//! the accumulated transcript text: an ordered rule set matched
//! first-wins against domain keywords, with an explicit general fallback.
//! No network, no randomness.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{TaskPriority, HIERARCHY_SUBTASK, HIERARCHY_TASK};

/// Proposed parent entity of a draft
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum DraftParent {
    Project {
        name: String,
        description: String,
        priority: u32,
        /// Proposed schedule length; resolved to a target end date at
        /// submission time
        target_days: i64,
    },
    Task {
        title: String,
        description: String,
        project_id: String,
        priority: TaskPriority,
        estimated_hours: f64,
    },
}

impl DraftParent {
    pub fn title(&self) -> &str {
        match self {
            DraftParent::Project { name, .. } => name,
            DraftParent::Task { title, .. } => title,
        }
    }

    pub fn set_title(&mut self, value: impl Into<String>) {
        match self {
            DraftParent::Project { name, .. } => *name = value.into(),
            DraftParent::Task { title, .. } => *title = value.into(),
        }
    }

    pub fn description(&self) -> &str {
        match self {
            DraftParent::Project { description, .. } => description,
            DraftParent::Task { description, .. } => description,
        }
    }

    pub fn set_description(&mut self, value: impl Into<String>) {
        match self {
            DraftParent::Project { description, .. } => *description = value.into(),
            DraftParent::Task { description, .. } => *description = value.into(),
        }
    }
}

/// A proposed child task; order within the draft is significant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DraftChild {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub estimated_hours: f64,
    pub priority: TaskPriority,
    pub hierarchy_level: u8,
}

impl DraftChild {
    pub fn task(title: &str, hours: f64, priority: TaskPriority) -> Self {
        Self {
            title: title.to_string(),
            description: String::new(),
            estimated_hours: hours,
            priority,
            hierarchy_level: HIERARCHY_TASK,
        }
    }

    pub fn subtask(title: &str, hours: f64, priority: TaskPriority) -> Self {
        Self {
            title: title.to_string(),
            description: String::new(),
            estimated_hours: hours,
            priority,
            hierarchy_level: HIERARCHY_SUBTASK,
        }
    }

    fn described(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}

/// Editable proposal handed to the bulk submission orchestrator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Draft {
    pub parent: DraftParent,
    pub children: Vec<DraftChild>,
    /// Plain-language notes shown alongside the proposal
    pub reasoning: Vec<String>,
}

impl Draft {
    pub fn total_hours(&self) -> f64 {
        self.children.iter().map(|c| c.estimated_hours).sum()
    }

    pub fn set_child_title(&mut self, index: usize, title: impl Into<String>) -> Result<()> {
        let child = self.child_mut(index)?;
        child.title = title.into();
        Ok(())
    }

    pub fn set_child_hours(&mut self, index: usize, hours: f64) -> Result<()> {
        if hours < 0.0 {
            return Err(Error::InvalidArgument(
                "estimated hours cannot be negative".to_string(),
            ));
        }
        let child = self.child_mut(index)?;
        child.estimated_hours = hours;
        Ok(())
    }

    pub fn remove_child(&mut self, index: usize) -> Result<DraftChild> {
        if index >= self.children.len() {
            return Err(Error::InvalidArgument(format!(
                "no draft child at index {index}"
            )));
        }
        Ok(self.children.remove(index))
    }

    pub fn insert_child(&mut self, index: usize, child: DraftChild) -> Result<()> {
        if index > self.children.len() {
            return Err(Error::InvalidArgument(format!(
                "no draft position at index {index}"
            )));
        }
        self.children.insert(index, child);
        Ok(())
    }

    pub fn push_child(&mut self, child: DraftChild) {
        self.children.push(child);
    }

    /// Reorder a child, shifting the entries between the two positions
    pub fn move_child(&mut self, from: usize, to: usize) -> Result<()> {
        if from >= self.children.len() || to >= self.children.len() {
            return Err(Error::InvalidArgument(format!(
                "cannot move draft child {from} to {to}"
            )));
        }
        let child = self.children.remove(from);
        self.children.insert(to, child);
        Ok(())
    }

    /// Validate the draft for submission.
    ///
    /// The parent title must be non-empty, and for project drafts every
    /// level-2 child needs a preceding level-1 sibling to hang off.
    pub fn validate(&self) -> Result<()> {
        if self.parent.title().trim().is_empty() {
            return Err(Error::EmptyDraftTitle);
        }
        if matches!(self.parent, DraftParent::Project { .. }) {
            let mut seen_top_level = false;
            for (index, child) in self.children.iter().enumerate() {
                match child.hierarchy_level {
                    HIERARCHY_TASK => seen_top_level = true,
                    HIERARCHY_SUBTASK => {
                        if !seen_top_level {
                            return Err(Error::InvalidDraft(format!(
                                "subtask '{}' at index {index} has no preceding top-level task",
                                child.title
                            )));
                        }
                    }
                    other => {
                        return Err(Error::InvalidDraft(format!(
                            "child '{}' has invalid hierarchy level {other}",
                            child.title
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn child_mut(&mut self, index: usize) -> Result<&mut DraftChild> {
        let len = self.children.len();
        self.children
            .get_mut(index)
            .ok_or_else(|| Error::InvalidArgument(format!("no draft child at index {index} (len {len})")))
    }
}

// =============================================================================
// Generation rules
// =============================================================================

struct DraftRule {
    keywords: &'static [&'static str],
    build: fn() -> Draft,
}

/// First keyword match over the lowercased transcript wins
fn match_rule(rules: &[DraftRule], transcript: &str, fallback: fn() -> Draft) -> Draft {
    let haystack = transcript.to_lowercase();
    rules
        .iter()
        .find(|rule| rule.keywords.iter().any(|kw| haystack.contains(kw)))
        .map(|rule| (rule.build)())
        .unwrap_or_else(fallback)
}

/// Generate a project draft from the accumulated transcript text.
pub fn generate_project_draft(transcript: &str) -> Draft {
    const RULES: &[DraftRule] = &[
        DraftRule {
            keywords: &["mobile", "app"],
            build: mobile_project,
        },
        DraftRule {
            keywords: &["website", "web"],
            build: website_project,
        },
        DraftRule {
            keywords: &["ecommerce", "shop"],
            build: ecommerce_project,
        },
        DraftRule {
            keywords: &["dashboard", "analytics"],
            build: dashboard_project,
        },
    ];
    match_rule(RULES, transcript, general_project)
}

/// Generate a subtask breakdown draft for a task being created inside
/// `project_id`. The transcript describes the work; `title` is the
/// task's own name.
pub fn generate_task_draft(transcript: &str, title: &str, project_id: &str) -> Draft {
    const RULES: &[DraftRule] = &[
        DraftRule {
            keywords: &["design", "ui", "figma"],
            build: design_subtasks,
        },
        DraftRule {
            keywords: &["api", "backend", "server"],
            build: backend_subtasks,
        },
        DraftRule {
            keywords: &["frontend", "react", "component"],
            build: frontend_subtasks,
        },
    ];
    let mut draft = match_rule(RULES, transcript, general_subtasks);
    let estimated_hours = draft.total_hours();
    draft.parent = DraftParent::Task {
        title: title.to_string(),
        description: transcript.trim().to_string(),
        project_id: project_id.to_string(),
        priority: TaskPriority::Medium,
        estimated_hours,
    };
    draft
}

fn project_parent(name: &str, description: &str, priority: u32, target_days: i64) -> DraftParent {
    DraftParent::Project {
        name: name.to_string(),
        description: description.to_string(),
        priority,
        target_days,
    }
}

// Placeholder parent replaced by the caller in generate_task_draft.
fn subtask_parent() -> DraftParent {
    DraftParent::Task {
        title: String::new(),
        description: String::new(),
        project_id: String::new(),
        priority: TaskPriority::Medium,
        estimated_hours: 0.0,
    }
}

fn mobile_project() -> Draft {
    use TaskPriority::*;
    Draft {
        parent: project_parent(
            "Mobile Application Development",
            "Cross-platform mobile application with user authentication, core features, and app store deployment.",
            80,
            120,
        ),
        children: vec![
            DraftChild::task("Requirements gathering & UX research", 24.0, High),
            DraftChild::task("UI/UX Design - Core screens", 40.0, High),
            DraftChild::subtask("UI/UX Design - User flows & edge cases", 24.0, Medium),
            DraftChild::task("Backend API development", 56.0, High),
            DraftChild::subtask("Database schema design", 16.0, High),
            DraftChild::subtask("API endpoint implementation", 40.0, High),
            DraftChild::task("Mobile app development", 80.0, High),
            DraftChild::subtask("Authentication integration", 16.0, Medium),
            DraftChild::subtask("Core feature implementation", 48.0, High),
            DraftChild::task("Testing & QA", 32.0, High),
            DraftChild::task("App store submission", 8.0, Medium),
        ],
        reasoning: vec![
            "Structured in phases: Design, then backend, then mobile, then QA".to_string(),
            "Estimated 384 total hours across design, backend, and mobile work".to_string(),
            "Critical path runs through design, backend, and mobile development".to_string(),
        ],
    }
}

fn website_project() -> Draft {
    use TaskPriority::*;
    Draft {
        parent: project_parent(
            "Marketing Website Redesign",
            "Modern responsive website with improved SEO, performance optimization, and conversion-focused design.",
            70,
            60,
        ),
        children: vec![
            DraftChild::task("Content audit & strategy", 16.0, High),
            DraftChild::task("Wireframing & prototyping", 24.0, High),
            DraftChild::task("Visual design - Homepage", 20.0, High),
            DraftChild::task("Visual design - Interior pages", 24.0, Medium),
            DraftChild::task("Frontend development", 48.0, High),
            DraftChild::subtask("Component library setup", 12.0, Medium),
            DraftChild::subtask("Page implementations", 36.0, High),
            DraftChild::task("SEO optimization", 12.0, High),
            DraftChild::task("Performance optimization", 8.0, Medium),
            DraftChild::task("Testing & launch", 12.0, High),
        ],
        reasoning: vec![
            "Marketing website lifecycle: strategy, design, development, launch".to_string(),
            "SEO and performance prioritized for marketing impact".to_string(),
        ],
    }
}

fn ecommerce_project() -> Draft {
    use TaskPriority::*;
    Draft {
        parent: project_parent(
            "E-Commerce Platform",
            "Full-featured online store with product catalog, cart, checkout, and payment integration.",
            90,
            100,
        ),
        children: vec![
            DraftChild::task("Requirements & architecture planning", 20.0, High),
            DraftChild::task("Design system & component library", 32.0, High),
            DraftChild::task("Product catalog design", 24.0, High),
            DraftChild::task("Backend development", 72.0, High),
            DraftChild::subtask("Database design", 16.0, High),
            DraftChild::subtask("Product & inventory APIs", 24.0, High),
            DraftChild::subtask("Cart & checkout APIs", 24.0, Critical),
            DraftChild::subtask("Payment integration", 8.0, Critical),
            DraftChild::task("Frontend development", 64.0, High),
            DraftChild::subtask("Product catalog UI", 24.0, High),
            DraftChild::subtask("Shopping cart & checkout UI", 24.0, Critical),
            DraftChild::task("Admin dashboard", 32.0, Medium),
            DraftChild::task("Testing & security audit", 32.0, High),
        ],
        reasoning: vec![
            "E-commerce complexity requires a backend-first approach".to_string(),
            "Checkout and payment carry the highest risk and priority".to_string(),
        ],
    }
}

fn dashboard_project() -> Draft {
    use TaskPriority::*;
    Draft {
        parent: project_parent(
            "Analytics Dashboard",
            "Real-time data visualization dashboard with custom widgets, reporting, and user management.",
            75,
            80,
        ),
        children: vec![
            DraftChild::task("Data source integration planning", 16.0, High),
            DraftChild::task("Data pipeline setup", 32.0, High),
            DraftChild::subtask("ETL process development", 24.0, High),
            DraftChild::subtask("Data warehouse configuration", 8.0, Medium),
            DraftChild::task("Backend API development", 40.0, High),
            DraftChild::task("Dashboard UI design", 32.0, High),
            DraftChild::task("Widget library development", 40.0, High),
            DraftChild::subtask("Chart components", 16.0, High),
            DraftChild::subtask("Data table components", 12.0, Medium),
            DraftChild::task("Report builder feature", 32.0, Medium),
            DraftChild::task("User management & permissions", 16.0, Medium),
            DraftChild::task("Testing & optimization", 24.0, High),
        ],
        reasoning: vec![
            "Data-heavy project: the pipeline must be stable before UI work".to_string(),
            "Widget reusability prioritized for scalability".to_string(),
        ],
    }
}

fn general_project() -> Draft {
    use TaskPriority::*;
    Draft {
        parent: project_parent(
            "New Project",
            "Custom software project with planning, development, and deployment phases.",
            60,
            90,
        ),
        children: vec![
            DraftChild::task("Discovery & requirements", 20.0, High),
            DraftChild::task("Technical architecture", 16.0, High),
            DraftChild::task("UI/UX Design", 40.0, High),
            DraftChild::task("Backend development", 60.0, High),
            DraftChild::task("Frontend development", 56.0, High),
            DraftChild::task("Integration & testing", 32.0, High),
            DraftChild::task("Deployment & launch", 16.0, Medium),
        ],
        reasoning: vec![
            "Standard software development lifecycle structure".to_string(),
            "Flexible for iteration once requirements firm up".to_string(),
        ],
    }
}

fn design_subtasks() -> Draft {
    use TaskPriority::*;
    Draft {
        parent: subtask_parent(),
        children: vec![
            DraftChild::subtask("Research & reference gathering", 4.0, Medium)
                .described("Collect inspiration and analyze competitors"),
            DraftChild::subtask("User flow mapping", 6.0, Medium)
                .described("Map out user journeys and interactions"),
            DraftChild::subtask("Wireframe creation", 8.0, High)
                .described("Low-fidelity wireframes for all screens"),
            DraftChild::subtask("Visual design - Core screens", 16.0, High)
                .described("High-fidelity designs for main flows"),
            DraftChild::subtask("Visual design - Edge cases", 8.0, Medium)
                .described("Empty states, error states, loading screens"),
            DraftChild::subtask("Design review & handoff", 4.0, Medium)
                .described("Review with stakeholders and prepare specs"),
        ],
        reasoning: vec!["Design work split from research through handoff".to_string()],
    }
}

fn backend_subtasks() -> Draft {
    use TaskPriority::*;
    Draft {
        parent: subtask_parent(),
        children: vec![
            DraftChild::subtask("API design & documentation", 6.0, High)
                .described("Design endpoints and document with OpenAPI"),
            DraftChild::subtask("Database schema design", 8.0, High)
                .described("Design tables, relationships, and indexes"),
            DraftChild::subtask("Authentication & authorization", 8.0, High)
                .described("Implement auth middleware and permissions"),
            DraftChild::subtask("Core endpoint implementation", 16.0, High)
                .described("Build main CRUD endpoints"),
            DraftChild::subtask("Business logic implementation", 16.0, High)
                .described("Implement domain-specific logic"),
            DraftChild::subtask("Testing & API validation", 8.0, High)
                .described("Unit tests and integration tests"),
        ],
        reasoning: vec!["Backend breakdown from contract design to validation".to_string()],
    }
}

fn frontend_subtasks() -> Draft {
    use TaskPriority::*;
    Draft {
        parent: subtask_parent(),
        children: vec![
            DraftChild::subtask("Component structure planning", 4.0, Medium)
                .described("Plan component hierarchy and props"),
            DraftChild::subtask("Core component development", 16.0, High)
                .described("Build reusable UI components"),
            DraftChild::subtask("State management setup", 6.0, Medium)
                .described("Configure stores and data flow"),
            DraftChild::subtask("API integration", 8.0, High)
                .described("Connect frontend to backend APIs"),
            DraftChild::subtask("Form validation & error handling", 6.0, Medium)
                .described("Implement validation logic"),
            DraftChild::subtask("Responsive styling", 8.0, Medium)
                .described("Mobile and tablet adaptations"),
        ],
        reasoning: vec!["Frontend breakdown from structure to styling".to_string()],
    }
}

fn general_subtasks() -> Draft {
    use TaskPriority::*;
    Draft {
        parent: subtask_parent(),
        children: vec![
            DraftChild::subtask("Requirements clarification", 2.0, Medium)
                .described("Clarify scope and acceptance criteria"),
            DraftChild::subtask("Research & planning", 4.0, Medium)
                .described("Research solutions and create plan"),
            DraftChild::subtask("Implementation - Phase 1", 8.0, High)
                .described("Core functionality development"),
            DraftChild::subtask("Implementation - Phase 2", 8.0, High)
                .described("Additional features and edge cases"),
            DraftChild::subtask("Testing & QA", 4.0, High)
                .described("Manual testing and bug fixes"),
            DraftChild::subtask("Review & documentation", 2.0, Medium)
                .described("Code review and documentation"),
        ],
        reasoning: vec!["Generic breakdown across plan, build, verify".to_string()],
    }
}
