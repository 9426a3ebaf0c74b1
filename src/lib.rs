//! steward - Optimistic Sync Client Library
//!
//! This library provides the client-side data layer for the steward
//! project-management API: a typed transport client, a keyed query cache
//! with declarative invalidation, an optimistic mutation store with
//! automatic rollback, and the multi-step creation wizard that turns a
//! conversation into a parent entity plus its child tasks.
//!
//! # Core Concepts
//!
//! - **Envelope**: every API response is normalized into one typed shape
//! - **Query Cache**: (collection, id, filters) keys; stale entries force
//!   a refetch instead of being served
//! - **Optimistic Mutations**: patches apply locally first and roll back
//!   exactly when the network call fails
//! - **Wizard**: chat transcript to editable draft to committed draft
//! - **Bulk Submission**: parent first, then children sequentially, with
//!   partial-failure reporting instead of compensation
//!
//! # Module Organization
//!
//! - `client`: HTTP transport against `{base_url}/api/v1`
//! - `config`: configuration loading from `.steward.toml`
//! - `session`: persisted auth token and organization id
//! - `error`: error types and result aliases
//! - `types`: wire entities and request/response DTOs
//! - `cache`: query cache and the per-mutation invalidation table
//! - `store`: entity snapshot, patches, and the per-entity guard
//! - `mutation`: mutation lifecycle states and the reconciliation log
//! - `context`: the dependency-injected sync context
//! - `events`: JSONL event output for external integrations
//! - `draft` / `wizard`: draft generation and the dialog state machine
//! - `submit`: bulk submission orchestration

pub mod cache;
pub mod client;
pub mod config;
pub mod context;
pub mod draft;
pub mod error;
pub mod events;
pub mod mutation;
pub mod session;
pub mod store;
pub mod submit;
pub mod types;
pub mod wizard;

pub use error::{Error, Result};
