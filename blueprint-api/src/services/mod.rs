//! Service Layer
//!
//! Validation and orchestration above the repository. Services hold no
//! mutable state; their collaborators are injected at construction.

mod blueprint_service;

pub use blueprint_service::*;
