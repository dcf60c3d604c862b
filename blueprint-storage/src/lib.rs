//! Blueprint Storage - Repository Trait and In-Memory Implementation
//!
//! Defines the persistence contract the service layer depends on. The
//! PostgreSQL implementation lives in blueprint-api.

pub mod memory;
pub mod repository;

pub use memory::InMemoryBlueprintRepository;
pub use repository::BlueprintRepository;
