//! Blueprint Test Utilities
//!
//! Shared test infrastructure for the workspace:
//! - Proptest generators for requests, metadata and stored rows
//! - Fixtures for common scenarios
//! - Re-export of the in-memory repository

pub use blueprint_storage::InMemoryBlueprintRepository;

pub use blueprint_core::{
    Blueprint, BlueprintEntity, BlueprintId, BlueprintMetadata, BlueprintResponse,
    CreateBlueprintRequest, Timestamp, UpdateBlueprintRequest, DEFAULT_METADATA_VERSION,
};

use chrono::Utc;
use uuid::Uuid;

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for blueprint shapes.

    use super::*;
    use proptest::prelude::*;

    /// Generate a random UUID (not necessarily v4).
    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    /// Generate a Timestamp with whole-microsecond precision.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        // 2020-01-01 .. 2030-01-01, microsecond resolution like PostgreSQL
        (1_577_836_800i64..1_893_456_000i64, 0u32..1_000_000).prop_map(|(secs, micros)| {
            chrono::DateTime::from_timestamp(secs, micros * 1_000).unwrap_or_else(Utc::now)
        })
    }

    /// Generate a valid (non-empty) blueprint name.
    pub fn arb_name() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z0-9 _-]{0,39}"
    }

    /// Generate a description, empty included.
    pub fn arb_description() -> impl Strategy<Value = String> {
        "[ -~]{0,80}"
    }

    pub fn arb_tags() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-z][a-z0-9-]{0,11}", 0..5)
    }

    /// Generate metadata with arbitrary owner, version and tags.
    pub fn arb_metadata() -> impl Strategy<Value = BlueprintMetadata> {
        ("[a-z]{0,12}", "[0-9]{1,2}\\.[0-9]{1,2}\\.[0-9]{1,2}", arb_tags()).prop_map(
            |(owner, version, tags)| BlueprintMetadata {
                owner,
                version,
                tags,
            },
        )
    }

    pub fn arb_create_request() -> impl Strategy<Value = CreateBlueprintRequest> {
        (arb_name(), arb_description(), arb_metadata()).prop_map(
            |(name, description, metadata)| CreateBlueprintRequest {
                name,
                description,
                metadata,
            },
        )
    }

    /// Generate an update request aimed at `id`.
    pub fn arb_update_request(id: BlueprintId) -> impl Strategy<Value = UpdateBlueprintRequest> {
        (arb_name(), arb_description(), arb_metadata()).prop_map(
            move |(name, description, metadata)| UpdateBlueprintRequest {
                id,
                name,
                description,
                metadata,
            },
        )
    }

    /// Generate a domain blueprint whose `updated_at` is never before `created_at`.
    pub fn arb_blueprint() -> impl Strategy<Value = Blueprint> {
        (
            arb_uuid(),
            arb_name(),
            arb_description(),
            arb_timestamp(),
            0i64..86_400,
            arb_metadata(),
        )
            .prop_map(|(id, name, description, created_at, age, metadata)| Blueprint {
                id,
                name,
                description,
                created_at,
                updated_at: created_at + chrono::Duration::seconds(age),
                metadata,
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built values for common scenarios.

    use super::*;
    use std::sync::Arc;

    /// Empty in-memory repository, shared.
    pub fn in_memory_repository() -> Arc<InMemoryBlueprintRepository> {
        Arc::new(InMemoryBlueprintRepository::new())
    }

    /// Create request with default metadata.
    pub fn create_request(name: &str) -> CreateBlueprintRequest {
        CreateBlueprintRequest {
            name: name.to_string(),
            description: format!("{name} description"),
            metadata: BlueprintMetadata::default(),
        }
    }

    /// Create request with a populated owner and tags.
    pub fn tagged_create_request(name: &str, owner: &str, tags: &[&str]) -> CreateBlueprintRequest {
        CreateBlueprintRequest {
            name: name.to_string(),
            description: String::new(),
            metadata: BlueprintMetadata {
                owner: owner.to_string(),
                version: DEFAULT_METADATA_VERSION.to_string(),
                tags: tags.iter().map(|t| t.to_string()).collect(),
            },
        }
    }

    /// Stored row whose metadata column is not valid JSON.
    pub fn corrupt_entity(name: &str) -> BlueprintEntity {
        let now = Utc::now();
        BlueprintEntity {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: String::new(),
            created_at: now,
            updated_at: now,
            metadata: "{not json".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_generated_names_are_non_empty(name in arb_name()) {
            prop_assert!(!name.is_empty());
        }

        #[test]
        fn prop_generated_blueprints_are_ordered(blueprint in arb_blueprint()) {
            prop_assert!(blueprint.updated_at >= blueprint.created_at);
        }
    }
}
