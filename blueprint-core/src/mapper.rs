//! Blueprint mapping
//!
//! Pure, total conversions between storage rows, domain objects, requests and
//! responses. The only failure paths are the metadata JSON codec, and both fall
//! back to a usable value: corrupt metadata must never block reads or lists.

use chrono::Utc;

use crate::model::{
    Blueprint, BlueprintEntity, BlueprintMetadata, BlueprintResponse, CreateBlueprintRequest,
    UpdateBlueprintRequest,
};
use crate::{new_blueprint_id, BlueprintId};

/// JSON text written when metadata cannot be encoded.
pub const EMPTY_METADATA_JSON: &str = "{}";

/// Storage row to domain object.
///
/// Empty, `null` or undecodable metadata becomes [`BlueprintMetadata::default`].
pub fn entity_to_domain(entity: BlueprintEntity) -> Blueprint {
    let metadata = decode_metadata(entity.id, &entity.metadata);
    Blueprint {
        id: entity.id,
        name: entity.name,
        description: entity.description,
        created_at: entity.created_at,
        updated_at: entity.updated_at,
        metadata,
    }
}

/// Domain object to storage row.
pub fn domain_to_entity(blueprint: &Blueprint) -> BlueprintEntity {
    BlueprintEntity {
        id: blueprint.id,
        name: blueprint.name.clone(),
        description: blueprint.description.clone(),
        created_at: blueprint.created_at,
        updated_at: blueprint.updated_at,
        metadata: encode_metadata(blueprint.id, &blueprint.metadata),
    }
}

/// Domain object to response, field for field.
pub fn domain_to_response(blueprint: Blueprint) -> BlueprintResponse {
    BlueprintResponse {
        id: blueprint.id,
        name: blueprint.name,
        description: blueprint.description,
        created_at: blueprint.created_at,
        updated_at: blueprint.updated_at,
        metadata: blueprint.metadata,
    }
}

/// New domain object from a create request: fresh identifier, both
/// timestamps set to the same instant.
pub fn create_request_to_domain(request: CreateBlueprintRequest) -> Blueprint {
    let now = Utc::now();
    Blueprint {
        id: new_blueprint_id(),
        name: request.name,
        description: request.description,
        created_at: now,
        updated_at: now,
        metadata: request.metadata,
    }
}

/// Replacement of `existing` by an update request.
///
/// Name, description and metadata are taken wholesale from the request;
/// identifier and `created_at` are carried over; `updated_at` is now.
/// `existing` is left untouched.
pub fn update_request_to_domain(request: &UpdateBlueprintRequest, existing: &Blueprint) -> Blueprint {
    Blueprint {
        name: request.name.clone(),
        description: request.description.clone(),
        metadata: request.metadata.clone(),
        updated_at: Utc::now(),
        ..existing.clone()
    }
}

fn decode_metadata(id: BlueprintId, raw: &str) -> BlueprintMetadata {
    if raw.is_empty() {
        return BlueprintMetadata::default();
    }

    match serde_json::from_str::<Option<BlueprintMetadata>>(raw) {
        Ok(metadata) => metadata.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(
                blueprint.id = %id,
                error = %e,
                "Failed to deserialize metadata, using defaults"
            );
            BlueprintMetadata::default()
        }
    }
}

fn encode_metadata(id: BlueprintId, metadata: &BlueprintMetadata) -> String {
    serde_json::to_string(metadata).unwrap_or_else(|e| {
        tracing::warn!(
            blueprint.id = %id,
            error = %e,
            "Failed to serialize metadata, storing empty object"
        );
        EMPTY_METADATA_JSON.to_string()
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Timestamp;
    use chrono::{Duration, TimeZone};

    fn fixed_time(secs: i64) -> Timestamp {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).single().unwrap_or_else(Utc::now)
    }

    fn sample_entity(metadata: &str) -> BlueprintEntity {
        BlueprintEntity {
            id: new_blueprint_id(),
            name: "alpha".to_string(),
            description: "first".to_string(),
            created_at: fixed_time(0),
            updated_at: fixed_time(60),
            metadata: metadata.to_string(),
        }
    }

    #[test]
    fn test_entity_to_domain_decodes_metadata() {
        let entity = sample_entity(r#"{"Owner":"ops","Version":"3.0.0","Tags":["a","b"]}"#);
        let id = entity.id;
        let blueprint = entity_to_domain(entity);
        assert_eq!(blueprint.id, id);
        assert_eq!(blueprint.name, "alpha");
        assert_eq!(blueprint.updated_at, fixed_time(60));
        assert_eq!(blueprint.metadata.owner, "ops");
        assert_eq!(blueprint.metadata.version, "3.0.0");
        assert_eq!(blueprint.metadata.tags, vec!["a", "b"]);
    }

    #[test]
    fn test_entity_to_domain_empty_metadata_is_default() {
        let blueprint = entity_to_domain(sample_entity(""));
        assert_eq!(blueprint.metadata, BlueprintMetadata::default());
    }

    #[test]
    fn test_entity_to_domain_null_metadata_is_default() {
        let blueprint = entity_to_domain(sample_entity("null"));
        assert_eq!(blueprint.metadata, BlueprintMetadata::default());
    }

    #[test]
    fn test_entity_to_domain_malformed_metadata_is_default() {
        for raw in ["{not json", "[1,2,3]", r#"{"Tags": 5}"#, "42"] {
            let blueprint = entity_to_domain(sample_entity(raw));
            assert_eq!(blueprint.metadata, BlueprintMetadata::default(), "input: {raw}");
            assert_eq!(blueprint.name, "alpha");
        }
    }

    #[test]
    fn test_domain_to_entity_encodes_metadata() {
        let blueprint = entity_to_domain(sample_entity(r#"{"Owner":"ops"}"#));
        let entity = domain_to_entity(&blueprint);
        assert_eq!(entity.metadata, r#"{"Owner":"ops","Version":"1.0.0","Tags":[]}"#);
    }

    #[test]
    fn test_domain_to_response_copies_every_field() {
        let blueprint = entity_to_domain(sample_entity(r#"{"Tags":["x"]}"#));
        let response = domain_to_response(blueprint.clone());
        assert_eq!(response.id, blueprint.id);
        assert_eq!(response.name, blueprint.name);
        assert_eq!(response.description, blueprint.description);
        assert_eq!(response.created_at, blueprint.created_at);
        assert_eq!(response.updated_at, blueprint.updated_at);
        assert_eq!(response.metadata, blueprint.metadata);
    }

    #[test]
    fn test_create_request_to_domain_assigns_identity() {
        let request = CreateBlueprintRequest {
            name: "alpha".to_string(),
            description: "d".to_string(),
            metadata: BlueprintMetadata::default(),
        };
        let first = create_request_to_domain(request.clone());
        let second = create_request_to_domain(request);
        assert_ne!(first.id, second.id);
        assert_eq!(first.created_at, first.updated_at);
        assert_eq!(first.metadata.version, "1.0.0");
    }

    #[test]
    fn test_update_request_to_domain_replaces_content() {
        let existing = Blueprint {
            id: new_blueprint_id(),
            name: "old".to_string(),
            description: "old description".to_string(),
            created_at: Utc::now() - Duration::hours(1),
            updated_at: Utc::now() - Duration::hours(1),
            metadata: BlueprintMetadata {
                owner: "someone".to_string(),
                version: "9.9.9".to_string(),
                tags: vec!["keep?".to_string()],
            },
        };
        let request = UpdateBlueprintRequest {
            id: existing.id,
            name: "new".to_string(),
            description: String::new(),
            metadata: BlueprintMetadata::default(),
        };

        let updated = update_request_to_domain(&request, &existing);
        assert_eq!(updated.id, existing.id);
        assert_eq!(updated.created_at, existing.created_at);
        assert!(updated.updated_at > existing.updated_at);
        assert_eq!(updated.name, "new");
        assert_eq!(updated.description, "");
        assert!(updated.metadata.tags.is_empty());
        assert_eq!(existing.name, "old");
    }
}
