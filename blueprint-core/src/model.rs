//! Blueprint record shapes
//!
//! Pure data structures with no behavior. The same blueprint appears as a
//! storage row ([`BlueprintEntity`]), a domain object ([`Blueprint`]) and an
//! externally visible response ([`BlueprintResponse`]); the request shapes carry
//! only what a client may supply.

use serde::{Deserialize, Serialize};

use crate::{BlueprintId, Timestamp};

/// Version assigned to metadata that does not specify one.
pub const DEFAULT_METADATA_VERSION: &str = "1.0.0";

/// Free-form ownership/version/tag metadata, stored as a JSON document.
///
/// Field names on disk are `Owner`, `Version` and `Tags`; lower-case names are
/// accepted when reading. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlueprintMetadata {
    #[serde(rename = "Owner", alias = "owner")]
    pub owner: String,
    #[serde(rename = "Version", alias = "version")]
    pub version: String,
    #[serde(rename = "Tags", alias = "tags")]
    pub tags: Vec<String>,
}

impl Default for BlueprintMetadata {
    fn default() -> Self {
        Self {
            owner: String::new(),
            version: DEFAULT_METADATA_VERSION.to_string(),
            tags: Vec::new(),
        }
    }
}

/// Storage shape: one row of the `blueprints` table.
///
/// `metadata` is the raw JSON text of the column, decoded only by the mapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlueprintEntity {
    pub id: BlueprintId,
    pub name: String,
    pub description: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub metadata: String,
}

/// Domain shape. Metadata is always a structured value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blueprint {
    pub id: BlueprintId,
    pub name: String,
    pub description: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub metadata: BlueprintMetadata,
}

/// Intent to create a blueprint. Identifier and timestamps are server-assigned.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CreateBlueprintRequest {
    pub name: String,
    pub description: String,
    pub metadata: BlueprintMetadata,
}

/// Intent to replace the name, description and metadata of a blueprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateBlueprintRequest {
    pub id: BlueprintId,
    pub name: String,
    pub description: String,
    pub metadata: BlueprintMetadata,
}

/// Externally visible shape of a blueprint.
///
/// Same content as [`Blueprint`], kept separate so the domain type can change
/// without touching the wire contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlueprintResponse {
    pub id: BlueprintId,
    pub name: String,
    pub description: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub metadata: BlueprintMetadata,
}
