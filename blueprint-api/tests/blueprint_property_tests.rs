//! Property-Based Tests for the Blueprint Service and gRPC Façade
//!
//! Run against the in-memory repository, so no database is required.
//!
//! Properties:
//! - creation assigns a fresh v4 identity and equal timestamps
//! - update replaces content and keeps identity and creation time
//! - unknown identifiers report absence (or NOT_FOUND), never another error
//! - an empty name is rejected before the repository is called
//! - paging partitions the name-ordered listing
//! - a blueprint survives the storage shape and the repository unchanged

use std::sync::Arc;

use blueprint_api::proto::blueprint_service_server::BlueprintService as BlueprintRpc;
use blueprint_api::{proto, BlueprintGrpcService, BlueprintService, DefaultBlueprintService};
use blueprint_core::mapper::{domain_to_entity, entity_to_domain};
use blueprint_core::{BlueprintError, TraceContext, ValidationError};
use blueprint_storage::BlueprintRepository;
use blueprint_test_utils::generators::*;
use blueprint_test_utils::{fixtures, InMemoryBlueprintRepository};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use tokio_util::sync::CancellationToken;
use tonic::{Code, Request};

// ============================================================================
// TEST CONFIGURATION
// ============================================================================

fn test_service() -> (Arc<InMemoryBlueprintRepository>, DefaultBlueprintService) {
    let repo = fixtures::in_memory_repository();
    let service = DefaultBlueprintService::new(repo.clone(), TraceContext::new("service"));
    (repo, service)
}

fn test_facade() -> (Arc<InMemoryBlueprintRepository>, BlueprintGrpcService) {
    let (repo, service) = test_service();
    let facade = BlueprintGrpcService::new(Arc::new(service), CancellationToken::new());
    (repo, facade)
}

fn fail<E: std::fmt::Display>(e: E) -> TestCaseError {
    TestCaseError::fail(e.to_string())
}

fn runtime() -> Result<tokio::runtime::Runtime, TestCaseError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(fail)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Create returns the request content under a fresh v4 identifier, and a
    /// read returns exactly what create returned.
    #[test]
    fn prop_create_assigns_fresh_identity(request in arb_create_request()) {
        runtime()?.block_on(async {
            let (_, service) = test_service();
            let cancel = CancellationToken::new();

            let first = service.create(request.clone(), &cancel).await.map_err(fail)?;
            let second = service.create(request.clone(), &cancel).await.map_err(fail)?;

            prop_assert_eq!(first.id.get_version_num(), 4);
            prop_assert_ne!(first.id, second.id);
            prop_assert_eq!(first.created_at, first.updated_at);
            prop_assert_eq!(&first.name, &request.name);
            prop_assert_eq!(&first.description, &request.description);
            prop_assert_eq!(&first.metadata, &request.metadata);

            let fetched = service.get_by_id(first.id, &cancel).await.map_err(fail)?;
            prop_assert_eq!(fetched, Some(first));
            Ok(())
        })?;
    }

    /// Update replaces name, description and metadata; identity and creation
    /// time are untouched.
    #[test]
    fn prop_update_replaces_content(
        request in arb_create_request(),
        replacement in arb_update_request(uuid::Uuid::nil()),
    ) {
        runtime()?.block_on(async {
            let (_, service) = test_service();
            let cancel = CancellationToken::new();

            let created = service.create(request, &cancel).await.map_err(fail)?;
            let mut replacement = replacement;
            replacement.id = created.id;

            let updated = service
                .update(replacement.clone(), &cancel)
                .await
                .map_err(fail)?
                .ok_or_else(|| TestCaseError::fail("existing blueprint not updated"))?;

            prop_assert_eq!(updated.id, created.id);
            prop_assert_eq!(updated.created_at, created.created_at);
            prop_assert!(updated.updated_at >= created.updated_at);
            prop_assert_eq!(&updated.name, &replacement.name);
            prop_assert_eq!(&updated.description, &replacement.description);
            prop_assert_eq!(&updated.metadata, &replacement.metadata);
            prop_assert_eq!(service.count(&cancel).await.map_err(fail)?, 1);
            Ok(())
        })?;
    }

    /// Unknown identifiers are absent at the service and NOT_FOUND on the wire.
    #[test]
    fn prop_unknown_ids_are_not_found(id in arb_uuid(), name in arb_name()) {
        runtime()?.block_on(async {
            let (_, service) = test_service();
            let cancel = CancellationToken::new();

            prop_assert_eq!(service.get_by_id(id, &cancel).await.map_err(fail)?, None);
            prop_assert!(!service.delete(id, &cancel).await.map_err(fail)?);

            let (_, facade) = test_facade();
            let get = facade
                .get_blueprint(Request::new(proto::GetBlueprintRequest { id: id.to_string() }))
                .await;
            prop_assert_eq!(get.err().map(|s| s.code()), Some(Code::NotFound));

            let update = facade
                .update_blueprint(Request::new(proto::UpdateBlueprintRequest {
                    id: id.to_string(),
                    name,
                    description: String::new(),
                    metadata: None,
                }))
                .await;
            prop_assert_eq!(update.err().map(|s| s.code()), Some(Code::NotFound));

            let delete = facade
                .delete_blueprint(Request::new(proto::DeleteBlueprintRequest { id: id.to_string() }))
                .await;
            prop_assert_eq!(delete.err().map(|s| s.code()), Some(Code::NotFound));
            Ok(())
        })?;
    }

    /// An empty name fails validation without any repository call.
    #[test]
    fn prop_empty_name_never_reaches_storage(
        description in arb_description(),
        metadata in arb_metadata(),
    ) {
        runtime()?.block_on(async {
            let (repo, service) = test_service();
            let request = blueprint_core::CreateBlueprintRequest {
                name: String::new(),
                description,
                metadata,
            };

            let result = service.create(request, &CancellationToken::new()).await;
            prop_assert_eq!(
                result.err(),
                Some(BlueprintError::Validation(ValidationError::EmptyName))
            );
            prop_assert_eq!(repo.call_count(), 0);
            Ok(())
        })?;
    }

    /// Walking every page yields the full name-ordered listing exactly once.
    #[test]
    fn prop_pages_partition_listing(
        names in prop::collection::vec(arb_name(), 0..12),
        page_size in 1i32..5,
    ) {
        runtime()?.block_on(async {
            let (_, facade) = test_facade();
            for name in &names {
                facade
                    .create_blueprint(Request::new(proto::CreateBlueprintRequest {
                        name: name.clone(),
                        description: String::new(),
                        metadata: None,
                    }))
                    .await
                    .map_err(fail)?;
            }

            let mut expected = names.clone();
            expected.sort();

            let mut listed = Vec::new();
            let mut page_number = 1;
            loop {
                let page = facade
                    .list_blueprints(Request::new(proto::ListBlueprintsRequest {
                        page_number,
                        page_size,
                    }))
                    .await
                    .map_err(fail)?
                    .into_inner();
                prop_assert_eq!(page.total_count, names.len() as i64);
                prop_assert!(page.blueprints.len() <= page_size as usize);
                if page.blueprints.is_empty() {
                    break;
                }
                listed.extend(page.blueprints.into_iter().map(|b| b.name));
                page_number += 1;
            }

            prop_assert_eq!(listed, expected);
            Ok(())
        })?;
    }

    /// Storage shape and repository both reproduce the domain object.
    #[test]
    fn prop_blueprint_round_trips_through_storage(blueprint in arb_blueprint()) {
        prop_assert_eq!(entity_to_domain(domain_to_entity(&blueprint)), blueprint.clone());

        runtime()?.block_on(async {
            let repo = fixtures::in_memory_repository();
            let cancel = CancellationToken::new();

            let created = repo.create(&blueprint, &cancel).await.map_err(fail)?;
            prop_assert_eq!(&created, &blueprint);
            let fetched = repo.get_by_id(blueprint.id, &cancel).await.map_err(fail)?;
            prop_assert_eq!(fetched, Some(blueprint.clone()));
            Ok(())
        })?;
    }

    /// Metadata sent on the wire comes back unchanged.
    #[test]
    fn prop_wire_metadata_is_preserved(name in arb_name(), metadata in arb_metadata()) {
        runtime()?.block_on(async {
            let (_, facade) = test_facade();
            let wire = proto::BlueprintMetadata {
                owner: metadata.owner.clone(),
                version: metadata.version.clone(),
                tags: metadata.tags.clone(),
            };

            let created = facade
                .create_blueprint(Request::new(proto::CreateBlueprintRequest {
                    name,
                    description: String::new(),
                    metadata: Some(wire.clone()),
                }))
                .await
                .map_err(fail)?
                .into_inner()
                .blueprint
                .ok_or_else(|| TestCaseError::fail("create returned no blueprint"))?;

            let fetched = facade
                .get_blueprint(Request::new(proto::GetBlueprintRequest { id: created.id.clone() }))
                .await
                .map_err(fail)?
                .into_inner()
                .blueprint
                .ok_or_else(|| TestCaseError::fail("get returned no blueprint"))?;

            prop_assert_eq!(fetched.metadata, Some(wire));
            prop_assert_eq!(fetched.created_at, created.created_at);
            Ok(())
        })?;
    }
}

#[tokio::test]
async fn test_two_pages_of_two_over_four_rows() -> Result<(), tonic::Status> {
    let (_, facade) = test_facade();
    for name in ["delta", "alpha", "charlie", "bravo"] {
        facade
            .create_blueprint(Request::new(proto::CreateBlueprintRequest {
                name: name.to_string(),
                description: String::new(),
                metadata: None,
            }))
            .await?;
    }

    let page = |page_number| proto::ListBlueprintsRequest {
        page_number,
        page_size: 2,
    };
    let first = facade.list_blueprints(Request::new(page(1))).await?.into_inner();
    let second = facade.list_blueprints(Request::new(page(2))).await?.into_inner();
    let third = facade.list_blueprints(Request::new(page(3))).await?.into_inner();

    let names = |r: &proto::ListBlueprintsResponse| {
        r.blueprints.iter().map(|b| b.name.clone()).collect::<Vec<_>>()
    };
    assert_eq!(names(&first), vec!["alpha", "bravo"]);
    assert_eq!(names(&second), vec!["charlie", "delta"]);
    assert!(third.blueprints.is_empty());
    assert_eq!(first.total_count, 4);
    assert_eq!(third.total_count, 4);
    Ok(())
}

#[tokio::test]
async fn test_corrupt_row_lists_with_default_metadata() -> Result<(), tonic::Status> {
    let (repo, facade) = test_facade();
    repo.insert_entity(fixtures::corrupt_entity("broken")).await;

    let listed = facade
        .list_blueprints(Request::new(proto::ListBlueprintsRequest {
            page_number: 1,
            page_size: 10,
        }))
        .await?
        .into_inner();

    assert_eq!(listed.blueprints.len(), 1);
    let metadata = listed.blueprints[0].metadata.clone().unwrap_or_default();
    assert_eq!(metadata.owner, "");
    assert_eq!(metadata.version, "1.0.0");
    assert!(metadata.tags.is_empty());
    Ok(())
}
