//! gRPC Service Implementation
//!
//! Implements `blueprint.v1.BlueprintService` from proto/blueprint.proto on
//! top of the service layer. Handlers only marshal: parse identifiers, map
//! wire messages to requests, and turn service outcomes into responses or
//! status codes.
//!
//! Status mapping:
//! - malformed identifier, empty name, bad paging -> `INVALID_ARGUMENT`
//! - absent blueprint on get/update/delete -> `NOT_FOUND`
//! - server shutting down -> `CANCELLED`
//! - anything else -> `INTERNAL` with a generic message (detail is logged)

use std::sync::Arc;

use blueprint_core::{
    parse_blueprint_id, BlueprintId, BlueprintMetadata, BlueprintResponse, CreateBlueprintRequest,
    Timestamp, UpdateBlueprintRequest,
};
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status};
use tracing::Instrument;

use crate::error::ApiError;
use crate::services::BlueprintService;

// Include the generated protobuf code
pub mod proto {
    tonic::include_proto!("blueprint.v1");
}

use proto::blueprint_service_server::{
    BlueprintService as BlueprintRpc, BlueprintServiceServer,
};

// ============================================================================
// CONVERSION HELPERS
// ============================================================================

fn timestamp_to_proto(ts: &Timestamp) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: ts.timestamp(),
        nanos: i32::try_from(ts.timestamp_subsec_nanos()).unwrap_or(0),
    }
}

/// Absent wire metadata means default metadata; present metadata is taken
/// as sent.
fn metadata_from_proto(metadata: Option<proto::BlueprintMetadata>) -> BlueprintMetadata {
    match metadata {
        Some(m) => BlueprintMetadata {
            owner: m.owner,
            version: m.version,
            tags: m.tags,
        },
        None => BlueprintMetadata::default(),
    }
}

fn metadata_to_proto(metadata: BlueprintMetadata) -> proto::BlueprintMetadata {
    proto::BlueprintMetadata {
        owner: metadata.owner,
        version: metadata.version,
        tags: metadata.tags,
    }
}

fn blueprint_to_proto(blueprint: BlueprintResponse) -> proto::Blueprint {
    proto::Blueprint {
        id: blueprint.id.to_string(),
        name: blueprint.name,
        description: blueprint.description,
        created_at: Some(timestamp_to_proto(&blueprint.created_at)),
        updated_at: Some(timestamp_to_proto(&blueprint.updated_at)),
        metadata: Some(metadata_to_proto(blueprint.metadata)),
    }
}

fn parse_id(value: &str) -> Result<BlueprintId, Status> {
    parse_blueprint_id(value).map_err(|e| ApiError::from(e).into())
}

fn rpc_span(rpc: &'static str, id: &str) -> tracing::Span {
    tracing::info_span!("grpc.request", rpc, blueprint.id = id)
}

// ============================================================================
// BLUEPRINT SERVICE IMPLEMENTATION
// ============================================================================

/// gRPC façade over a [`BlueprintService`].
///
/// Each call runs under a child of the process shutdown token, so in-flight
/// store operations abort when the server stops.
#[derive(Clone)]
pub struct BlueprintGrpcService {
    service: Arc<dyn BlueprintService>,
    shutdown: CancellationToken,
}

impl BlueprintGrpcService {
    pub fn new(service: Arc<dyn BlueprintService>, shutdown: CancellationToken) -> Self {
        Self { service, shutdown }
    }
}

#[tonic::async_trait]
impl BlueprintRpc for BlueprintGrpcService {
    async fn get_blueprint(
        &self,
        request: Request<proto::GetBlueprintRequest>,
    ) -> Result<Response<proto::GetBlueprintResponse>, Status> {
        let req = request.into_inner();
        let span = rpc_span("GetBlueprint", &req.id);

        async {
            let id = parse_id(&req.id)?;
            let cancel = self.shutdown.child_token();

            let blueprint = self
                .service
                .get_by_id(id, &cancel)
                .await
                .map_err(ApiError::from)?
                .ok_or_else(|| ApiError::blueprint_not_found(&req.id))?;

            Ok::<_, Status>(Response::new(proto::GetBlueprintResponse {
                blueprint: Some(blueprint_to_proto(blueprint)),
            }))
        }
        .instrument(span)
        .await
    }

    async fn list_blueprints(
        &self,
        request: Request<proto::ListBlueprintsRequest>,
    ) -> Result<Response<proto::ListBlueprintsResponse>, Status> {
        let req = request.into_inner();
        let span = tracing::info_span!(
            "grpc.request",
            rpc = "ListBlueprints",
            page_number = req.page_number,
            page_size = req.page_size,
        );

        async {
            if req.page_number < 1 {
                return Err(Status::from(ApiError::invalid_range(
                    "page_number",
                    "must be at least 1",
                    req.page_number,
                )));
            }
            if req.page_size < 0 {
                return Err(Status::from(ApiError::invalid_range(
                    "page_size",
                    "must not be negative",
                    req.page_size,
                )));
            }

            let limit = i64::from(req.page_size);
            let offset = (i64::from(req.page_number) - 1) * limit;
            let cancel = self.shutdown.child_token();

            let blueprints = self
                .service
                .get_all(limit, offset, &cancel)
                .await
                .map_err(ApiError::from)?;
            let total_count = self.service.count(&cancel).await.map_err(ApiError::from)?;

            Ok::<_, Status>(Response::new(proto::ListBlueprintsResponse {
                blueprints: blueprints.into_iter().map(blueprint_to_proto).collect(),
                total_count,
            }))
        }
        .instrument(span)
        .await
    }

    async fn create_blueprint(
        &self,
        request: Request<proto::CreateBlueprintRequest>,
    ) -> Result<Response<proto::CreateBlueprintResponse>, Status> {
        let req = request.into_inner();
        let span = tracing::info_span!("grpc.request", rpc = "CreateBlueprint");

        async {
            let create_req = CreateBlueprintRequest {
                name: req.name,
                description: req.description,
                metadata: metadata_from_proto(req.metadata),
            };
            let cancel = self.shutdown.child_token();

            let blueprint = self
                .service
                .create(create_req, &cancel)
                .await
                .map_err(ApiError::from)?;

            Ok::<_, Status>(Response::new(proto::CreateBlueprintResponse {
                blueprint: Some(blueprint_to_proto(blueprint)),
            }))
        }
        .instrument(span)
        .await
    }

    async fn update_blueprint(
        &self,
        request: Request<proto::UpdateBlueprintRequest>,
    ) -> Result<Response<proto::UpdateBlueprintResponse>, Status> {
        let req = request.into_inner();
        let span = rpc_span("UpdateBlueprint", &req.id);

        async {
            let id = parse_id(&req.id)?;
            let update_req = UpdateBlueprintRequest {
                id,
                name: req.name,
                description: req.description,
                metadata: metadata_from_proto(req.metadata),
            };
            let cancel = self.shutdown.child_token();

            let blueprint = self
                .service
                .update(update_req, &cancel)
                .await
                .map_err(ApiError::from)?
                .ok_or_else(|| ApiError::blueprint_not_found(&req.id))?;

            Ok::<_, Status>(Response::new(proto::UpdateBlueprintResponse {
                blueprint: Some(blueprint_to_proto(blueprint)),
            }))
        }
        .instrument(span)
        .await
    }

    async fn delete_blueprint(
        &self,
        request: Request<proto::DeleteBlueprintRequest>,
    ) -> Result<Response<proto::DeleteBlueprintResponse>, Status> {
        let req = request.into_inner();
        let span = rpc_span("DeleteBlueprint", &req.id);

        async {
            let id = parse_id(&req.id)?;
            let cancel = self.shutdown.child_token();

            let deleted = self
                .service
                .delete(id, &cancel)
                .await
                .map_err(ApiError::from)?;
            if !deleted {
                return Err(Status::from(ApiError::blueprint_not_found(&req.id)));
            }

            Ok::<_, Status>(Response::new(proto::DeleteBlueprintResponse {
                id: id.to_string(),
            }))
        }
        .instrument(span)
        .await
    }
}

/// Wrap the façade in its tonic server type.
pub fn create_server(
    service: Arc<dyn BlueprintService>,
    shutdown: CancellationToken,
) -> BlueprintServiceServer<BlueprintGrpcService> {
    BlueprintServiceServer::new(BlueprintGrpcService::new(service, shutdown))
}
