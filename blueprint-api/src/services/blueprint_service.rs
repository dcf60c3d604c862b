//! Blueprint Service
//!
//! Validates requests, runs the read-then-write update flow and maps domain
//! objects to responses. All persistence is delegated to the repository.
//!
//! Update is check-then-act across two statements and is not serialized:
//! concurrent updates of one blueprint resolve as last write wins, and a
//! delete landing between the read and the write surfaces as `None`.

use std::sync::Arc;

use async_trait::async_trait;
use blueprint_core::mapper::{
    create_request_to_domain, domain_to_response, update_request_to_domain,
};
use blueprint_core::{
    BlueprintError, BlueprintId, BlueprintResponse, BlueprintResult, CreateBlueprintRequest, TraceContext,
    UpdateBlueprintRequest, ValidationError,
};
use blueprint_storage::BlueprintRepository;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Blueprint operations as seen by the RPC layer.
#[async_trait]
pub trait BlueprintService: Send + Sync {
    async fn get_by_id(
        &self,
        id: BlueprintId,
        cancel: &CancellationToken,
    ) -> BlueprintResult<Option<BlueprintResponse>>;

    /// One page, in repository order (name ascending).
    async fn get_all(
        &self,
        limit: i64,
        offset: i64,
        cancel: &CancellationToken,
    ) -> BlueprintResult<Vec<BlueprintResponse>>;

    /// Fails with [`ValidationError::EmptyName`] before touching storage.
    async fn create(
        &self,
        request: CreateBlueprintRequest,
        cancel: &CancellationToken,
    ) -> BlueprintResult<BlueprintResponse>;

    /// Whole-record replacement. `None` if the blueprint does not exist
    /// (or vanished between the read and the write).
    async fn update(
        &self,
        request: UpdateBlueprintRequest,
        cancel: &CancellationToken,
    ) -> BlueprintResult<Option<BlueprintResponse>>;

    async fn delete(&self, id: BlueprintId, cancel: &CancellationToken) -> BlueprintResult<bool>;

    async fn count(&self, cancel: &CancellationToken) -> BlueprintResult<i64>;
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(())
}

/// Default [`BlueprintService`] over any repository.
#[derive(Clone)]
pub struct DefaultBlueprintService {
    repository: Arc<dyn BlueprintRepository>,
    trace: TraceContext,
}

impl DefaultBlueprintService {
    pub fn new(repository: Arc<dyn BlueprintRepository>, trace: TraceContext) -> Self {
        Self { repository, trace }
    }
}

#[async_trait]
impl BlueprintService for DefaultBlueprintService {
    async fn get_by_id(
        &self,
        id: BlueprintId,
        cancel: &CancellationToken,
    ) -> BlueprintResult<Option<BlueprintResponse>> {
        let span = self.trace.span("Service.GetById");
        span.record_id(&id);

        let result = async {
            let blueprint = self.repository.get_by_id(id, cancel).await?;
            Ok::<_, BlueprintError>(blueprint.map(domain_to_response))
        }
        .instrument(span.span())
        .await;

        span.observe(result)
    }

    async fn get_all(
        &self,
        limit: i64,
        offset: i64,
        cancel: &CancellationToken,
    ) -> BlueprintResult<Vec<BlueprintResponse>> {
        let span = self.trace.span("Service.GetAll");
        span.record_page(limit, offset);

        let result = async {
            let blueprints = self.repository.get_all(limit, offset, cancel).await?;
            Ok::<_, BlueprintError>(blueprints.into_iter().map(domain_to_response).collect())
        }
        .instrument(span.span())
        .await;

        span.observe(result)
    }

    async fn create(
        &self,
        request: CreateBlueprintRequest,
        cancel: &CancellationToken,
    ) -> BlueprintResult<BlueprintResponse> {
        let span = self.trace.span("Service.Create");

        let result = async {
            validate_name(&request.name)?;

            let blueprint = create_request_to_domain(request);
            span.record_id(&blueprint.id);

            let created = self.repository.create(&blueprint, cancel).await?;
            Ok::<_, BlueprintError>(domain_to_response(created))
        }
        .instrument(span.span())
        .await;

        span.observe(result)
    }

    async fn update(
        &self,
        request: UpdateBlueprintRequest,
        cancel: &CancellationToken,
    ) -> BlueprintResult<Option<BlueprintResponse>> {
        let span = self.trace.span("Service.Update");
        span.record_id(&request.id);

        let result = async {
            validate_name(&request.name)?;

            let Some(existing) = self.repository.get_by_id(request.id, cancel).await? else {
                return Ok(None);
            };

            let replacement = update_request_to_domain(&request, &existing);
            let updated = self.repository.update(&replacement, cancel).await?;
            Ok::<_, BlueprintError>(updated.map(domain_to_response))
        }
        .instrument(span.span())
        .await;

        span.observe(result)
    }

    async fn delete(&self, id: BlueprintId, cancel: &CancellationToken) -> BlueprintResult<bool> {
        let span = self.trace.span("Service.Delete");
        span.record_id(&id);

        let result = async { Ok::<_, BlueprintError>(self.repository.delete(id, cancel).await?) }
            .instrument(span.span())
            .await;

        span.observe(result)
    }

    async fn count(&self, cancel: &CancellationToken) -> BlueprintResult<i64> {
        let span = self.trace.span("Service.Count");

        let result = async { Ok::<_, BlueprintError>(self.repository.count(cancel).await?) }
            .instrument(span.span())
            .await;

        span.observe(result)
    }
}

// =============================================================================
// TESTS
// =============================================================================
