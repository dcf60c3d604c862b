//! Tracing span boundary
//!
//! Components receive a [`TraceContext`] at construction instead of reaching
//! for a process-wide handle. Each repository/service method opens one
//! [`OperationSpan`], tags it, and hands its result through
//! [`OperationSpan::observe`] so failures land on the span.
//!
//! Export (OTLP, sampling) is configured by whoever installs the subscriber.

use std::fmt;

use tracing::field::Empty;
use tracing::Span;
use uuid::Uuid;

/// Factory for operation spans, tagged with the owning component.
#[derive(Debug, Clone)]
pub struct TraceContext {
    component: &'static str,
}

impl TraceContext {
    /// Create a context for the named component (e.g. "repository").
    pub fn new(component: &'static str) -> Self {
        Self { component }
    }

    /// Start a span for one operation, e.g. `"Repository.GetById"`.
    pub fn span(&self, operation: &'static str) -> OperationSpan {
        let span = tracing::info_span!(
            "blueprint.operation",
            otel.name = operation,
            otel.status_code = Empty,
            component = self.component,
            blueprint.id = Empty,
            limit = Empty,
            offset = Empty,
            error = Empty,
        );
        OperationSpan { operation, span }
    }
}

/// An open span for a single operation.
#[derive(Debug, Clone)]
pub struct OperationSpan {
    operation: &'static str,
    span: Span,
}

impl OperationSpan {
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// The underlying span, for `Instrument::instrument`.
    pub fn span(&self) -> Span {
        self.span.clone()
    }

    pub fn record_id(&self, id: &Uuid) {
        self.span.record("blueprint.id", tracing::field::display(id));
    }

    pub fn record_page(&self, limit: i64, offset: i64) {
        self.span.record("limit", limit);
        self.span.record("offset", offset);
    }

    pub fn record_error(&self, error: &dyn fmt::Display) {
        self.span.record("otel.status_code", "ERROR");
        self.span.record("error", tracing::field::display(error));
    }

    /// Attach the error (if any) to the span and return the result unchanged.
    pub fn observe<T, E: fmt::Display>(&self, result: Result<T, E>) -> Result<T, E> {
        if let Err(e) = &result {
            self.record_error(e);
        }
        result
    }
}
