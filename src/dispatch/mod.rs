/*
 * Copyright 2026 Specmock Team
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! Per-request orchestration: match, validate, resolve.
//!
//! A [`Dispatcher`] is built once from a loaded model and a handler registry
//! and is immutable afterwards; it can be shared across workers behind an
//! `Arc` without locking.

pub mod formats;
pub mod index;
pub mod matcher;
pub mod request;
pub mod resolver;
pub mod validator;

pub use formats::FormatRegistry;
pub use index::{Candidate, OperationIndex};
pub use matcher::{MatchResult, RequestMatcher};
pub use request::{Body, IncomingRequest, ResponseResult};
pub use resolver::{
    HandlerRegistry, HandlerRequest, OperationHandler, ResponseResolver, ResponseSource,
};
pub use validator::{
    SchemaValidator, UnknownFieldPolicy, ValidatedRequest, ValidationOutcome, Violation,
    ViolationLocation,
};

use crate::spec::{OperationDescriptor, Schema, SpecLoadError, SpecificationModel};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::Instrument;

/// Formats that constrain numbers or only document intent; never registered as string predicates.
const NON_STRING_FORMATS: &[&str] = &["int32", "int64", "float", "double", "password", "binary"];

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("handler registered for unknown operation '{0}'")]
    UnknownOperation(String),

    #[error(transparent)]
    Spec(#[from] SpecLoadError),
}

#[derive(Debug, Clone, Default)]
pub struct DispatcherOptions {
    pub unknown_fields: UnknownFieldPolicy,
    pub formats: FormatRegistry,
}

/// Exactly one of these is produced per request.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    NotFound,
    AmbiguousSpec {
        candidates: Vec<String>,
    },
    ValidationFailed {
        operation_id: String,
        violations: Vec<Violation>,
    },
    Resolved {
        operation_id: String,
        response: ResponseResult,
        source: ResponseSource,
    },
}

impl DispatchOutcome {
    pub fn state(&self) -> &'static str {
        match self {
            DispatchOutcome::NotFound => "not_found",
            DispatchOutcome::AmbiguousSpec { .. } => "ambiguous_spec",
            DispatchOutcome::ValidationFailed { .. } => "validation_failed",
            DispatchOutcome::Resolved { .. } => "resolved",
        }
    }

    pub fn operation_id(&self) -> Option<&str> {
        match self {
            DispatchOutcome::ValidationFailed { operation_id, .. }
            | DispatchOutcome::Resolved { operation_id, .. } => Some(operation_id),
            DispatchOutcome::NotFound | DispatchOutcome::AmbiguousSpec { .. } => None,
        }
    }

    pub fn source(&self) -> Option<ResponseSource> {
        match self {
            DispatchOutcome::Resolved { source, .. } => Some(*source),
            _ => None,
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            DispatchOutcome::NotFound => 404,
            DispatchOutcome::AmbiguousSpec { .. } => 500,
            DispatchOutcome::ValidationFailed { .. } => 400,
            DispatchOutcome::Resolved { response, .. } => response.status,
        }
    }

    pub fn into_response(self) -> ResponseResult {
        match self {
            DispatchOutcome::NotFound => ResponseResult::json(404, &json!({"err": "not found"})),
            DispatchOutcome::AmbiguousSpec { candidates } => ResponseResult::json(
                500,
                &json!({"err": "ambiguous operation match", "candidates": candidates}),
            ),
            DispatchOutcome::ValidationFailed { violations, .. } => {
                ResponseResult::json(400, &json!({ "err": violations }))
            }
            DispatchOutcome::Resolved { response, .. } => response,
        }
    }
}

pub struct Dispatcher {
    matcher: RequestMatcher,
    validator: SchemaValidator,
    resolver: ResponseResolver,
}

impl Dispatcher {
    pub fn new(
        model: SpecificationModel,
        handlers: HandlerRegistry,
        options: DispatcherOptions,
    ) -> Result<Self, BuildError> {
        for operation_id in handlers.operation_ids() {
            if model.operation(operation_id).is_none() {
                return Err(BuildError::UnknownOperation(operation_id.to_string()));
            }
        }

        for format in unregistered_formats(&model, &options.formats) {
            tracing::warn!(format = %format, "Unknown schema format, values will not be checked against it");
        }

        let index = OperationIndex::build(model)?;
        tracing::info!(
            operations = index.len(),
            handlers = handlers.len(),
            unknown_fields = ?options.unknown_fields,
            "Dispatcher ready"
        );

        Ok(Self {
            matcher: RequestMatcher::new(Arc::new(index)),
            validator: SchemaValidator::new(options.formats, options.unknown_fields),
            resolver: ResponseResolver::new(handlers),
        })
    }

    pub fn builder(model: SpecificationModel) -> DispatcherBuilder {
        DispatcherBuilder {
            model,
            handlers: HandlerRegistry::new(),
            options: DispatcherOptions::default(),
        }
    }

    pub fn index(&self) -> &OperationIndex {
        self.matcher.index()
    }

    pub fn model(&self) -> &SpecificationModel {
        self.matcher.index().model()
    }

    pub fn validator(&self) -> &SchemaValidator {
        &self.validator
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        self.resolver.handlers()
    }

    /// Errors only when a custom handler fails.
    pub async fn dispatch(&self, request: IncomingRequest) -> anyhow::Result<DispatchOutcome> {
        let span = tracing::info_span!(
            "dispatch",
            method = %request.method,
            path = %request.path,
            operation_id = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        async move {
            let outcome = self.run(request).await?;
            let span = tracing::Span::current();
            if let Some(operation_id) = outcome.operation_id() {
                span.record("operation_id", operation_id);
            }
            span.record("outcome", outcome.state());
            Ok(outcome)
        }
        .instrument(span)
        .await
    }

    async fn run(&self, request: IncomingRequest) -> anyhow::Result<DispatchOutcome> {
        let (operation, path_params) = match self.matcher.find_match(&request.method, &request.path) {
            MatchResult::Matched {
                operation,
                path_params,
            } => (operation, path_params),
            MatchResult::Unmatched => {
                tracing::debug!("No operation matches the request");
                return Ok(DispatchOutcome::NotFound);
            }
            MatchResult::AmbiguousMatch { candidates } => {
                let candidates: Vec<String> = candidates
                    .iter()
                    .map(|op| op.operation_id.clone())
                    .collect();
                tracing::error!(candidates = ?candidates, "Ambiguous operation match, the API description needs fixing");
                return Ok(DispatchOutcome::AmbiguousSpec { candidates });
            }
        };

        let params = match self.validator.validate(&operation, &path_params, &request) {
            ValidationOutcome::Valid(params) => params,
            ValidationOutcome::Invalid { violations } => {
                tracing::debug!(
                    operation_id = %operation.operation_id,
                    violations = violations.len(),
                    "Request failed validation"
                );
                return Ok(DispatchOutcome::ValidationFailed {
                    operation_id: operation.operation_id.clone(),
                    violations,
                });
            }
        };

        let handler_request = HandlerRequest {
            operation: operation.clone(),
            method: request.method,
            path: request.path,
            headers: request.headers,
            params,
        };
        let (response, source) = self.resolver.resolve(&operation, handler_request).await?;

        tracing::debug!(
            operation_id = %operation.operation_id,
            status = response.status,
            source = source.as_str(),
            "Request resolved"
        );
        Ok(DispatchOutcome::Resolved {
            operation_id: operation.operation_id.clone(),
            response,
            source,
        })
    }
}

pub struct DispatcherBuilder {
    model: SpecificationModel,
    handlers: HandlerRegistry,
    options: DispatcherOptions,
}

impl DispatcherBuilder {
    pub fn handler<H>(mut self, operation_id: impl Into<String>, handler: H) -> Self
    where
        H: OperationHandler + 'static,
    {
        self.handlers.register(operation_id, handler);
        self
    }

    pub fn handlers(mut self, handlers: HandlerRegistry) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn unknown_fields(mut self, policy: UnknownFieldPolicy) -> Self {
        self.options.unknown_fields = policy;
        self
    }

    pub fn format<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.options.formats.register(name, predicate);
        self
    }

    pub fn build(self) -> Result<Dispatcher, BuildError> {
        Dispatcher::new(self.model, self.handlers, self.options)
    }
}

fn unregistered_formats(model: &SpecificationModel, formats: &FormatRegistry) -> BTreeSet<String> {
    let mut schemas: Vec<&Schema> = model.components.iter().map(|(_, s)| s).collect();
    for operation in &model.operations {
        schemas.extend(operation_schemas(operation));
    }

    schemas
        .into_iter()
        .flat_map(Schema::formats)
        .filter(|f| !formats.contains(f) && !NON_STRING_FORMATS.contains(f))
        .map(str::to_string)
        .collect()
}

fn operation_schemas(operation: &OperationDescriptor) -> Vec<&Schema> {
    let mut schemas: Vec<&Schema> = operation.parameters.iter().map(|p| &p.schema).collect();
    if let Some(body) = &operation.request_body {
        schemas.extend(body.content.iter().filter_map(|m| m.schema.as_ref()));
    }
    for response in &operation.responses {
        schemas.extend(response.content.iter().filter_map(|m| m.schema.as_ref()));
    }
    schemas
}
