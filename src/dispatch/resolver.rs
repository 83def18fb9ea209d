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

use crate::dispatch::request::ResponseResult;
use crate::dispatch::validator::ValidatedRequest;
use crate::spec::OperationDescriptor;
use anyhow::Context;
use futures::future::BoxFuture;
use http::Method;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// What a custom handler receives: the matched operation and the values the
/// validator accepted.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    pub operation: Arc<OperationDescriptor>,
    pub method: Method,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub params: ValidatedRequest,
}

/// Custom behaviour for one operation. Errors surface as transport-level
/// server errors, never as validation failures.
pub trait OperationHandler: Send + Sync {
    fn handle(&self, request: HandlerRequest) -> BoxFuture<'static, anyhow::Result<ResponseResult>>;
}

impl<F, Fut> OperationHandler for F
where
    F: Fn(HandlerRequest) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<ResponseResult>> + Send + 'static,
{
    fn handle(&self, request: HandlerRequest) -> BoxFuture<'static, anyhow::Result<ResponseResult>> {
        Box::pin(self(request))
    }
}

#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn OperationHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any handler already registered for `operation_id`.
    pub fn register<H>(&mut self, operation_id: impl Into<String>, handler: H) -> &mut Self
    where
        H: OperationHandler + 'static,
    {
        self.handlers.insert(operation_id.into(), Arc::new(handler));
        self
    }

    pub fn with_handler<H>(mut self, operation_id: impl Into<String>, handler: H) -> Self
    where
        H: OperationHandler + 'static,
    {
        self.register(operation_id, handler);
        self
    }

    pub fn get(&self, operation_id: &str) -> Option<&Arc<dyn OperationHandler>> {
        self.handlers.get(operation_id)
    }

    pub fn contains(&self, operation_id: &str) -> bool {
        self.handlers.contains_key(operation_id)
    }

    pub fn operation_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("operations", &self.operation_ids())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Handler,
    Example,
    NoContent,
    NotImplemented,
}

impl ResponseSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Handler => "handler",
            Self::Example => "example",
            Self::NoContent => "no_content",
            Self::NotImplemented => "not_implemented",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResponseResolver {
    handlers: HandlerRegistry,
}

impl ResponseResolver {
    pub fn new(handlers: HandlerRegistry) -> Self {
        Self { handlers }
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    pub async fn resolve(
        &self,
        operation: &Arc<OperationDescriptor>,
        request: HandlerRequest,
    ) -> anyhow::Result<(ResponseResult, ResponseSource)> {
        match self.handlers.get(&operation.operation_id) {
            Some(handler) => {
                tracing::debug!(operation_id = %operation.operation_id, "Invoking custom handler");
                let response = handler.handle(request).await.with_context(|| {
                    format!("handler for operation '{}' failed", operation.operation_id)
                })?;
                Ok((response, ResponseSource::Handler))
            }
            None => Ok(mock(operation)),
        }
    }
}

/// The response synthesized from the operation's declared examples.
pub fn mock(operation: &OperationDescriptor) -> (ResponseResult, ResponseSource) {
    let Some(response) = operation.mock_response() else {
        return not_implemented();
    };
    let status = response.status.mock_status();

    if response.content.is_empty() {
        return (with_header_examples(ResponseResult::new(status), &response.headers), ResponseSource::NoContent);
    }

    let Some((media, example)) = response
        .content
        .iter()
        .find_map(|media| media.example.as_ref().map(|example| (media, example)))
    else {
        return not_implemented();
    };

    let body = match example {
        Value::String(text) if !media.is_json() => text.clone().into_bytes(),
        other => other.to_string().into_bytes(),
    };
    let result = ResponseResult::new(status)
        .with_header("Content-Type", media.media_type.clone())
        .with_body(body);

    (with_header_examples(result, &response.headers), ResponseSource::Example)
}

fn with_header_examples(mut result: ResponseResult, headers: &[(String, Value)]) -> ResponseResult {
    for (name, example) in headers {
        let value = match example {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        result = result.with_header(name.clone(), value);
    }
    result
}

fn not_implemented() -> (ResponseResult, ResponseSource) {
    (
        ResponseResult::json(501, &json!({"err": "not implemented"})),
        ResponseSource::NotImplemented,
    )
}
