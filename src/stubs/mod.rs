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

//! Config-declared handlers.
//!
//! Templates understand `{{name}}` for path parameters, `{{query.name}}`,
//! `{{header.name}}`, `{{method}}`, `{{path}}`, `{{operation_id}}`,
//! `{{timestamp}}`, `{{uuid}}` and `{{request_id}}`.

use crate::config::StubConfig;
use crate::dispatch::{HandlerRegistry, HandlerRequest, OperationHandler, ResponseResult};
use futures::future::BoxFuture;
use rand::Rng;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone)]
pub struct StubHandler {
    stub: Arc<StubConfig>,
}

impl StubHandler {
    pub fn new(stub: StubConfig) -> Self {
        Self {
            stub: Arc::new(stub),
        }
    }

    pub async fn respond(&self, request: HandlerRequest) -> anyhow::Result<ResponseResult> {
        let stub = &self.stub;
        info!(
            operation_id = %stub.operation_id,
            method = %request.method,
            path = %request.path,
            "Executing stub"
        );

        let delay = pick_delay(stub);
        if !delay.is_zero() {
            info!(delay_ms = delay.as_millis() as u64, "Adding delay to response");
            tokio::time::sleep(delay).await;
        }

        let context = TemplateContext::new(&request);
        let mut response = ResponseResult::new(stub.status);

        if let Some(body) = &stub.body {
            let (bytes, content_type) = match body {
                Value::String(template) => {
                    let text = context.render(template);
                    let content_type = if serde_json::from_str::<Value>(&text).is_ok() {
                        "application/json"
                    } else {
                        "text/plain"
                    };
                    (text.into_bytes(), content_type)
                }
                other => {
                    let rendered = context.render_value(other);
                    (serde_json::to_vec(&rendered)?, "application/json")
                }
            };
            response = response
                .with_header("Content-Type", content_type)
                .with_body(bytes);
        }

        for (name, value) in &stub.headers {
            response = response.with_header(name.clone(), context.render(value));
        }

        Ok(response.with_header("X-Request-ID", context.request_id.clone()))
    }
}

impl OperationHandler for StubHandler {
    fn handle(&self, request: HandlerRequest) -> BoxFuture<'static, anyhow::Result<ResponseResult>> {
        let handler = self.clone();
        Box::pin(async move { handler.respond(request).await })
    }
}

/// One handler per configured stub.
pub fn registry_from_stubs(stubs: &[StubConfig]) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    for stub in stubs {
        registry.register(stub.operation_id.clone(), StubHandler::new(stub.clone()));
    }
    registry
}

fn pick_delay(stub: &StubConfig) -> Duration {
    let Some(delay) = &stub.delay else {
        return Duration::ZERO;
    };
    let (min, max) = delay.bounds();
    if min == max {
        return min;
    }
    let mut rng = rand::thread_rng();
    Duration::from_millis(rng.gen_range(min.as_millis() as u64..=max.as_millis() as u64))
}

struct TemplateContext<'r> {
    request: &'r HandlerRequest,
    request_id: String,
}

impl<'r> TemplateContext<'r> {
    fn new(request: &'r HandlerRequest) -> Self {
        let request_id = request
            .headers
            .get("x-request-id")
            .cloned()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        Self {
            request,
            request_id,
        }
    }

    /// Typed value for a placeholder, when it names a request value.
    fn lookup(&self, key: &str) -> Option<Value> {
        let params = &self.request.params;
        if let Some(name) = key.strip_prefix("query.") {
            return params.query.get(name).cloned();
        }
        if let Some(name) = key.strip_prefix("header.") {
            return params.headers.get(name).cloned().or_else(|| {
                self.request
                    .headers
                    .get(&name.to_ascii_lowercase())
                    .map(|v| Value::String(v.clone()))
            });
        }
        match key {
            "method" => Some(Value::String(self.request.method.to_string())),
            "path" => Some(Value::String(self.request.path.clone())),
            "operation_id" => Some(Value::String(self.request.operation.operation_id.clone())),
            "timestamp" => Some(Value::String(chrono::Utc::now().to_rfc3339())),
            "uuid" => Some(Value::String(uuid::Uuid::new_v4().to_string())),
            "request_id" => Some(Value::String(self.request_id.clone())),
            name => params.path_params.get(name).cloned(),
        }
    }

    fn render(&self, template: &str) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find("{{") {
            let Some(close) = rest[open + 2..].find("}}") else {
                break;
            };
            result.push_str(&rest[..open]);
            let key = rest[open + 2..open + 2 + close].trim();
            match self.lookup(key) {
                Some(Value::String(text)) => result.push_str(&text),
                Some(other) => result.push_str(&other.to_string()),
                None => result.push_str(&rest[open..open + 4 + close]),
            }
            rest = &rest[open + 4 + close..];
        }

        result.push_str(rest);
        result
    }

    /// A string leaf that is exactly one placeholder keeps the value's JSON type.
    fn render_value(&self, value: &Value) -> Value {
        match value {
            Value::String(template) => {
                let trimmed = template.trim();
                if let Some(key) = trimmed.strip_prefix("{{").and_then(|s| s.strip_suffix("}}")) {
                    if !key.contains("{{") {
                        if let Some(found) = self.lookup(key.trim()) {
                            return found;
                        }
                    }
                }
                Value::String(self.render(template))
            }
            Value::Array(items) => Value::Array(items.iter().map(|v| self.render_value(v)).collect()),
            Value::Object(object) => Value::Object(
                object
                    .iter()
                    .map(|(k, v)| (k.clone(), self.render_value(v)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}
