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

use serde::Serialize;
use utoipa::OpenApi;
use utoipa::ToSchema;

/// Describes the admin surface only; mocked operations come from the loaded document.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Specmock Admin API",
        description = "Introspection endpoints of the specmock mock server",
        version = "0.1.0",
        license(
            name = "Apache-2.0",
            url = "https://www.apache.org/licenses/LICENSE-2.0"
        )
    ),
    paths(
        super::handlers::health_handler,
        super::handlers::operations_handler,
        super::handlers::spec_handler,
        request_handler_path
    ),
    components(
        schemas(
            HealthResponse,
            OperationSummary,
            ErrorResponse
        )
    ),
    tags(
        (name = "System", description = "Admin endpoints"),
        (name = "Mock", description = "Operations of the loaded API description")
    )
)]
pub struct ApiDoc;

#[utoipa::path(
    get,
    path = "/{path:.*}",
    tag = "Mock",
    responses(
        (status = 200, description = "Handler output or the operation's example"),
        (status = 400, description = "Request violates the operation's parameters or body schema"),
        (status = 404, description = "No operation matches method and path"),
        (status = 500, description = "Ambiguous match or failed handler", body = ErrorResponse),
        (status = 501, description = "Operation has no example to mock")
    )
)]
#[allow(dead_code)]
pub fn request_handler_path() {}

#[derive(ToSchema, Serialize)]
pub struct HealthResponse {
    #[schema(example = "healthy")]
    pub status: String,
    #[schema(example = "specmock")]
    pub service: String,
    #[schema(example = "Users API 1.0.0")]
    pub api: String,
    #[schema(example = 12)]
    pub operations: usize,
    #[schema(example = "2026-01-01T00:00:00Z")]
    pub timestamp: String,
}

#[derive(ToSchema, Serialize)]
pub struct OperationSummary {
    #[schema(example = "GetUser")]
    pub operation_id: String,
    #[schema(example = "GET")]
    pub method: String,
    #[schema(example = "/users/{id}")]
    pub path: String,
    #[schema(example = "Fetch one user")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// `handler` when a custom handler is registered, `example` otherwise.
    #[schema(example = "example")]
    pub responder: String,
}

#[derive(ToSchema, Serialize)]
pub struct ErrorResponse {
    #[schema(example = "Internal server error")]
    pub error: String,
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub request_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_document_lists_paths() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        let paths = doc["paths"].as_object().unwrap();
        assert!(paths.contains_key("/__specmock/health"));
        assert!(paths.contains_key("/__specmock/operations"));
        assert!(paths.contains_key("/__specmock/spec.json"));
        assert_eq!(doc["info"]["title"], "Specmock Admin API");
    }
}
