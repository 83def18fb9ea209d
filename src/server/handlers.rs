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

use crate::dispatch::{Body, IncomingRequest, ResponseResult};
use crate::server::app::AppState;
use crate::server::openapi::{ErrorResponse, HealthResponse, OperationSummary};
use crate::telemetry::attributes;
use crate::telemetry::metrics::{record_dispatch, record_handler_error};
use actix_web::http::StatusCode;
use actix_web::web;
use actix_web::HttpRequest;
use actix_web::HttpResponse;
use actix_web::Responder;
use std::time::Instant;
use tracing::info;
use tracing::Span;

#[utoipa::path(
    get,
    path = "/__specmock/health",
    tag = "System",
    responses(
        (status = 200, description = "Server is healthy", body = HealthResponse)
    )
)]
pub async fn health_handler(data: web::Data<AppState>) -> impl Responder {
    let dispatcher = data.dispatcher.load();
    let model = dispatcher.model();
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        service: data.config.telemetry.service_name.clone(),
        api: format!("{} {}", model.title, model.version),
        operations: dispatcher.index().len(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[utoipa::path(
    get,
    path = "/__specmock/operations",
    tag = "System",
    responses(
        (status = 200, description = "Operations of the loaded API description", body = [OperationSummary])
    )
)]
pub async fn operations_handler(data: web::Data<AppState>) -> impl Responder {
    let dispatcher = data.dispatcher.load();
    let handlers = dispatcher.handlers();
    let operations: Vec<OperationSummary> = dispatcher
        .model()
        .operations
        .iter()
        .map(|op| OperationSummary {
            operation_id: op.operation_id.clone(),
            method: op.method.to_string(),
            path: op.path.as_str().to_string(),
            summary: op.summary.clone(),
            responder: if handlers.contains(&op.operation_id) {
                "handler".to_string()
            } else {
                "example".to_string()
            },
        })
        .collect();
    HttpResponse::Ok().json(operations)
}

#[utoipa::path(
    get,
    path = "/__specmock/spec.json",
    tag = "System",
    responses(
        (status = 200, description = "The loaded API description as JSON")
    )
)]
pub async fn spec_handler(data: web::Data<AppState>) -> impl Responder {
    let dispatcher = data.dispatcher.load();
    HttpResponse::Ok().json(&dispatcher.model().document)
}

/// Catch-all: every request outside the admin prefix goes through the dispatcher.
pub async fn request_handler(
    req: HttpRequest,
    body: web::Bytes,
    data: web::Data<AppState>,
) -> impl Responder {
    let start_time = Instant::now();
    let span = Span::current();

    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    span.record("request.id", request_id.as_str());

    let incoming = match to_incoming(&req, body, &request_id) {
        Some(incoming) => incoming,
        None => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "err": "unsupported request method"
            }))
        }
    };
    let method = incoming.method.to_string();

    // Pinned for the whole request so a reload cannot swap it mid-flight.
    let dispatcher = data.dispatcher.load_full();

    match dispatcher.dispatch(incoming).await {
        Ok(outcome) => {
            let state = outcome.state();
            let operation_id = outcome.operation_id().map(str::to_string);
            if let Some(id) = &operation_id {
                span.record(attributes::dispatch::OPERATION_ID, id.as_str());
                if let Some(op) = dispatcher.model().operation(id) {
                    span.record(attributes::http::ROUTE, op.path.as_str());
                }
            }
            span.record(attributes::dispatch::OUTCOME, state);
            let source = outcome.source().map(|s| s.as_str()).unwrap_or("none");

            let response = outcome.into_response();
            let latency = start_time.elapsed();
            record_dispatch(&method, state, operation_id.as_deref(), response.status, latency);

            info!(
                request_id = %request_id,
                status = response.status,
                outcome = state,
                source = source,
                latency_ms = latency.as_millis() as u64,
                "Request completed"
            );
            to_http_response(response)
        }
        Err(e) => {
            let latency = start_time.elapsed();
            record_dispatch(&method, "handler_error", None, 500, latency);
            record_handler_error(&method, None);

            tracing::error!(
                request_id = %request_id,
                error = %e,
                latency_ms = latency.as_millis() as u64,
                "Request processing failed"
            );
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Internal server error".to_string(),
                request_id,
            })
        }
    }
}

fn to_incoming(req: &HttpRequest, body: web::Bytes, request_id: &str) -> Option<IncomingRequest> {
    let method = http::Method::from_bytes(req.method().as_str().as_bytes()).ok()?;
    let mut incoming =
        IncomingRequest::new(method, req.path()).with_query_string(req.query_string());

    for name in req.headers().keys() {
        let values: Vec<&str> = req
            .headers()
            .get_all(name)
            .filter_map(|v| v.to_str().ok())
            .collect();
        if !values.is_empty() {
            incoming = incoming.with_header(name.as_str(), values.join(", "));
        }
    }
    if incoming.header("x-request-id").is_none() {
        incoming = incoming.with_header("x-request-id", request_id);
    }

    if !body.is_empty() {
        incoming = incoming.with_body(Body::Raw(body.to_vec()));
    }
    Some(incoming)
}

fn to_http_response(response: ResponseResult) -> HttpResponse {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut http_response = HttpResponse::build(status);

    for (key, value) in response.headers {
        http_response.insert_header((key, value));
    }

    if response.body.is_empty() {
        http_response.finish()
    } else {
        http_response.body(response.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dispatch::Dispatcher;
    use crate::spec::SpecLoader;
    use actix_web::test;
    use arc_swap::ArcSwap;
    use std::sync::Arc;

    const SPEC: &str = r#"
openapi: 3.0.3
info: {title: Ping, version: "2.0"}
paths:
  /ping:
    get:
      operationId: Ping
      summary: Liveness
      responses:
        "200":
          description: ok
          content:
            application/json:
              example: {pong: true}
"#;

    fn state() -> web::Data<AppState> {
        let model = SpecLoader::from_str(SPEC).unwrap();
        let dispatcher = Dispatcher::builder(model).build().unwrap();
        web::Data::new(AppState {
            config: Config::default(),
            dispatcher: Arc::new(ArcSwap::from_pointee(dispatcher)),
        })
    }

    #[actix_web::test]
    async fn test_health_handler() {
        let resp = health_handler(state()).await;
        let resp = resp.respond_to(&test::TestRequest::default().to_http_request());
        assert_eq!(resp.status(), 200);
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "application/json"
        );
    }

    #[actix_web::test]
    async fn test_request_handler_mocks_example() {
        let req = test::TestRequest::get()
            .uri("/ping")
            .insert_header(("x-request-id", "abc"))
            .to_http_request();
        let resp = request_handler(req, web::Bytes::new(), state()).await;
        let resp = resp.respond_to(&test::TestRequest::default().to_http_request());
        assert_eq!(resp.status(), 200);
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "application/json"
        );
    }

    #[actix_web::test]
    async fn test_request_handler_unknown_path() {
        let req = test::TestRequest::post().uri("/pong").to_http_request();
        let resp = request_handler(req, web::Bytes::from_static(b"{}"), state()).await;
        let resp = resp.respond_to(&test::TestRequest::default().to_http_request());
        assert_eq!(resp.status(), 404);
    }

    #[actix_web::test]
    async fn test_to_incoming_copies_request() {
        let req = test::TestRequest::post()
            .uri("/users/7?tag=a&tag=b")
            .insert_header(("Content-Type", "application/json"))
            .to_http_request();
        let incoming = to_incoming(&req, web::Bytes::from_static(b"{\"a\":1}"), "rid").unwrap();
        assert_eq!(incoming.method, http::Method::POST);
        assert_eq!(incoming.path, "/users/7");
        assert_eq!(incoming.query_values("tag"), vec!["a", "b"]);
        assert_eq!(incoming.content_type(), Some("application/json"));
        assert_eq!(incoming.header("x-request-id"), Some("rid"));
        assert!(matches!(incoming.body, Body::Raw(ref b) if b == b"{\"a\":1}"));
    }

    #[actix_web::test]
    async fn test_to_http_response_keeps_headers() {
        let response = ResponseResult::new(201)
            .with_header("Location", "/users/1")
            .with_body("created");
        let http_response = to_http_response(response);
        assert_eq!(http_response.status(), 201);
        assert_eq!(http_response.headers().get("location").unwrap(), "/users/1");
    }

    #[actix_web::test]
    async fn test_invalid_status_becomes_500() {
        let http_response = to_http_response(ResponseResult::new(42));
        assert_eq!(http_response.status(), 500);
    }
}
