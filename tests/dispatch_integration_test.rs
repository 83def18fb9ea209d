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

use assert_json_diff::assert_json_eq;
use http::Method;
use serde_json::json;
use specmock::dispatch::{
    Body, DispatchOutcome, Dispatcher, HandlerRequest, IncomingRequest, MatchResult,
    OperationIndex, RequestMatcher, ResponseResult, ResponseSource, UnknownFieldPolicy,
    ViolationLocation,
};
use specmock::spec::{SpecLoader, SpecificationModel};
use std::sync::Arc;

const USERS_API: &str = include_str!("fixtures/users_api.yaml");

fn model() -> SpecificationModel {
    SpecLoader::from_str(USERS_API).unwrap()
}

fn dispatcher() -> Dispatcher {
    Dispatcher::builder(model()).build().unwrap()
}

async fn dispatch(dispatcher: &Dispatcher, request: IncomingRequest) -> DispatchOutcome {
    dispatcher.dispatch(request).await.unwrap()
}

#[tokio::test]
async fn test_heartbeat_is_mocked_from_example() {
    let outcome = dispatch(&dispatcher(), IncomingRequest::new(Method::GET, "/heartbeat")).await;

    assert_eq!(outcome.state(), "resolved");
    assert_eq!(outcome.operation_id(), Some("Heartbeat"));
    assert_eq!(outcome.source(), Some(ResponseSource::Example));

    let response = outcome.into_response();
    assert_eq!(response.status, 200);
    assert_eq!(
        response.headers.get("Content-Type").map(String::as_str),
        Some("application/json")
    );
    assert_json_eq!(response.body_json().unwrap(), json!({"status": "ok"}));
}

#[tokio::test]
async fn test_missing_required_field_fails_validation() {
    let request = IncomingRequest::new(Method::POST, "/users").with_json(json!({"name": "Erin"}));
    let outcome = dispatch(&dispatcher(), request).await;

    let DispatchOutcome::ValidationFailed {
        operation_id,
        violations,
    } = &outcome
    else {
        panic!("expected validation failure, got {:?}", outcome);
    };
    assert_eq!(operation_id, "CreateUser");
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].location, ViolationLocation::Body);
    assert_eq!(violations[0].field, "email");

    let response = outcome.into_response();
    assert_eq!(response.status, 400);
    assert_json_eq!(
        response.body_json().unwrap(),
        json!({"err": [{"location": "body", "field": "email", "message": "is required"}]})
    );
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let outcome = dispatch(
        &dispatcher(),
        IncomingRequest::new(Method::GET, "/unknown/path"),
    )
    .await;

    assert!(matches!(outcome, DispatchOutcome::NotFound));
    let response = outcome.into_response();
    assert_eq!(response.status, 404);
    assert_json_eq!(response.body_json().unwrap(), json!({"err": "not found"}));
}

#[tokio::test]
async fn test_wrong_method_is_not_found() {
    let outcome = dispatch(&dispatcher(), IncomingRequest::new(Method::PATCH, "/users")).await;
    assert_eq!(outcome.status(), 404);
}

#[tokio::test]
async fn test_custom_handler_overrides_example() {
    let dispatcher = Dispatcher::builder(model())
        .handler("Heartbeat", |request: HandlerRequest| async move {
            Ok::<_, anyhow::Error>(
                ResponseResult::new(200)
                    .with_header("Content-Type", "text/plain")
                    .with_body(format!("alive via {}", request.operation.operation_id)),
            )
        })
        .build()
        .unwrap();

    for _ in 0..2 {
        let outcome = dispatch(&dispatcher, IncomingRequest::new(Method::GET, "/heartbeat")).await;
        assert_eq!(outcome.source(), Some(ResponseSource::Handler));
        let response = outcome.into_response();
        assert_eq!(response.status, 200);
        assert_eq!(response.body_text(), "alive via Heartbeat");
    }
}

#[tokio::test]
async fn test_handler_failure_propagates() {
    let dispatcher = Dispatcher::builder(model())
        .handler("Heartbeat", |_request: HandlerRequest| async move {
            Err::<ResponseResult, _>(anyhow::anyhow!("database unavailable"))
        })
        .build()
        .unwrap();

    let err = dispatcher
        .dispatch(IncomingRequest::new(Method::GET, "/heartbeat"))
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("database unavailable"));
}

#[tokio::test]
async fn test_handler_for_unknown_operation_is_rejected() {
    let result = Dispatcher::builder(model())
        .handler("Nope", |_request: HandlerRequest| async move {
            Ok::<_, anyhow::Error>(ResponseResult::new(200))
        })
        .build();
    assert!(result.is_err());
}

#[tokio::test]
async fn test_literal_segment_wins_over_placeholder() {
    let dispatcher = dispatcher();

    let outcome = dispatch(&dispatcher, IncomingRequest::new(Method::GET, "/users/me")).await;
    assert_eq!(outcome.operation_id(), Some("GetCurrentUser"));

    let outcome = dispatch(&dispatcher, IncomingRequest::new(Method::GET, "/users/42")).await;
    assert_eq!(outcome.operation_id(), Some("GetUser"));
    assert_json_eq!(
        outcome.into_response().body_json().unwrap(),
        json!({"id": 42, "name": "Dave", "email": "dave@example.com"})
    );
}

#[test]
fn test_every_template_instantiation_finds_its_operation() {
    let model = model();
    let operations = model.operations.clone();
    let matcher = RequestMatcher::new(Arc::new(OperationIndex::build(model).unwrap()));

    for operation in &operations {
        let path = operation.path.instantiate(|name| format!("{}-value", name));
        match matcher.find_match(&operation.method, &path) {
            MatchResult::Matched {
                operation: found,
                path_params,
            } => {
                assert_eq!(found.operation_id, operation.operation_id, "path {}", path);
                for name in operation.path.param_names() {
                    assert_eq!(path_params.get(name), Some(&format!("{}-value", name)));
                }
            }
            other => panic!("{} {} did not match: {:?}", operation.method, path, other),
        }
    }
}

#[tokio::test]
async fn test_violations_are_reported_in_location_order() {
    let request = IncomingRequest::new(Method::GET, "/users/abc").with_header("X-Trace", "ab");
    let outcome = dispatch(&dispatcher(), request).await;

    let DispatchOutcome::ValidationFailed { violations, .. } = outcome else {
        panic!("expected validation failure");
    };
    let locations: Vec<ViolationLocation> = violations.iter().map(|v| v.location).collect();
    assert_eq!(
        locations,
        vec![ViolationLocation::Path, ViolationLocation::Header]
    );
    assert_eq!(violations[0].field, "id");
    assert_eq!(violations[1].field, "X-Trace");
}

#[tokio::test]
async fn test_violations_cover_every_location_in_order() {
    let model = SpecLoader::from_str(
        r#"
openapi: 3.0.3
info: {title: Orders, version: "1.0"}
paths:
  /orders/{orderId}/items:
    post:
      operationId: AddItem
      parameters:
        - {name: orderId, in: path, required: true, schema: {type: integer}}
        - {name: quantity, in: query, required: true, schema: {type: integer, minimum: 1}}
        - {name: X-Tenant, in: header, required: true, schema: {type: string}}
      requestBody:
        required: true
        content:
          application/json:
            schema:
              type: object
              required: [sku]
              properties:
                sku: {type: string}
      responses:
        '201': {description: added}
"#,
    )
    .unwrap();
    let dispatcher = Dispatcher::builder(model).build().unwrap();

    let request = IncomingRequest::new(Method::POST, "/orders/first/items")
        .with_query("quantity", "0")
        .with_json(json!({"note": "no sku"}));
    let outcome = dispatch(&dispatcher, request).await;

    let DispatchOutcome::ValidationFailed { violations, .. } = outcome else {
        panic!("expected validation failure");
    };
    let reported: Vec<(ViolationLocation, &str)> = violations
        .iter()
        .map(|v| (v.location, v.field.as_str()))
        .collect();
    assert_eq!(
        reported,
        vec![
            (ViolationLocation::Path, "orderId"),
            (ViolationLocation::Query, "quantity"),
            (ViolationLocation::Header, "X-Tenant"),
            (ViolationLocation::Body, "sku"),
        ]
    );
}

#[tokio::test]
async fn test_ambiguous_document_dispatches_to_500() {
    let model = SpecLoader::from_str(
        r#"
openapi: 3.0.3
info: {title: Files, version: "1.0"}
paths:
  /files/{name}.{ext}:
    get: {operationId: ByExtension, responses: {}}
  /files/{base}-{rev}:
    get: {operationId: ByRevision, responses: {}}
"#,
    )
    .unwrap();
    let dispatcher = Dispatcher::builder(model).build().unwrap();

    let outcome = dispatch(
        &dispatcher,
        IncomingRequest::new(Method::GET, "/files/report-2.txt"),
    )
    .await;
    assert_eq!(outcome.state(), "ambiguous_spec");
    assert_eq!(outcome.status(), 500);

    let body = outcome.into_response().body_json().unwrap();
    assert_eq!(body["err"], "ambiguous operation match");
    let mut candidates: Vec<&str> = body["candidates"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|c| c.as_str())
        .collect();
    candidates.sort_unstable();
    assert_eq!(candidates, vec!["ByExtension", "ByRevision"]);
}

#[tokio::test]
async fn test_query_parameters_are_coerced() {
    let dispatcher = Dispatcher::builder(model())
        .handler("ListUsers", |request: HandlerRequest| async move {
            Ok::<_, anyhow::Error>(ResponseResult::json(
                200,
                &serde_json::to_value(&request.params.query)?,
            ))
        })
        .build()
        .unwrap();

    let request = IncomingRequest::new(Method::GET, "/users")
        .with_query_string("limit=10&role=admin&role=member");
    let response = dispatch(&dispatcher, request).await.into_response();
    assert_json_eq!(
        response.body_json().unwrap(),
        json!({"limit": 10, "role": ["admin", "member"]})
    );

    let request = IncomingRequest::new(Method::GET, "/users").with_query_string("limit=0");
    let outcome = dispatch(&dispatcher, request).await;
    assert_eq!(outcome.status(), 400);
}

#[tokio::test]
async fn test_malformed_json_body() {
    let request = IncomingRequest::new(Method::POST, "/users")
        .with_header("Content-Type", "application/json")
        .with_body(Body::Raw(b"{\"name\":".to_vec()));
    let outcome = dispatch(&dispatcher(), request).await;
    assert_eq!(outcome.state(), "validation_failed");
}

#[tokio::test]
async fn test_strict_policy_rejects_unknown_fields() {
    let body = json!({"name": "Erin", "email": "erin@example.com", "nickname": "e"});

    let permissive = dispatch(
        &dispatcher(),
        IncomingRequest::new(Method::POST, "/users").with_json(body.clone()),
    )
    .await;
    assert_eq!(permissive.status(), 201);

    let strict = Dispatcher::builder(model())
        .unknown_fields(UnknownFieldPolicy::Strict)
        .build()
        .unwrap();
    let outcome = dispatch(
        &strict,
        IncomingRequest::new(Method::POST, "/users").with_json(body),
    )
    .await;
    let DispatchOutcome::ValidationFailed { violations, .. } = outcome else {
        panic!("expected validation failure");
    };
    assert_eq!(violations[0].field, "nickname");
}

#[tokio::test]
async fn test_created_response_carries_header_example() {
    let request = IncomingRequest::new(Method::POST, "/users")
        .with_json(json!({"name": "Carol", "email": "carol@example.com"}));
    let response = dispatch(&dispatcher(), request).await.into_response();
    assert_eq!(response.status, 201);
    assert_eq!(response.headers.get("Location").map(String::as_str), Some("/users/3"));
}

#[tokio::test]
async fn test_no_content_and_not_implemented() {
    let dispatcher = dispatcher();

    let outcome = dispatch(&dispatcher, IncomingRequest::new(Method::DELETE, "/users/5")).await;
    assert_eq!(outcome.source(), Some(ResponseSource::NoContent));
    let response = outcome.into_response();
    assert_eq!(response.status, 204);
    assert!(response.body.is_empty());

    let outcome = dispatch(
        &dispatcher,
        IncomingRequest::new(
            Method::GET,
            "/reports/8d7a5c3e-1f2b-4c5d-9e8f-0a1b2c3d4e5f",
        ),
    )
    .await;
    assert_eq!(outcome.source(), Some(ResponseSource::NotImplemented));
    let response = outcome.into_response();
    assert_eq!(response.status, 501);
    assert_json_eq!(response.body_json().unwrap(), json!({"err": "not implemented"}));
}

#[tokio::test]
async fn test_resolution_is_idempotent() {
    let dispatcher = dispatcher();
    let first = dispatch(&dispatcher, IncomingRequest::new(Method::GET, "/users")).await;
    let second = dispatch(&dispatcher, IncomingRequest::new(Method::GET, "/users")).await;
    assert_eq!(first.into_response(), second.into_response());
}

#[test]
fn test_declared_examples_satisfy_their_schemas() {
    let dispatcher = dispatcher();
    let validator = dispatcher.validator();
    let mut checked = 0;

    for operation in &dispatcher.model().operations {
        let request_media = operation
            .request_body
            .iter()
            .flat_map(|body| body.content.iter())
            .map(|media| (media, true));
        let response_media = operation
            .responses
            .iter()
            .flat_map(|response| response.content.iter())
            .map(|media| (media, false));

        for (media, is_request) in request_media.chain(response_media) {
            let (Some(example), Some(schema)) = (&media.example, &media.schema) else {
                continue;
            };
            let violations = if is_request {
                validator.check_request_value(example, schema)
            } else {
                validator.check_value(example, schema)
            };
            assert!(
                violations.is_empty(),
                "{} example violates its schema: {:?}",
                operation.operation_id,
                violations
            );
            checked += 1;
        }
    }
    assert!(checked >= 6);
}

#[test]
fn test_request_example_passes_request_validation() {
    let dispatcher = dispatcher();
    let operation = dispatcher.model().operation("CreateUser").unwrap();
    let example = operation
        .request_body
        .as_ref()
        .and_then(|body| body.json_content())
        .and_then(|media| media.example.clone())
        .unwrap();

    let request = IncomingRequest::new(Method::POST, "/users").with_json(example);
    let outcome = dispatcher
        .validator()
        .validate(operation, &Default::default(), &request);
    assert!(outcome.is_valid(), "{:?}", outcome.violations());
}
