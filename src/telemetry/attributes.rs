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

//! Attribute names shared by spans, log records and metrics.
//!
//! HTTP and service names follow the OpenTelemetry semantic conventions:
//! - https://opentelemetry.io/docs/specs/semconv/http/http-spans/
//! - https://opentelemetry.io/docs/specs/semconv/attributes-registry/

/// HTTP semantic conventions
pub mod http {
    /// HTTP request method
    pub const METHOD: &str = "http.method";

    /// Matched path template, never the raw request path
    pub const ROUTE: &str = "http.route";

    /// HTTP response status code
    pub const RESPONSE_STATUS_CODE: &str = "http.response.status_code";
}

/// Service semantic conventions
pub mod service {
    pub const NAME: &str = "service.name";

    pub const VERSION: &str = "service.version";
}

/// Error semantic conventions
pub mod error {
    /// Error type
    pub const TYPE: &str = "error.type";
}

/// Dispatch pipeline attributes
pub mod dispatch {
    /// `operationId` of the matched operation
    pub const OPERATION_ID: &str = "operation.id";

    /// One of `not_found`, `ambiguous_spec`, `validation_failed`, `resolved`
    pub const OUTCOME: &str = "dispatch.outcome";

    /// `handler`, `example`, `no_content` or `not_implemented`
    pub const RESPONSE_SOURCE: &str = "dispatch.response_source";
}

/// Helper functions for creating OpenTelemetry KeyValue pairs
#[cfg(feature = "otel")]
pub mod kv {
    use opentelemetry::KeyValue;

    use super::http;

    pub fn http_method(method: impl Into<String>) -> KeyValue {
        KeyValue::new(http::METHOD, method.into())
    }

    pub fn http_route(route: impl Into<String>) -> KeyValue {
        KeyValue::new(http::ROUTE, route.into())
    }

    pub fn http_response_status_code(status: u16) -> KeyValue {
        KeyValue::new(http::RESPONSE_STATUS_CODE, status as i64)
    }

    pub fn operation_id(operation_id: impl Into<String>) -> KeyValue {
        KeyValue::new(super::dispatch::OPERATION_ID, operation_id.into())
    }

    pub fn dispatch_outcome(outcome: impl Into<String>) -> KeyValue {
        KeyValue::new(super::dispatch::OUTCOME, outcome.into())
    }

    pub fn error_type(error_type: impl Into<String>) -> KeyValue {
        KeyValue::new(super::error::TYPE, error_type.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_constants() {
        assert_eq!(http::METHOD, "http.method");
        assert_eq!(http::ROUTE, "http.route");
        assert_eq!(http::RESPONSE_STATUS_CODE, "http.response.status_code");
        assert_ne!(http::RESPONSE_STATUS_CODE, "http.status_code");
    }

    #[test]
    fn test_dispatch_constants() {
        assert_eq!(dispatch::OPERATION_ID, "operation.id");
        assert_eq!(dispatch::OUTCOME, "dispatch.outcome");
        assert_eq!(dispatch::RESPONSE_SOURCE, "dispatch.response_source");
    }

    #[cfg(feature = "otel")]
    #[test]
    fn test_kv_http_response_status_code() {
        let kv = kv::http_response_status_code(404);
        assert_eq!(kv.key.as_str(), "http.response.status_code");
        assert_eq!(kv.value.to_string(), "404");
    }

    #[cfg(feature = "otel")]
    #[test]
    fn test_kv_dispatch() {
        let kv = kv::operation_id("GetUser");
        assert_eq!(kv.key.as_str(), "operation.id");
        assert_eq!(kv.value.to_string(), "GetUser");

        let kv = kv::dispatch_outcome("validation_failed");
        assert_eq!(kv.key.as_str(), "dispatch.outcome");
        assert_eq!(kv.value.to_string(), "validation_failed");
    }

    #[cfg(feature = "otel")]
    #[test]
    fn test_kv_with_different_input_types() {
        let kv1 = kv::http_method(String::from("POST"));
        let kv2 = kv::http_method("POST");
        assert_eq!(kv1.key.as_str(), kv2.key.as_str());
        assert_eq!(kv1.value.to_string(), kv2.value.to_string());
    }
}
