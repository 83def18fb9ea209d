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

use crate::config::TelemetryConfig;
use crate::telemetry::attributes;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use anyhow::Context;
use futures::future::LocalBoxFuture;
use std::future::ready;
use std::rc::Rc;
use std::task::{Context as TaskContext, Poll};
use tracing::{info, Instrument};
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

type BaseSubscriber = Layered<EnvFilter, Registry>;
type BoxedLayer = Box<dyn Layer<BaseSubscriber> + Send + Sync + 'static>;

#[cfg(feature = "otel")]
static PROVIDERS: once_cell::sync::OnceCell<(
    opentelemetry_sdk::trace::SdkTracerProvider,
    opentelemetry_sdk::logs::SdkLoggerProvider,
)> = once_cell::sync::OnceCell::new();

/// Adapts actix-web's `HeaderMap` to the `opentelemetry::propagation::Extractor`
/// trait so that W3C `traceparent`/`tracestate` headers can be extracted from
/// incoming requests.
#[cfg(feature = "otel")]
struct ActixHeaderExtractor<'a>(&'a actix_web::http::header::HeaderMap);

#[cfg(feature = "otel")]
impl opentelemetry::propagation::Extractor for ActixHeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

/// Installs the global subscriber: stdout logging always, OTLP span and log
/// export when telemetry is enabled.
pub async fn init_tracing(config: &TelemetryConfig) -> anyhow::Result<()> {
    if tracing::dispatcher::has_been_set() {
        info!("A tracing subscriber is already set, skipping initialization");
        return Ok(());
    }

    let filter = EnvFilter::try_new(&config.log_level)
        .with_context(|| format!("Invalid log level '{}'", config.log_level))?;

    let mut layers: Vec<BoxedLayer> = Vec::new();
    if config.log_format.eq_ignore_ascii_case("json") {
        layers.push(tracing_subscriber::fmt::layer().json().boxed());
    } else {
        layers.push(tracing_subscriber::fmt::layer().boxed());
    }

    #[cfg(feature = "otel")]
    {
        if config.enabled {
            layers.extend(otel_layers(config)?);
        }
    }

    // Losing a race against another initializer is harmless.
    let _ = Registry::default().with(filter).with(layers).try_init();

    if config.enabled && cfg!(feature = "otel") {
        info!(
            endpoint = %config.endpoint,
            protocol = %config.protocol,
            "OpenTelemetry tracing initialized"
        );
    } else {
        info!("Logging initialized without OTLP export");
    }
    Ok(())
}

#[cfg(feature = "otel")]
fn otel_layers(config: &TelemetryConfig) -> anyhow::Result<Vec<BoxedLayer>> {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_otlp::{LogExporter, SpanExporter, WithExportConfig};
    use opentelemetry_sdk::logs::{self, BatchLogProcessor, SdkLoggerProvider};
    use opentelemetry_sdk::trace::{self, BatchSpanProcessor, Sampler, SdkTracerProvider};
    use std::time::Duration;

    crate::telemetry::debug_log("Configuring OTLP span and log exporters", config);

    let timeout = Duration::from_secs(config.timeout_seconds);
    let use_http = config.protocol.eq_ignore_ascii_case("http");

    let span_exporter = if use_http {
        SpanExporter::builder()
            .with_http()
            .with_endpoint(crate::telemetry::signal_endpoint(&config.endpoint, "traces"))
            .with_timeout(timeout)
            .build()
    } else {
        SpanExporter::builder()
            .with_tonic()
            .with_endpoint(&config.endpoint)
            .with_timeout(timeout)
            .build()
    }
    .map_err(|e| anyhow::anyhow!("OpenTelemetry span exporter build failed: {}", e))?;

    let log_exporter = if use_http {
        LogExporter::builder()
            .with_http()
            .with_endpoint(crate::telemetry::signal_endpoint(&config.endpoint, "logs"))
            .with_timeout(timeout)
            .build()
    } else {
        LogExporter::builder()
            .with_tonic()
            .with_endpoint(&config.endpoint)
            .with_timeout(timeout)
            .build()
    }
    .map_err(|e| anyhow::anyhow!("OpenTelemetry log exporter build failed: {}", e))?;

    let resource = crate::telemetry::resource(config);

    let span_processor = BatchSpanProcessor::builder(span_exporter)
        .with_batch_config(
            trace::BatchConfigBuilder::default()
                .with_max_export_batch_size(config.export_batch_size)
                .build(),
        )
        .build();
    let log_processor = BatchLogProcessor::builder(log_exporter)
        .with_batch_config(
            logs::BatchConfigBuilder::default()
                .with_max_export_batch_size(config.export_batch_size)
                .build(),
        )
        .build();

    let tracer_provider = SdkTracerProvider::builder()
        .with_span_processor(span_processor)
        .with_resource(resource.clone())
        .with_sampler(Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(
            config.sampling_rate,
        ))))
        .build();
    opentelemetry::global::set_tracer_provider(tracer_provider.clone());

    let logger_provider = SdkLoggerProvider::builder()
        .with_log_processor(log_processor)
        .with_resource(resource)
        .build();

    opentelemetry::global::set_text_map_propagator(
        opentelemetry_sdk::propagation::TraceContextPropagator::new(),
    );

    let tracer = tracer_provider.tracer("specmock");
    let layers: Vec<BoxedLayer> = vec![
        tracing_opentelemetry::layer().with_tracer(tracer).boxed(),
        opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge::new(&logger_provider)
            .boxed(),
    ];

    let _ = PROVIDERS.set((tracer_provider, logger_provider));
    Ok(layers)
}

/// Flushes pending spans and log records.
pub(crate) fn shutdown() {
    #[cfg(feature = "otel")]
    {
        if let Some((tracer_provider, logger_provider)) = PROVIDERS.get() {
            if let Err(e) = tracer_provider.shutdown() {
                tracing::warn!(error = %e, "Tracer provider shutdown failed");
            }
            if let Err(e) = logger_provider.shutdown() {
                tracing::warn!(error = %e, "Logger provider shutdown failed");
            }
        }
    }
}

pub fn tracing_middleware() -> TracingMiddleware {
    TracingMiddleware
}

pub struct TracingMiddleware;

impl<S, B> Transform<S, ServiceRequest> for TracingMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Transform = TracingMiddlewareService<S>;
    type InitError = ();
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(TracingMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct TracingMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for TracingMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        // Handlers fill in the route, request id and dispatch fields.
        let span = tracing::info_span!(
            "http.request",
            http.method = %req.method(),
            http.target = %req.path(),
            http.route = tracing::field::Empty,
            http.response.status_code = tracing::field::Empty,
            request.id = tracing::field::Empty,
            operation.id = tracing::field::Empty,
            dispatch.outcome = tracing::field::Empty,
            span.kind = "server",
        );

        #[cfg(feature = "otel")]
        {
            use opentelemetry::propagation::TextMapPropagator;
            use opentelemetry_sdk::propagation::TraceContextPropagator;
            use tracing_opentelemetry::OpenTelemetrySpanExt;

            let parent_cx = TraceContextPropagator::new().extract(&ActixHeaderExtractor(req.headers()));
            let _ = span.set_parent(parent_cx);
        }

        let request_span = span.clone();
        Box::pin(
            async move {
                let response = service.call(req).await?;
                let status = response.status().as_u16();
                request_span.record(attributes::http::RESPONSE_STATUS_CODE, status);

                if status >= 500 {
                    tracing::error!("Server error");
                } else if status >= 400 {
                    tracing::warn!("Client error");
                } else if status >= 300 {
                    tracing::info!("Redirection");
                } else {
                    tracing::info!("Request successful");
                }

                Ok(response)
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test;
    use actix_web::web;
    use actix_web::App;
    use actix_web::HttpResponse;

    #[cfg(feature = "otel")]
    #[actix_web::test]
    async fn test_otel_layers_use_configured_batch_size() {
        let config = TelemetryConfig {
            enabled: true,
            timeout_seconds: 1,
            export_batch_size: 16,
            ..TelemetryConfig::default()
        };
        let layers = otel_layers(&config).unwrap();
        assert_eq!(layers.len(), 2);
    }

    #[actix_web::test]
    async fn test_tracing_middleware() {
        let app = test::init_service(App::new().wrap(tracing_middleware()).route(
            "/test",
            web::get().to(|| async { HttpResponse::Ok().finish() }),
        ))
        .await;

        let req = test::TestRequest::get().uri("/test").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
    }

    #[actix_web::test]
    async fn test_tracing_middleware_passes_error_statuses_through() {
        let app = test::init_service(
            App::new()
                .wrap(tracing_middleware())
                .route(
                    "/missing",
                    web::get().to(|| async { HttpResponse::NotFound().finish() }),
                )
                .route(
                    "/error",
                    web::get().to(|| async { HttpResponse::InternalServerError().finish() }),
                ),
        )
        .await;

        let req = test::TestRequest::get().uri("/missing").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 404);

        let req = test::TestRequest::get().uri("/error").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 500);
    }

    #[actix_web::test]
    async fn test_tracing_middleware_with_traceparent_header() {
        let app = test::init_service(App::new().wrap(tracing_middleware()).route(
            "/propagate",
            web::get().to(|| async { HttpResponse::Ok().finish() }),
        ))
        .await;

        // Valid W3C traceparent: version-traceId-parentId-flags
        let req = test::TestRequest::get()
            .uri("/propagate")
            .insert_header((
                "traceparent",
                "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01",
            ))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
    }
}
