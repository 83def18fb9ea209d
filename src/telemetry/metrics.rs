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
#[cfg(feature = "otel")]
use crate::telemetry::attributes;
use std::time::Duration;
use tracing::info;

#[cfg(feature = "otel")]
static METER_PROVIDER: once_cell::sync::OnceCell<opentelemetry_sdk::metrics::SdkMeterProvider> =
    once_cell::sync::OnceCell::new();

#[cfg(feature = "otel")]
pub async fn init_metrics(config: &TelemetryConfig) -> anyhow::Result<()> {
    use opentelemetry_otlp::{MetricExporter, WithExportConfig};
    use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};

    if !config.enabled {
        info!("Metrics export is disabled");
        return Ok(());
    }

    crate::telemetry::debug_log("Configuring OTLP metric exporter", config);

    let timeout = Duration::from_secs(config.timeout_seconds);
    let exporter = if config.protocol.eq_ignore_ascii_case("http") {
        MetricExporter::builder()
            .with_http()
            .with_endpoint(crate::telemetry::signal_endpoint(&config.endpoint, "metrics"))
            .with_timeout(timeout)
            .build()
    } else {
        MetricExporter::builder()
            .with_tonic()
            .with_endpoint(&config.endpoint)
            .with_timeout(timeout)
            .build()
    }
    .map_err(|e| anyhow::anyhow!("OpenTelemetry metric exporter build failed: {}", e))?;

    let reader = PeriodicReader::builder(exporter)
        .with_interval(Duration::from_secs(10))
        .build();

    let meter_provider = SdkMeterProvider::builder()
        .with_reader(reader)
        .with_resource(crate::telemetry::resource(config))
        .build();

    opentelemetry::global::set_meter_provider(meter_provider.clone());
    let _ = METER_PROVIDER.set(meter_provider);

    info!(
        endpoint = %config.endpoint,
        protocol = %config.protocol,
        "OpenTelemetry metrics initialized"
    );
    Ok(())
}

#[cfg(not(feature = "otel"))]
pub async fn init_metrics(config: &TelemetryConfig) -> anyhow::Result<()> {
    if config.enabled {
        info!("Metrics requested but the otel feature is not compiled in");
    }
    Ok(())
}

/// Counts one dispatched request and records its latency.
///
/// `operation_id` is `None` for requests that matched no single operation.
#[cfg(feature = "otel")]
pub fn record_dispatch(
    method: &str,
    outcome: &str,
    operation_id: Option<&str>,
    status: u16,
    latency: Duration,
) {
    let meter = opentelemetry::global::meter("specmock");
    let counter = meter
        .u64_counter("specmock_dispatch_count_total")
        .with_description("Total number of dispatched requests")
        .build();
    let histogram = meter
        .f64_histogram("specmock_dispatch_duration")
        .with_description("Request dispatch duration in seconds")
        .with_unit("s")
        .build();

    let attributes = vec![
        attributes::kv::http_method(method),
        attributes::kv::operation_id(operation_id.unwrap_or("none")),
        attributes::kv::dispatch_outcome(outcome),
        attributes::kv::http_response_status_code(status),
    ];

    if crate::telemetry::is_debug_enabled() {
        tracing::debug!(
            ?attributes,
            latency_ms = latency.as_millis() as u64,
            "[TELEMETRY DEBUG] Recording dispatch metrics"
        );
    }

    counter.add(1, &attributes);
    histogram.record(latency.as_secs_f64(), &attributes[..3]);
}

#[cfg(not(feature = "otel"))]
pub fn record_dispatch(
    method: &str,
    outcome: &str,
    operation_id: Option<&str>,
    status: u16,
    latency: Duration,
) {
    tracing::debug!(
        method = %method,
        outcome = %outcome,
        operation_id = operation_id.unwrap_or("none"),
        status = status,
        latency_ms = latency.as_millis() as u64,
        "Dispatch metric"
    );
}

/// Counts a request whose custom handler failed.
#[cfg(feature = "otel")]
pub fn record_handler_error(method: &str, operation_id: Option<&str>) {
    let meter = opentelemetry::global::meter("specmock");
    let counter = meter
        .u64_counter("specmock_handler_error_count_total")
        .with_description("Total number of failed custom handlers")
        .build();

    counter.add(
        1,
        &[
            attributes::kv::http_method(method),
            attributes::kv::operation_id(operation_id.unwrap_or("none")),
            attributes::kv::error_type("handler_error"),
        ],
    );
}

#[cfg(not(feature = "otel"))]
pub fn record_handler_error(method: &str, operation_id: Option<&str>) {
    tracing::debug!(
        method = %method,
        operation_id = operation_id.unwrap_or("none"),
        "Handler error metric"
    );
}

/// Flushes the last metric batch.
pub(crate) fn shutdown() {
    #[cfg(feature = "otel")]
    {
        if let Some(provider) = METER_PROVIDER.get() {
            if let Err(e) = provider.shutdown() {
                tracing::warn!(error = %e, "Meter provider shutdown failed");
            }
        }
    }
}
