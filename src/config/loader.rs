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

use crate::config::types::{Config, StubConfig, TelemetryConfig};
use anyhow::Context;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Overrides `spec.source` when set.
pub const SPEC_SOURCE_ENV: &str = "SPECMOCK_SPEC";

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        Self::from_str(&content)
    }

    pub fn from_str(content: &str) -> anyhow::Result<Config> {
        let config: Config =
            serde_yaml::from_str(content).with_context(|| "Failed to parse YAML configuration")?;

        Self::validate(&config)?;

        Ok(config)
    }

    /// Applies environment overrides on top of a loaded configuration.
    pub fn apply_env(config: Config) -> Config {
        Self::with_spec_source(config, std::env::var(SPEC_SOURCE_ENV).ok())
    }

    pub fn with_spec_source(mut config: Config, source: Option<String>) -> Config {
        if let Some(source) = source.filter(|s| !s.trim().is_empty()) {
            config.spec.source = source;
        }
        config
    }

    pub fn validate(config: &Config) -> anyhow::Result<()> {
        if config.server.port == 0 {
            anyhow::bail!("Server port cannot be 0");
        }

        if config.server.workers == 0 {
            anyhow::bail!("Number of workers cannot be 0");
        }

        if config.telemetry.sampling_rate < 0.0 || config.telemetry.sampling_rate > 1.0 {
            anyhow::bail!("Sampling rate must be between 0.0 and 1.0");
        }

        let log_format = config.telemetry.log_format.to_lowercase();
        if log_format != "json" && log_format != "text" {
            anyhow::bail!(
                "Log format must be 'json' or 'text', got '{}'",
                config.telemetry.log_format
            );
        }

        if config.telemetry.enabled {
            Self::validate_telemetry_config(&config.telemetry)?;
        }

        if config.spec.source.trim().is_empty() {
            anyhow::bail!("Spec source cannot be empty");
        }

        let mut seen = HashSet::new();
        for stub in &config.stubs {
            Self::validate_stub(stub)?;
            if !seen.insert(stub.operation_id.as_str()) {
                anyhow::bail!("Duplicate stub for operation '{}'", stub.operation_id);
            }
        }

        Ok(())
    }

    fn validate_telemetry_config(config: &TelemetryConfig) -> anyhow::Result<()> {
        if config.endpoint.is_empty() {
            anyhow::bail!("Telemetry endpoint cannot be empty");
        }

        match url::Url::parse(&config.endpoint) {
            Ok(url) => {
                let scheme = url.scheme();
                if scheme != "http" && scheme != "https" {
                    anyhow::bail!("Telemetry endpoint must use http:// or https:// scheme");
                }
                if url.host().is_none() {
                    anyhow::bail!("Telemetry endpoint must have a host");
                }
            }
            Err(_) => anyhow::bail!("Invalid telemetry endpoint URL format: {}", config.endpoint),
        }

        let protocol = config.protocol.to_lowercase();
        if protocol != "http" && protocol != "grpc" {
            anyhow::bail!(
                "Telemetry protocol must be 'http' or 'grpc', got '{}'",
                config.protocol
            );
        }

        if config.timeout_seconds == 0 {
            anyhow::bail!("Telemetry timeout must be greater than 0");
        }

        if config.export_batch_size == 0 {
            anyhow::bail!("Telemetry export batch size must be greater than 0");
        }

        Ok(())
    }

    fn validate_stub(stub: &StubConfig) -> anyhow::Result<()> {
        if stub.operation_id.trim().is_empty() {
            anyhow::bail!("Stub operation_id cannot be empty");
        }

        if stub.status < 100 || stub.status >= 600 {
            anyhow::bail!(
                "Invalid HTTP status code {} for stub '{}'",
                stub.status,
                stub.operation_id
            );
        }

        for name in stub.headers.keys() {
            if http::HeaderName::from_bytes(name.as_bytes()).is_err() {
                anyhow::bail!("Invalid header name '{}' for stub '{}'", name, stub.operation_id);
            }
        }

        Ok(())
    }
}
