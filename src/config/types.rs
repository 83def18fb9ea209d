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

use crate::dispatch::UnknownFieldPolicy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub spec: SpecConfig,
    #[serde(default)]
    pub stubs: Vec<StubConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_max_request_size")]
    pub max_request_size: usize,
}

fn default_port() -> u16 {
    8080
}

fn default_workers() -> usize {
    4
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_max_request_size() -> usize {
    10 * 1024 * 1024 // 10MB
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Turns on OTLP export; logging to stdout is always on.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_service_version")]
    pub service_version: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default = "default_sampling_rate")]
    pub sampling_rate: f64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Largest batch handed to the span and log exporters.
    #[serde(default = "default_export_batch_size")]
    pub export_batch_size: usize,
}

fn default_service_name() -> String {
    "specmock".to_string()
}

fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_protocol() -> String {
    "grpc".to_string()
}

fn default_sampling_rate() -> f64 {
    1.0
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_export_batch_size() -> usize {
    512
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecConfig {
    /// File path or http(s) URL of the OpenAPI document.
    #[serde(default = "default_spec_source")]
    pub source: String,
    #[serde(default)]
    pub unknown_fields: UnknownFieldPolicy,
}

fn default_spec_source() -> String {
    "config/openapi.yaml".to_string()
}

/// A canned handler for one operation, overriding the example-based mock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StubConfig {
    pub operation_id: String,
    #[serde(default = "default_stub_status")]
    pub status: u16,
    /// Strings are templates; other values are sent as JSON with templates
    /// rendered inside their string leaves.
    #[serde(default)]
    pub body: Option<Value>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub delay: Option<Delay>,
}

fn default_stub_status() -> u16 {
    200
}

/// `"100ms"`, `"2s"` or a range such as `"100ms-500ms"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Delay {
    Fixed(Duration),
    Range(Duration, Duration),
}

impl Delay {
    pub fn parse(value: &str) -> anyhow::Result<Self> {
        match value.split_once('-') {
            None => Ok(Delay::Fixed(parse_duration_str(value)?)),
            Some((min, max)) => {
                let min = parse_duration_str(min)?;
                let max = parse_duration_str(max)?;
                if min > max {
                    anyhow::bail!("Min delay cannot be greater than max delay");
                }
                Ok(Delay::Range(min, max))
            }
        }
    }

    pub fn bounds(&self) -> (Duration, Duration) {
        match *self {
            Delay::Fixed(duration) => (duration, duration),
            Delay::Range(min, max) => (min, max),
        }
    }
}

impl TryFrom<String> for Delay {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Delay::parse(&value)
    }
}

impl From<Delay> for String {
    fn from(delay: Delay) -> Self {
        delay.to_string()
    }
}

impl fmt::Display for Delay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delay::Fixed(duration) => write!(f, "{}ms", duration.as_millis()),
            Delay::Range(min, max) => write!(f, "{}ms-{}ms", min.as_millis(), max.as_millis()),
        }
    }
}

fn parse_duration_str(duration_str: &str) -> anyhow::Result<Duration> {
    let duration_str = duration_str.trim();
    if let Some(ms) = duration_str.strip_suffix("ms") {
        let ms = ms
            .parse::<u64>()
            .map_err(|e| anyhow::anyhow!("Invalid milliseconds: {}", e))?;
        Ok(Duration::from_millis(ms))
    } else if let Some(secs) = duration_str.strip_suffix('s') {
        let secs = secs
            .parse::<u64>()
            .map_err(|e| anyhow::anyhow!("Invalid seconds: {}", e))?;
        Ok(Duration::from_secs(secs))
    } else {
        anyhow::bail!("Invalid duration format: {}", duration_str);
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            workers: default_workers(),
            host: default_host(),
            max_request_size: default_max_request_size(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            service_name: default_service_name(),
            service_version: default_service_version(),
            endpoint: default_endpoint(),
            protocol: default_protocol(),
            sampling_rate: default_sampling_rate(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            timeout_seconds: default_timeout_seconds(),
            export_batch_size: default_export_batch_size(),
        }
    }
}

impl Default for SpecConfig {
    fn default() -> Self {
        Self {
            source: default_spec_source(),
            unknown_fields: UnknownFieldPolicy::default(),
        }
    }
}
