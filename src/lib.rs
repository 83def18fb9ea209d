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

//! Mock server driven by an OpenAPI 3.x description.
//!
//! Requests are matched to an operation, validated against its parameter and
//! body schemas, and answered by a registered handler or the operation's
//! declared example.

pub mod config;
pub mod dispatch;
pub mod server;
pub mod spec;
pub mod stubs;
pub mod telemetry;
pub mod utils;

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::spec::{SpecLoader, SpecSource};
use anyhow::Context;

/// Loads the configured API description and wires the configured stubs into a dispatcher.
pub async fn build_dispatcher(config: &Config) -> anyhow::Result<Dispatcher> {
    let source = SpecSource::parse(&config.spec.source);
    let model = SpecLoader::load(&source)
        .await
        .with_context(|| format!("Failed to load API description from '{}'", source))?;

    let dispatcher = Dispatcher::builder(model)
        .handlers(stubs::registry_from_stubs(&config.stubs))
        .unknown_fields(config.spec.unknown_fields)
        .build()
        .context("Failed to build dispatcher")?;

    tracing::info!(
        source = %source,
        operations = dispatcher.index().len(),
        stubs = config.stubs.len(),
        "API description loaded"
    );
    Ok(dispatcher)
}
