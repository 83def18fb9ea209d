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

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::server::handlers::{health_handler, operations_handler, request_handler, spec_handler};
use crate::server::openapi::ApiDoc;
use crate::telemetry::tracer::tracing_middleware;
use actix_web::dev::Server;
use actix_web::web;
use actix_web::App;
use actix_web::HttpServer;
use arc_swap::ArcSwap;
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Paths under this prefix never reach the dispatcher.
pub const ADMIN_PREFIX: &str = "/__specmock";

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Swapped wholesale on hot reload.
    pub dispatcher: Arc<ArcSwap<Dispatcher>>,
}

impl AppState {
    pub fn new(config: Config, dispatcher: Arc<ArcSwap<Dispatcher>>) -> Self {
        Self { config, dispatcher }
    }
}

/// Registers the admin endpoints and the Swagger UI for them.
pub fn configure_admin(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new(format!("{}/swagger-ui/{{_:.*}}", ADMIN_PREFIX))
            .url(format!("{}/api-docs/openapi.json", ADMIN_PREFIX), ApiDoc::openapi()),
    )
    .route(
        &format!("{}/health", ADMIN_PREFIX),
        web::get().to(health_handler),
    )
    .route(
        &format!("{}/operations", ADMIN_PREFIX),
        web::get().to(operations_handler),
    )
    .route(
        &format!("{}/spec.json", ADMIN_PREFIX),
        web::get().to(spec_handler),
    );
}

pub async fn run_server(
    config: Config,
    dispatcher: Arc<ArcSwap<Dispatcher>>,
) -> anyhow::Result<Server> {
    let server_config = config.server.clone();
    let addr = format!("{}:{}", server_config.host, server_config.port);

    info!("Starting server on {}", addr);
    info!("Server workers: {}", server_config.workers);
    info!("Max request size: {} bytes", server_config.max_request_size);
    info!(
        operations = dispatcher.load().index().len(),
        "Serving API '{}'",
        dispatcher.load().model().title
    );

    let app_state = web::Data::new(AppState::new(config, dispatcher));
    let max_request_size = server_config.max_request_size;

    let server = HttpServer::new(move || {
        App::new()
            .wrap(tracing_middleware())
            .app_data(app_state.clone())
            .app_data(web::PayloadConfig::new(max_request_size))
            .configure(configure_admin)
            .default_service(web::to(request_handler))
    })
    .workers(server_config.workers)
    .bind(addr)?
    .run();

    Ok(server)
}
