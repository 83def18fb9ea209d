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

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use http::Method;
use serde_json::{json, Map, Value};
use specmock::dispatch::{OperationIndex, RequestMatcher};
use specmock::spec::SpecLoader;
use std::sync::Arc;

/// `resources` collections, each with list, item and a literal sub-route.
fn document(resources: usize) -> Value {
    let mut paths = Map::new();
    let ok = json!({"200": {"description": "ok"}});
    for i in 0..resources {
        paths.insert(
            format!("/r{}", i),
            json!({"get": {"operationId": format!("List{}", i), "responses": ok}}),
        );
        paths.insert(
            format!("/r{}/{{id}}", i),
            json!({"get": {"operationId": format!("Get{}", i), "responses": ok}}),
        );
        paths.insert(
            format!("/r{}/{{id}}/history", i),
            json!({"get": {"operationId": format!("History{}", i), "responses": ok}}),
        );
        paths.insert(
            format!("/r{}/latest", i),
            json!({"get": {"operationId": format!("Latest{}", i), "responses": ok}}),
        );
    }
    json!({
        "openapi": "3.0.3",
        "info": {"title": "bench", "version": "1"},
        "paths": paths
    })
}

fn bench_lookup(c: &mut Criterion) {
    let model = SpecLoader::from_value(document(250)).unwrap();
    let matcher = RequestMatcher::new(Arc::new(OperationIndex::build(model).unwrap()));

    c.bench_function("lookup_literal", |b| {
        b.iter(|| matcher.find_match(black_box(&Method::GET), black_box("/r125/latest")))
    });
    c.bench_function("lookup_placeholder", |b| {
        b.iter(|| matcher.find_match(black_box(&Method::GET), black_box("/r249/8812/history")))
    });
    c.bench_function("lookup_miss", |b| {
        b.iter(|| matcher.find_match(black_box(&Method::GET), black_box("/r9999/1")))
    });
}

criterion_group!(benches, bench_lookup);
criterion_main!(benches);
