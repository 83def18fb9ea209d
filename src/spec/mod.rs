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

//! Loading an OpenAPI 3.x description into an immutable, fully resolved model.

pub mod error;
pub mod loader;
pub mod model;
pub mod refs;
pub mod schema;
pub mod template;

pub use error::SpecLoadError;
pub use loader::{SpecLoader, SpecSource};
pub use model::{
    MediaTypeSpec, OperationDescriptor, ParamLocation, ParameterSpec, RequestBodySpec,
    ResponseSpec, SpecificationModel, StatusKey,
};
pub use schema::{AdditionalProperties, Schema, SchemaType};
pub use template::{normalize_path, PathTemplate, Segment};
