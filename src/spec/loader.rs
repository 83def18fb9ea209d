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

use crate::spec::error::SpecLoadError;
use crate::spec::model::{
    MediaTypeSpec, OperationDescriptor, ParamLocation, ParameterSpec, RequestBodySpec,
    ResponseSpec, SpecificationModel, StatusKey,
};
use crate::spec::refs::{escape_pointer_segment, Resolver};
use crate::spec::schema::{Schema, SchemaCompiler, SchemaType};
use crate::spec::template::PathTemplate;
use http::Method;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

const METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Where the API description comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecSource {
    File(PathBuf),
    Url(Url),
    Inline(String),
}

impl SpecSource {
    /// `http(s)://` identifiers are URLs, anything else a file path.
    pub fn parse(identifier: &str) -> Self {
        match Url::parse(identifier) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Self::Url(url),
            _ => Self::File(PathBuf::from(identifier)),
        }
    }

    pub fn file_path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path),
            _ => None,
        }
    }
}

impl fmt::Display for SpecSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Url(url) => write!(f, "{}", url),
            Self::Inline(_) => f.write_str("<inline document>"),
        }
    }
}

pub struct SpecLoader;

impl SpecLoader {
    pub async fn load(source: &SpecSource) -> Result<SpecificationModel, SpecLoadError> {
        info!(source = %source, "Loading API specification");
        let model = match source {
            SpecSource::File(path) => {
                let content = tokio::fs::read_to_string(path).await.map_err(|e| {
                    SpecLoadError::Unreadable {
                        source_id: path.display().to_string(),
                        reason: e.to_string(),
                    }
                })?;
                Self::from_str(&content)?
            }
            SpecSource::Url(url) => Self::from_url(url).await?,
            SpecSource::Inline(content) => Self::from_str(content)?,
        };
        info!(
            title = %model.title,
            version = %model.version,
            operations = model.operations.len(),
            "API specification loaded"
        );
        Ok(model)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<SpecificationModel, SpecLoadError> {
        let content = fs::read_to_string(&path).map_err(|e| SpecLoadError::Unreadable {
            source_id: path.as_ref().display().to_string(),
            reason: e.to_string(),
        })?;

        Self::from_str(&content)
    }

    pub async fn from_url(url: &Url) -> Result<SpecificationModel, SpecLoadError> {
        let unreadable = |reason: String| SpecLoadError::Unreadable {
            source_id: url.to_string(),
            reason,
        };

        let response = reqwest::get(url.clone())
            .await
            .map_err(|e| unreadable(e.to_string()))?
            .error_for_status()
            .map_err(|e| unreadable(e.to_string()))?;
        let content = response.text().await.map_err(|e| unreadable(e.to_string()))?;

        Self::from_str(&content)
    }

    /// Parses a YAML or JSON document.
    pub fn from_str(content: &str) -> Result<SpecificationModel, SpecLoadError> {
        let yaml: serde_yaml::Value = serde_yaml::from_str(content)
            .map_err(|e| SpecLoadError::malformed("#", format!("not valid YAML or JSON: {}", e)))?;
        let document = serde_json::to_value(yaml)
            .map_err(|e| SpecLoadError::malformed("#", format!("unsupported document content: {}", e)))?;

        Self::from_value(document)
    }

    pub fn from_value(document: Value) -> Result<SpecificationModel, SpecLoadError> {
        let version = document
            .get("openapi")
            .and_then(Value::as_str)
            .ok_or_else(|| SpecLoadError::malformed("#/openapi", "missing 'openapi' version field"))?;
        if !version.starts_with("3.") {
            return Err(SpecLoadError::malformed(
                "#/openapi",
                format!("unsupported OpenAPI version '{}'", version),
            ));
        }

        let info = document.get("info");
        let title = info
            .and_then(|i| i.get("title"))
            .and_then(Value::as_str)
            .unwrap_or("untitled")
            .to_string();
        let api_version = info
            .and_then(|i| i.get("version"))
            .and_then(Value::as_str)
            .unwrap_or("0.0.0")
            .to_string();

        let resolver = Resolver::new(&document);
        let builder = ModelBuilder::new(&resolver);
        let components = builder.compile_components()?;
        let operations = builder.collect_operations()?;

        Ok(SpecificationModel {
            title,
            version: api_version,
            operations,
            components,
            document: document.clone(),
        })
    }
}

struct ModelBuilder<'r, 'a> {
    resolver: &'r Resolver<'a>,
}

impl<'r, 'a> ModelBuilder<'r, 'a> {
    fn new(resolver: &'r Resolver<'a>) -> Self {
        Self { resolver }
    }

    fn compiler(&self) -> SchemaCompiler<'r, 'a> {
        SchemaCompiler::new(self.resolver)
    }

    /// Compiles every reusable schema, so a broken but unused fragment still fails the load.
    fn compile_components(&self) -> Result<Vec<(String, Schema)>, SpecLoadError> {
        let Some(schemas) = self
            .resolver
            .root()
            .pointer("/components/schemas")
        else {
            return Ok(Vec::new());
        };
        let schemas = as_object(schemas, "#/components/schemas")?;

        let mut compiled = Vec::new();
        for (name, schema) in schemas {
            let location = format!("#/components/schemas/{}", escape_pointer_segment(name));
            compiled.push((name.clone(), self.compiler().compile(schema, &location)?));
        }
        Ok(compiled)
    }

    fn collect_operations(&self) -> Result<Vec<Arc<OperationDescriptor>>, SpecLoadError> {
        let Some(paths) = self.resolver.root().get("paths") else {
            return Ok(Vec::new());
        };
        let paths = as_object(paths, "#/paths")?;

        let mut collected = Vec::new();
        let mut by_id: HashMap<String, String> = HashMap::new();
        let mut by_shape: HashMap<String, String> = HashMap::new();

        for (raw_path, item) in paths {
            let item_location = format!("#/paths/{}", escape_pointer_segment(raw_path));
            let template = PathTemplate::parse(raw_path)
                .map_err(|reason| SpecLoadError::malformed(&item_location, reason))?;
            let item = self.resolver.deref(item, &item_location)?;
            let item = as_object(item, &item_location)?;

            let shared = match item.get("parameters") {
                Some(params) => self.parameters(params, &format!("{}/parameters", item_location))?,
                None => Vec::new(),
            };

            for (key, operation) in item {
                let key_lower = key.to_ascii_lowercase();
                if !METHODS.contains(&key_lower.as_str()) {
                    continue;
                }
                let location = format!("{}/{}", item_location, key);
                let descriptor =
                    self.operation(&key_lower, &template, operation, &shared, &location)?;
                let generated = !has_explicit_id(operation);

                let shape = format!("{} {}", descriptor.method, template.shape_key());
                let label = format!("{} {}", descriptor.method, template);
                if let Some(first) = by_shape.insert(shape.clone(), label.clone()) {
                    return Err(SpecLoadError::DuplicateOperation {
                        key: shape,
                        first,
                        second: label,
                    });
                }
                if !generated {
                    if let Some(first) = by_id.insert(descriptor.operation_id.clone(), label.clone()) {
                        return Err(SpecLoadError::DuplicateOperation {
                            key: format!("operationId {}", descriptor.operation_id),
                            first,
                            second: label,
                        });
                    }
                }
                collected.push((descriptor, label, generated));
            }
        }

        // Generated ids yield to declared ones and take a numeric suffix on collision.
        let mut operations = Vec::with_capacity(collected.len());
        for (mut descriptor, label, generated) in collected {
            if generated {
                let base = descriptor.operation_id.clone();
                let mut suffix = 2;
                while by_id.contains_key(&descriptor.operation_id) {
                    descriptor.operation_id = format!("{}_{}", base, suffix);
                    suffix += 1;
                }
                by_id.insert(descriptor.operation_id.clone(), label);
            }

            debug!(
                operation_id = %descriptor.operation_id,
                method = %descriptor.method,
                path = %descriptor.path,
                "Registered operation"
            );
            operations.push(Arc::new(descriptor));
        }

        Ok(operations)
    }

    fn operation(
        &self,
        method_name: &str,
        template: &PathTemplate,
        value: &'a Value,
        shared: &[ParameterSpec],
        location: &str,
    ) -> Result<OperationDescriptor, SpecLoadError> {
        let method = Method::from_bytes(method_name.to_ascii_uppercase().as_bytes())
            .map_err(|e| SpecLoadError::malformed(location, e.to_string()))?;
        let object = as_object(value, location)?;

        let operation_id = match object.get("operationId") {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(Value::String(_)) | None => generated_operation_id(method_name, template),
            Some(_) => {
                return Err(SpecLoadError::malformed(
                    location,
                    "'operationId' must be a string",
                ))
            }
        };

        let own = match object.get("parameters") {
            Some(params) => self.parameters(params, &format!("{}/parameters", location))?,
            None => Vec::new(),
        };
        let parameters = merge_parameters(shared, own, template, location)?;

        let request_body = match object.get("requestBody") {
            Some(body) => Some(self.request_body(body, &format!("{}/requestBody", location))?),
            None => None,
        };

        let responses = match object.get("responses") {
            Some(responses) => self.responses(responses, &format!("{}/responses", location))?,
            None => Vec::new(),
        };

        Ok(OperationDescriptor {
            operation_id,
            method,
            path: template.clone(),
            summary: object
                .get("summary")
                .and_then(Value::as_str)
                .map(str::to_string),
            parameters,
            request_body,
            responses,
        })
    }

    fn parameters(&self, value: &'a Value, location: &str) -> Result<Vec<ParameterSpec>, SpecLoadError> {
        let list = value
            .as_array()
            .ok_or_else(|| SpecLoadError::malformed(location, "'parameters' must be an array"))?;

        list.iter()
            .enumerate()
            .map(|(i, param)| self.parameter(param, &format!("{}/{}", location, i)))
            .collect()
    }

    fn parameter(&self, value: &'a Value, location: &str) -> Result<ParameterSpec, SpecLoadError> {
        let param = self.resolver.deref(value, location)?;
        let name = param
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| SpecLoadError::malformed(location, "parameter without a 'name'"))?;
        let location_name = param
            .get("in")
            .and_then(Value::as_str)
            .ok_or_else(|| SpecLoadError::malformed(location, "parameter without 'in'"))?;
        let param_location = ParamLocation::parse(location_name).ok_or_else(|| {
            SpecLoadError::malformed(location, format!("unknown parameter location '{}'", location_name))
        })?;

        let schema = match (param.get("schema"), param.get("content")) {
            (Some(schema), _) => self.compiler().compile(schema, &format!("{}/schema", location))?,
            (None, Some(content)) => {
                let content = as_object(content, location)?;
                match content.values().next().and_then(|media| media.get("schema")) {
                    Some(schema) => self.compiler().compile(schema, &format!("{}/content", location))?,
                    None => Schema::any(),
                }
            }
            (None, None) => Schema::any(),
        };

        let required = param_location == ParamLocation::Path
            || param.get("required").and_then(Value::as_bool).unwrap_or(false);
        let style_is_form = param
            .get("style")
            .and_then(Value::as_str)
            .map_or(param_location == ParamLocation::Query, |s| s == "form");
        let explode = param
            .get("explode")
            .and_then(Value::as_bool)
            .unwrap_or(style_is_form);

        Ok(ParameterSpec {
            name: name.to_string(),
            location: param_location,
            required,
            schema,
            explode,
            example: param.get("example").cloned(),
        })
    }

    fn request_body(&self, value: &'a Value, location: &str) -> Result<RequestBodySpec, SpecLoadError> {
        let body = self.resolver.deref(value, location)?;
        let content = match body.get("content") {
            Some(content) => self.content(content, &format!("{}/content", location))?,
            None => Vec::new(),
        };

        Ok(RequestBodySpec {
            required: body.get("required").and_then(Value::as_bool).unwrap_or(false),
            content,
        })
    }

    fn responses(&self, value: &'a Value, location: &str) -> Result<Vec<ResponseSpec>, SpecLoadError> {
        let responses = as_object(value, location)?;
        let mut specs = Vec::new();

        for (key, response) in responses {
            // Specification extensions may sit next to status codes.
            if key.starts_with("x-") {
                continue;
            }
            let response_location = format!("{}/{}", location, key);
            let status = StatusKey::parse(key).ok_or_else(|| {
                SpecLoadError::malformed(&response_location, format!("invalid status code '{}'", key))
            })?;
            let response = self.resolver.deref(response, &response_location)?;

            let content = match response.get("content") {
                Some(content) => self.content(content, &format!("{}/content", response_location))?,
                None => Vec::new(),
            };
            let headers = match response.get("headers") {
                Some(headers) => self.header_examples(headers, &format!("{}/headers", response_location))?,
                None => Vec::new(),
            };

            specs.push(ResponseSpec {
                status,
                description: response
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                content,
                headers,
            });
        }

        Ok(specs)
    }

    fn content(&self, value: &'a Value, location: &str) -> Result<Vec<MediaTypeSpec>, SpecLoadError> {
        let content = as_object(value, location)?;
        let mut media_types = Vec::new();

        for (media_type, media) in content {
            let media_location = format!("{}/{}", location, escape_pointer_segment(media_type));
            let schema = match media.get("schema") {
                Some(schema) => Some(
                    self.compiler()
                        .compile(schema, &format!("{}/schema", media_location))?,
                ),
                None => None,
            };

            let example = match media.get("example") {
                Some(example) => Some(example.clone()),
                None => self.first_example(media.get("examples"), &media_location)?,
            }
            .or_else(|| schema.as_ref().and_then(|s| s.example.clone()));

            media_types.push(MediaTypeSpec {
                media_type: media_type.clone(),
                schema,
                example,
            });
        }

        Ok(media_types)
    }

    /// The value of the first entry of an `examples` map; `externalValue` entries are skipped.
    fn first_example(&self, examples: Option<&'a Value>, location: &str) -> Result<Option<Value>, SpecLoadError> {
        let Some(examples) = examples else {
            return Ok(None);
        };
        let examples = as_object(examples, &format!("{}/examples", location))?;

        for (name, example) in examples {
            let example_location = format!("{}/examples/{}", location, name);
            let example = self.resolver.deref(example, &example_location)?;
            if let Some(value) = example.get("value") {
                return Ok(Some(value.clone()));
            }
        }
        Ok(None)
    }

    fn header_examples(&self, value: &'a Value, location: &str) -> Result<Vec<(String, Value)>, SpecLoadError> {
        let headers = as_object(value, location)?;
        let mut examples = Vec::new();

        for (name, header) in headers {
            let header_location = format!("{}/{}", location, name);
            let header = self.resolver.deref(header, &header_location)?;
            let example = match header.get("example") {
                Some(example) => Some(example.clone()),
                None => match header.get("schema") {
                    Some(schema) => self
                        .compiler()
                        .compile(schema, &format!("{}/schema", header_location))?
                        .example,
                    None => None,
                },
            };
            if let Some(example) = example {
                examples.push((name.clone(), example));
            }
        }
        Ok(examples)
    }
}

fn as_object<'v>(value: &'v Value, location: &str) -> Result<&'v Map<String, Value>, SpecLoadError> {
    value
        .as_object()
        .ok_or_else(|| SpecLoadError::malformed(location, "expected an object"))
}

/// Operation-level parameters override path-level ones with the same name and location.
/// Template placeholders nobody declared become required string parameters.
fn merge_parameters(
    shared: &[ParameterSpec],
    own: Vec<ParameterSpec>,
    template: &PathTemplate,
    location: &str,
) -> Result<Vec<ParameterSpec>, SpecLoadError> {
    let mut merged: Vec<ParameterSpec> = shared
        .iter()
        .filter(|s| {
            !own.iter()
                .any(|o| o.name == s.name && o.location == s.location)
        })
        .cloned()
        .collect();

    for param in own {
        if merged
            .iter()
            .any(|m| m.name == param.name && m.location == param.location)
        {
            return Err(SpecLoadError::malformed(
                location,
                format!("parameter '{}' in {} declared twice", param.name, param.location),
            ));
        }
        merged.push(param);
    }

    let placeholders = template.param_names();
    for param in merged.iter().filter(|p| p.location == ParamLocation::Path) {
        if !placeholders.contains(&param.name.as_str()) {
            return Err(SpecLoadError::malformed(
                location,
                format!("path parameter '{}' does not appear in '{}'", param.name, template),
            ));
        }
    }

    for name in placeholders {
        let declared = merged
            .iter()
            .any(|p| p.location == ParamLocation::Path && p.name == name);
        if !declared {
            merged.push(ParameterSpec {
                name: name.to_string(),
                location: ParamLocation::Path,
                required: true,
                schema: Schema::of_type(SchemaType::String),
                explode: false,
                example: None,
            });
        }
    }

    Ok(merged)
}

fn has_explicit_id(operation: &Value) -> bool {
    matches!(operation.get("operationId"), Some(Value::String(id)) if !id.is_empty())
}

fn generated_operation_id(method: &str, template: &PathTemplate) -> String {
    let mut id = method.to_string();
    let path: String = template
        .as_str()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let parts: Vec<&str> = path.split('_').filter(|p| !p.is_empty()).collect();
    if parts.is_empty() {
        id.push_str("_root");
    } else {
        for part in parts {
            id.push('_');
            id.push_str(part);
        }
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    const USERS_API: &str = r#"
openapi: 3.0.3
info:
  title: Users
  version: 1.2.0
paths:
  /users:
    post:
      operationId: CreateUser
      requestBody:
        required: true
        content:
          application/json:
            schema:
              $ref: '#/components/schemas/NewUser'
      responses:
        '201':
          description: created
          content:
            application/json:
              examples:
                alice:
                  $ref: '#/components/examples/Alice'
  /users/{id}:
    parameters:
      - $ref: '#/components/parameters/UserId'
    get:
      operationId: GetUser
      parameters:
        - name: verbose
          in: query
          schema:
            type: boolean
      responses:
        '200':
          description: ok
          headers:
            X-Rate-Limit:
              schema:
                type: integer
                example: 100
  /users/{id}/avatar:
    get:
      responses:
        '200':
          description: ok
components:
  parameters:
    UserId:
      name: id
      in: path
      required: true
      schema:
        type: integer
  examples:
    Alice:
      value:
        id: 1
        email: alice@example.com
  schemas:
    NewUser:
      type: object
      required: [email]
      properties:
        email:
          type: string
          format: email
"#;

    #[test]
    fn test_load_users_api() {
        let model = SpecLoader::from_str(USERS_API).unwrap();
        assert_eq!(model.title, "Users");
        assert_eq!(model.version, "1.2.0");
        assert_eq!(model.operations.len(), 3);
        assert_eq!(model.components.len(), 1);

        let create = model.operation("CreateUser").unwrap();
        assert_eq!(create.method, Method::POST);
        let body = create.request_body.as_ref().unwrap();
        assert!(body.required);
        let json = body.json_content().unwrap();
        assert_eq!(json.schema.as_ref().unwrap().required, vec!["email".to_string()]);

        let created = create.mock_response().unwrap();
        assert_eq!(created.status, StatusKey::Code(201));
        assert_eq!(
            created.content[0].example,
            Some(serde_json::json!({"id": 1, "email": "alice@example.com"}))
        );
    }

    #[test]
    fn test_path_level_parameters_are_merged() {
        let model = SpecLoader::from_str(USERS_API).unwrap();
        let get = model.operation("GetUser").unwrap();
        let names: Vec<&str> = get.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["id", "verbose"]);
        assert_eq!(get.parameters[0].schema.types, vec![SchemaType::Integer]);
        assert!(get.parameters[0].required);
        assert!(get.parameters[1].explode);

        let ok = get.mock_response().unwrap();
        assert_eq!(ok.headers, vec![("X-Rate-Limit".to_string(), serde_json::json!(100))]);
    }

    #[test]
    fn test_generated_operation_id_and_implicit_params() {
        let model = SpecLoader::from_str(USERS_API).unwrap();
        let avatar = model.operation("get_users_id_avatar").unwrap();
        assert_eq!(avatar.parameters.len(), 1);
        assert_eq!(avatar.parameters[0].name, "id");
        assert_eq!(avatar.parameters[0].schema.types, vec![SchemaType::String]);
    }

    #[test]
    fn test_colliding_generated_ids_are_suffixed() {
        let doc = r#"
openapi: 3.0.3
info: {title: Ids, version: "1"}
paths:
  /users_id:
    get:
      responses: {"200": {description: ok}}
  /users/{id}:
    get:
      responses: {"200": {description: ok}}
  /items:
    get:
      operationId: get_items
      responses: {"200": {description: ok}}
  /items/:
    post:
      responses: {"200": {description: ok}}
"#;
        let model = SpecLoader::from_str(doc).unwrap();
        let ids: Vec<&str> = model.operations.iter().map(|op| op.operation_id.as_str()).collect();
        assert_eq!(ids, vec!["get_users_id", "get_users_id_2", "get_items", "post_items"]);
    }

    #[test]
    fn test_declared_id_keeps_its_name_over_generated_one() {
        let doc = r#"
openapi: 3.0.3
info: {title: Ids, version: "1"}
paths:
  /users/{id}:
    get:
      responses: {"200": {description: ok}}
  /people/{id}:
    get:
      operationId: get_users_id
      responses: {"200": {description: ok}}
"#;
        let model = SpecLoader::from_str(doc).unwrap();
        assert_eq!(model.operations[0].operation_id, "get_users_id_2");
        assert_eq!(model.operation("get_users_id").unwrap().path.as_str(), "/people/{id}");
    }

    #[test]
    fn test_generated_operation_id_for_root() {
        let template = PathTemplate::parse("/").unwrap();
        assert_eq!(generated_operation_id("get", &template), "get_root");
    }

    #[test]
    fn test_json_document() {
        let doc = r#"{"openapi": "3.1.0", "info": {"title": "J", "version": "1"},
            "paths": {"/ping": {"get": {"operationId": "Ping", "responses": {"204": {"description": "none"}}}}}}"#;
        let model = SpecLoader::from_str(doc).unwrap();
        assert_eq!(model.operations[0].operation_id, "Ping");
    }

    #[test]
    fn test_rejects_swagger_2() {
        let result = SpecLoader::from_str("swagger: '2.0'\npaths: {}\n");
        assert!(matches!(result, Err(SpecLoadError::Malformed { .. })));
    }

    #[test]
    fn test_rejects_garbage() {
        let result = SpecLoader::from_str("openapi: [3");
        assert!(matches!(result, Err(SpecLoadError::Malformed { .. })));
    }

    #[test]
    fn test_unresolved_reference() {
        let doc = r#"
openapi: 3.0.0
info: {title: t, version: '1'}
paths:
  /a:
    get:
      responses:
        '200':
          $ref: '#/components/responses/Missing'
"#;
        let result = SpecLoader::from_str(doc);
        assert!(matches!(
            result,
            Err(SpecLoadError::UnresolvedReference { .. })
        ));
    }

    #[test]
    fn test_duplicate_operation_shape() {
        let doc = r#"
openapi: 3.0.0
info: {title: t, version: '1'}
paths:
  /users/{id}:
    get:
      responses: {}
  /users/{uid}:
    get:
      responses: {}
"#;
        let result = SpecLoader::from_str(doc);
        assert!(matches!(
            result,
            Err(SpecLoadError::DuplicateOperation { .. })
        ));
    }

    #[test]
    fn test_duplicate_operation_id() {
        let doc = r#"
openapi: 3.0.0
info: {title: t, version: '1'}
paths:
  /a:
    get:
      operationId: Same
      responses: {}
  /b:
    get:
      operationId: Same
      responses: {}
"#;
        let result = SpecLoader::from_str(doc);
        assert!(matches!(
            result,
            Err(SpecLoadError::DuplicateOperation { .. })
        ));
    }

    #[test]
    fn test_undeclared_path_parameter_is_malformed() {
        let doc = r#"
openapi: 3.0.0
info: {title: t, version: '1'}
paths:
  /a:
    get:
      parameters:
        - name: id
          in: path
      responses: {}
"#;
        assert!(matches!(
            SpecLoader::from_str(doc),
            Err(SpecLoadError::Malformed { .. })
        ));
    }

    #[test]
    fn test_broken_unused_component_fails_load() {
        let doc = r#"
openapi: 3.0.0
info: {title: t, version: '1'}
paths: {}
components:
  schemas:
    Broken:
      type: strnig
"#;
        assert!(matches!(
            SpecLoader::from_str(doc),
            Err(SpecLoadError::Malformed { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let result = SpecLoader::from_file("/definitely/not/here.yaml");
        assert!(matches!(result, Err(SpecLoadError::Unreadable { .. })));
    }

    #[tokio::test]
    async fn test_load_reads_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.yaml");
        std::fs::write(&path, USERS_API).unwrap();

        let model = SpecLoader::load(&SpecSource::File(path)).await.unwrap();
        assert_eq!(model.title, SpecLoader::from_str(USERS_API).unwrap().title);

        let missing = SpecSource::File(dir.path().join("absent.yaml"));
        let result = SpecLoader::load(&missing).await;
        assert!(matches!(result, Err(SpecLoadError::Unreadable { .. })));
    }

    #[test]
    fn test_spec_source_parse() {
        assert!(matches!(
            SpecSource::parse("https://example.com/openapi.yaml"),
            SpecSource::Url(_)
        ));
        assert_eq!(
            SpecSource::parse("api/openapi.yaml"),
            SpecSource::File(PathBuf::from("api/openapi.yaml"))
        );
        assert!(matches!(
            SpecSource::parse("C:\\specs\\api.yaml"),
            SpecSource::File(_)
        ));
    }
}
