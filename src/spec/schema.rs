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

//! Schemas compiled out of the raw document at load time.
//!
//! Compilation resolves every `$ref` and rejects keywords whose values the
//! validator could not interpret, so validation itself never fails on the
//! schema side.

use crate::spec::error::SpecLoadError;
use crate::spec::refs::{reference_of, Resolver};
use regex::Regex;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    Null,
}

impl SchemaType {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::String),
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            "array" => Some(Self::Array),
            "object" => Some(Self::Object),
            "null" => Some(Self::Null),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Null => "null",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub enum AdditionalProperties {
    /// Not declared; the deployment's unknown-field policy decides.
    #[default]
    Unspecified,
    Allowed,
    Forbidden,
    Schema(Box<Schema>),
}

#[derive(Debug, Clone, Default)]
pub struct Schema {
    /// Empty means any type.
    pub types: Vec<SchemaType>,
    pub nullable: bool,
    pub format: Option<String>,
    pub pattern: Option<Regex>,
    pub enum_values: Option<Vec<Value>>,
    pub const_value: Option<Value>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: Option<f64>,
    pub exclusive_maximum: Option<f64>,
    pub multiple_of: Option<f64>,
    pub items: Option<Box<Schema>>,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
    pub unique_items: bool,
    /// Declaration order is kept; violations are reported in this order.
    pub properties: Vec<(String, Schema)>,
    pub required: Vec<String>,
    pub additional_properties: AdditionalProperties,
    pub min_properties: Option<usize>,
    pub max_properties: Option<usize>,
    pub all_of: Vec<Schema>,
    pub any_of: Vec<Schema>,
    pub one_of: Vec<Schema>,
    pub not: Option<Box<Schema>>,
    pub read_only: bool,
    pub example: Option<Value>,
}

impl Schema {
    /// A schema that accepts anything.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn of_type(kind: SchemaType) -> Self {
        Self {
            types: vec![kind],
            ..Self::default()
        }
    }

    /// The type used to coerce string input from path, query and headers.
    pub fn primary_type(&self) -> Option<SchemaType> {
        self.types
            .iter()
            .copied()
            .find(|t| *t != SchemaType::Null)
            .or_else(|| {
                self.all_of
                    .iter()
                    .chain(self.one_of.iter())
                    .chain(self.any_of.iter())
                    .find_map(Schema::primary_type)
            })
    }

    pub fn property(&self, name: &str) -> Option<&Schema> {
        self.properties
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, schema)| schema)
    }

    /// Names of every format keyword used anywhere in this schema.
    pub fn formats(&self) -> Vec<&str> {
        let mut formats = Vec::new();
        self.collect_formats(&mut formats);
        formats
    }

    fn collect_formats<'s>(&'s self, out: &mut Vec<&'s str>) {
        if let Some(format) = &self.format {
            out.push(format);
        }
        if let Some(items) = &self.items {
            items.collect_formats(out);
        }
        for (_, property) in &self.properties {
            property.collect_formats(out);
        }
        if let AdditionalProperties::Schema(schema) = &self.additional_properties {
            schema.collect_formats(out);
        }
        for schema in self.all_of.iter().chain(&self.any_of).chain(&self.one_of) {
            schema.collect_formats(out);
        }
        if let Some(not) = &self.not {
            not.collect_formats(out);
        }
    }
}

/// Compiles raw schema objects, resolving `$ref`s as it goes.
pub struct SchemaCompiler<'r, 'a> {
    resolver: &'r Resolver<'a>,
    active: Vec<String>,
}

impl<'r, 'a> SchemaCompiler<'r, 'a> {
    pub fn new(resolver: &'r Resolver<'a>) -> Self {
        Self {
            resolver,
            active: Vec::new(),
        }
    }

    pub fn compile(&mut self, value: &'a Value, location: &str) -> Result<Schema, SpecLoadError> {
        if let Some(reference) = reference_of(value) {
            let target = self.resolver.pointer(reference, location)?;
            // Back-edge of a recursive schema: the target exists, validate it as unconstrained.
            if self.active.iter().any(|active| active == reference) {
                // A cycle made only of `$ref`s never reaches a schema and fails here.
                self.resolver.deref(target, location)?;
                tracing::debug!(reference = %reference, location = %location, "Recursive schema reference");
                return Ok(Schema::any());
            }
            self.active.push(reference.to_string());
            let compiled = self.compile(target, reference);
            self.active.pop();
            return compiled;
        }

        match value {
            Value::Bool(true) => Ok(Schema::any()),
            Value::Bool(false) => Ok(Schema {
                not: Some(Box::new(Schema::any())),
                ..Schema::default()
            }),
            Value::Object(_) => self.compile_object(value, location),
            _ => Err(SpecLoadError::malformed(
                location,
                "schema must be an object or a boolean",
            )),
        }
    }

    fn compile_object(&mut self, value: &'a Value, location: &str) -> Result<Schema, SpecLoadError> {
        let mut schema = Schema {
            types: parse_types(value.get("type"), location)?,
            nullable: value.get("nullable").and_then(Value::as_bool).unwrap_or(false),
            format: value.get("format").and_then(Value::as_str).map(str::to_string),
            enum_values: match value.get("enum") {
                None => None,
                Some(Value::Array(values)) => Some(values.clone()),
                Some(_) => return Err(SpecLoadError::malformed(location, "'enum' must be an array")),
            },
            const_value: value.get("const").cloned(),
            min_length: usize_keyword(value, "minLength", location)?,
            max_length: usize_keyword(value, "maxLength", location)?,
            minimum: number_keyword(value, "minimum", location)?,
            maximum: number_keyword(value, "maximum", location)?,
            multiple_of: number_keyword(value, "multipleOf", location)?,
            min_items: usize_keyword(value, "minItems", location)?,
            max_items: usize_keyword(value, "maxItems", location)?,
            unique_items: value.get("uniqueItems").and_then(Value::as_bool).unwrap_or(false),
            min_properties: usize_keyword(value, "minProperties", location)?,
            max_properties: usize_keyword(value, "maxProperties", location)?,
            read_only: value.get("readOnly").and_then(Value::as_bool).unwrap_or(false),
            example: value
                .get("example")
                .cloned()
                .or_else(|| first_of_array(value.get("examples"))),
            ..Schema::default()
        };

        if schema.types.contains(&SchemaType::Null) {
            schema.nullable = true;
        }

        if let Some(pattern) = value.get("pattern") {
            let source = pattern
                .as_str()
                .ok_or_else(|| SpecLoadError::malformed(location, "'pattern' must be a string"))?;
            let regex = Regex::new(source).map_err(|e| {
                SpecLoadError::malformed(location, format!("invalid pattern '{}': {}", source, e))
            })?;
            schema.pattern = Some(regex);
        }

        // OpenAPI 3.0 spells exclusivity as a flag on minimum/maximum, 3.1 as a number.
        match value.get("exclusiveMinimum") {
            Some(Value::Bool(true)) => schema.exclusive_minimum = schema.minimum.take(),
            Some(Value::Bool(false)) | None => {}
            Some(other) => {
                schema.exclusive_minimum = Some(other.as_f64().ok_or_else(|| {
                    SpecLoadError::malformed(location, "'exclusiveMinimum' must be a number")
                })?)
            }
        }
        match value.get("exclusiveMaximum") {
            Some(Value::Bool(true)) => schema.exclusive_maximum = schema.maximum.take(),
            Some(Value::Bool(false)) | None => {}
            Some(other) => {
                schema.exclusive_maximum = Some(other.as_f64().ok_or_else(|| {
                    SpecLoadError::malformed(location, "'exclusiveMaximum' must be a number")
                })?)
            }
        }

        if let Some(items) = value.get("items") {
            let items_location = format!("{}/items", location);
            schema.items = Some(Box::new(self.compile(items, &items_location)?));
        }

        if let Some(properties) = value.get("properties") {
            let properties = properties
                .as_object()
                .ok_or_else(|| SpecLoadError::malformed(location, "'properties' must be an object"))?;
            for (name, property) in properties {
                let property_location = format!("{}/properties/{}", location, name);
                let compiled = self.compile(property, &property_location)?;
                schema.properties.push((name.clone(), compiled));
            }
        }

        if let Some(required) = value.get("required") {
            let required = required
                .as_array()
                .ok_or_else(|| SpecLoadError::malformed(location, "'required' must be an array"))?;
            for name in required {
                let name = name.as_str().ok_or_else(|| {
                    SpecLoadError::malformed(location, "'required' entries must be strings")
                })?;
                schema.required.push(name.to_string());
            }
        }

        schema.additional_properties = match value.get("additionalProperties") {
            None => AdditionalProperties::Unspecified,
            Some(Value::Bool(true)) => AdditionalProperties::Allowed,
            Some(Value::Bool(false)) => AdditionalProperties::Forbidden,
            Some(other) => {
                let location = format!("{}/additionalProperties", location);
                AdditionalProperties::Schema(Box::new(self.compile(other, &location)?))
            }
        };

        schema.all_of = self.compile_list(value, "allOf", location)?;
        schema.any_of = self.compile_list(value, "anyOf", location)?;
        schema.one_of = self.compile_list(value, "oneOf", location)?;

        if let Some(not) = value.get("not") {
            let location = format!("{}/not", location);
            schema.not = Some(Box::new(self.compile(not, &location)?));
        }

        Ok(schema)
    }

    fn compile_list(
        &mut self,
        value: &'a Value,
        keyword: &str,
        location: &str,
    ) -> Result<Vec<Schema>, SpecLoadError> {
        let Some(list) = value.get(keyword) else {
            return Ok(Vec::new());
        };
        let list = list
            .as_array()
            .ok_or_else(|| SpecLoadError::malformed(location, format!("'{}' must be an array", keyword)))?;

        list.iter()
            .enumerate()
            .map(|(i, item)| self.compile(item, &format!("{}/{}/{}", location, keyword, i)))
            .collect()
    }
}

fn parse_types(value: Option<&Value>, location: &str) -> Result<Vec<SchemaType>, SpecLoadError> {
    let names: Vec<&str> = match value {
        None => return Ok(Vec::new()),
        Some(Value::String(name)) => vec![name.as_str()],
        Some(Value::Array(names)) => names
            .iter()
            .map(|n| {
                n.as_str()
                    .ok_or_else(|| SpecLoadError::malformed(location, "'type' entries must be strings"))
            })
            .collect::<Result<_, _>>()?,
        Some(_) => {
            return Err(SpecLoadError::malformed(
                location,
                "'type' must be a string or an array",
            ))
        }
    };

    names
        .into_iter()
        .map(|name| {
            SchemaType::parse(name)
                .ok_or_else(|| SpecLoadError::malformed(location, format!("unknown type '{}'", name)))
        })
        .collect()
}

fn usize_keyword(value: &Value, keyword: &str, location: &str) -> Result<Option<usize>, SpecLoadError> {
    match value.get(keyword) {
        None => Ok(None),
        Some(v) => v
            .as_u64()
            .map(|n| Some(n as usize))
            .ok_or_else(|| {
                SpecLoadError::malformed(location, format!("'{}' must be a non-negative integer", keyword))
            }),
    }
}

fn number_keyword(value: &Value, keyword: &str, location: &str) -> Result<Option<f64>, SpecLoadError> {
    match value.get(keyword) {
        None => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| SpecLoadError::malformed(location, format!("'{}' must be a number", keyword))),
    }
}

fn first_of_array(value: Option<&Value>) -> Option<Value> {
    value.and_then(Value::as_array).and_then(|a| a.first()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compile(doc: &Value, schema: &Value) -> Result<Schema, SpecLoadError> {
        let resolver = Resolver::new(doc);
        SchemaCompiler::new(&resolver).compile(schema, "test")
    }

    #[test]
    fn test_compile_object_schema() {
        let doc = json!({});
        let schema = compile(
            &doc,
            &json!({
                "type": "object",
                "required": ["email"],
                "properties": {
                    "name": {"type": "string", "minLength": 1},
                    "email": {"type": "string", "format": "email"}
                },
                "additionalProperties": false
            }),
        )
        .unwrap();

        assert_eq!(schema.types, vec![SchemaType::Object]);
        assert_eq!(schema.required, vec!["email".to_string()]);
        let names: Vec<&str> = schema.properties.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["name", "email"]);
        assert!(matches!(
            schema.additional_properties,
            AdditionalProperties::Forbidden
        ));
        assert_eq!(schema.formats(), vec!["email"]);
    }

    #[test]
    fn test_compile_resolves_refs() {
        let doc = json!({
            "components": {"schemas": {"Id": {"type": "integer", "minimum": 1}}}
        });
        let schema = compile(&doc, &json!({"$ref": "#/components/schemas/Id"})).unwrap();
        assert_eq!(schema.types, vec![SchemaType::Integer]);
        assert_eq!(schema.minimum, Some(1.0));
    }

    #[test]
    fn test_recursive_schema_terminates() {
        let doc = json!({
            "components": {"schemas": {"Node": {
                "type": "object",
                "properties": {
                    "children": {"type": "array", "items": {"$ref": "#/components/schemas/Node"}}
                }
            }}}
        });
        let schema = compile(&doc, &json!({"$ref": "#/components/schemas/Node"})).unwrap();
        let children = schema.property("children").unwrap();
        let items = children.items.as_ref().unwrap();
        assert!(items.types.is_empty());
    }

    #[test]
    fn test_pure_reference_loop_is_malformed() {
        let doc = json!({
            "components": {"schemas": {
                "Loop": {"$ref": "#/components/schemas/Loop"},
                "Ping": {"$ref": "#/components/schemas/Pong"},
                "Pong": {"$ref": "#/components/schemas/Ping"}
            }}
        });
        for name in ["Loop", "Ping"] {
            let reference = json!({"$ref": format!("#/components/schemas/{}", name)});
            let result = compile(&doc, &reference);
            assert!(
                matches!(result, Err(SpecLoadError::Malformed { .. })),
                "{} compiled: {:?}",
                name,
                result
            );
        }
    }

    #[test]
    fn test_exclusive_bounds_both_dialects() {
        let doc = json!({});
        let v30 = compile(&doc, &json!({"type": "number", "minimum": 0, "exclusiveMinimum": true})).unwrap();
        assert_eq!(v30.minimum, None);
        assert_eq!(v30.exclusive_minimum, Some(0.0));

        let v31 = compile(&doc, &json!({"type": "number", "exclusiveMaximum": 10})).unwrap();
        assert_eq!(v31.exclusive_maximum, Some(10.0));
    }

    #[test]
    fn test_type_array_with_null() {
        let doc = json!({});
        let schema = compile(&doc, &json!({"type": ["string", "null"]})).unwrap();
        assert!(schema.nullable);
        assert_eq!(schema.primary_type(), Some(SchemaType::String));
    }

    #[test]
    fn test_malformed_schemas() {
        let doc = json!({});
        assert!(compile(&doc, &json!({"type": "text"})).is_err());
        assert!(compile(&doc, &json!({"type": "string", "pattern": "(["})).is_err());
        assert!(compile(&doc, &json!({"minLength": -1})).is_err());
        assert!(compile(&doc, &json!("string")).is_err());
        assert!(matches!(
            compile(&doc, &json!({"$ref": "#/components/schemas/Nope"})),
            Err(SpecLoadError::UnresolvedReference { .. })
        ));
    }
}
