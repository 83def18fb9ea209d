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

//! Request validation against a matched operation.
//!
//! Path, query and header values arrive as strings and are coerced to the
//! declared schema type first; the body is decoded according to its media
//! type. Every location is checked independently and all violations are
//! collected, in the order path, query, header, body.

use crate::dispatch::formats::FormatRegistry;
use crate::dispatch::request::{Body, IncomingRequest};
use crate::spec::{
    AdditionalProperties, MediaTypeSpec, OperationDescriptor, ParamLocation, ParameterSpec,
    RequestBodySpec, Schema, SchemaType,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViolationLocation {
    Path,
    Query,
    Header,
    Body,
}

impl ViolationLocation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Body => "body",
        }
    }
}

impl From<ParamLocation> for ViolationLocation {
    fn from(location: ParamLocation) -> Self {
        match location {
            ParamLocation::Path => Self::Path,
            ParamLocation::Query => Self::Query,
            // Cookies are never validated.
            ParamLocation::Header | ParamLocation::Cookie => Self::Header,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub location: ViolationLocation,
    /// Dotted path to the offending value, `items[2].name`; empty for the body root.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(location: ViolationLocation, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field.is_empty() {
            write!(f, "{}: {}", self.location.as_str(), self.message)
        } else {
            write!(f, "{} '{}': {}", self.location.as_str(), self.field, self.message)
        }
    }
}

/// Request values after coercion, keyed by declared parameter name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidatedRequest {
    pub path_params: Map<String, Value>,
    pub query: Map<String, Value>,
    pub headers: Map<String, Value>,
    pub body: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Valid(ValidatedRequest),
    Invalid { violations: Vec<Violation> },
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid(_))
    }

    pub fn violations(&self) -> &[Violation] {
        match self {
            ValidationOutcome::Valid(_) => &[],
            ValidationOutcome::Invalid { violations } => violations,
        }
    }
}

/// What happens to body fields no schema declares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownFieldPolicy {
    #[default]
    Permissive,
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Request,
    Response,
}

#[derive(Debug, Clone, Default)]
pub struct SchemaValidator {
    formats: FormatRegistry,
    policy: UnknownFieldPolicy,
}

impl SchemaValidator {
    pub fn new(formats: FormatRegistry, policy: UnknownFieldPolicy) -> Self {
        Self { formats, policy }
    }

    pub fn formats(&self) -> &FormatRegistry {
        &self.formats
    }

    pub fn policy(&self) -> UnknownFieldPolicy {
        self.policy
    }

    pub fn validate(
        &self,
        operation: &OperationDescriptor,
        path_params: &HashMap<String, String>,
        request: &IncomingRequest,
    ) -> ValidationOutcome {
        let mut violations = Vec::new();
        let mut validated = ValidatedRequest::default();

        for param in operation.parameters_in(ParamLocation::Path) {
            let raw = path_params.get(&param.name).map(|v| vec![v.clone()]).unwrap_or_default();
            if let Some(value) = self.validate_param(param, raw, &mut violations) {
                validated.path_params.insert(param.name.clone(), value);
            }
        }

        for param in operation.parameters_in(ParamLocation::Query) {
            let raw = request.query_values(&param.name);
            if let Some(value) = self.validate_param(param, raw, &mut violations) {
                validated.query.insert(param.name.clone(), value);
            }
        }

        for param in operation.parameters_in(ParamLocation::Header) {
            let raw = request.header(&param.name).map(|v| vec![v.to_string()]).unwrap_or_default();
            if let Some(value) = self.validate_param(param, raw, &mut violations) {
                validated.headers.insert(param.name.clone(), value);
            }
        }

        validated.body = match &operation.request_body {
            Some(spec) => self.validate_body(spec, request, &mut violations),
            None => passthrough_body(&request.body),
        };

        if violations.is_empty() {
            ValidationOutcome::Valid(validated)
        } else {
            ValidationOutcome::Invalid { violations }
        }
    }

    /// Checks a value against a schema the way a response payload is checked.
    pub fn check_value(&self, value: &Value, schema: &Schema) -> Vec<Violation> {
        self.check_directed(value, schema, Direction::Response)
    }

    /// Checks a value the way a request body is checked: `readOnly`
    /// properties are not required and strict mode applies.
    pub fn check_request_value(&self, value: &Value, schema: &Schema) -> Vec<Violation> {
        self.check_directed(value, schema, Direction::Request)
    }

    fn check_directed(&self, value: &Value, schema: &Schema, direction: Direction) -> Vec<Violation> {
        let mut out = Vec::new();
        Walk {
            validator: self,
            location: ViolationLocation::Body,
            direction,
        }
        .check(value, schema, "", false, &mut out);
        out
    }

    fn validate_param(
        &self,
        param: &ParameterSpec,
        raw: Vec<String>,
        out: &mut Vec<Violation>,
    ) -> Option<Value> {
        let location = ViolationLocation::from(param.location);
        if raw.is_empty() {
            if param.required {
                out.push(Violation::new(location, &param.name, "required parameter is missing"));
            }
            return None;
        }

        let value = match coerce_param(param, raw) {
            Ok(value) => value,
            Err(message) => {
                out.push(Violation::new(location, &param.name, message));
                return None;
            }
        };

        let before = out.len();
        Walk {
            validator: self,
            location,
            direction: Direction::Request,
        }
        .check(&value, &param.schema, &param.name, false, out);

        (out.len() == before).then_some(value)
    }

    fn validate_body(
        &self,
        spec: &RequestBodySpec,
        request: &IncomingRequest,
        out: &mut Vec<Violation>,
    ) -> Option<Value> {
        if request.body.is_empty() {
            if spec.required {
                out.push(Violation::new(ViolationLocation::Body, "", "request body is required"));
            }
            return None;
        }

        let media = match request.content_type() {
            Some(content_type) => match spec.content.iter().find(|m| media_matches(&m.media_type, content_type)) {
                Some(media) => media,
                None => {
                    out.push(Violation::new(
                        ViolationLocation::Body,
                        "",
                        format!("unsupported content type '{}'", content_type),
                    ));
                    return None;
                }
            },
            None => match spec.json_content().or_else(|| spec.content.first()) {
                Some(media) => media,
                None => return passthrough_body(&request.body),
            },
        };

        let value = match decode_body(media, &request.body) {
            Ok(Some(value)) => value,
            Ok(None) => return None,
            Err(message) => {
                out.push(Violation::new(ViolationLocation::Body, "", message));
                return None;
            }
        };

        if let Some(schema) = &media.schema {
            let before = out.len();
            Walk {
                validator: self,
                location: ViolationLocation::Body,
                direction: Direction::Request,
            }
            .check(&value, schema, "", false, out);
            if out.len() != before {
                return None;
            }
        }
        Some(value)
    }
}

fn passthrough_body(body: &Body) -> Option<Value> {
    match body {
        Body::Empty => None,
        Body::Json(value) => Some(value.clone()),
        Body::Raw(bytes) => serde_json::from_slice(bytes).ok(),
    }
}

fn media_matches(declared: &str, actual: &str) -> bool {
    let (Ok(declared), Ok(actual)) = (declared.parse::<mime::Mime>(), actual.parse::<mime::Mime>()) else {
        return declared.eq_ignore_ascii_case(actual);
    };
    if declared.type_() == mime::STAR {
        return true;
    }
    declared.type_() == actual.type_()
        && (declared.subtype() == mime::STAR
            || (declared.subtype() == actual.subtype() && declared.suffix() == actual.suffix()))
}

/// `Ok(None)` for media types whose payload is not validated.
fn decode_body(media: &MediaTypeSpec, body: &Body) -> Result<Option<Value>, String> {
    if let Body::Json(value) = body {
        return Ok(Some(value.clone()));
    }
    let Body::Raw(bytes) = body else {
        return Ok(None);
    };

    if media.is_json() {
        return serde_json::from_slice(bytes)
            .map(Some)
            .map_err(|e| format!("malformed JSON body: {}", e));
    }

    if media.media_type.eq_ignore_ascii_case("application/x-www-form-urlencoded") {
        let schema = media.schema.as_ref();
        let mut fields: Vec<(String, Vec<String>)> = Vec::new();
        for (key, value) in url::form_urlencoded::parse(bytes) {
            match fields.iter_mut().find(|(k, _)| *k == key) {
                Some((_, values)) => values.push(value.into_owned()),
                None => fields.push((key.into_owned(), vec![value.into_owned()])),
            }
        }

        let mut object = Map::new();
        for (key, values) in fields {
            let property = schema.and_then(|s| s.property(&key));
            let value = match property {
                Some(property) => coerce(property, values, true).map_err(|message| format!("field '{}': {}", key, message))?,
                None if values.len() == 1 => Value::String(values.into_iter().next().unwrap_or_default()),
                None => Value::Array(values.into_iter().map(Value::String).collect()),
            };
            object.insert(key, value);
        }
        return Ok(Some(Value::Object(object)));
    }

    Ok(None)
}

fn coerce_param(param: &ParameterSpec, raw: Vec<String>) -> Result<Value, String> {
    let repeated_keys = param.location == ParamLocation::Query && param.explode;
    coerce(&param.schema, raw, repeated_keys)
}

/// Turns raw string input into a JSON value of the schema's type.
fn coerce(schema: &Schema, raw: Vec<String>, repeated_keys: bool) -> Result<Value, String> {
    if schema.primary_type() == Some(SchemaType::Array) {
        let pieces: Vec<String> = if repeated_keys {
            raw
        } else {
            raw.iter()
                .flat_map(|v| v.split(','))
                .map(str::to_string)
                .collect()
        };
        let any = Schema::any();
        let items = schema.items.as_deref().unwrap_or(&any);
        return pieces
            .iter()
            .map(|piece| coerce_scalar(items, piece))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array);
    }

    let first = raw.into_iter().next().unwrap_or_default();
    coerce_scalar(schema, &first)
}

fn coerce_scalar(schema: &Schema, raw: &str) -> Result<Value, String> {
    if schema.nullable && raw == "null" {
        return Ok(Value::Null);
    }
    match schema.primary_type() {
        Some(SchemaType::Integer) => raw
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| format!("expected integer, got '{}'", raw)),
        Some(SchemaType::Number) => {
            let trimmed = raw.trim();
            if let Ok(n) = trimmed.parse::<i64>() {
                return Ok(Value::from(n));
            }
            trimmed
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("expected number, got '{}'", raw))
        }
        Some(SchemaType::Boolean) => match raw.trim() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(format!("expected boolean, got '{}'", raw)),
        },
        Some(SchemaType::Object) => match serde_json::from_str::<Value>(raw) {
            Ok(value @ Value::Object(_)) => Ok(value),
            _ => Err(format!("expected object, got '{}'", raw)),
        },
        Some(SchemaType::Array) => coerce(schema, vec![raw.to_string()], false),
        Some(SchemaType::String) | Some(SchemaType::Null) | None => Ok(Value::String(raw.to_string())),
    }
}

struct Walk<'v> {
    validator: &'v SchemaValidator,
    location: ViolationLocation,
    direction: Direction,
}

impl Walk<'_> {
    fn violation(&self, out: &mut Vec<Violation>, field: &str, message: impl Into<String>) {
        out.push(Violation::new(self.location, field, message));
    }

    /// `allow_unknown` is set for branches of a composition, where sibling
    /// branches may declare the fields this one does not know.
    fn check(&self, value: &Value, schema: &Schema, field: &str, allow_unknown: bool, out: &mut Vec<Violation>) {
        if value.is_null() && (schema.nullable || schema.types.contains(&SchemaType::Null)) {
            return;
        }

        if !schema.types.is_empty() && !schema.types.iter().any(|t| type_matches(*t, value)) {
            let expected: Vec<&str> = schema.types.iter().map(|t| t.name()).collect();
            self.violation(
                out,
                field,
                format!("expected {}, got {}", expected.join(" or "), type_name(value)),
            );
            return;
        }

        if let Some(values) = &schema.enum_values {
            if !values.iter().any(|allowed| json_equal(allowed, value)) {
                let allowed: Vec<String> = values.iter().map(Value::to_string).collect();
                self.violation(out, field, format!("must be one of [{}]", allowed.join(", ")));
            }
        }

        if let Some(expected) = &schema.const_value {
            if !json_equal(expected, value) {
                self.violation(out, field, format!("must be {}", expected));
            }
        }

        match value {
            Value::String(text) => self.check_string(text, schema, field, out),
            Value::Number(_) => self.check_number(value, schema, field, out),
            Value::Array(items) => self.check_array(items, schema, field, out),
            Value::Object(object) => self.check_object(object, schema, field, allow_unknown, out),
            Value::Bool(_) | Value::Null => {}
        }

        self.check_composition(value, schema, field, out);
    }

    fn check_string(&self, text: &str, schema: &Schema, field: &str, out: &mut Vec<Violation>) {
        let length = text.chars().count();
        if let Some(min) = schema.min_length {
            if length < min {
                self.violation(out, field, format!("must be at least {} characters long", min));
            }
        }
        if let Some(max) = schema.max_length {
            if length > max {
                self.violation(out, field, format!("must be at most {} characters long", max));
            }
        }
        if let Some(pattern) = &schema.pattern {
            if !pattern.is_match(text) {
                self.violation(out, field, format!("does not match pattern '{}'", pattern.as_str()));
            }
        }
        if let Some(format) = &schema.format {
            if self.validator.formats.check(format, text) == Some(false) {
                self.violation(out, field, format!("is not a valid {}", format));
            }
        }
    }

    fn check_number(&self, value: &Value, schema: &Schema, field: &str, out: &mut Vec<Violation>) {
        let Some(n) = value.as_f64() else {
            return;
        };

        if let Some(min) = schema.minimum {
            if n < min {
                self.violation(out, field, format!("must be >= {}", min));
            }
        }
        if let Some(max) = schema.maximum {
            if n > max {
                self.violation(out, field, format!("must be <= {}", max));
            }
        }
        if let Some(min) = schema.exclusive_minimum {
            if n <= min {
                self.violation(out, field, format!("must be > {}", min));
            }
        }
        if let Some(max) = schema.exclusive_maximum {
            if n >= max {
                self.violation(out, field, format!("must be < {}", max));
            }
        }
        if let Some(divisor) = schema.multiple_of {
            if divisor > 0.0 {
                let quotient = n / divisor;
                if (quotient - quotient.round()).abs() > 1e-9 {
                    self.violation(out, field, format!("must be a multiple of {}", divisor));
                }
            }
        }

        match schema.format.as_deref() {
            Some("int32") if n < i32::MIN as f64 || n > i32::MAX as f64 => {
                self.violation(out, field, "is out of range for int32");
            }
            Some("int64") if value.is_u64() && value.as_i64().is_none() => {
                self.violation(out, field, "is out of range for int64");
            }
            _ => {}
        }
    }

    fn check_array(&self, items: &[Value], schema: &Schema, field: &str, out: &mut Vec<Violation>) {
        if let Some(min) = schema.min_items {
            if items.len() < min {
                self.violation(out, field, format!("must contain at least {} items", min));
            }
        }
        if let Some(max) = schema.max_items {
            if items.len() > max {
                self.violation(out, field, format!("must contain at most {} items", max));
            }
        }
        if schema.unique_items {
            let duplicated = items
                .iter()
                .enumerate()
                .any(|(i, a)| items[i + 1..].iter().any(|b| json_equal(a, b)));
            if duplicated {
                self.violation(out, field, "items must be unique");
            }
        }
        if let Some(item_schema) = &schema.items {
            for (i, item) in items.iter().enumerate() {
                self.check(item, item_schema, &format!("{}[{}]", field, i), false, out);
            }
        }
    }

    fn check_object(
        &self,
        object: &Map<String, Value>,
        schema: &Schema,
        field: &str,
        allow_unknown: bool,
        out: &mut Vec<Violation>,
    ) {
        let required_here = |name: &str| {
            schema.required.iter().any(|r| r == name)
                && !(self.direction == Direction::Request
                    && schema.property(name).map_or(false, |p| p.read_only))
        };

        for (name, property) in &schema.properties {
            let child = join_field(field, name);
            match object.get(name) {
                Some(value) => self.check(value, property, &child, false, out),
                None if required_here(name) => self.violation(out, &child, "is required"),
                None => {}
            }
        }

        for name in &schema.required {
            if schema.property(name).is_none() && !object.contains_key(name) {
                self.violation(out, &join_field(field, name), "is required");
            }
        }

        let mut known = HashSet::new();
        collect_known_properties(schema, &mut known);
        for (name, value) in object {
            if known.contains(name.as_str()) {
                continue;
            }
            let child = join_field(field, name);
            match &schema.additional_properties {
                AdditionalProperties::Forbidden => self.violation(out, &child, "unknown field"),
                AdditionalProperties::Schema(extra) => self.check(value, extra, &child, false, out),
                AdditionalProperties::Allowed => {}
                AdditionalProperties::Unspecified => {
                    if self.validator.policy == UnknownFieldPolicy::Strict
                        && !allow_unknown
                        && self.direction == Direction::Request
                    {
                        self.violation(out, &child, "unknown field");
                    }
                }
            }
        }

        if let Some(min) = schema.min_properties {
            if object.len() < min {
                self.violation(out, field, format!("must have at least {} properties", min));
            }
        }
        if let Some(max) = schema.max_properties {
            if object.len() > max {
                self.violation(out, field, format!("must have at most {} properties", max));
            }
        }
    }

    fn check_composition(&self, value: &Value, schema: &Schema, field: &str, out: &mut Vec<Violation>) {
        for branch in &schema.all_of {
            self.check(value, branch, field, true, out);
        }

        if !schema.any_of.is_empty() {
            let any_passes = schema.any_of.iter().any(|branch| self.passes(value, branch, field));
            if !any_passes {
                self.violation(out, field, "does not match any of the allowed schemas");
            }
        }

        if !schema.one_of.is_empty() {
            let passing = schema
                .one_of
                .iter()
                .filter(|branch| self.passes(value, branch, field))
                .count();
            if passing != 1 {
                self.violation(
                    out,
                    field,
                    format!("must match exactly one schema in oneOf, matched {}", passing),
                );
            }
        }

        if let Some(not) = &schema.not {
            if self.passes(value, not, field) {
                self.violation(out, field, "must not match the excluded schema");
            }
        }
    }

    fn passes(&self, value: &Value, schema: &Schema, field: &str) -> bool {
        let mut scratch = Vec::new();
        self.check(value, schema, field, true, &mut scratch);
        scratch.is_empty()
    }
}

/// Property names declared by a schema or any of its composed branches.
fn collect_known_properties<'s>(schema: &'s Schema, known: &mut HashSet<&'s str>) {
    known.extend(schema.properties.iter().map(|(name, _)| name.as_str()));
    for branch in schema.all_of.iter().chain(&schema.any_of).chain(&schema.one_of) {
        collect_known_properties(branch, known);
    }
}

fn join_field(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}

fn type_matches(kind: SchemaType, value: &Value) -> bool {
    match kind {
        SchemaType::String => value.is_string(),
        SchemaType::Integer => {
            value.is_i64() || value.is_u64() || value.as_f64().map_or(false, |n| n.fract() == 0.0)
        }
        SchemaType::Number => value.is_number(),
        SchemaType::Boolean => value.is_boolean(),
        SchemaType::Array => value.is_array(),
        SchemaType::Object => value.is_object(),
        SchemaType::Null => value.is_null(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Equality where `1` and `1.0` are the same number.
fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| json_equal(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter().all(|(k, v)| y.get(k).map_or(false, |w| json_equal(v, w)))
        }
        _ => a == b,
    }
}
