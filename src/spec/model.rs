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

use crate::spec::schema::Schema;
use crate::spec::template::PathTemplate;
use http::Method;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParamLocation {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            "cookie" => Some(Self::Cookie),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Cookie => "cookie",
        }
    }
}

impl fmt::Display for ParamLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ParameterSpec {
    pub name: String,
    pub location: ParamLocation,
    pub required: bool,
    pub schema: Schema,
    /// Query arrays arrive as repeated keys when exploded, comma-separated otherwise.
    pub explode: bool,
    pub example: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct MediaTypeSpec {
    pub media_type: String,
    pub schema: Option<Schema>,
    pub example: Option<Value>,
}

impl MediaTypeSpec {
    pub fn is_json(&self) -> bool {
        is_json_media_type(&self.media_type)
    }
}

/// `application/json`, `application/problem+json`, `*/*` and friends.
pub fn is_json_media_type(media_type: &str) -> bool {
    match media_type.parse::<mime::Mime>() {
        Ok(mime) => {
            mime.subtype() == mime::JSON
                || mime.suffix() == Some(mime::JSON)
                || (mime.type_() == mime::STAR && mime.subtype() == mime::STAR)
        }
        Err(_) => false,
    }
}

#[derive(Debug, Clone)]
pub struct RequestBodySpec {
    pub required: bool,
    pub content: Vec<MediaTypeSpec>,
}

impl RequestBodySpec {
    /// The media type requests are validated against.
    pub fn json_content(&self) -> Option<&MediaTypeSpec> {
        self.content.iter().find(|c| c.is_json())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKey {
    Code(u16),
    /// `2XX` style ranges, holding the leading digit.
    Range(u8),
    Default,
}

impl StatusKey {
    pub fn parse(key: &str) -> Option<Self> {
        if key.eq_ignore_ascii_case("default") {
            return Some(Self::Default);
        }
        if key.len() == 3 && key[1..].eq_ignore_ascii_case("xx") {
            return match key.as_bytes()[0] {
                d @ b'1'..=b'5' => Some(Self::Range(d - b'0')),
                _ => None,
            };
        }
        match key.parse::<u16>() {
            Ok(code) if (100..600).contains(&code) => Some(Self::Code(code)),
            _ => None,
        }
    }

    pub fn is_success(self) -> bool {
        match self {
            Self::Code(code) => (200..300).contains(&code),
            Self::Range(digit) => digit == 2,
            Self::Default => false,
        }
    }

    /// The concrete status a mock for this key is served with.
    pub fn mock_status(self) -> u16 {
        match self {
            Self::Code(code) => code,
            Self::Range(digit) => digit as u16 * 100,
            Self::Default => 200,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResponseSpec {
    pub status: StatusKey,
    pub description: String,
    pub content: Vec<MediaTypeSpec>,
    /// Declared response headers that carry an example value.
    pub headers: Vec<(String, Value)>,
}

#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    pub operation_id: String,
    pub method: Method,
    pub path: PathTemplate,
    pub summary: Option<String>,
    /// Declaration order, path-item level parameters first.
    pub parameters: Vec<ParameterSpec>,
    pub request_body: Option<RequestBodySpec>,
    pub responses: Vec<ResponseSpec>,
}

impl OperationDescriptor {
    pub fn parameters_in(&self, location: ParamLocation) -> impl Iterator<Item = &ParameterSpec> {
        self.parameters
            .iter()
            .filter(move |p| p.location == location)
    }

    /// Lowest declared 2xx response, or `default` when no success is declared.
    pub fn mock_response(&self) -> Option<&ResponseSpec> {
        self.responses
            .iter()
            .filter(|r| r.status.is_success())
            .min_by_key(|r| r.status.mock_status())
            .or_else(|| {
                self.responses
                    .iter()
                    .find(|r| r.status == StatusKey::Default)
            })
    }
}

/// Everything the loader extracted from one API description.
#[derive(Debug, Clone)]
pub struct SpecificationModel {
    pub title: String,
    pub version: String,
    pub operations: Vec<Arc<OperationDescriptor>>,
    /// Compiled `components.schemas`, in declaration order.
    pub components: Vec<(String, Schema)>,
    /// The document as loaded, kept for the admin endpoint.
    pub document: Value,
}

impl SpecificationModel {
    pub fn operation(&self, operation_id: &str) -> Option<&Arc<OperationDescriptor>> {
        self.operations
            .iter()
            .find(|op| op.operation_id == operation_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: StatusKey) -> ResponseSpec {
        ResponseSpec {
            status,
            description: String::new(),
            content: Vec::new(),
            headers: Vec::new(),
        }
    }

    fn operation(responses: Vec<ResponseSpec>) -> OperationDescriptor {
        OperationDescriptor {
            operation_id: "Test".to_string(),
            method: Method::GET,
            path: PathTemplate::parse("/test").unwrap(),
            summary: None,
            parameters: Vec::new(),
            request_body: None,
            responses,
        }
    }

    #[test]
    fn test_status_key_parse() {
        assert_eq!(StatusKey::parse("200"), Some(StatusKey::Code(200)));
        assert_eq!(StatusKey::parse("2XX"), Some(StatusKey::Range(2)));
        assert_eq!(StatusKey::parse("4xx"), Some(StatusKey::Range(4)));
        assert_eq!(StatusKey::parse("default"), Some(StatusKey::Default));
        assert_eq!(StatusKey::parse("99"), None);
        assert_eq!(StatusKey::parse("9XX"), None);
        assert_eq!(StatusKey::parse("ok"), None);
    }

    #[test]
    fn test_mock_response_prefers_lowest_success() {
        let op = operation(vec![
            response(StatusKey::Code(404)),
            response(StatusKey::Code(202)),
            response(StatusKey::Code(201)),
            response(StatusKey::Default),
        ]);
        assert_eq!(op.mock_response().unwrap().status, StatusKey::Code(201));
    }

    #[test]
    fn test_mock_response_falls_back_to_default() {
        let op = operation(vec![response(StatusKey::Code(404)), response(StatusKey::Default)]);
        assert_eq!(op.mock_response().unwrap().status, StatusKey::Default);

        let op = operation(vec![response(StatusKey::Code(404))]);
        assert!(op.mock_response().is_none());
    }

    #[test]
    fn test_json_media_types() {
        assert!(is_json_media_type("application/json"));
        assert!(is_json_media_type("application/problem+json"));
        assert!(is_json_media_type("application/json; charset=utf-8"));
        assert!(is_json_media_type("*/*"));
        assert!(!is_json_media_type("text/plain"));
        assert!(!is_json_media_type("not a mime"));
    }
}
