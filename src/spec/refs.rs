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

//! Local `$ref` resolution against the document root.
//!
//! Only in-document references (`#/components/...`) are supported; anything
//! pointing at another document is reported as unresolved.

use crate::spec::error::SpecLoadError;
use percent_encoding::percent_decode_str;
use serde_json::Value;

const MAX_REF_HOPS: usize = 32;

pub struct Resolver<'a> {
    root: &'a Value,
}

impl<'a> Resolver<'a> {
    pub fn new(root: &'a Value) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &'a Value {
        self.root
    }

    /// Looks up a single reference without following further `$ref`s.
    pub fn pointer(&self, reference: &str, location: &str) -> Result<&'a Value, SpecLoadError> {
        let fragment = reference
            .strip_prefix('#')
            .ok_or_else(|| SpecLoadError::unresolved(reference, location))?;

        let decoded = percent_decode_str(fragment).decode_utf8_lossy();
        if decoded.is_empty() {
            return Ok(self.root);
        }

        self.root
            .pointer(&decoded)
            .ok_or_else(|| SpecLoadError::unresolved(reference, location))
    }

    /// Follows a chain of `$ref` objects until a concrete value is reached.
    pub fn deref(&self, value: &'a Value, location: &str) -> Result<&'a Value, SpecLoadError> {
        let mut current = value;
        for _ in 0..MAX_REF_HOPS {
            match reference_of(current) {
                Some(reference) => current = self.pointer(reference, location)?,
                None => return Ok(current),
            }
        }
        Err(SpecLoadError::malformed(
            location,
            format!("reference chain longer than {} hops", MAX_REF_HOPS),
        ))
    }
}

/// The `$ref` target of a reference object, if `value` is one.
pub fn reference_of(value: &Value) -> Option<&str> {
    value.get("$ref").and_then(Value::as_str)
}

/// Escapes a key for use inside a JSON pointer.
pub fn escape_pointer_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> Value {
        json!({
            "components": {
                "schemas": {
                    "User": {"type": "object"},
                    "Alias": {"$ref": "#/components/schemas/User"},
                    "Loop": {"$ref": "#/components/schemas/Loop"},
                    "With Space": {"type": "string"}
                }
            }
        })
    }

    #[test]
    fn test_pointer_lookup() {
        let doc = document();
        let resolver = Resolver::new(&doc);
        let user = resolver
            .pointer("#/components/schemas/User", "test")
            .unwrap();
        assert_eq!(user, &json!({"type": "object"}));
    }

    #[test]
    fn test_percent_encoded_pointer() {
        let doc = document();
        let resolver = Resolver::new(&doc);
        let value = resolver
            .pointer("#/components/schemas/With%20Space", "test")
            .unwrap();
        assert_eq!(value, &json!({"type": "string"}));
    }

    #[test]
    fn test_deref_follows_chain() {
        let doc = document();
        let resolver = Resolver::new(&doc);
        let alias = json!({"$ref": "#/components/schemas/Alias"});
        let target = resolver.deref(&alias, "test").unwrap();
        assert_eq!(target, &json!({"type": "object"}));
    }

    #[test]
    fn test_deref_detects_self_loop() {
        let doc = document();
        let resolver = Resolver::new(&doc);
        let looped = json!({"$ref": "#/components/schemas/Loop"});
        assert!(matches!(
            resolver.deref(&looped, "test"),
            Err(SpecLoadError::Malformed { .. })
        ));
    }

    #[test]
    fn test_missing_and_external_references() {
        let doc = document();
        let resolver = Resolver::new(&doc);
        assert!(matches!(
            resolver.pointer("#/components/schemas/Missing", "test"),
            Err(SpecLoadError::UnresolvedReference { .. })
        ));
        assert!(matches!(
            resolver.pointer("other.yaml#/components/schemas/User", "test"),
            Err(SpecLoadError::UnresolvedReference { .. })
        ));
    }

    #[test]
    fn test_escape_pointer_segment() {
        assert_eq!(escape_pointer_segment("/users/{id}"), "~1users~1{id}");
        assert_eq!(escape_pointer_segment("a~b"), "a~0b");
    }
}
