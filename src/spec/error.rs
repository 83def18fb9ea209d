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

use thiserror::Error;

/// Fatal problems found while turning an API description into a model.
///
/// A loader either returns a complete model or one of these; callers never
/// see a partially resolved document.
#[derive(Debug, Error)]
pub enum SpecLoadError {
    #[error("failed to read specification from {source_id}: {reason}")]
    Unreadable { source_id: String, reason: String },

    #[error("malformed specification at {location}: {reason}")]
    Malformed { location: String, reason: String },

    #[error("unresolved reference {reference} at {location}")]
    UnresolvedReference { reference: String, location: String },

    #[error("duplicate operation {key}: {first} and {second}")]
    DuplicateOperation {
        key: String,
        first: String,
        second: String,
    },
}

impl SpecLoadError {
    pub fn malformed(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            location: location.into(),
            reason: reason.into(),
        }
    }

    pub fn unresolved(reference: impl Into<String>, location: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            reference: reference.into(),
            location: location.into(),
        }
    }
}
