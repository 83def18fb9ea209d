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

use crate::dispatch::index::OperationIndex;
use crate::spec::OperationDescriptor;
use http::Method;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum MatchResult {
    Matched {
        operation: Arc<OperationDescriptor>,
        path_params: HashMap<String, String>,
    },
    Unmatched,
    /// Several operations fit equally well; a defect of the loaded document.
    AmbiguousMatch {
        candidates: Vec<Arc<OperationDescriptor>>,
    },
}

impl MatchResult {
    pub fn is_matched(&self) -> bool {
        matches!(self, MatchResult::Matched { .. })
    }
}

#[derive(Clone)]
pub struct RequestMatcher {
    index: Arc<OperationIndex>,
}

impl RequestMatcher {
    pub fn new(index: Arc<OperationIndex>) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &OperationIndex {
        &self.index
    }

    pub fn find_match(&self, method: &Method, path: &str) -> MatchResult {
        let method = canonical_method(method);
        let mut candidates = self.index.lookup(&method, path).into_iter();

        let Some(best) = candidates.next() else {
            return MatchResult::Unmatched;
        };

        let tied: Vec<_> = candidates
            .take_while(|c| c.specificity == best.specificity)
            .map(|c| c.operation)
            .collect();

        if !tied.is_empty() {
            let mut all = Vec::with_capacity(tied.len() + 1);
            all.push(best.operation);
            all.extend(tied);
            return MatchResult::AmbiguousMatch { candidates: all };
        }

        MatchResult::Matched {
            operation: best.operation,
            path_params: best.path_params.into_iter().collect(),
        }
    }
}

/// Upper-cases extension methods such as `get` so they meet the standard ones.
fn canonical_method(method: &Method) -> Method {
    let upper = method.as_str().to_ascii_uppercase();
    if upper == method.as_str() {
        return method.clone();
    }
    Method::from_bytes(upper.as_bytes()).unwrap_or_else(|_| method.clone())
}
