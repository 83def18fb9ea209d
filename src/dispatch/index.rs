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

//! Per-method segment trie over path templates.
//!
//! Lookup walks one trie level per request segment. At every level the
//! literal child is tried first, then mixed pattern children, then the bare
//! placeholder child, and every full match is returned together with its
//! specificity so the matcher can pick the winner and spot ties.

use crate::spec::template::{normalize_path, split_segments, PatternSegment, Segment};
use crate::spec::{OperationDescriptor, SpecLoadError, SpecificationModel};
use http::Method;
use percent_encoding::percent_decode_str;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct Node {
    literals: HashMap<String, Node>,
    patterns: Vec<(PatternSegment, Node)>,
    param: Option<Box<Node>>,
    operation: Option<usize>,
}

impl Node {
    fn child_for(&mut self, segment: &Segment) -> &mut Node {
        match segment {
            Segment::Literal(text) => self.literals.entry(text.clone()).or_default(),
            Segment::Param(_) => self.param.get_or_insert_with(Default::default),
            Segment::Pattern(pattern) => {
                let position = self
                    .patterns
                    .iter()
                    .position(|(existing, _)| existing.shape() == pattern.shape());
                let position = match position {
                    Some(position) => position,
                    None => {
                        self.patterns.push((pattern.clone(), Node::default()));
                        self.patterns.len() - 1
                    }
                };
                &mut self.patterns[position].1
            }
        }
    }
}

/// One operation whose template fits a concrete path.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub operation: Arc<OperationDescriptor>,
    /// Placeholder bindings in template order, percent-decoded.
    pub path_params: Vec<(String, String)>,
    /// Segment ranks from the first segment on: 2 literal, 1 pattern, 0 placeholder.
    pub specificity: Vec<u8>,
}

pub struct OperationIndex {
    model: SpecificationModel,
    roots: HashMap<Method, Node>,
}

impl OperationIndex {
    /// Takes ownership of the model; it is never mutated afterwards.
    pub fn build(model: SpecificationModel) -> Result<Self, SpecLoadError> {
        let mut roots: HashMap<Method, Node> = HashMap::new();

        for (position, operation) in model.operations.iter().enumerate() {
            let mut node = roots.entry(operation.method.clone()).or_default();
            for segment in operation.path.segments() {
                node = node.child_for(segment);
            }

            if let Some(existing) = node.operation {
                let first = &model.operations[existing];
                return Err(SpecLoadError::DuplicateOperation {
                    key: format!("{} {}", operation.method, operation.path.shape_key()),
                    first: first.operation_id.clone(),
                    second: operation.operation_id.clone(),
                });
            }
            node.operation = Some(position);
        }

        Ok(Self { model, roots })
    }

    pub fn model(&self) -> &SpecificationModel {
        &self.model
    }

    pub fn operations(&self) -> &[Arc<OperationDescriptor>] {
        &self.model.operations
    }

    pub fn len(&self) -> usize {
        self.model.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.model.operations.is_empty()
    }

    /// All operations matching `method` + `path`, most specific first.
    pub fn lookup(&self, method: &Method, path: &str) -> Vec<Candidate> {
        let Some(root) = self.roots.get(method) else {
            return Vec::new();
        };

        let normalized = normalize_path(path);
        let segments: Vec<String> = split_segments(&normalized)
            .into_iter()
            .map(|s| percent_decode_str(s).decode_utf8_lossy().into_owned())
            .collect();

        let mut found = Vec::new();
        let mut ranks = Vec::with_capacity(segments.len());
        collect(root, &segments, &mut ranks, &mut found);

        let mut candidates: Vec<Candidate> = found
            .into_iter()
            .map(|(position, specificity)| {
                let operation = self.model.operations[position].clone();
                let path_params = bind_params(&operation, &segments);
                Candidate {
                    operation,
                    path_params,
                    specificity,
                }
            })
            .collect();

        // Lexicographic: the first segment where two candidates differ decides.
        candidates.sort_by(|a, b| b.specificity.cmp(&a.specificity));
        candidates
    }
}

fn collect(node: &Node, segments: &[String], ranks: &mut Vec<u8>, found: &mut Vec<(usize, Vec<u8>)>) {
    let Some((segment, rest)) = segments.split_first() else {
        if let Some(position) = node.operation {
            found.push((position, ranks.clone()));
        }
        return;
    };

    if let Some(child) = node.literals.get(segment) {
        ranks.push(2);
        collect(child, rest, ranks, found);
        ranks.pop();
    }

    for (pattern, child) in &node.patterns {
        if pattern.captures(segment).is_some() {
            ranks.push(1);
            collect(child, rest, ranks, found);
            ranks.pop();
        }
    }

    if let Some(child) = &node.param {
        ranks.push(0);
        collect(child, rest, ranks, found);
        ranks.pop();
    }
}

fn bind_params(operation: &OperationDescriptor, segments: &[String]) -> Vec<(String, String)> {
    let mut params = Vec::new();
    for (template_segment, value) in operation.path.segments().iter().zip(segments) {
        match template_segment {
            Segment::Literal(_) => {}
            Segment::Param(name) => params.push((name.clone(), value.clone())),
            Segment::Pattern(pattern) => {
                if let Some(bindings) = pattern.captures(value) {
                    params.extend(bindings);
                }
            }
        }
    }
    params
}
