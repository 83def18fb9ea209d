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

//! Path templates such as `/users/{id}` or `/reports/{year}-{month}.csv`.

use regex::Regex;
use std::collections::HashSet;
use std::fmt;

/// One `/`-separated piece of a path template.
#[derive(Debug, Clone)]
pub enum Segment {
    /// Matches only the exact same text.
    Literal(String),
    /// `{name}`: matches any non-empty segment.
    Param(String),
    /// Literal text mixed with placeholders, e.g. `{name}.json`.
    Pattern(PatternSegment),
}

impl Segment {
    /// Rank used for precedence: literal > pattern > bare placeholder.
    pub fn rank(&self) -> u8 {
        match self {
            Segment::Literal(_) => 2,
            Segment::Pattern(_) => 1,
            Segment::Param(_) => 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PatternSegment {
    shape: String,
    names: Vec<String>,
    regex: Regex,
}

impl PatternSegment {
    /// The segment with placeholder names erased, e.g. `{}.json`.
    pub fn shape(&self) -> &str {
        &self.shape
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Returns the placeholder bindings when `segment` fits the pattern.
    pub fn captures(&self, segment: &str) -> Option<Vec<(String, String)>> {
        let captures = self.regex.captures(segment)?;
        let bindings = self
            .names
            .iter()
            .enumerate()
            .filter_map(|(i, name)| {
                captures
                    .get(i + 1)
                    .map(|m| (name.clone(), m.as_str().to_string()))
            })
            .collect();
        Some(bindings)
    }
}

#[derive(Debug, Clone)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn parse(raw: &str) -> Result<Self, String> {
        if !raw.starts_with('/') {
            return Err(format!("path template '{}' must start with '/'", raw));
        }

        let normalized = normalize_path(raw);
        let mut seen = HashSet::new();
        let mut segments = Vec::new();

        for piece in split_segments(&normalized) {
            let segment = parse_segment(piece)?;
            let names: Vec<&str> = match &segment {
                Segment::Literal(_) => Vec::new(),
                Segment::Param(name) => vec![name.as_str()],
                Segment::Pattern(pattern) => pattern.names.iter().map(String::as_str).collect(),
            };
            for name in names {
                if !seen.insert(name.to_string()) {
                    return Err(format!(
                        "placeholder '{}' appears more than once in '{}'",
                        name, raw
                    ));
                }
            }
            segments.push(segment);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Placeholder names in template order.
    pub fn param_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(_) => {}
                Segment::Param(name) => names.push(name.as_str()),
                Segment::Pattern(pattern) => {
                    names.extend(pattern.names.iter().map(String::as_str))
                }
            }
        }
        names
    }

    /// Identity of the template for uniqueness checks: placeholder names are
    /// erased, so `/users/{id}` and `/users/{uid}` share a shape.
    pub fn shape_key(&self) -> String {
        if self.segments.is_empty() {
            return "/".to_string();
        }
        let mut key = String::new();
        for segment in &self.segments {
            key.push('/');
            match segment {
                Segment::Literal(text) => key.push_str(text),
                Segment::Param(_) => key.push_str("{}"),
                Segment::Pattern(pattern) => key.push_str(&pattern.shape),
            }
        }
        key
    }

    /// Builds a concrete path by substituting every placeholder.
    pub fn instantiate<F>(&self, mut value_for: F) -> String
    where
        F: FnMut(&str) -> String,
    {
        if self.segments.is_empty() {
            return "/".to_string();
        }
        let mut path = String::new();
        for segment in &self.segments {
            path.push('/');
            match segment {
                Segment::Literal(text) => path.push_str(text),
                Segment::Param(name) => path.push_str(&value_for(name)),
                Segment::Pattern(pattern) => {
                    let mut rendered = pattern.shape.clone();
                    for name in &pattern.names {
                        rendered = rendered.replacen("{}", &value_for(name), 1);
                    }
                    path.push_str(&rendered);
                }
            }
        }
        path
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse_segment(piece: &str) -> Result<Segment, String> {
    if !piece.contains('{') && !piece.contains('}') {
        return Ok(Segment::Literal(piece.to_string()));
    }

    if piece.starts_with('{')
        && piece.ends_with('}')
        && piece.matches('{').count() == 1
        && piece.matches('}').count() == 1
    {
        let name = &piece[1..piece.len() - 1];
        if name.is_empty() {
            return Err(format!("empty placeholder in segment '{}'", piece));
        }
        return Ok(Segment::Param(name.to_string()));
    }

    let mut shape = String::new();
    let mut pattern = String::from("^");
    let mut names = Vec::new();
    let mut rest = piece;

    while let Some(open) = rest.find('{') {
        let literal = &rest[..open];
        if literal.contains('}') {
            return Err(format!("unbalanced '}}' in segment '{}'", piece));
        }
        shape.push_str(literal);
        pattern.push_str(&regex::escape(literal));

        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| format!("unclosed '{{' in segment '{}'", piece))?;
        let name = &after[..close];
        if name.is_empty() || name.contains('{') {
            return Err(format!("invalid placeholder in segment '{}'", piece));
        }
        shape.push_str("{}");
        pattern.push_str("(.+?)");
        names.push(name.to_string());
        rest = &after[close + 1..];
    }

    if rest.contains('}') {
        return Err(format!("unbalanced '}}' in segment '{}'", piece));
    }
    shape.push_str(rest);
    pattern.push_str(&regex::escape(rest));
    pattern.push('$');

    let regex = Regex::new(&pattern)
        .map_err(|e| format!("segment '{}' cannot be compiled: {}", piece, e))?;

    Ok(Segment::Pattern(PatternSegment {
        shape,
        names,
        regex,
    }))
}

/// Collapses repeated slashes and drops a trailing slash.
pub fn normalize_path(path: &str) -> String {
    let mut normalized = String::new();
    let mut last_was_slash = false;

    for c in path.chars() {
        if c == '/' {
            if !last_was_slash {
                normalized.push(c);
                last_was_slash = true;
            }
        } else {
            normalized.push(c);
            last_was_slash = false;
        }
    }

    if normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }

    if normalized.is_empty() || !normalized.starts_with('/') {
        normalized.insert(0, '/');
    }
    normalized
}

/// Splits a normalized path into its segments; `/` has none.
pub fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}
