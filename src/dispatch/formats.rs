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

//! Named string formats (`format: email`, `format: date-time`, ...).
//!
//! The built-in set is fixed; deployments add their own formats by
//! registering a predicate under a new name before the dispatcher is built.

use chrono::{DateTime, NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

pub type FormatPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$")
        .expect("email regex is valid")
});

static HOSTNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$")
        .expect("hostname regex is valid")
});

static BASE64: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9+/]{4})*(?:[A-Za-z0-9+/]{2}==|[A-Za-z0-9+/]{3}=)?$")
        .expect("base64 regex is valid")
});

static TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2}:\d{2}:\d{2})(?:\.\d+)?(?:[Zz]|[+-]\d{2}:\d{2})?$")
        .expect("time regex is valid")
});

#[derive(Clone)]
pub struct FormatRegistry {
    predicates: HashMap<String, FormatPredicate>,
}

impl FormatRegistry {
    /// A registry without any format; every format is then ignored.
    pub fn empty() -> Self {
        Self {
            predicates: HashMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry
            .register("date-time", |s| DateTime::parse_from_rfc3339(s).is_ok())
            .register("date", |s| NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok())
            .register("time", is_time)
            .register("email", |s| s.len() <= 254 && EMAIL.is_match(s))
            .register("hostname", |s| s.len() <= 253 && HOSTNAME.is_match(s))
            .register("uuid", |s| uuid::Uuid::parse_str(s).is_ok())
            .register("uri", |s| url::Url::parse(s).is_ok())
            .register("ipv4", |s| s.parse::<Ipv4Addr>().is_ok())
            .register("ipv6", |s| s.parse::<Ipv6Addr>().is_ok())
            .register("byte", |s| BASE64.is_match(s))
            .register("json", |s| serde_json::from_str::<serde_json::Value>(s).is_ok());
        registry
    }

    /// Adds or replaces the predicate for `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, predicate: F) -> &mut Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.predicates.insert(name.into(), Arc::new(predicate));
        self
    }

    pub fn with_format<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.register(name, predicate);
        self
    }

    /// `None` when no predicate is registered under `name`.
    pub fn check(&self, name: &str, value: &str) -> Option<bool> {
        self.predicates.get(name).map(|predicate| predicate(value))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.predicates.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.predicates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("formats", &self.names())
            .finish()
    }
}

fn is_time(value: &str) -> bool {
    TIME.captures(value)
        .and_then(|c| c.get(1))
        .map_or(false, |hms| NaiveTime::parse_from_str(hms.as_str(), "%H:%M:%S").is_ok())
}
