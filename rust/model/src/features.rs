// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed key-value features that can be attached to any model object.
//!
//! Every value carries its type tag; typed reads check the tag and never
//! coerce between types.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Feature name under which CAD tools store their own object id.
pub const CAD_OBJECT_ID: &str = "CADObjectId";

/// A typed value stored in a feature bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeatureValue {
    String(String),
    Double(f64),
    Integer(i64),
    Boolean(bool),
}

impl FeatureValue {
    /// Returns the tag name.
    pub fn type_name(&self) -> &'static str {
        match self {
            FeatureValue::String(_) => "String",
            FeatureValue::Double(_) => "Double",
            FeatureValue::Integer(_) => "Integer",
            FeatureValue::Boolean(_) => "Boolean",
        }
    }
}

/// Named, typed features of one object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureBag {
    values: FxHashMap<String, FeatureValue>,
}

impl FeatureBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn has_feature(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Feature names in sorted order.
    pub fn feature_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.values.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.values.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: FeatureValue) {
        self.values.insert(name.into(), value);
    }

    pub fn set_string(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.set(name, FeatureValue::String(value.into()));
    }

    pub fn set_double(&mut self, name: impl Into<String>, value: f64) {
        self.set(name, FeatureValue::Double(value));
    }

    pub fn set_integer(&mut self, name: impl Into<String>, value: i64) {
        self.set(name, FeatureValue::Integer(value));
    }

    pub fn set_boolean(&mut self, name: impl Into<String>, value: bool) {
        self.set(name, FeatureValue::Boolean(value));
    }

    pub fn remove(&mut self, name: &str) -> Option<FeatureValue> {
        self.values.remove(name)
    }

    fn typed<'a, T>(
        &'a self,
        name: &str,
        expected: &'static str,
        read: impl FnOnce(&'a FeatureValue) -> Option<T>,
    ) -> Result<T> {
        let value = self
            .values
            .get(name)
            .ok_or_else(|| Error::FeatureNotFound(name.to_string()))?;
        read(value).ok_or_else(|| Error::FeatureType {
            name: name.to_string(),
            expected,
            found: value.type_name(),
        })
    }

    pub fn get_string(&self, name: &str) -> Result<&str> {
        self.typed(name, "String", |v| match v {
            FeatureValue::String(s) => Some(s.as_str()),
            _ => None,
        })
    }

    pub fn get_double(&self, name: &str) -> Result<f64> {
        self.typed(name, "Double", |v| match v {
            FeatureValue::Double(d) => Some(*d),
            _ => None,
        })
    }

    pub fn get_integer(&self, name: &str) -> Result<i64> {
        self.typed(name, "Integer", |v| match v {
            FeatureValue::Integer(i) => Some(*i),
            _ => None,
        })
    }

    pub fn get_boolean(&self, name: &str) -> Result<bool> {
        self.typed(name, "Boolean", |v| match v {
            FeatureValue::Boolean(b) => Some(*b),
            _ => None,
        })
    }
}
