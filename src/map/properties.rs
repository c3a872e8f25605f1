//! Typed custom properties attached to maps, layers, tiles and objects

use std::collections::BTreeMap;

use glam::Vec4;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    Int(i64),
    Float(f32),
    Bool(bool),
    String(String),
    /// RGBA, components in 0..=1
    Color(Vec4),
    /// Reference to another object by id
    Object(u32),
}

/// Property bag queried with an explicit type and default
///
/// A missing property and a property of the wrong type both yield the
/// default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties(BTreeMap<String, PropertyValue>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: PropertyValue) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get_int(&self, name: &str, default: i64) -> i64 {
        match self.get(name) {
            Some(PropertyValue::Int(v)) => *v,
            _ => default,
        }
    }

    /// Int values are accepted as floats
    pub fn get_float(&self, name: &str, default: f32) -> f32 {
        match self.get(name) {
            Some(PropertyValue::Float(v)) => *v,
            Some(PropertyValue::Int(v)) => *v as f32,
            _ => default,
        }
    }

    pub fn get_bool(&self, name: &str, default: bool) -> bool {
        match self.get(name) {
            Some(PropertyValue::Bool(v)) => *v,
            _ => default,
        }
    }

    pub fn get_string<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        match self.get(name) {
            Some(PropertyValue::String(v)) => v,
            _ => default,
        }
    }

    pub fn get_color(&self, name: &str, default: Vec4) -> Vec4 {
        match self.get(name) {
            Some(PropertyValue::Color(v)) => *v,
            _ => default,
        }
    }
}
