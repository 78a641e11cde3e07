//! Core data model: flattened properties and per-column statistics.
//!
//! Every input format is reduced to a stream of [`FlattenedRecord`]s, each an ordered list of
//! [`FlatProperty`]s named by their dotted path (e.g. `address.city`). The schema collection pass
//! summarizes that stream into one [`PropertyInfo`] per column.

use serde::Serialize;

/// Placeholder written for array-valued properties; items are never expanded.
pub const ARRAY_PLACEHOLDER: &str = "[...]";
/// Placeholder written for object-valued properties.
pub const OBJECT_PLACEHOLDER: &str = "{...}";

/// The value of one flattened field.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Any numeric value.
    Number(f64),
    /// UTF-8 text.
    String(String),
    /// Boolean.
    Boolean(bool),
    /// Explicit null.
    Null,
    /// An array-valued field. Items are reserved and currently always empty.
    Array(Vec<String>),
    /// An object-valued field. Flattening never produces this (objects are expanded into
    /// dotted paths); it exists so the model can describe opaque structures.
    Object(Vec<(String, String)>),
    /// A spreadsheet formula (or error marker); never the computed value.
    Expression(String),
}

impl PropertyValue {
    /// Width this value contributes to a column's `max_length`.
    pub fn serialized_len(&self) -> usize {
        match self {
            PropertyValue::Number(n) => format_number(*n).len(),
            PropertyValue::String(s) | PropertyValue::Expression(s) => s.chars().count(),
            PropertyValue::Boolean(_) => 5,
            PropertyValue::Null => 4,
            PropertyValue::Array(_) | PropertyValue::Object(_) => 2,
        }
    }

    /// Short lowercase name of the variant, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            PropertyValue::Number(_) => "number",
            PropertyValue::String(_) => "string",
            PropertyValue::Boolean(_) => "boolean",
            PropertyValue::Null => "null",
            PropertyValue::Array(_) => "array",
            PropertyValue::Object(_) => "object",
            PropertyValue::Expression(_) => "expression",
        }
    }
}

/// Plain textual form of a number: integral values print without a fraction (`8001`, not `8001.0`).
pub fn format_number(n: f64) -> String {
    n.to_string()
}

/// One named field of one record.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatProperty {
    /// Dotted path, never empty.
    pub name: String,
    /// Field value.
    pub value: PropertyValue,
}

impl FlatProperty {
    /// Create a new property.
    pub fn new(name: impl Into<String>, value: PropertyValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// One source record (JSON object, spreadsheet row) as an ordered list of properties.
///
/// Names are unique within a record, but two records of the same source may carry different
/// sets of names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlattenedRecord {
    /// Properties in source order.
    pub properties: Vec<FlatProperty>,
}

impl FlattenedRecord {
    /// Create a record from properties.
    pub fn new(properties: Vec<FlatProperty>) -> Self {
        Self { properties }
    }

    /// Look up a property by its dotted name.
    pub fn get(&self, name: &str) -> Option<&FlatProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Iterate property names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|p| p.name.as_str())
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether the record has no properties.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// Per-variant counters for one column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TypesCount {
    pub string: usize,
    pub number: usize,
    pub boolean: usize,
    /// Reserved; no source currently yields temporal values.
    pub datetime: usize,
    pub null: usize,
    pub object: usize,
    pub array: usize,
    pub expression: usize,
}

impl TypesCount {
    /// Sum of all counters.
    pub fn total(&self) -> usize {
        self.string
            + self.number
            + self.boolean
            + self.datetime
            + self.null
            + self.object
            + self.array
            + self.expression
    }

    pub(crate) fn count(&mut self, value: &PropertyValue) {
        match value {
            PropertyValue::Number(_) => self.number += 1,
            PropertyValue::String(_) => self.string += 1,
            PropertyValue::Boolean(_) => self.boolean += 1,
            PropertyValue::Null => self.null += 1,
            PropertyValue::Array(_) => self.array += 1,
            PropertyValue::Object(_) => self.object += 1,
            PropertyValue::Expression(_) => self.expression += 1,
        }
    }
}

/// Running statistics for one column, keyed by property name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyInfo {
    /// Column name (the dotted property path).
    pub name: String,
    /// How many values of each kind were seen.
    pub types: TypesCount,
    /// Longest serialized value seen.
    pub max_length: usize,
}

impl PropertyInfo {
    /// Create an empty column summary.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: TypesCount::default(),
            max_length: 0,
        }
    }

    pub(crate) fn observe(&mut self, value: &PropertyValue) {
        self.types.count(value);
        self.max_length = self.max_length.max(value.serialized_len());
    }
}
