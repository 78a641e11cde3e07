//! JSON tabularizer.
//!
//! The locator is a slash-separated path of object field names (e.g. `/data/children`) leading
//! from the document root to the array that holds the records. `/` or an empty locator means the
//! root itself is that array.
//!
//! The document is streamed: fields off the path are skipped without being built, and each array
//! element is parsed into a tree, flattened and handed to the processor before the next one is
//! read. Nested objects flatten into dotted names (`address.city`); arrays are kept opaque as a
//! single [`PropertyValue::Array`] property.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use serde::de::{self, DeserializeSeed, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde_json::{Map, Value};

use crate::error::{ConvertError, ConvertResult};
use crate::types::{FlatProperty, FlattenedRecord, PropertyValue};

use super::{EntryProcessor, ExportOptions, Tabularizer, convert_to_sibling_csv};

/// Tabularizer for JSON documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTabularizer;

impl JsonTabularizer {
    /// Create a JSON tabularizer.
    pub fn new() -> Self {
        Self
    }

    /// Drive one pass over the records of an already opened JSON stream.
    pub fn visit_entries_from_reader<R: Read>(
        &self,
        reader: R,
        locator: &str,
        processor: &mut dyn EntryProcessor,
    ) -> ConvertResult<()> {
        let segments = parse_items_path(locator);
        let mut failure: Option<WalkFailure> = None;
        let mut de = serde_json::Deserializer::from_reader(reader);

        processor.before_entries()?;
        let seed = SproutSeed {
            remaining: &segments,
            processor: &mut *processor,
            failure: &mut failure,
        };
        if let Err(err) = seed.deserialize(&mut de) {
            return Err(match failure {
                Some(WalkFailure::NotFound { found }) => ConvertError::ItemsArraySproutNotFound {
                    path: display_items_path(&segments),
                    found,
                    line: err.line(),
                    column: err.column(),
                },
                Some(WalkFailure::Processor(inner)) => inner,
                None => ConvertError::Json(err),
            });
        }
        de.end()?;
        processor.after_entries()
    }

    /// Drive one pass over the records of an in-memory JSON document.
    pub fn visit_entries_from_str(
        &self,
        input: &str,
        locator: &str,
        processor: &mut dyn EntryProcessor,
    ) -> ConvertResult<()> {
        self.visit_entries_from_reader(input.as_bytes(), locator, processor)
    }
}

impl Tabularizer for JsonTabularizer {
    fn visit_entries(
        &self,
        input: &Path,
        locator: &str,
        processor: &mut dyn EntryProcessor,
    ) -> ConvertResult<()> {
        let file = File::open(input)?;
        self.visit_entries_from_reader(BufReader::new(file), locator, processor)
    }

    fn convert(&self, input: &Path, locator: &str, options: &ExportOptions) -> ConvertResult<PathBuf> {
        convert_to_sibling_csv(self, input, locator, options).map(|(path, _)| path)
    }
}

/// Split a locator into its field-name steps, ignoring empty segments.
pub fn parse_items_path(locator: &str) -> Vec<String> {
    locator
        .split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn display_items_path(segments: &[String]) -> String {
    format!("/{}", segments.join("/"))
}

/// Flatten one JSON value into a record.
///
/// Non-object values yield an empty record.
pub fn flatten_value(value: &Value) -> ConvertResult<FlattenedRecord> {
    let mut properties = Vec::new();
    match value {
        Value::Object(map) => flatten_object(map, "", &mut properties)?,
        other => tracing::debug!(
            kind = json_kind(other),
            "record is not a JSON object, emitting empty record"
        ),
    }
    Ok(FlattenedRecord::new(properties))
}

fn flatten_object(
    map: &Map<String, Value>,
    prefix: &str,
    out: &mut Vec<FlatProperty>,
) -> ConvertResult<()> {
    for (field, value) in map {
        let name = format!("{prefix}{field}");
        if field.is_empty() {
            tracing::warn!(path = %name, "skipping JSON field with an empty name");
            continue;
        }
        let converted = match value {
            Value::String(s) => PropertyValue::String(s.clone()),
            Value::Number(n) => PropertyValue::Number(n.as_f64().ok_or_else(|| {
                ConvertError::UnsupportedValue {
                    path: name.clone(),
                    message: format!("number {n} is not representable as f64"),
                }
            })?),
            Value::Bool(b) => PropertyValue::Boolean(*b),
            Value::Null => PropertyValue::Null,
            Value::Array(_) => PropertyValue::Array(Vec::new()),
            Value::Object(inner) => {
                flatten_object(inner, &format!("{name}."), out)?;
                continue;
            }
        };
        out.push(FlatProperty::new(name, converted));
    }
    Ok(())
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Why the walk stopped, kept aside because serde errors only carry a message.
enum WalkFailure {
    NotFound { found: String },
    Processor(ConvertError),
}

/// Walks the remaining locator steps, then streams the items array into the processor.
struct SproutSeed<'a, 'p> {
    remaining: &'a [String],
    processor: &'a mut (dyn EntryProcessor + 'p),
    failure: &'a mut Option<WalkFailure>,
}

impl SproutSeed<'_, '_> {
    fn not_found<E: de::Error>(self, found: &str) -> Result<(), E> {
        *self.failure = Some(WalkFailure::NotFound {
            found: found.to_string(),
        });
        Err(E::custom(format!("items array not found, found {found}")))
    }
}

fn fail<E: de::Error>(slot: &mut Option<WalkFailure>, err: ConvertError) -> E {
    let message = err.to_string();
    *slot = Some(WalkFailure::Processor(err));
    E::custom(message)
}

impl<'de> DeserializeSeed<'de> for SproutSeed<'_, '_> {
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> Result<(), D::Error>
    where
        D: de::Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for SproutSeed<'_, '_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.remaining.first() {
            Some(step) => write!(f, "an object with field '{step}'"),
            None => f.write_str("an array of records"),
        }
    }

    fn visit_map<A>(self, mut map: A) -> Result<(), A::Error>
    where
        A: MapAccess<'de>,
    {
        let remaining = self.remaining;
        let Some((step, rest)) = remaining.split_first() else {
            while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
            return self.not_found("an object");
        };

        while let Some(key) = map.next_key::<String>()? {
            if key != *step {
                tracing::trace!(field = %key, expected = %step, "skipping field off the items path");
                map.next_value::<IgnoredAny>()?;
                continue;
            }

            tracing::trace!(field = %key, "following items path");
            map.next_value_seed(SproutSeed {
                remaining: rest,
                processor: self.processor,
                failure: self.failure,
            })?;
            while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
            return Ok(());
        }

        self.not_found(&format!("no field '{step}'"))
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<(), A::Error>
    where
        A: SeqAccess<'de>,
    {
        if !self.remaining.is_empty() {
            while seq.next_element::<IgnoredAny>()?.is_some() {}
            return self.not_found("an array");
        }

        while let Some(item) = seq.next_element::<Value>()? {
            let record = flatten_value(&item).map_err(|e| fail::<A::Error>(self.failure, e))?;
            self.processor
                .process_entry(&record)
                .map_err(|e| fail::<A::Error>(self.failure, e))?;
        }
        Ok(())
    }

    fn visit_bool<E: de::Error>(self, _v: bool) -> Result<(), E> {
        self.not_found("a boolean")
    }

    fn visit_i64<E: de::Error>(self, _v: i64) -> Result<(), E> {
        self.not_found("a number")
    }

    fn visit_u64<E: de::Error>(self, _v: u64) -> Result<(), E> {
        self.not_found("a number")
    }

    fn visit_f64<E: de::Error>(self, _v: f64) -> Result<(), E> {
        self.not_found("a number")
    }

    fn visit_str<E: de::Error>(self, _v: &str) -> Result<(), E> {
        self.not_found("a string")
    }

    fn visit_unit<E: de::Error>(self) -> Result<(), E> {
        self.not_found("null")
    }
}
