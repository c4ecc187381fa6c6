//! Record data model.
//!
//! A [`Shape`] is the ordered list of named, typed field descriptors shared by
//! every record in a run. It is computed once (from the first record, plus any
//! configured output fields) and held behind an `Arc` — records carry a handle
//! to it, never a copy, and nothing mutates it after the run starts.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

// ── Values ──────────────────────────────────────────────────────────

/// A single positional value in a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Text(String),
    Integer(i64),
    /// Unset — the default for appended output fields that never get filled.
    #[default]
    Null,
}

impl Value {
    /// The text content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// True for `Null` and for empty text.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::Integer(_) => false,
            Self::Null => true,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

// ── Shape ───────────────────────────────────────────────────────────

/// The declared type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Integer,
}

/// A named, typed field descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldDef {
    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Text,
        }
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Integer,
        }
    }
}

/// An ordered list of field descriptors describing a record's layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    fields: Vec<FieldDef>,
}

impl Shape {
    pub fn new(fields: Vec<FieldDef>) -> Self {
        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Zero-based position of the first field with this name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// A new shape with extra fields appended. The receiver is untouched.
    pub fn with_appended(&self, extra: impl IntoIterator<Item = FieldDef>) -> Self {
        let mut fields = self.fields.clone();
        fields.extend(extra);
        Self { fields }
    }
}

// ── Record ──────────────────────────────────────────────────────────

/// An ordered sequence of typed values, positionally indexed against a shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    shape: Arc<Shape>,
    values: Vec<Value>,
}

impl Record {
    /// Build a record over a shape. Missing trailing values are `Null`.
    pub fn new(shape: Arc<Shape>, mut values: Vec<Value>) -> Self {
        values.resize(shape.len(), Value::Null);
        Self { shape, values }
    }

    pub fn shape(&self) -> &Arc<Shape> {
        &self.shape
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, idx: usize) -> &Value {
        &self.values[idx]
    }

    pub fn set(&mut self, idx: usize, value: Value) {
        self.values[idx] = value;
    }

    /// Rebind this record to a wider output shape, padding new positions
    /// with `Null`. The output shape must start with the input shape.
    pub fn resized_to(self, shape: Arc<Shape>) -> Self {
        debug_assert!(shape.len() >= self.values.len());
        Self::new(shape, self.values)
    }
}
