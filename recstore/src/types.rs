use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bail;
use crate::error::{ErrorKind, StoreResult};

/// Suffix appended to a field name to derive its index name.
pub const INDEX_NAME_SUFFIX: &str = "_idx";

/// Caller-supplied part of a [`Key`], unique within a set.
///
/// Integers order before strings, which fixes the order in which query matches are returned.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Int(i64),
    Str(String),
}

impl Identifier {
    /// Type-tagged encoding used in store keys, so `1` and `"1"` never collide.
    pub fn token(&self) -> String {
        match self {
            Identifier::Int(value) => format!("i:{value}"),
            Identifier::Str(value) => format!("s:{value}"),
        }
    }

    /// Inverse of [`Identifier::token`].
    pub fn from_token(token: &str) -> Option<Identifier> {
        let (tag, raw) = token.split_once(':')?;
        match tag {
            "i" => raw.parse().ok().map(Identifier::Int),
            "s" => Some(Identifier::Str(raw.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Int(value) => write!(f, "{value}"),
            Identifier::Str(value) => f.write_str(value),
        }
    }
}

impl From<i64> for Identifier {
    fn from(value: i64) -> Self {
        Identifier::Int(value)
    }
}

impl From<u32> for Identifier {
    fn from(value: u32) -> Self {
        Identifier::Int(i64::from(value))
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Identifier::Str(value.to_string())
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Identifier::Str(value)
    }
}

/// Address of one record: `(namespace, set, identifier)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key {
    pub namespace: String,
    pub set: String,
    pub id: Identifier,
}

impl Key {
    pub fn new(namespace: impl Into<String>, set: impl Into<String>, id: impl Into<Identifier>) -> Self {
        Self {
            namespace: namespace.into(),
            set: set.into(),
            id: id.into(),
        }
    }

    /// Rejects keys the store cannot address.
    pub fn validate(&self) -> StoreResult<()> {
        if self.namespace.is_empty() {
            bail!(ErrorKind::InvalidKey, "key namespace is empty", self);
        }
        if self.set.is_empty() {
            bail!(ErrorKind::InvalidKey, "key set is empty", self);
        }
        if matches!(&self.id, Identifier::Str(id) if id.is_empty()) {
            bail!(ErrorKind::InvalidKey, "key identifier is empty", self);
        }

        Ok(())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.namespace, self.set, self.id)
    }
}

/// A scalar field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    /// Type-tagged encoding used for index entries.
    pub fn token(&self) -> String {
        match self {
            Value::Bool(value) => format!("b:{value}"),
            Value::Int(value) => format!("i:{value}"),
            Value::Float(value) => format!("f:{value:?}"),
            Value::Str(value) => format!("s:{value}"),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(value) => write!(f, "{value}"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value}"),
            Value::Str(value) => f.write_str(value),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

/// Field name to value mapping stored under one [`Key`].
///
/// Writing a record replaces every field previously stored under its key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Rejects values that would not read back as written. JSON has no NaN or infinity.
    pub fn validate(&self) -> StoreResult<()> {
        for (field, value) in &self.0 {
            if let Value::Float(float) = value {
                if !float.is_finite() {
                    bail!(
                        ErrorKind::SerializationError,
                        "record holds a non-finite float",
                        format!("field `{field}` is {float}")
                    );
                }
            }
        }

        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Keeps only `fields`. An empty slice keeps everything.
    pub fn project(mut self, fields: &[&str]) -> Record {
        if !fields.is_empty() {
            self.0.retain(|name, _| fields.contains(&name.as_str()));
        }
        self
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Record(
            iter.into_iter()
                .map(|(field, value)| (field.into(), value.into()))
                .collect(),
        )
    }
}

/// An equality index over one field of one set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexSpec {
    pub namespace: String,
    pub set: String,
    pub field: String,
    pub name: String,
}

impl IndexSpec {
    /// Describes the index on `field`, named `{field}_idx`.
    pub fn new(namespace: impl Into<String>, set: impl Into<String>, field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            namespace: namespace.into(),
            set: set.into(),
            name: format!("{field}{INDEX_NAME_SUFFIX}"),
            field,
        }
    }
}
