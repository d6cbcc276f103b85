//! Dynamic message values.

use std::collections::BTreeMap;

use crate::{Actor, Error, Result};

/// A message exchanged between actors.
///
/// Values are plain data plus actor references. Actors are the only way a
/// value can carry authority.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Actor(Actor),
}

impl Value {
    /// Build a map value from key/value pairs.
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Short name of the variant, used in error messages and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Actor(_) => "actor",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Look up a field of a map value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(key),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        match self {
            Value::Map(map) => map.get_mut(key),
            _ => None,
        }
    }

    /// Insert a field, turning a null value into an empty map first.
    ///
    /// Returns `false` if the value is neither a map nor null.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        if self.is_null() {
            *self = Value::Map(BTreeMap::new());
        }
        match self {
            Value::Map(map) => {
                map.insert(key.into(), value.into());
                true
            }
            _ => false,
        }
    }

    pub fn as_actor(&self) -> Option<&Actor> {
        match self {
            Value::Actor(actor) => Some(actor),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Read an actor field that must be present.
    pub fn require_actor(&self, field: &str) -> Result<&Actor> {
        match self.get(field) {
            None | Some(Value::Null) => Err(Error::MissingField(field.to_string())),
            Some(Value::Actor(actor)) => Ok(actor),
            Some(other) => Err(Error::UnexpectedType {
                field: field.to_string(),
                expected: "actor",
                found: other.kind(),
            }),
        }
    }

    /// Read an actor field that may be absent.
    ///
    /// Any non-actor value is treated as absent, the same way a missing
    /// continuation is.
    pub fn optional_actor(&self, field: &str) -> Option<&Actor> {
        self.get(field).and_then(Value::as_actor)
    }

    /// Read a string field that must be present.
    pub fn require_str(&self, field: &str) -> Result<&str> {
        match self.get(field) {
            None | Some(Value::Null) => Err(Error::MissingField(field.to_string())),
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(Error::UnexpectedType {
                field: field.to_string(),
                expected: "string",
                found: other.kind(),
            }),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Actor> for Value {
    fn from(actor: Actor) -> Self {
        Value::Actor(actor)
    }
}

impl From<&Actor> for Value {
    fn from(actor: &Actor) -> Self {
        Value::Actor(actor.clone())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_promotes_null_to_map() {
        let mut value = Value::Null;
        assert!(value.insert("first", true));
        assert_eq!(value.get("first"), Some(&Value::Bool(true)));
    }

    #[test]
    fn insert_into_scalar_is_refused() {
        let mut value = Value::from("boom!");
        assert!(!value.insert("first", true));
    }

    #[test]
    fn require_str_reports_shape() {
        let value = Value::map([("module", 7)]);
        assert_eq!(
            value.require_str("module"),
            Err(Error::UnexpectedType {
                field: "module".to_string(),
                expected: "string",
                found: "int",
            })
        );
        assert_eq!(
            value.require_str("missing"),
            Err(Error::MissingField("missing".to_string()))
        );
    }

    #[test]
    fn integral_floats_read_as_integers() {
        assert_eq!(Value::Float(3.0).as_i64(), Some(3));
        assert_eq!(Value::Float(3.5).as_i64(), None);
    }
}
