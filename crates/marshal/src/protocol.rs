//! Wire format (JSON based).
//!
//! Plain data maps onto JSON directly. Actor references travel as
//! `{"$actor": "<uri>"}`; a map whose keys start with `$` is wrapped as
//! `{"$map": {...}}` so it cannot be mistaken for a reference.

use capability::{Actor, Value};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use crate::{Error, Result};

const ACTOR_TAG: &str = "$actor";
const MAP_TAG: &str = "$map";

/// A message in transit between domains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// URI of the destination capability.
    pub address: String,
    /// Encoded message.
    pub content: String,
}

impl Envelope {
    pub fn new(address: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            content: content.into(),
        }
    }

    pub fn to_value(&self) -> Value {
        Value::map([
            ("address", self.address.as_str()),
            ("content", self.content.as_str()),
        ])
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        Ok(Self {
            address: value.require_str("address")?.to_string(),
            content: value.require_str("content")?.to_string(),
        })
    }
}

/// Encode a value, naming each actor with `name`.
pub fn to_wire(value: &Value, name: &mut dyn FnMut(&Actor) -> String) -> Result<Json> {
    Ok(match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(n) => Json::from(*n),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(Json::Number)
            .ok_or(Error::NonFiniteNumber(*f))?,
        Value::String(s) => Json::String(s.clone()),
        Value::List(items) => Json::Array(
            items
                .iter()
                .map(|item| to_wire(item, name))
                .collect::<Result<_>>()?,
        ),
        Value::Map(map) => {
            let mut object = Map::with_capacity(map.len());
            for (key, item) in map {
                object.insert(key.clone(), to_wire(item, name)?);
            }
            if map.keys().any(|key| key.starts_with('$')) {
                let mut wrapper = Map::with_capacity(1);
                wrapper.insert(MAP_TAG.to_string(), Json::Object(object));
                Json::Object(wrapper)
            } else {
                Json::Object(object)
            }
        }
        Value::Actor(actor) => {
            let mut object = Map::with_capacity(1);
            object.insert(ACTOR_TAG.to_string(), Json::String(name(actor)));
            Json::Object(object)
        }
    })
}

/// Decode a value, resolving each actor URI with `resolve`.
pub fn from_wire(json: Json, resolve: &mut dyn FnMut(&str) -> Result<Actor>) -> Result<Value> {
    Ok(match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(
                n.as_f64()
                    .ok_or_else(|| Error::Decode(format!("unrepresentable number {n}")))?,
            ),
        },
        Json::String(s) => Value::String(s),
        Json::Array(items) => Value::List(
            items
                .into_iter()
                .map(|item| from_wire(item, resolve))
                .collect::<Result<_>>()?,
        ),
        Json::Object(mut object) => {
            if object.len() == 1 {
                if let Some(tagged) = object.remove(ACTOR_TAG) {
                    let uri = tagged
                        .as_str()
                        .ok_or_else(|| Error::Decode("actor reference is not a string".into()))?;
                    return Ok(Value::Actor(resolve(uri)?));
                }
                if let Some(Json::Object(inner)) = object.remove(MAP_TAG) {
                    object = inner;
                }
            }
            Value::Map(
                object
                    .into_iter()
                    .map(|(key, item)| Ok((key, from_wire(item, resolve)?)))
                    .collect::<Result<_>>()?,
            )
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use capability::Behavior;
    use pretty_assertions::assert_eq;
    use stepping::Stepping;

    #[test]
    fn plain_data_is_plain_json() {
        let value = Value::map([
            ("count", Value::from(3)),
            ("ratio", Value::from(0.5)),
            ("tags", Value::List(vec!["a".into(), Value::Null])),
        ]);
        let json = to_wire(&value, &mut |_| unreachable!()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"count": 3, "ratio": 0.5, "tags": ["a", null]})
        );
    }

    #[test]
    fn actor_references_are_tagged() {
        let stepping = Stepping::new();
        let actor = stepping.sponsor(Behavior::new("sink", |_, _| Ok(())));
        let value = Value::map([("customer", &actor)]);

        let json = to_wire(&value, &mut |_| "ocap://test/abc".to_string()).unwrap();
        assert_eq!(json, serde_json::json!({"customer": {"$actor": "ocap://test/abc"}}));

        let back = from_wire(json, &mut |uri| {
            assert_eq!(uri, "ocap://test/abc");
            Ok(actor.clone())
        })
        .unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn dollar_keys_survive() {
        let value = Value::map([("$actor", "not a reference")]);
        let json = to_wire(&value, &mut |_| unreachable!()).unwrap();
        let back = from_wire(json, &mut |_| unreachable!()).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn non_finite_floats_are_rejected() {
        let err = to_wire(&Value::Float(f64::NAN), &mut |_| unreachable!()).unwrap_err();
        assert!(matches!(err, Error::NonFiniteNumber(_)));
    }

    #[test]
    fn envelope_round_trip_through_value() {
        let envelope = Envelope::new("ocap://test/abc", "{}");
        assert_eq!(Envelope::from_value(&envelope.to_value()).unwrap(), envelope);
        assert!(Envelope::from_value(&Value::Null).is_err());
    }
}
