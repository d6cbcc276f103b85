//! Normalized failure records.

use std::any::Any;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Value;

/// A failure as it is allowed to cross a capability boundary.
///
/// Only the message and a rendered stack survive. The original error value,
/// and anything it references, stays on the side that raised it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct Fault {
    pub message: String,
    pub stack: String,
}

impl Fault {
    pub fn new(message: impl Into<String>, stack: impl Into<String>) -> Self {
        let message = message.into();
        let mut stack = stack.into();
        if stack.is_empty() {
            stack = format!("Error: {message}");
        }
        Self { message, stack }
    }

    /// Convert an error raised at `frame` into a fault.
    ///
    /// An error that already is a fault passes through unchanged.
    pub fn from_error(err: &anyhow::Error, frame: &str) -> Self {
        if let Some(fault) = err.downcast_ref::<Fault>() {
            return fault.clone();
        }
        Self::new(err.to_string(), format!("Error: {err:?}\n    at {frame}"))
    }

    /// Convert a caught panic payload into a fault.
    pub fn from_panic(payload: Box<dyn Any + Send>, frame: &str) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "behavior panicked".to_string()
        };
        let stack = format!("Panic: {message}\n    at {frame}");
        Self::new(message, stack)
    }

    /// Rebuild a fault from an arbitrary value, keeping only `message` and
    /// `stack`.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Map(_) => {
                let message = value.get("message").and_then(Value::as_str).unwrap_or("");
                let stack = value.get("stack").and_then(Value::as_str).unwrap_or("");
                Self::new(message, stack)
            }
            Value::String(s) => Self::new(s.clone(), ""),
            other => Self::new(format!("{} failure", other.kind()), ""),
        }
    }
}

impl From<Fault> for Value {
    fn from(fault: Fault) -> Self {
        Value::map([("message", fault.message), ("stack", fault.stack)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_error_keeps_message_and_renders_stack() {
        let err = anyhow::anyhow!("boom!");
        let fault = Fault::from_error(&err, "failBeh");
        assert_eq!(fault.message, "boom!");
        assert!(fault.stack.contains("at failBeh"));
    }

    #[test]
    fn existing_fault_passes_through() {
        let inner = Fault::new("boom!", "Error: boom!\n    at inner");
        let err = anyhow::Error::new(inner.clone());
        assert_eq!(Fault::from_error(&err, "outer"), inner);
    }

    #[test]
    fn from_value_drops_extra_fields() {
        let value = Value::map([
            ("message", Value::from("boom!")),
            ("stack", Value::from("at sandbox")),
            ("secret", Value::from("internal")),
        ]);
        let normalized = Value::from(Fault::from_value(&value));
        assert_eq!(normalized.get("secret"), None);
        assert_eq!(normalized.get("message"), Some(&Value::from("boom!")));
    }

    #[test]
    fn stack_is_never_empty() {
        let fault = Fault::new("boom!", "");
        assert_eq!(fault.stack, "Error: boom!");
    }

    #[test]
    fn panic_payloads_become_messages() {
        let payload: Box<dyn Any + Send> = Box::new("kaput");
        let fault = Fault::from_panic(payload, "behavior");
        assert_eq!(fault.message, "kaput");
    }
}
