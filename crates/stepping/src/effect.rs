//! Event and effect records.

use capability::{Actor, Fault, Value};

/// A message waiting for, or taken up by, its target.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub target: Actor,
    pub message: Value,
}

impl Event {
    pub fn new(target: Actor, message: Value) -> Self {
        Self { target, message }
    }

    fn to_value(&self, behavior: Option<&str>) -> Value {
        let mut context = Value::map([("self", &self.target)]);
        if let Some(name) = behavior {
            context.insert("behavior", name);
        }
        Value::map([("message", self.message.clone()), ("context", context)])
    }
}

/// What happened while processing one event, or between events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Effect {
    /// The event that was dispatched. `None` for activity outside dispatch.
    pub event: Option<Event>,
    /// Behavior that processed the event.
    pub behavior: Option<String>,
    pub created: Vec<Actor>,
    pub sent: Vec<Event>,
    /// Replacement behavior installed by the event.
    pub became: Option<String>,
    pub exception: Option<Fault>,
}

impl Effect {
    pub fn is_empty(&self) -> bool {
        self.event.is_none() && self.created.is_empty() && self.sent.is_empty()
    }

    /// Render the effect as a message value.
    ///
    /// Behaviors are reported by name; the actors themselves are included
    /// as references.
    pub fn to_value(&self) -> Value {
        let created = self
            .created
            .iter()
            .map(|actor| {
                Value::map([
                    ("self", Value::from(actor)),
                    ("behavior", Value::from(actor.behavior().name())),
                ])
            })
            .collect::<Vec<_>>();
        let sent = self
            .sent
            .iter()
            .map(|event| event.to_value(None))
            .collect::<Vec<_>>();

        Value::map([
            (
                "event",
                self.event
                    .as_ref()
                    .map_or(Value::Null, |e| e.to_value(self.behavior.as_deref())),
            ),
            ("behavior", Value::from(self.behavior.clone())),
            ("created", Value::List(created)),
            ("sent", Value::List(sent)),
            ("became", Value::from(self.became.clone())),
            ("exception", Value::from(self.exception.clone())),
        ])
    }
}
