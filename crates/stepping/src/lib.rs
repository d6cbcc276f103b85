//! Deterministic, step-by-step actor execution.
//!
//! A [`Stepping`] engine queues every message sent to its actors and runs
//! nothing on its own. The owner decides when to process the next event,
//! and every processed event yields an [`Effect`] describing what it did.
//!
//! # Example
//!
//! ```
//! use capability::{Behavior, Value};
//! use stepping::{EventLoop, Stepping};
//!
//! let stepping = Stepping::new();
//! let greeter = stepping.sponsor(Behavior::new("greeter", |ctx, message| {
//!     if let Some(customer) = message.as_actor() {
//!         ctx.send(customer, "hello");
//!     }
//!     Ok(())
//! }));
//! let customer = stepping.sponsor(Behavior::new("customer", |_, _| Ok(())));
//!
//! greeter.send(Value::from(&customer));
//! let effect = stepping.dispatch().expect("one event is queued");
//! assert_eq!(effect.sent.len(), 1);
//!
//! assert!(stepping.event_loop(EventLoop::new()).expect("no behavior fails"));
//! ```

mod effect;
mod engine;

pub use effect::{Effect, Event};
pub use engine::{EventLoop, Stepping};
