//! Call-style functions as continuation-style behaviors.
//!
//! An adapted behavior expects `{arguments, ok, fail}`. It applies its
//! function to `arguments` and answers exactly once: the result goes to `ok`,
//! a failure goes to `fail` as a `{message, stack}` record. Either
//! continuation may be absent, in which case that answer is lost.

use std::panic::{AssertUnwindSafe, catch_unwind};

use capability::{Actor, Behavior, Context, Fault, Value};
use tracing::{debug, warn};

/// Adapt `f` into a behavior named `name`.
pub fn value_adapter<F>(name: &str, f: F) -> Behavior
where
    F: Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    let frame = name.to_string();
    Behavior::new(name, move |ctx, message| {
        let arguments = arguments(&message);
        let outcome = invoke(&frame, || f(&arguments));
        reply(ctx, &message, outcome);
        Ok(())
    })
}

/// Like [`value_adapter`], for functions that take an options record as their
/// first argument.
///
/// If the options carry their own `fail` actor, it is replaced by an actor
/// that reduces whatever it receives to `{message, stack}` before passing it
/// on, so nothing else of a sandboxed failure reaches the caller.
pub fn event_loop_adapter<F>(name: &str, f: F) -> Behavior
where
    F: Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    let frame = name.to_string();
    Behavior::new(name, move |ctx, message| {
        let mut arguments = arguments(&message);
        if let Some(options) = arguments.first_mut() {
            if let Some(fail) = options.optional_actor("fail").cloned() {
                let normalizer = ctx.sponsor(fault_normalizer(fail));
                options.insert("fail", normalizer);
            }
        }
        let outcome = invoke(&frame, || f(&arguments));
        reply(ctx, &message, outcome);
        Ok(())
    })
}

fn arguments(message: &Value) -> Vec<Value> {
    match message.get("arguments") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::List(items)) => items.clone(),
        Some(other) => vec![other.clone()],
    }
}

fn invoke(frame: &str, f: impl FnOnce() -> anyhow::Result<Value>) -> Result<Value, Fault> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(Fault::from_error(&err, frame)),
        Err(payload) => Err(Fault::from_panic(payload, frame)),
    }
}

fn reply(ctx: &mut Context, message: &Value, outcome: Result<Value, Fault>) {
    match outcome {
        Ok(value) => match message.optional_actor("ok") {
            Some(ok) => ctx.send(ok, value),
            None => debug!(behavior = ctx.behavior().name(), "result dropped, no ok"),
        },
        Err(fault) => match message.optional_actor("fail") {
            Some(fail) => ctx.send(fail, fault),
            None => warn!(
                behavior = ctx.behavior().name(),
                error = %fault,
                "failure dropped, no fail"
            ),
        },
    }
}

fn fault_normalizer(target: Actor) -> Behavior {
    Behavior::new("faultNormalizer", move |ctx, failure| {
        ctx.send(&target, Fault::from_value(&failure));
        Ok(())
    })
}
