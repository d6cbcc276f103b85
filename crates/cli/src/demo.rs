//! Built-in demo modules.

use std::collections::BTreeMap;

use capability::{Actor, Behavior, Value};
use sandbox::{Exports, ModuleRegistry};

/// Counter stops resending to itself after this many rounds.
const COUNTER_ROUNDS: i64 = 5;

/// Name and one-line summary of every demo module.
pub const MODULES: &[(&str, &str)] = &[
    ("ping", "answers every {customer} with \"pong\""),
    ("counter", "counts to 5 by messaging itself, reporting each step"),
    ("faulty", "a ping and a behavior that always fails"),
];

pub fn registry() -> ModuleRegistry {
    let registry = ModuleRegistry::new();
    registry
        .register("ping", || Ok(Exports::Single(ping())))
        .register("counter", || Ok(Exports::Single(counter(0))))
        .register("faulty", || {
            let mut behaviors = BTreeMap::new();
            behaviors.insert("ping".to_string(), ping());
            behaviors.insert("boom".to_string(), boom());
            Ok(Exports::Named(behaviors))
        });
    registry
}

fn ping() -> Behavior {
    Behavior::new("ping", |ctx, message| {
        let customer = message.require_actor("customer")?.clone();
        ctx.send(&customer, "pong");
        Ok(())
    })
}

fn counter(count: i64) -> Behavior {
    Behavior::new("counter", move |ctx, message| {
        let customer = message.require_actor("customer")?.clone();
        let next = count + 1;
        ctx.send(&customer, next);
        if next < COUNTER_ROUNDS {
            let me = ctx.self_actor().clone();
            ctx.send(&me, message);
        }
        ctx.become_(counter(next));
        Ok(())
    })
}

fn boom() -> Behavior {
    Behavior::new("boom", |_, _| anyhow::bail!("boom!"))
}

/// Every actor among a module's sponsored exports.
pub fn exported_actors(exports: &Value) -> Vec<(String, Actor)> {
    match exports {
        Value::Actor(actor) => vec![("default".to_string(), actor.clone())],
        Value::Map(map) => map
            .iter()
            .filter_map(|(name, value)| value.as_actor().map(|a| (name.clone(), a.clone())))
            .collect(),
        _ => Vec::new(),
    }
}
