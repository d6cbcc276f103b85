//! The `sponsor` management capability.

use std::sync::Arc;

use capability::{Behavior, Fault, Value};
use stepping::Stepping;
use tracing::{debug, warn};

use crate::loader::{Exports, ModuleLoader};

/// Behavior that loads a module and sponsors its exports into `engine`.
///
/// Expects `{module, ok, fail}`. A single exported behavior is answered with
/// one actor, a map of behaviors with a map of actors under the same keys.
/// Loader failures go to `fail`; any other export is dropped.
pub fn module_sponsor(loader: Arc<dyn ModuleLoader>, engine: Stepping) -> Behavior {
    Behavior::new("sponsor", move |ctx, message| {
        let loaded = match message.require_str("module") {
            Ok(source) => loader.load(source).map_err(|err| err.to_fault()),
            Err(err) => Err(Fault::new(err.to_string(), "")),
        };

        let response = match loaded {
            Ok(Exports::Single(behavior)) => Value::from(engine.sponsor(behavior)),
            Ok(Exports::Named(behaviors)) => Value::Map(
                behaviors
                    .into_iter()
                    .map(|(name, behavior)| (name, Value::from(engine.sponsor(behavior))))
                    .collect(),
            ),
            Ok(Exports::Opaque(value)) => {
                warn!(kind = value.kind(), "module exports no behaviors, dropped");
                return Ok(());
            }
            Err(fault) => {
                match message.optional_actor("fail") {
                    Some(fail) => ctx.send(fail, fault),
                    None => warn!(error = %fault, "module load failed, no fail"),
                }
                return Ok(());
            }
        };

        match message.optional_actor("ok") {
            Some(ok) => ctx.send(ok, response),
            None => debug!("sponsored exports dropped, no ok"),
        }
        Ok(())
    })
}
