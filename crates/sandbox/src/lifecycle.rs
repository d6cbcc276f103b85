//! Sandbox construction.

use std::sync::Arc;

use capability::{Actor, Behavior, Revocable, Sponsor, Value};
use marshal::Domain;
use stepping::{Effect, EventLoop, Stepping};
use tracing::info;

use crate::adapter::{event_loop_adapter, value_adapter};
use crate::bundle::SandboxBundle;
use crate::config::SandboxConfig;
use crate::loader::ModuleLoader;
use crate::module::module_sponsor;
use crate::name::mint_domain_name;
use crate::registry::{DestroyCoordinator, RevocationRegistry};
use crate::{Error, Result};

/// A built sandbox and the pieces the bundle only names.
struct Sandbox {
    bundle: SandboxBundle,
    #[cfg_attr(not(test), allow(dead_code))]
    control: Arc<Domain>,
    #[cfg_attr(not(test), allow(dead_code))]
    coordinator: DestroyCoordinator,
}

/// Builds sandboxes.
#[derive(Clone)]
pub struct SandboxFactory {
    config: SandboxConfig,
    loader: Arc<dyn ModuleLoader>,
}

impl SandboxFactory {
    pub fn new(config: SandboxConfig, loader: Arc<dyn ModuleLoader>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, loader })
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Build a sandbox whose control surface is sponsored by `host` and
    /// whose domains send through `transport`.
    ///
    /// Every management capability is reachable only through a revocable
    /// proxy sponsored into the control domain, and every one of those
    /// proxies, the receptionists and the transport proxy are revoked by
    /// `destroy`, which also halts the sandbox engine. Nothing is returned
    /// unless construction succeeds.
    pub fn create(&self, host: Arc<dyn Sponsor>, transport: &Actor) -> Result<SandboxBundle> {
        Ok(self.build(host, transport)?.bundle)
    }

    fn build(&self, host: Arc<dyn Sponsor>, raw_transport: &Actor) -> Result<Sandbox> {
        let mut registry = RevocationRegistry::new();

        let transport_caps = Revocable::new(raw_transport.clone());
        let transport = host.sponsor(transport_caps.proxy_behavior());
        registry.register_handle("transport", transport_caps.handle());

        let control_name = mint_domain_name(self.config.name_bytes)?;
        let domain_name = mint_domain_name(self.config.name_bytes)?;
        if control_name == domain_name {
            return Err(Error::NameCollision(domain_name));
        }
        let scheme = &self.config.scheme;

        let control = Domain::new(
            format!("{scheme}://{control_name}/"),
            Arc::clone(&host),
            transport.clone(),
        )?;
        let engine = Stepping::new();
        let domain = Domain::new(
            format!("{scheme}://{domain_name}/"),
            engine.plumbing(),
            transport,
        )?;

        let sponsor = expose(
            &control,
            &mut registry,
            "sponsor",
            module_sponsor(Arc::clone(&self.loader), engine.clone()),
        );
        let dispatch = expose(
            &control,
            &mut registry,
            "dispatch",
            dispatch_op(engine.clone()),
        );
        let event_loop = expose(
            &control,
            &mut registry,
            "eventLoop",
            event_loop_op(engine.clone()),
        );
        let effect = self
            .config
            .expose_effect
            .then(|| expose(&control, &mut registry, "effect", effect_op(engine.clone())));

        let coordinator =
            DestroyCoordinator::new().acknowledge_through(&control, raw_transport.clone());
        let destroy = expose(&control, &mut registry, "destroy", coordinator.behavior());

        let control_receptionist = guard(
            &control,
            &mut registry,
            "controlReceptionist",
            control.receptionist(),
        );
        let receptionist = guard(
            &control,
            &mut registry,
            "receptionist",
            domain.receptionist(),
        );

        let halted = engine.clone();
        registry.register("engine", move || Ok(halted.halt()));

        coordinator.seal(registry);

        info!(
            control = %control.name(),
            domain = %domain.name(),
            "sandbox created"
        );

        Ok(Sandbox {
            bundle: SandboxBundle {
                scheme: scheme.clone(),
                control_domain: control_name,
                control_receptionist,
                destroy,
                dispatch,
                domain: domain_name,
                event_loop,
                receptionist,
                sponsor,
                effect,
            },
            control,
            coordinator,
        })
    }

    /// Behavior of the `create` capability.
    ///
    /// Expects `{ok, fail, transport}` and answers `ok` with the bundle. A
    /// construction failure fails the behavior itself.
    pub fn create_behavior(&self) -> Behavior {
        let factory = self.clone();
        Behavior::new("create", move |ctx, message| {
            let ok = message.require_actor("ok")?;
            let transport = message.require_actor("transport")?;
            let bundle = factory.create(ctx.sponsor_handle(), transport)?;
            ctx.send(ok, bundle.to_value());
            Ok(())
        })
    }
}

/// Sponsor `behavior` into the control domain behind a revocable proxy and
/// export the proxy.
fn expose(
    control: &Arc<Domain>,
    registry: &mut RevocationRegistry,
    label: &str,
    behavior: Behavior,
) -> String {
    let proxy = guard(control, registry, label, control.sponsor(behavior));
    control.local_to_remote(&proxy)
}

/// Put `target` behind a revocable proxy sponsored into the control domain.
fn guard(
    control: &Arc<Domain>,
    registry: &mut RevocationRegistry,
    label: &str,
    target: Actor,
) -> Actor {
    let caps = Revocable::new(target);
    registry.register_handle(label, caps.handle());
    control.sponsor(caps.proxy_behavior())
}

fn dispatch_op(engine: Stepping) -> Behavior {
    value_adapter("dispatch", move |_| {
        Ok(engine
            .dispatch()
            .map_or(Value::Bool(false), |effect| effect.to_value()))
    })
}

fn effect_op(engine: Stepping) -> Behavior {
    value_adapter("effect", move |_| Ok(engine.effect().to_value()))
}

/// `eventLoop` takes an optional `{count, log, fail}` record.
///
/// `log` receives every effect and `false` once nothing is pending. With a
/// `fail` actor, failures are reported to it and the loop goes on; without
/// one the first failure ends the loop and fails the call.
fn event_loop_op(engine: Stepping) -> Behavior {
    event_loop_adapter("eventLoop", move |arguments| {
        let mut options = EventLoop::new();
        if let Some(record) = arguments.first() {
            match record.get("count") {
                None | Some(Value::Null) => {}
                Some(count) => options = options.count(dispatch_limit(count)),
            }
            if let Some(log) = record.optional_actor("log").cloned() {
                options = options.log(move |effect| {
                    log.send(effect.map_or(Value::Bool(false), Effect::to_value));
                });
            }
            if let Some(fail) = record.optional_actor("fail").cloned() {
                options = options.fail(move |fault| {
                    fail.send(fault);
                    Ok(())
                });
            }
        }
        Ok(Value::Bool(engine.event_loop(options)?))
    })
}

/// A `count` that is not a non-negative integer allows no dispatch.
fn dispatch_limit(count: &Value) -> usize {
    count
        .as_i64()
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::ModuleRegistry;
    use marshal::Envelope;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    fn factory(config: SandboxConfig) -> SandboxFactory {
        SandboxFactory::new(config, Arc::new(ModuleRegistry::new())).unwrap()
    }

    #[test]
    fn bundle_names_are_distinct_and_scoped() {
        let host = Stepping::new();
        let transport = host.sponsor(Behavior::new("transport", |_, _| Ok(())));
        let bundle = factory(SandboxConfig::default())
            .create(Arc::new(host), &transport)
            .unwrap();

        assert_ne!(bundle.control_domain, bundle.domain);
        let control = bundle.control_prefix();
        for uri in [&bundle.sponsor, &bundle.dispatch, &bundle.event_loop, &bundle.destroy] {
            assert!(uri.starts_with(&control), "{uri} outside {control}");
        }
        assert!(bundle.effect.as_ref().is_some_and(|uri| uri.starts_with(&control)));
        assert!(bundle.domain_prefix().starts_with("ansible://"));
    }

    #[test]
    fn effect_can_be_left_out() {
        let host = Stepping::new();
        let transport = host.sponsor(Behavior::new("transport", |_, _| Ok(())));
        let config = SandboxConfig {
            expose_effect: false,
            ..SandboxConfig::default()
        };
        let bundle = factory(config).create(Arc::new(host), &transport).unwrap();
        assert_eq!(bundle.effect, None);
        assert_eq!(bundle.to_value().get("effect"), None);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = SandboxConfig {
            name_bytes: 8,
            ..SandboxConfig::default()
        };
        assert!(SandboxFactory::new(config, Arc::new(ModuleRegistry::new())).is_err());
    }

    #[test]
    fn bundle_value_round_trip() {
        let host = Stepping::new();
        let transport = host.sponsor(Behavior::new("transport", |_, _| Ok(())));
        let bundle = factory(SandboxConfig::default())
            .create(Arc::new(host), &transport)
            .unwrap();
        assert_eq!(SandboxBundle::from_value(&bundle.to_value()).unwrap(), bundle);
        assert!(SandboxBundle::from_value(&Value::Null).is_err());
    }

    #[test]
    fn create_requires_continuation_and_transport() {
        let host = Stepping::new();
        let create = host.sponsor(factory(SandboxConfig::default()).create_behavior());
        create.send(Value::Null);
        let err = host.event_loop(EventLoop::new()).unwrap_err();
        assert!(err.message.contains("ok"));
    }

    fn recorder(host: &Stepping) -> (Actor, Arc<Mutex<Vec<Value>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let store = seen.clone();
        let actor = host.sponsor(Behavior::new("recorder", move |_, message| {
            store.lock().push(message);
            Ok(())
        }));
        (actor, seen)
    }

    #[test]
    fn destroy_revokes_each_management_proxy() {
        let host = Stepping::new();
        let transport = host.sponsor(Behavior::new("transport", |_, _| Ok(())));
        let sandbox = factory(SandboxConfig::default())
            .build(Arc::new(host.clone()), &transport)
            .unwrap();
        let bundle = &sandbox.bundle;
        let effect = bundle.effect.clone().unwrap();
        let proxy = |uri: &str| sandbox.control.remote_to_local(uri).unwrap();
        let (ok, answers) = recorder(&host);
        let (fail, failures) = recorder(&host);
        let request = Value::map([("ok", &ok), ("fail", &fail)]);

        proxy(&bundle.dispatch).send(request.clone());
        assert!(host.event_loop(EventLoop::new()).unwrap());
        assert_eq!(answers.lock().as_slice(), &[Value::Bool(false)]);
        answers.lock().clear();

        let report = sandbox.coordinator.destroy().unwrap();
        assert_eq!(
            report.revoked,
            vec![
                "transport",
                "sponsor",
                "dispatch",
                "eventLoop",
                "effect",
                "destroy",
                "controlReceptionist",
                "receptionist",
                "engine",
            ]
        );
        assert!(report.failed.is_empty());

        for uri in [&bundle.dispatch, &bundle.event_loop, &effect, &bundle.destroy] {
            proxy(uri).send(request.clone());
        }
        proxy(&bundle.sponsor).send(Value::map([
            ("module", Value::from("anything")),
            ("ok", ok.clone().into()),
            ("fail", fail.clone().into()),
        ]));
        let content = sandbox.control.encode(&request).unwrap();
        bundle
            .control_receptionist
            .send(Envelope::new(bundle.dispatch.as_str(), content).to_value());
        assert!(host.event_loop(EventLoop::new()).unwrap());

        assert!(answers.lock().is_empty());
        assert!(failures.lock().is_empty());
        assert_eq!(sandbox.coordinator.destroy(), None);
    }

    #[test]
    fn malformed_counts_allow_no_dispatch() {
        assert_eq!(dispatch_limit(&Value::from(3)), 3);
        assert_eq!(dispatch_limit(&Value::from(0)), 0);
        assert_eq!(dispatch_limit(&Value::from(-2)), 0);
        assert_eq!(dispatch_limit(&Value::from(2.5)), 0);
        assert_eq!(dispatch_limit(&Value::from("3")), 0);
        assert_eq!(dispatch_limit(&Value::Bool(true)), 0);
    }
}
