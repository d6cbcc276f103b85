//! Revocation bookkeeping and the `destroy` management capability.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};

use capability::{Actor, Behavior, Context, Fault, RevokeHandle, Value};
use marshal::{Domain, Envelope};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

type Revoke = Box<dyn FnOnce() -> anyhow::Result<bool> + Send>;

/// Revoke operations of one sandbox, in the order they were registered.
#[derive(Default)]
pub struct RevocationRegistry {
    entries: Vec<(String, Revoke)>,
}

/// Outcome of [`RevocationRegistry::revoke_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevocationReport {
    /// Entries that were live and are now revoked.
    pub revoked: Vec<String>,
    /// Entries whose revoke failed.
    pub failed: Vec<String>,
}

impl RevocationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the revoke half of a revocable proxy.
    pub fn register_handle(&mut self, label: impl Into<String>, handle: RevokeHandle) {
        self.register(label, move || Ok(handle.revoke()));
    }

    /// Register an arbitrary revoke operation. It returns whether there was
    /// anything left to revoke.
    pub fn register<F>(&mut self, label: impl Into<String>, revoke: F)
    where
        F: FnOnce() -> anyhow::Result<bool> + Send + 'static,
    {
        self.entries.push((label.into(), Box::new(revoke)));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(label, _)| label.as_str())
    }

    /// Run every revoke in registration order.
    ///
    /// A revoke that fails or panics is logged and skipped; the rest still
    /// run.
    pub fn revoke_all(self) -> RevocationReport {
        let mut report = RevocationReport::default();
        for (label, revoke) in self.entries {
            match catch_unwind(AssertUnwindSafe(revoke)) {
                Ok(Ok(true)) => report.revoked.push(label),
                Ok(Ok(false)) => debug!(capability = %label, "already revoked"),
                Ok(Err(err)) => {
                    warn!(capability = %label, error = %err, "revoke failed");
                    report.failed.push(label);
                }
                Err(payload) => {
                    let fault = Fault::from_panic(payload, &label);
                    warn!(capability = %label, error = %fault, "revoke panicked");
                    report.failed.push(label);
                }
            }
        }
        report
    }
}

impl fmt::Debug for RevocationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.labels()).finish()
    }
}

/// Owner of a sandbox's registry until `destroy` consumes it.
///
/// The destroy behavior exists before the registry is complete, since it is
/// itself registered; [`seal`](Self::seal) hands the finished registry over.
#[derive(Clone, Default)]
pub struct DestroyCoordinator {
    slot: Arc<Mutex<Option<RevocationRegistry>>>,
    outbound: Option<Outbound>,
}

/// Where acknowledgements to remote callers leave once the registry has cut
/// the sandbox's own transport.
#[derive(Clone)]
struct Outbound {
    domain: Weak<Domain>,
    transport: Actor,
}

impl DestroyCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acknowledge callers imported by `domain` with an envelope sent straight
    /// to `transport`, which must be the unwrapped transport.
    pub fn acknowledge_through(mut self, domain: &Arc<Domain>, transport: Actor) -> Self {
        self.outbound = Some(Outbound {
            domain: Arc::downgrade(domain),
            transport,
        });
        self
    }

    pub fn seal(&self, registry: RevocationRegistry) {
        *self.slot.lock() = Some(registry);
    }

    /// Whether the registry has been consumed.
    pub fn is_destroyed(&self) -> bool {
        self.slot.lock().is_none()
    }

    /// Run every registered revoke. `None` if that already happened.
    pub fn destroy(&self) -> Option<RevocationReport> {
        let registry = self.slot.lock().take()?;
        let report = registry.revoke_all();
        info!(
            revoked = report.revoked.len(),
            failed = report.failed.len(),
            "sandbox destroyed"
        );
        Some(report)
    }

    /// Behavior of the `destroy` capability.
    ///
    /// Runs every registered revoke once, then answers `ok` with null. Later
    /// invocations find the registry gone and only answer.
    pub fn behavior(&self) -> Behavior {
        let coordinator = self.clone();
        Behavior::new("destroy", move |ctx, message| {
            // Held across the revokes so the ack can still be encoded.
            let outbound = coordinator
                .outbound
                .as_ref()
                .and_then(|o| Some((o.domain.upgrade()?, o.transport.clone())));
            if coordinator.destroy().is_none() {
                debug!("sandbox already destroyed");
            }
            let Some(ok) = message.optional_actor("ok") else {
                return Ok(());
            };
            match outbound {
                Some((domain, transport)) => acknowledge(ctx, &domain, &transport, ok)?,
                None => ctx.send(ok, Value::Null),
            }
            Ok(())
        })
    }
}

fn acknowledge(
    ctx: &mut Context,
    domain: &Domain,
    transport: &Actor,
    ok: &Actor,
) -> anyhow::Result<()> {
    match domain.imported_uri(ok) {
        Some(address) => {
            let content = domain.encode(&Value::Null)?;
            ctx.send(transport, Envelope::new(address, content).to_value());
        }
        None => ctx.send(ok, Value::Null),
    }
    Ok(())
}

impl fmt::Debug for DestroyCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DestroyCoordinator")
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use stepping::{EventLoop, Stepping};

    #[test]
    fn revokes_in_order_past_failures() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut registry = RevocationRegistry::new();
        for label in ["a", "b", "c", "d"] {
            let order = order.clone();
            registry.register(label, move || {
                order.lock().push(label);
                match label {
                    "b" => anyhow::bail!("revoke refused"),
                    "c" => panic!("revoke exploded"),
                    _ => Ok(true),
                }
            });
        }
        assert_eq!(registry.labels().collect::<Vec<_>>(), vec!["a", "b", "c", "d"]);

        let report = registry.revoke_all();
        assert_eq!(order.lock().as_slice(), &["a", "b", "c", "d"]);
        assert_eq!(report.revoked, vec!["a", "d"]);
        assert_eq!(report.failed, vec!["b", "c"]);
    }

    #[test]
    fn destroy_runs_revokes_once_and_acknowledges() {
        let stepping = Stepping::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let acks = Arc::new(AtomicUsize::new(0));

        let mut registry = RevocationRegistry::new();
        let counter = runs.clone();
        registry.register("only", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        });
        let coordinator = DestroyCoordinator::new();
        coordinator.seal(registry);

        let destroy = stepping.sponsor(coordinator.behavior());
        let counter = acks.clone();
        let ok = stepping.sponsor(Behavior::new("ok", move |_, message| {
            assert!(message.is_null());
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
        destroy.send(Value::map([("ok", &ok)]));
        destroy.send(Value::map([("ok", &ok)]));
        destroy.send(Value::Null);
        assert!(stepping.event_loop(EventLoop::new()).unwrap());

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(acks.load(Ordering::SeqCst), 2);
        assert!(coordinator.is_destroyed());
        assert_eq!(coordinator.destroy(), None);
    }

    #[test]
    fn remote_callers_are_acknowledged_past_a_cut_transport() {
        let stepping = Stepping::new();
        let wire = Arc::new(Mutex::new(Vec::new()));
        let store = wire.clone();
        let transport = stepping.sponsor(Behavior::new("transport", move |_, message| {
            store.lock().push(message);
            Ok(())
        }));
        let cut = capability::Revocable::new(transport.clone());
        let proxied = stepping.sponsor(cut.proxy_behavior());
        let domain = Domain::new("ocap://control/", Arc::new(stepping.clone()), proxied).unwrap();

        let mut registry = RevocationRegistry::new();
        registry.register_handle("transport", cut.handle());
        let coordinator = DestroyCoordinator::new().acknowledge_through(&domain, transport);
        coordinator.seal(registry);

        let destroy = stepping.sponsor(coordinator.behavior());
        let ok = domain.remote_to_local("ocap://host/ok").unwrap();
        destroy.send(Value::map([("ok", &ok)]));
        assert!(stepping.event_loop(EventLoop::new()).unwrap());

        let wire = wire.lock();
        assert_eq!(wire.len(), 1);
        let envelope = Envelope::from_value(&wire[0]).unwrap();
        assert_eq!(envelope.address, "ocap://host/ok");
        assert_eq!(domain.decode(&envelope.content).unwrap(), Value::Null);
        assert!(cut.is_revoked());
    }
}
