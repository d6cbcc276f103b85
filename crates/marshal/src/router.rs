//! In-process routing between domains.

use std::collections::HashMap;
use std::sync::Arc;

use capability::{Actor, Behavior, Sponsor};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::domain::Domain;
use crate::protocol::Envelope;
use crate::uri::{CapabilityUri, validate_prefix};
use crate::Result;

type Routes = Arc<Mutex<HashMap<String, Actor>>>;

/// A routing table plus the transport actor that consults it.
///
/// The transport accepts [`Envelope`] values and hands each one to the
/// receptionist registered for its address prefix.
pub struct Router {
    sponsor: Arc<dyn Sponsor>,
    routes: Routes,
    transport: Actor,
}

impl Router {
    pub fn new(sponsor: Arc<dyn Sponsor>) -> Self {
        let routes: Routes = Arc::default();
        let transport = sponsor.sponsor(transport_behavior(Arc::clone(&routes)));
        Self {
            sponsor,
            routes,
            transport,
        }
    }

    /// The transport actor shared by every domain of this router.
    pub fn transport(&self) -> &Actor {
        &self.transport
    }

    /// Create a domain on this router and route its prefix to it.
    pub fn domain(&self, prefix: &str) -> Result<Arc<Domain>> {
        let domain = Domain::new(prefix, Arc::clone(&self.sponsor), self.transport.clone())?;
        self.route(prefix, domain.receptionist())?;
        Ok(domain)
    }

    /// Route envelopes addressed under `prefix` to `receptionist`.
    ///
    /// Replaces any previous route for the same prefix.
    pub fn route(&self, prefix: &str, receptionist: Actor) -> Result<()> {
        validate_prefix(prefix)?;
        debug!(prefix, "route installed");
        self.routes.lock().insert(prefix.to_string(), receptionist);
        Ok(())
    }

    pub fn unroute(&self, prefix: &str) -> Option<Actor> {
        self.routes.lock().remove(prefix)
    }

    /// Prefixes currently routed.
    pub fn routes(&self) -> Vec<String> {
        let mut prefixes: Vec<_> = self.routes.lock().keys().cloned().collect();
        prefixes.sort();
        prefixes
    }
}

fn transport_behavior(routes: Routes) -> Behavior {
    Behavior::new("transport", move |ctx, message| {
        let envelope = match Envelope::from_value(&message) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(error = %err, "malformed envelope dropped");
                return Ok(());
            }
        };
        let prefix = match CapabilityUri::parse(&envelope.address) {
            Ok(uri) => uri.prefix(),
            Err(err) => {
                warn!(error = %err, "unaddressable envelope dropped");
                return Ok(());
            }
        };
        let receptionist = routes.lock().get(&prefix).cloned();
        match receptionist {
            Some(receptionist) => ctx.send(&receptionist, message),
            None => warn!(address = %envelope.address, "no route, envelope dropped"),
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use capability::Value;
    use stepping::{EventLoop, Stepping};

    #[test]
    fn routes_between_domains() {
        let stepping = Stepping::new();
        let router = Router::new(Arc::new(stepping.clone()));
        let alice = router.domain("ocap://alice/").unwrap();
        let bob = router.domain("ocap://bob/").unwrap();
        assert_eq!(router.routes(), vec!["ocap://alice/", "ocap://bob/"]);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let store = seen.clone();
        let inbox = bob.sponsor(Behavior::new("inbox", move |_, message| {
            store.lock().push(message);
            Ok(())
        }));
        let uri = bob.local_to_remote(&inbox);

        let reply_to = alice.sponsor(Behavior::new("replyTo", |_, _| Ok(())));
        let remote_inbox = alice.remote_to_local(&uri).unwrap();
        remote_inbox.send(Value::map([("from", &reply_to)]));
        assert!(stepping.event_loop(EventLoop::new()).unwrap());

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        let from = seen[0].get("from").and_then(Value::as_actor).unwrap();
        assert_eq!(bob.local_to_remote(from), alice.local_to_remote(&reply_to));
    }

    #[test]
    fn unrouted_envelopes_are_dropped() {
        let stepping = Stepping::new();
        let router = Router::new(Arc::new(stepping.clone()));
        let alice = router.domain("ocap://alice/").unwrap();
        let nowhere = alice.remote_to_local("ocap://nowhere/abc").unwrap();
        nowhere.send("hello");
        assert!(stepping.event_loop(EventLoop::new()).unwrap());

        assert!(router.unroute("ocap://alice/").is_some());
        assert!(router.routes().is_empty());
    }
}
