//! Naming domains: exported actors, imported proxies and the receptionist.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use capability::{Actor, ActorId, Behavior, Sponsor, Value};
use parking_lot::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::protocol::{Envelope, from_wire, to_wire};
use crate::uri::{CapabilityUri, validate_prefix};
use crate::{Error, Result};

#[derive(Default)]
struct Tables {
    /// token -> local actor
    exports: HashMap<String, Actor>,
    /// local actor -> URI
    exported: HashMap<ActorId, String>,
    /// URI -> local proxy for a remote actor
    imports: HashMap<String, Actor>,
    /// proxy -> URI it stands for
    imported: HashMap<ActorId, String>,
}

/// A named scope in which local actors get remote identifiers and remote
/// identifiers get local proxies.
///
/// Every outbound message leaves through `transport` as an [`Envelope`];
/// every inbound envelope enters through a [receptionist](Self::receptionist).
pub struct Domain {
    prefix: String,
    sponsor: Arc<dyn Sponsor>,
    transport: Actor,
    tables: Mutex<Tables>,
}

impl Domain {
    /// Create a domain named `prefix` (`scheme://authority/`).
    pub fn new(
        prefix: impl Into<String>,
        sponsor: Arc<dyn Sponsor>,
        transport: Actor,
    ) -> Result<Arc<Self>> {
        let prefix = prefix.into();
        validate_prefix(&prefix)?;
        debug!(domain = %prefix, "domain created");
        Ok(Arc::new(Self {
            prefix,
            sponsor,
            transport,
            tables: Mutex::new(Tables::default()),
        }))
    }

    /// The domain prefix, `scheme://authority/`.
    pub fn name(&self) -> &str {
        &self.prefix
    }

    /// Create an actor with this domain's sponsor.
    pub fn sponsor(&self, behavior: Behavior) -> Actor {
        self.sponsor.sponsor(behavior)
    }

    /// Mint an inbound entry point.
    ///
    /// The receptionist accepts envelopes addressed to actors exported by
    /// this domain, decodes them, and delivers the result. Every call mints a
    /// fresh actor; all of them are equivalent.
    pub fn receptionist(self: &Arc<Self>) -> Actor {
        let domain = Arc::clone(self);
        self.sponsor(Behavior::new("receptionist", move |ctx, message| {
            match domain.accept(&message) {
                Ok((target, decoded)) => ctx.send(&target, decoded),
                Err(err) => warn!(domain = %domain.prefix, error = %err, "inbound message dropped"),
            }
            Ok(())
        }))
    }

    /// Name `actor` with a URI in this domain, exporting it if needed.
    ///
    /// A proxy this domain created for a remote actor is named by that remote
    /// actor's URI, so references keep their identity across round trips.
    pub fn local_to_remote(&self, actor: &Actor) -> String {
        let mut tables = self.tables.lock();
        if let Some(uri) = tables.imported.get(&actor.id()) {
            return uri.clone();
        }
        if let Some(uri) = tables.exported.get(&actor.id()) {
            return uri.clone();
        }
        let token = Uuid::new_v4().simple().to_string();
        let uri = format!("{}{token}", self.prefix);
        tables.exports.insert(token, actor.clone());
        tables.exported.insert(actor.id(), uri.clone());
        uri
    }

    /// The URI of the remote actor `actor` stands for, if it is a proxy this
    /// domain imported.
    pub fn imported_uri(&self, actor: &Actor) -> Option<String> {
        self.tables.lock().imported.get(&actor.id()).cloned()
    }

    /// Resolve a URI to an actor.
    ///
    /// URIs of this domain resolve to the exported actor; any other URI
    /// resolves to a (cached) local proxy that forwards through the
    /// transport.
    pub fn remote_to_local(self: &Arc<Self>, uri: &str) -> Result<Actor> {
        let parsed = CapabilityUri::parse(uri)?;
        if parsed.prefix() == self.prefix {
            return self
                .tables
                .lock()
                .exports
                .get(parsed.token())
                .cloned()
                .ok_or_else(|| Error::UnknownCapability(uri.to_string()));
        }

        if let Some(proxy) = self.tables.lock().imports.get(uri) {
            return Ok(proxy.clone());
        }

        let proxy = self.sponsor(remote_proxy(Arc::downgrade(self), uri.to_string()));
        let mut tables = self.tables.lock();
        // Another import of the same URI may have won the race.
        if let Some(existing) = tables.imports.get(uri) {
            return Ok(existing.clone());
        }
        tables.imports.insert(uri.to_string(), proxy.clone());
        tables.imported.insert(proxy.id(), uri.to_string());
        Ok(proxy)
    }

    /// Encode a message for the wire.
    pub fn encode(&self, value: &Value) -> Result<String> {
        let json = to_wire(value, &mut |actor| self.local_to_remote(actor))?;
        Ok(serde_json::to_string(&json)?)
    }

    /// Decode a message from the wire.
    pub fn decode(self: &Arc<Self>, content: &str) -> Result<Value> {
        let json = serde_json::from_str(content)?;
        from_wire(json, &mut |uri| self.remote_to_local(uri))
    }

    fn accept(self: &Arc<Self>, message: &Value) -> Result<(Actor, Value)> {
        let envelope = Envelope::from_value(message)?;
        let uri = CapabilityUri::parse(&envelope.address)?;
        if uri.prefix() != self.prefix {
            return Err(Error::UnknownCapability(envelope.address));
        }
        let target = self
            .tables
            .lock()
            .exports
            .get(uri.token())
            .cloned()
            .ok_or_else(|| Error::UnknownCapability(envelope.address.clone()))?;
        let decoded = self.decode(&envelope.content)?;
        Ok((target, decoded))
    }
}

impl fmt::Debug for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tables = self.tables.lock();
        f.debug_struct("Domain")
            .field("prefix", &self.prefix)
            .field("exports", &tables.exports.len())
            .field("imports", &tables.imports.len())
            .finish()
    }
}

fn remote_proxy(domain: Weak<Domain>, uri: String) -> Behavior {
    Behavior::new("remoteProxy", move |ctx, message| {
        let Some(domain) = domain.upgrade() else {
            debug!(address = %uri, "domain gone, message dropped");
            return Ok(());
        };
        let content = domain.encode(&message)?;
        ctx.send(&domain.transport, Envelope::new(uri.as_str(), content).to_value());
        Ok(())
    })
}
