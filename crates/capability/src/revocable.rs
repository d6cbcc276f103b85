//! Revocable forwarding proxies.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::{Actor, Behavior};

/// A forwarding slot that can be permanently emptied.
///
/// The proxy behavior forwards every message to the target while the slot
/// is filled. Revoking empties the slot, which also releases the proxy's
/// reference to the target.
#[derive(Clone)]
pub struct Revocable {
    target: Arc<Mutex<Option<Actor>>>,
}

impl Revocable {
    pub fn new(target: Actor) -> Self {
        Self {
            target: Arc::new(Mutex::new(Some(target))),
        }
    }

    /// Behavior of the proxy actor.
    pub fn proxy_behavior(&self) -> Behavior {
        let target = Arc::clone(&self.target);
        Behavior::new("revocableProxy", move |ctx, message| {
            let current = target.lock().clone();
            match current {
                Some(actor) => ctx.send(&actor, message),
                None => trace!(proxy = %ctx.self_actor().id(), "revoked proxy, message dropped"),
            }
            Ok(())
        })
    }

    /// Behavior of an actor that revokes the proxy when it receives any
    /// message.
    pub fn revoke_behavior(&self) -> Behavior {
        let handle = self.handle();
        Behavior::new("revoke", move |_, _| {
            handle.revoke();
            Ok(())
        })
    }

    /// Direct handle on the revocation flag.
    pub fn handle(&self) -> RevokeHandle {
        RevokeHandle {
            target: Arc::clone(&self.target),
        }
    }

    pub fn is_revoked(&self) -> bool {
        self.target.lock().is_none()
    }
}

/// The revoke half of a [`Revocable`].
#[derive(Clone)]
pub struct RevokeHandle {
    target: Arc<Mutex<Option<Actor>>>,
}

impl RevokeHandle {
    /// Disable forwarding for good. Returns whether the proxy was still live.
    pub fn revoke(&self) -> bool {
        let previous = self.target.lock().take();
        if let Some(actor) = &previous {
            debug!(target_actor = %actor.id(), "proxy revoked");
        }
        previous.is_some()
    }

    pub fn is_revoked(&self) -> bool {
        self.target.lock().is_none()
    }
}

impl std::fmt::Debug for RevokeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevokeHandle")
            .field("revoked", &self.is_revoked())
            .finish()
    }
}
