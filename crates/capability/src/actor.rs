//! Actors, behaviors and the per-event execution context.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::trace;
use uuid::Uuid;

use crate::{Fault, Value};

/// Unique identity of an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub Uuid);

impl ActorId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

type BehaviorFn = dyn Fn(&mut Context, Value) -> anyhow::Result<()> + Send + Sync;

/// What an actor does with the next message it receives.
#[derive(Clone)]
pub struct Behavior {
    name: Arc<str>,
    run: Arc<BehaviorFn>,
}

impl Behavior {
    pub fn new<F>(name: impl Into<Arc<str>>, run: F) -> Self
    where
        F: Fn(&mut Context, Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            run: Arc::new(run),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Behavior").field(&self.name).finish()
    }
}

/// Creates actors within one configuration.
pub trait Sponsor: Send + Sync {
    fn sponsor(&self, behavior: Behavior) -> Actor;
}

/// Accepts events addressed to the actors of one configuration.
pub trait Mailbox: Send + Sync {
    fn deliver(&self, target: Actor, message: Value);
}

struct Cell {
    id: ActorId,
    behavior: Mutex<Behavior>,
    mailbox: Weak<dyn Mailbox>,
}

/// An unforgeable reference to an actor.
///
/// Holding an `Actor` is the authority to send it messages. Clones refer to
/// the same actor; equality is identity.
#[derive(Clone)]
pub struct Actor {
    cell: Arc<Cell>,
}

impl Actor {
    /// Create an actor whose events are delivered to `mailbox`.
    ///
    /// Configurations call this from their [`Sponsor`] implementation.
    pub fn new(behavior: Behavior, mailbox: Weak<dyn Mailbox>) -> Self {
        Self {
            cell: Arc::new(Cell {
                id: ActorId::new(),
                behavior: Mutex::new(behavior),
                mailbox,
            }),
        }
    }

    pub fn id(&self) -> ActorId {
        self.cell.id
    }

    /// Snapshot of the behavior that will handle the next message.
    pub fn behavior(&self) -> Behavior {
        self.cell.behavior.lock().clone()
    }

    /// Send a message. Dropped if the owning configuration no longer exists.
    pub fn send(&self, message: impl Into<Value>) {
        match self.cell.mailbox.upgrade() {
            Some(mailbox) => mailbox.deliver(self.clone(), message.into()),
            None => trace!(actor = %self.id(), "configuration gone, message dropped"),
        }
    }

    /// Run the current behavior against one message.
    ///
    /// Panics are caught. A replacement behavior is installed only when the
    /// behavior succeeds; sends are returned uncommitted so the caller can
    /// deliver them after recording the effect.
    pub fn receive(&self, message: Value, sponsor: Arc<dyn Sponsor>) -> Receipt {
        let behavior = self.behavior();
        let mut context = Context {
            self_actor: self.clone(),
            behavior: behavior.clone(),
            sponsor,
            created: Vec::new(),
            sent: Vec::new(),
            became: None,
        };

        let frame = format!("{} ({})", behavior.name(), self.id());
        let outcome =
            match catch_unwind(AssertUnwindSafe(|| (behavior.run)(&mut context, message))) {
                Ok(Ok(())) => Ok(()),
                Ok(Err(err)) => Err(Fault::from_error(&err, &frame)),
                Err(payload) => Err(Fault::from_panic(payload, &frame)),
            };

        let Context {
            created,
            sent,
            became,
            ..
        } = context;

        let became = match (&outcome, became) {
            (Ok(()), Some(next)) => {
                let name = next.name().to_string();
                *self.cell.behavior.lock() = next;
                Some(name)
            }
            _ => None,
        };

        Receipt {
            behavior: behavior.name().to_string(),
            created,
            sent: if outcome.is_ok() { sent } else { Vec::new() },
            became,
            outcome,
        }
    }
}

impl PartialEq for Actor {
    fn eq(&self, other: &Self) -> bool {
        self.cell.id == other.cell.id
    }
}

impl Eq for Actor {}

impl Hash for Actor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.cell.id.hash(state);
    }
}

impl fmt::Debug for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Actor({})", self.cell.id)
    }
}

/// Everything one behavior execution did.
#[derive(Debug)]
pub struct Receipt {
    /// Name of the behavior that ran.
    pub behavior: String,
    pub created: Vec<Actor>,
    /// Messages to deliver; empty when the behavior failed.
    pub sent: Vec<(Actor, Value)>,
    /// Name of the replacement behavior, if one was installed.
    pub became: Option<String>,
    pub outcome: Result<(), Fault>,
}

/// Execution context handed to a behavior for one message.
pub struct Context {
    self_actor: Actor,
    behavior: Behavior,
    sponsor: Arc<dyn Sponsor>,
    created: Vec<Actor>,
    sent: Vec<(Actor, Value)>,
    became: Option<Behavior>,
}

impl Context {
    /// The actor processing the message.
    pub fn self_actor(&self) -> &Actor {
        &self.self_actor
    }

    /// The behavior processing the message.
    pub fn behavior(&self) -> &Behavior {
        &self.behavior
    }

    /// Create an actor in the same configuration.
    pub fn sponsor(&mut self, behavior: Behavior) -> Actor {
        let actor = self.sponsor.sponsor(behavior);
        self.created.push(actor.clone());
        actor
    }

    /// The sponsor of this configuration, for collaborators that mint
    /// actors on its behalf later.
    pub fn sponsor_handle(&self) -> Arc<dyn Sponsor> {
        Arc::clone(&self.sponsor)
    }

    /// Send a message once the behavior completes successfully.
    pub fn send(&mut self, target: &Actor, message: impl Into<Value>) {
        self.sent.push((target.clone(), message.into()));
    }

    /// Replace the behavior used for the next message.
    pub fn become_(&mut self, behavior: Behavior) {
        self.became = Some(behavior);
    }
}
