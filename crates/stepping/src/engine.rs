//! The stepping engine.

use std::collections::VecDeque;
use std::sync::Arc;

use capability::{Actor, Behavior, Fault, Mailbox, Sponsor, Value};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::{Effect, Event};

type LogHook<'a> = Box<dyn FnMut(Option<&Effect>) + 'a>;
type FailHook<'a> = Box<dyn FnMut(Fault) -> Result<(), Fault> + 'a>;

/// Options for [`Stepping::event_loop`].
#[derive(Default)]
pub struct EventLoop<'a> {
    count: Option<usize>,
    log: Option<LogHook<'a>>,
    fail: Option<FailHook<'a>>,
}

impl<'a> EventLoop<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatch at most `count` events.
    pub fn count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    /// Called with every effect, and with `None` once nothing is pending.
    pub fn log(mut self, log: impl FnMut(Option<&Effect>) + 'a) -> Self {
        self.log = Some(Box::new(log));
        self
    }

    /// Called with every behavior failure. Returning an error stops the
    /// loop; by default the first failure stops it.
    pub fn fail(mut self, fail: impl FnMut(Fault) -> Result<(), Fault> + 'a) -> Self {
        self.fail = Some(Box::new(fail));
        self
    }
}

#[derive(Default)]
struct State {
    queue: VecDeque<Event>,
    /// Activity that happened outside dispatch since the last dispatch.
    current: Effect,
    dispatching: bool,
    halted: bool,
}

#[derive(Default)]
struct Inner {
    state: Mutex<State>,
}

impl Mailbox for Inner {
    fn deliver(&self, target: Actor, message: Value) {
        let mut state = self.state.lock();
        if state.halted {
            trace!(actor = %target.id(), "engine halted, message dropped");
            return;
        }
        if !state.dispatching {
            state
                .current
                .sent
                .push(Event::new(target.clone(), message.clone()));
        }
        trace!(actor = %target.id(), "event queued");
        state.queue.push_back(Event::new(target, message));
    }
}

/// A configuration whose events are processed only when asked to.
///
/// Sending to one of its actors queues an event; nothing runs until
/// [`dispatch`](Self::dispatch) or [`event_loop`](Self::event_loop) is
/// called. Cloning yields another handle to the same engine.
#[derive(Clone, Default)]
pub struct Stepping {
    inner: Arc<Inner>,
}

impl Stepping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an actor in this configuration.
    pub fn sponsor(&self, behavior: Behavior) -> Actor {
        self.create(behavior, true)
    }

    /// A sponsor for this engine whose actors are left out of
    /// [`effect`](Self::effect). Meant for plumbing such as receptionists.
    pub fn plumbing(&self) -> Arc<dyn Sponsor> {
        Arc::new(Plumbing(self.clone()))
    }

    fn create(&self, behavior: Behavior, record: bool) -> Actor {
        let mailbox: Arc<dyn Mailbox> = self.inner.clone();
        let actor = Actor::new(behavior, Arc::downgrade(&mailbox));
        let mut state = self.inner.state.lock();
        if record && !state.dispatching && !state.halted {
            state.current.created.push(actor.clone());
        }
        actor
    }

    /// Stop the engine for good.
    ///
    /// Queued events and recorded activity are dropped, and later sends are
    /// discarded. Returns whether the engine was still running.
    pub fn halt(&self) -> bool {
        let (queue, current) = {
            let mut state = self.inner.state.lock();
            if state.halted {
                return false;
            }
            state.halted = true;
            (
                std::mem::take(&mut state.queue),
                std::mem::take(&mut state.current),
            )
        };
        debug!(dropped = queue.len(), "engine halted");
        drop((queue, current));
        true
    }

    pub fn is_halted(&self) -> bool {
        self.inner.state.lock().halted
    }

    /// Number of queued events.
    pub fn pending(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    /// Snapshot of the activity recorded outside dispatch since the
    /// previous dispatch.
    pub fn effect(&self) -> Effect {
        self.inner.state.lock().current.clone()
    }

    /// Process the oldest queued event.
    ///
    /// Returns `None` when nothing is queued. A failing behavior consumes
    /// its event; the failure is recorded as the effect's `exception`.
    pub fn dispatch(&self) -> Option<Effect> {
        let event = {
            let mut state = self.inner.state.lock();
            let event = state.queue.pop_front()?;
            state.current = Effect::default();
            state.dispatching = true;
            event
        };

        let sponsor: Arc<dyn Sponsor> = Arc::new(self.clone());
        let receipt = event.target.receive(event.message.clone(), sponsor);

        let mut effect = Effect {
            behavior: Some(receipt.behavior),
            created: receipt.created,
            became: receipt.became,
            exception: receipt.outcome.err(),
            event: Some(event),
            ..Effect::default()
        };
        for (target, message) in receipt.sent {
            target.send(message.clone());
            effect.sent.push(Event::new(target, message));
        }

        self.inner.state.lock().dispatching = false;

        if let Some(fault) = &effect.exception {
            debug!(behavior = ?effect.behavior, error = %fault, "behavior failed");
        }
        Some(effect)
    }

    /// Dispatch events until none are left, the count runs out, or the
    /// fail hook gives up.
    ///
    /// Returns `Ok(true)` when the queue was drained and `Ok(false)` when
    /// the count ran out first.
    pub fn event_loop(&self, options: EventLoop<'_>) -> Result<bool, Fault> {
        let EventLoop {
            mut count,
            mut log,
            mut fail,
        } = options;

        loop {
            if let Some(remaining) = count.as_mut() {
                if *remaining == 0 {
                    return Ok(false);
                }
                *remaining -= 1;
            }

            let effect = self.dispatch();
            if let Some(log) = log.as_mut() {
                log(effect.as_ref());
            }

            let Some(effect) = effect else {
                return Ok(true);
            };

            if let Some(fault) = effect.exception {
                match fail.as_mut() {
                    Some(fail) => fail(fault)?,
                    None => return Err(fault),
                }
            }
        }
    }
}

impl Sponsor for Stepping {
    fn sponsor(&self, behavior: Behavior) -> Actor {
        Stepping::sponsor(self, behavior)
    }
}

struct Plumbing(Stepping);

impl Sponsor for Plumbing {
    fn sponsor(&self, behavior: Behavior) -> Actor {
        self.0.create(behavior, false)
    }
}
