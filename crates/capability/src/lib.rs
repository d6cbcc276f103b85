//! Capability primitives for actor configurations.
//!
//! Core principle: **an actor reference is the only authority.** A holder
//! can send to an actor and nothing else; a [`Revocable`] proxy lets that
//! authority be withdrawn later.

mod actor;
mod error;
mod fault;
mod revocable;
mod value;

pub use actor::{Actor, ActorId, Behavior, Context, Mailbox, Receipt, Sponsor};
pub use error::{Error, Result};
pub use fault::Fault;
pub use revocable::{Revocable, RevokeHandle};
pub use value::Value;
