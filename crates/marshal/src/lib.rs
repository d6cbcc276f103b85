//! Capability marshaling between naming domains.
//!
//! A [`Domain`] gives local actors remote identifiers
//! (`scheme://authority/token`) and gives remote identifiers local proxies.
//! Proxies encode what they receive and hand it to the domain's transport;
//! a [`Router`] carries those envelopes to the receptionist of the
//! destination domain.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use capability::{Behavior, Value};
//! use marshal::Router;
//! use stepping::{EventLoop, Stepping};
//!
//! # fn example() -> marshal::Result<()> {
//! let stepping = Stepping::new();
//! let router = Router::new(Arc::new(stepping.clone()));
//! let alice = router.domain("ocap://alice/")?;
//! let bob = router.domain("ocap://bob/")?;
//!
//! let inbox = bob.sponsor(Behavior::new("inbox", |_, _| Ok(())));
//! let uri = bob.local_to_remote(&inbox);
//!
//! alice.remote_to_local(&uri)?.send(Value::from("hello"));
//! assert!(stepping.event_loop(EventLoop::new()).unwrap_or(false));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

mod domain;
mod error;
mod protocol;
mod router;
mod uri;

pub use domain::Domain;
pub use error::{Error, Result};
pub use protocol::{Envelope, from_wire, to_wire};
pub use router::Router;
pub use uri::{CapabilityUri, validate_prefix};
