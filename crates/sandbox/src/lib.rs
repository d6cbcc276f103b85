//! Remotely controlled sandboxes for the stepping engine.
//!
//! A sandbox is a private [`Stepping`](stepping::Stepping) engine plus two
//! naming domains:
//!
//! - the **control domain**, sponsored by the host, which exports the
//!   management capabilities (`sponsor`, `dispatch`, `eventLoop`, `effect`,
//!   `destroy`);
//! - the **sandbox domain**, sponsored by the engine, which names the
//!   sandboxed actors.
//!
//! The host only ever sees revocable proxies. `destroy` revokes all of them,
//! together with the sandbox's access to the transport.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use marshal::Router;
//! use sandbox::{ModuleRegistry, SandboxConfig, SandboxFactory};
//! use stepping::Stepping;
//!
//! # fn example() -> sandbox::Result<()> {
//! let host = Stepping::new();
//! let router = Router::new(Arc::new(host.clone()));
//!
//! let factory = SandboxFactory::new(SandboxConfig::default(), Arc::new(ModuleRegistry::new()))?;
//! let bundle = factory.create(Arc::new(host.clone()), router.transport())?;
//! bundle.install_routes(&router)?;
//!
//! println!("dispatch capability: {}", bundle.dispatch);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

mod adapter;
mod bundle;
mod config;
mod error;
mod lifecycle;
mod loader;
mod module;
mod name;
mod registry;

pub use adapter::{event_loop_adapter, value_adapter};
pub use bundle::SandboxBundle;
pub use config::{MIN_NAME_BYTES, SandboxConfig};
pub use error::{Error, Result};
pub use lifecycle::SandboxFactory;
pub use loader::{Exports, LoadError, ModuleLoader, ModuleRegistry};
pub use module::module_sponsor;
pub use name::mint_domain_name;
pub use registry::{DestroyCoordinator, RevocationReport, RevocationRegistry};
