//! Loading sandboxed code.

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use capability::{Behavior, Fault, Value};
use parking_lot::RwLock;
use thiserror::Error;
use tracing::debug;

/// What a module evaluates to.
#[derive(Debug, Clone)]
pub enum Exports {
    /// One behavior.
    Single(Behavior),
    /// Behaviors by name.
    Named(BTreeMap<String, Behavior>),
    /// Anything else. Nothing is sponsored for it.
    Opaque(Value),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    #[error("module not found: {0}")]
    NotFound(String),

    #[error("module evaluation failed: {0}")]
    Evaluation(Fault),
}

impl LoadError {
    /// The failure as it is reported to a `fail` continuation.
    pub fn to_fault(&self) -> Fault {
        match self {
            LoadError::Evaluation(fault) => fault.clone(),
            other => Fault::new(other.to_string(), ""),
        }
    }
}

/// Turns module source into behaviors.
///
/// Implementations are the isolation boundary: whatever they evaluate must
/// not reach host state except through the behaviors it returns.
pub trait ModuleLoader: Send + Sync {
    fn load(&self, source: &str) -> Result<Exports, LoadError>;
}

type Factory = Arc<dyn Fn() -> anyhow::Result<Exports> + Send + Sync>;

/// A loader over a fixed set of in-process modules.
///
/// A module's source text is its specifier, compared after trimming
/// whitespace. Factories are evaluated on every load and their panics are
/// reported as evaluation failures.
#[derive(Default, Clone)]
pub struct ModuleRegistry {
    modules: Arc<RwLock<BTreeMap<String, Factory>>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&self, specifier: impl Into<String>, factory: F) -> &Self
    where
        F: Fn() -> anyhow::Result<Exports> + Send + Sync + 'static,
    {
        let specifier = specifier.into().trim().to_string();
        debug!(module = %specifier, "module registered");
        self.modules.write().insert(specifier, Arc::new(factory));
        self
    }

    /// Registered specifiers, sorted.
    pub fn specifiers(&self) -> Vec<String> {
        self.modules.read().keys().cloned().collect()
    }
}

impl ModuleLoader for ModuleRegistry {
    fn load(&self, source: &str) -> Result<Exports, LoadError> {
        let specifier = source.trim();
        let factory = self
            .modules
            .read()
            .get(specifier)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(specifier.to_string()))?;

        let frame = format!("module {specifier}");
        match catch_unwind(AssertUnwindSafe(|| factory())) {
            Ok(Ok(exports)) => Ok(exports),
            Ok(Err(err)) => Err(LoadError::Evaluation(Fault::from_error(&err, &frame))),
            Err(payload) => Err(LoadError::Evaluation(Fault::from_panic(payload, &frame))),
        }
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.specifiers())
            .finish()
    }
}
