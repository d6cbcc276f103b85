//! The capability bundle handed to the host.

use capability::{Actor, Value};
use marshal::Router;

use crate::{Error, Result};

/// Everything the host gets from `create`.
///
/// Management capabilities are URIs in the control domain; the two
/// receptionists are revocable proxies the host routes inbound traffic to.
#[derive(Debug, Clone, PartialEq)]
pub struct SandboxBundle {
    /// URI scheme shared by both domains.
    pub scheme: String,
    /// Name of the control domain.
    pub control_domain: String,
    pub control_receptionist: Actor,
    pub destroy: String,
    pub dispatch: String,
    /// Name of the sandbox domain.
    pub domain: String,
    pub event_loop: String,
    pub receptionist: Actor,
    pub sponsor: String,
    pub effect: Option<String>,
}

impl SandboxBundle {
    /// `scheme://control-domain/`
    pub fn control_prefix(&self) -> String {
        format!("{}://{}/", self.scheme, self.control_domain)
    }

    /// `scheme://domain/`
    pub fn domain_prefix(&self) -> String {
        format!("{}://{}/", self.scheme, self.domain)
    }

    /// Route both sandbox domains on `router`.
    pub fn install_routes(&self, router: &Router) -> Result<()> {
        router.route(&self.control_prefix(), self.control_receptionist.clone())?;
        router.route(&self.domain_prefix(), self.receptionist.clone())?;
        Ok(())
    }

    pub fn to_value(&self) -> Value {
        let mut value = Value::map([
            ("scheme", Value::from(self.scheme.as_str())),
            ("controlDomain", Value::from(self.control_domain.as_str())),
            ("controlReceptionist", Value::from(&self.control_receptionist)),
            ("destroy", Value::from(self.destroy.as_str())),
            ("dispatch", Value::from(self.dispatch.as_str())),
            ("domain", Value::from(self.domain.as_str())),
            ("eventLoop", Value::from(self.event_loop.as_str())),
            ("receptionist", Value::from(&self.receptionist)),
            ("sponsor", Value::from(self.sponsor.as_str())),
        ]);
        if let Some(effect) = &self.effect {
            value.insert("effect", effect.as_str());
        }
        value
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        if value.as_map().is_none() {
            return Err(Error::Bundle(format!("expected map, found {}", value.kind())));
        }
        let text = |field: &str| value.require_str(field).map(str::to_string);
        Ok(Self {
            scheme: value
                .get("scheme")
                .and_then(Value::as_str)
                .unwrap_or("ansible")
                .to_string(),
            control_domain: text("controlDomain")?,
            control_receptionist: value.require_actor("controlReceptionist")?.clone(),
            destroy: text("destroy")?,
            dispatch: text("dispatch")?,
            domain: text("domain")?,
            event_loop: text("eventLoop")?,
            receptionist: value.require_actor("receptionist")?.clone(),
            sponsor: text("sponsor")?,
            effect: value.get("effect").and_then(Value::as_str).map(str::to_string),
        })
    }
}
