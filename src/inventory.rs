//! Service descriptors supplied by the external inventory
//!
//! The inventory tells us which service listens where; identifiers are
//! treated as opaque and not validated for DNS well-formedness here.

use crate::error::{Error, Result};
use serde::Deserialize;

/// Upstream address a proxy target listens on
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PortBinding {
    pub ip: String,
    // The inventory's native spelling for the exposed port is `out`.
    #[serde(alias = "out")]
    pub port: u16,
}

/// One service to reconcile: the name keys both the certificate and the
/// routes entry, the dns is the public hostname the listener matches on.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSpec {
    pub name: String,
    pub dns: String,
    pub ports: Vec<PortBinding>,
}

impl ServiceSpec {
    /// The binding reconciliation proxies to. Only the first one is
    /// consumed; multi-upstream balancing is out of scope.
    pub fn first_port(&self) -> Result<&PortBinding> {
        self.ports.first().ok_or_else(|| Error::NoPortBinding {
            name: self.name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_inventory_port_spelling() {
        let spec: ServiceSpec = serde_json::from_str(
            r#"{"name": "web", "dns": "example.com", "ports": [{"ip": "127.0.0.1", "out": 8081}]}"#,
        )
        .unwrap();

        assert_eq!(
            spec.first_port().unwrap(),
            &PortBinding {
                ip: "127.0.0.1".to_string(),
                port: 8081
            }
        );
    }

    #[test]
    fn no_bindings_is_a_typed_error() {
        let spec = ServiceSpec {
            name: "web".to_string(),
            dns: "example.com".to_string(),
            ports: vec![],
        };

        assert!(matches!(
            spec.first_port(),
            Err(Error::NoPortBinding { ref name }) if name == "web"
        ));
    }
}
