//! Configuration fragments for routes and listeners
//!
//! Builds the JSON subtrees Unit expects under `/config/routes` and
//! `/config/listeners` for one service, and applies them through the
//! control-plane client. Applies target per-name sub-paths so that
//! reconciling one service leaves the entries of every other service
//! untouched; re-applying the same inputs yields the same remote state.

use crate::client::{ControlPlaneClient, Payload};
use crate::error::Result;
use crate::inventory::ServiceSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Host condition of a route step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteMatch {
    pub host: String,
}

/// Proxy action of a route step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteAction {
    pub proxy: String,
}

/// One entry of a named route array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteStep {
    #[serde(rename = "match")]
    pub matcher: RouteMatch,
    pub action: RouteAction,
}

/// TLS binding of a listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tls {
    pub certificate: String,
}

/// A listener entry, keyed in the config by its `<address>:<port>` string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listener {
    pub pass: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<Tls>,
}

/// Route rules for a service: one step matching its hostname and proxying
/// to its first port binding.
pub fn route_rules(service: &ServiceSpec) -> Result<Vec<RouteStep>> {
    let port = service.first_port()?;

    Ok(vec![RouteStep {
        matcher: RouteMatch {
            host: service.dns.clone(),
        },
        action: RouteAction {
            proxy: format!("http://{}:{}", port.ip, port.port),
        },
    }])
}

/// The two listener entries for a service: plain HTTP on `*:80` and TLS on
/// `*:443` bound to the certificate stored under the service name.
pub fn listener_set(name: &str) -> BTreeMap<String, Listener> {
    let mut listeners = BTreeMap::new();
    listeners.insert(
        "*:80".to_string(),
        Listener {
            pass: format!("routes/{name}"),
            tls: None,
        },
    );
    listeners.insert(
        "*:443".to_string(),
        Listener {
            pass: format!("routes/{name}"),
            tls: Some(Tls {
                certificate: name.to_string(),
            }),
        },
    );
    listeners
}

/// Applies route and listener fragments for one service
#[derive(Debug, Clone)]
pub struct FragmentBuilder {
    client: ControlPlaneClient,
}

impl FragmentBuilder {
    pub fn new(client: ControlPlaneClient) -> Self {
        Self { client }
    }

    /// Replace the routes entry at `/config/routes/<name>`
    pub async fn apply_routes(&self, service: &ServiceSpec) -> Result<()> {
        let rules = route_rules(service)?;
        let path = format!("/config/routes/{}", service.name);

        self.client
            .set(&path, Payload::Json(serde_json::to_value(&rules)?))
            .await?;

        info!("applied routes for '{}' ({})", service.name, service.dns);

        Ok(())
    }

    /// Replace the two listener entries, one scoped write per address so
    /// listeners belonging to other services survive.
    pub async fn apply_listeners(&self, name: &str) -> Result<()> {
        for (address, listener) in listener_set(name) {
            let path = format!("/config/listeners/{address}");
            self.client
                .set(&path, Payload::Json(serde_json::to_value(&listener)?))
                .await?;
        }

        info!("applied listeners for '{}'", name);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::PortBinding;
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service() -> ServiceSpec {
        ServiceSpec {
            name: "svc".to_string(),
            dns: "example.com".to_string(),
            ports: vec![
                PortBinding {
                    ip: "127.0.0.1".to_string(),
                    port: 8081,
                },
                PortBinding {
                    ip: "127.0.0.1".to_string(),
                    port: 9999,
                },
            ],
        }
    }

    #[test]
    fn route_rules_use_first_binding_only() {
        let rules = route_rules(&service()).unwrap();

        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].matcher.host, "example.com");
        assert_eq!(rules[0].action.proxy, "http://127.0.0.1:8081");
    }

    #[test]
    fn route_rules_serialize_to_unit_shape() {
        let rules = route_rules(&service()).unwrap();

        assert_eq!(
            serde_json::to_value(&rules).unwrap(),
            json!([{
                "match": { "host": "example.com" },
                "action": { "proxy": "http://127.0.0.1:8081" }
            }])
        );
    }

    #[test]
    fn listener_set_has_exactly_the_two_wildcard_entries() {
        let listeners = listener_set("svc");

        assert_eq!(listeners.len(), 2);

        let plain = &listeners["*:80"];
        assert_eq!(plain.pass, "routes/svc");
        assert!(plain.tls.is_none());

        let tls = &listeners["*:443"];
        assert_eq!(tls.pass, "routes/svc");
        assert_eq!(tls.tls.as_ref().unwrap().certificate, "svc");
    }

    #[test]
    fn plain_listener_omits_the_tls_key() {
        let listeners = listener_set("svc");
        assert_eq!(
            serde_json::to_value(&listeners["*:80"]).unwrap(),
            json!({ "pass": "routes/svc" })
        );
    }

    #[tokio::test]
    async fn apply_routes_targets_the_per_name_path() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/config/routes/svc"))
            .and(body_json(json!([{
                "match": { "host": "example.com" },
                "action": { "proxy": "http://127.0.0.1:8081" }
            }])))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": "ok"})))
            .expect(1)
            .mount(&server)
            .await;

        let builder = FragmentBuilder::new(ControlPlaneClient::new(
            Url::parse(&server.uri()).unwrap(),
        ));
        builder.apply_routes(&service()).await.unwrap();
    }

    #[tokio::test]
    async fn apply_listeners_writes_each_address_separately() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/config/listeners/*:80"))
            .and(body_json(json!({ "pass": "routes/svc" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": "ok"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/config/listeners/*:443"))
            .and(body_json(json!({
                "pass": "routes/svc",
                "tls": { "certificate": "svc" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": "ok"})))
            .expect(1)
            .mount(&server)
            .await;

        let builder = FragmentBuilder::new(ControlPlaneClient::new(
            Url::parse(&server.uri()).unwrap(),
        ));
        builder.apply_listeners("svc").await.unwrap();
    }
}
