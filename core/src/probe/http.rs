//! HTTP fingerprinting of hosts that run a web server.
//!
//! Vendor endpoints (`/shelly`, `/api/config`) are tried first because they
//! return structured data; page bodies (`/`, `/status`) are only searched
//! for signatures when no endpoint answered.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use khaneh_common::config::Config;
use khaneh_common::device::{DiscoveredDevice, DiscoveryMethod, Protocol};
use khaneh_common::network::mac::parse_mac;
use reqwest::Client;
use reqwest::header::SERVER;
use serde_json::Value;
use tracing::{debug, trace, warn};

use super::Probe;
use crate::classifier::{self, Observation};
use crate::error::ProbeError;

const SHELLY_ENDPOINT: &str = "/shelly";
const HUE_ENDPOINT: &str = "/api/config";
const BODY_PATHS: &[&str] = &["/", "/status"];

struct Fetched {
    server: Option<String>,
    body: String,
}

/// Identifies a single `ip:port` by talking HTTP to it.
#[derive(Debug, Clone)]
pub struct HttpIdentifier {
    client: Client,
    request_timeout: Duration,
}

impl HttpIdentifier {
    pub fn new(request_timeout: Duration) -> Self {
        // Devices on a LAN serve self-signed certificates.
        let client: Client = Client::builder()
            .timeout(request_timeout)
            .danger_accept_invalid_certs(true)
            .build()
            .unwrap_or_else(|e| {
                warn!("falling back to default HTTP client: {e}");
                Client::new()
            });
        Self {
            client,
            request_timeout,
        }
    }

    /// Returns `Ok(None)` when the host answers but carries no known signature.
    pub async fn identify(&self, ip: IpAddr, port: u16) -> Result<Option<DiscoveredDevice>, ProbeError> {
        let scheme: &str = if matches!(port, 443 | 8443) { "https" } else { "http" };
        let base: String = match ip {
            IpAddr::V4(v4) => format!("{scheme}://{v4}:{port}"),
            IpAddr::V6(v6) => format!("{scheme}://[{v6}]:{port}"),
        };

        if let Some(fetched) = self.fetch(&base, SHELLY_ENDPOINT).await? {
            if let Some(device) = from_shelly_endpoint(ip, port, &fetched.body) {
                return Ok(Some(device));
            }
        }
        if let Some(fetched) = self.fetch(&base, HUE_ENDPOINT).await? {
            if let Some(device) = from_hue_endpoint(ip, port, &fetched.body) {
                return Ok(Some(device));
            }
        }

        for path in BODY_PATHS {
            let Some(fetched) = self.fetch(&base, path).await? else {
                continue;
            };
            if let Some(device) = from_body(ip, port, &fetched) {
                return Ok(Some(device));
            }
        }

        trace!(%ip, port, "no HTTP signature matched");
        Ok(None)
    }

    /// `Ok(None)` for non-success statuses; transport failures are errors.
    async fn fetch(&self, base: &str, path: &str) -> Result<Option<Fetched>, ProbeError> {
        let url: String = format!("{base}{path}");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProbeError::from_http(&url, self.request_timeout, e))?;

        if !response.status().is_success() {
            trace!(%url, status = %response.status(), "skipping");
            return Ok(None);
        }

        let server: Option<String> = response
            .headers()
            .get(SERVER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body: String = response
            .text()
            .await
            .map_err(|e| ProbeError::from_http(&url, self.request_timeout, e))?;

        Ok(Some(Fetched { server, body }))
    }
}

fn json_str<'a>(json: &'a Value, key: &str) -> Option<&'a str> {
    json.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn from_shelly_endpoint(ip: IpAddr, port: u16, body: &str) -> Option<DiscoveredDevice> {
    let json: Value = serde_json::from_str(body).ok()?;
    // Gen1 reports `type`, Gen2 reports `model`.
    let model: &str = json_str(&json, "type").or_else(|| json_str(&json, "model"))?;

    let mut observation = Observation::new(ip, Protocol::Shelly, DiscoveryMethod::HttpEndpoint);
    observation.port = Some(port);
    observation.mac = json_str(&json, "mac").and_then(parse_mac);
    observation.name = json_str(&json, "name").map(str::to_string);
    observation.evidence.model = Some(model.to_string());
    observation.evidence.http_body = Some(body.to_string());

    (classifier::manufacturer_for(&observation.evidence) == Some("Shelly"))
        .then(|| observation.into_device())
}

fn from_hue_endpoint(ip: IpAddr, port: u16, body: &str) -> Option<DiscoveredDevice> {
    let json: Value = serde_json::from_str(body).ok()?;
    json_str(&json, "bridgeid")?;

    let mut observation = Observation::new(ip, Protocol::Hue, DiscoveryMethod::HttpEndpoint);
    observation.port = Some(port);
    observation.mac = json_str(&json, "mac").and_then(parse_mac);
    observation.name = json_str(&json, "name").map(str::to_string);
    observation.evidence.model = json_str(&json, "modelid").map(str::to_string);
    observation.evidence.http_body = Some(body.to_string());

    Some(observation.into_device())
}

fn from_body(ip: IpAddr, port: u16, fetched: &Fetched) -> Option<DiscoveredDevice> {
    let haystack: String = match &fetched.server {
        Some(server) => format!("{server}\n{}", fetched.body),
        None => fetched.body.clone(),
    };

    let mut observation = Observation::new(ip, Protocol::Http, DiscoveryMethod::HttpBody);
    observation.port = Some(port);
    observation.evidence.http_body = Some(haystack);

    observation.protocol = match classifier::manufacturer_for(&observation.evidence)? {
        "Shelly" => Protocol::Shelly,
        "Philips" => Protocol::Hue,
        _ => Protocol::Http,
    };
    Some(observation.into_device())
}

/// Fingerprints every configured host on every configured HTTP port.
pub struct HttpProbe {
    identifier: HttpIdentifier,
    targets: Vec<(IpAddr, u16)>,
}

impl HttpProbe {
    pub fn new(identifier: HttpIdentifier, targets: Vec<(IpAddr, u16)>) -> Self {
        Self { identifier, targets }
    }

    pub fn from_config(config: &Config) -> Self {
        let targets = config
            .known_hosts
            .iter()
            .flat_map(|ip| config.http_ports.iter().map(move |port| (*ip, *port)))
            .collect();
        Self::new(HttpIdentifier::new(config.http_timeout), targets)
    }
}

#[async_trait]
impl Probe for HttpProbe {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn probe(&self, timeout: Duration) -> Result<Vec<DiscoveredDevice>, ProbeError> {
        let attempts = self.targets.iter().map(|&(ip, port)| async move {
            match tokio::time::timeout(timeout, self.identifier.identify(ip, port)).await {
                Ok(Ok(found)) => found,
                Ok(Err(e)) => {
                    debug!(%ip, port, "http probe failed: {e}");
                    None
                }
                Err(_elapsed) => {
                    debug!(%ip, port, "http probe timed out");
                    None
                }
            }
        });

        Ok(join_all(attempts).await.into_iter().flatten().collect())
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
