//! GCP firewall rule model

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallPorts {
    pub protocol: String,
    #[serde(default)]
    pub ports: Vec<String>,
}

/// VPC-level firewall rule (GCP models firewalls as top-level resources)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Firewall {
    pub cloud_id: String,
    pub name: String,
    pub network: String,
    pub priority: i64,
    /// `INGRESS` or `EGRESS`
    pub direction: String,
    #[serde(default)]
    pub source_ranges: Vec<String>,
    #[serde(default)]
    pub destination_ranges: Vec<String>,
    #[serde(default)]
    pub source_tags: Vec<String>,
    #[serde(default)]
    pub target_tags: Vec<String>,
    #[serde(default)]
    pub allowed: Vec<FirewallPorts>,
    #[serde(default)]
    pub denied: Vec<FirewallPorts>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub memo: Option<String>,
}
