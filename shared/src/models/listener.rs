//! Load balancer listener model

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerCertificate {
    /// `UNIDIRECTIONAL` or `MUTUAL`
    pub ssl_mode: Option<String>,
    pub ca_cloud_id: Option<String>,
    #[serde(default)]
    pub cert_cloud_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listener {
    pub cloud_id: String,
    pub lb_cloud_id: String,
    pub name: String,
    pub protocol: String,
    pub port: i64,
    #[serde(default)]
    pub end_port: Option<i64>,
    #[serde(default)]
    pub scheduler: Option<String>,
    #[serde(default)]
    pub session_expire: Option<i64>,
    #[serde(default)]
    pub sni_switch: bool,
    #[serde(default)]
    pub default_domain: Option<String>,
    #[serde(default)]
    pub certificate: Option<ListenerCertificate>,
}

impl Listener {
    /// Layer-7 listeners carry domains and certificates
    pub fn is_layer7(&self) -> bool {
        matches!(self.protocol.as_str(), "HTTP" | "HTTPS")
    }
}
