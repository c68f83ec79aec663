//! Security group rule model

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleDirection {
    Ingress,
    Egress,
}

impl RuleDirection {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ingress => "ingress",
            Self::Egress => "egress",
        }
    }
}

/// One rule of a security group
///
/// `cloud_id` is whatever identifies the rule inside its group. Providers
/// without native rule ids (TCloud) use `"<direction>:<policy index>"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityGroupRule {
    pub cloud_id: String,
    pub security_group_cloud_id: String,
    pub direction: RuleDirection,
    /// Policy index or priority; lower evaluates first
    pub priority: i64,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub port: Option<String>,
    /// `accept` / `drop` / `allow` / `deny`, as reported by the provider
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub ipv4_cidr: Option<String>,
    #[serde(default)]
    pub ipv6_cidr: Option<String>,
    #[serde(default)]
    pub remote_group_id: Option<String>,
    #[serde(default)]
    pub address_template: Option<String>,
    #[serde(default)]
    pub memo: Option<String>,
}

impl SecurityGroupRule {
    /// Rule id for providers keying rules by direction and position
    pub fn positional_id(direction: RuleDirection, index: i64) -> String {
        format!("{}:{}", direction.as_str(), index)
    }
}
