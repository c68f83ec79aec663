//! Cloud vendors, resource kinds and sync scopes

mod scope;

pub use scope::{MAX_TARGET_IDS, ScopeError, SyncScope};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Public cloud provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    TCloud,
    Aws,
    HuaWei,
    Azure,
    Gcp,
}

impl Vendor {
    pub const ALL: [Vendor; 5] = [
        Vendor::TCloud,
        Vendor::Aws,
        Vendor::HuaWei,
        Vendor::Azure,
        Vendor::Gcp,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TCloud => "tcloud",
            Self::Aws => "aws",
            Self::HuaWei => "huawei",
            Self::Azure => "azure",
            Self::Gcp => "gcp",
        }
    }

    /// Resource kinds mirrored for this vendor, parents before children.
    pub const fn kinds(&self) -> &'static [ResourceKind] {
        use ResourceKind::*;
        match self {
            Self::TCloud => &[
                SecurityGroup,
                SecurityGroupRule,
                LoadBalancer,
                Listener,
                Vpc,
            ],
            Self::Aws | Self::HuaWei | Self::Azure => {
                &[SecurityGroup, SecurityGroupRule, Vpc]
            }
            Self::Gcp => &[Firewall, Vpc],
        }
    }

    pub fn supports(&self, kind: ResourceKind) -> bool {
        self.kinds().contains(&kind)
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unknown vendor or kind names
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {what}: {value}")]
pub struct ParseNameError {
    pub what: &'static str,
    pub value: String,
}

impl FromStr for Vendor {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Vendor::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseNameError {
                what: "vendor",
                value: s.to_string(),
            })
    }
}

/// Vendor-neutral resource kind
///
/// Azure network security groups and GCP VPC networks map onto
/// `SecurityGroup` and `Vpc`; Azure security rules onto `SecurityGroupRule`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    SecurityGroup,
    SecurityGroupRule,
    LoadBalancer,
    Listener,
    Vpc,
    Firewall,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::SecurityGroup,
        ResourceKind::SecurityGroupRule,
        ResourceKind::LoadBalancer,
        ResourceKind::Listener,
        ResourceKind::Vpc,
        ResourceKind::Firewall,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SecurityGroup => "security_group",
            Self::SecurityGroupRule => "security_group_rule",
            Self::LoadBalancer => "load_balancer",
            Self::Listener => "listener",
            Self::Vpc => "vpc",
            Self::Firewall => "firewall",
        }
    }

    /// Parent kind for child resources
    pub const fn parent(&self) -> Option<ResourceKind> {
        match self {
            Self::SecurityGroupRule => Some(Self::SecurityGroup),
            Self::Listener => Some(Self::LoadBalancer),
            _ => None,
        }
    }

    pub const fn is_child(&self) -> bool {
        self.parent().is_some()
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseNameError {
                what: "resource kind",
                value: s.to_string(),
            })
    }
}
