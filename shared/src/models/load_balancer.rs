//! Load balancer model

use super::Tags;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadBalancer {
    pub cloud_id: String,
    pub name: String,
    /// `OPEN` (public) or `INTERNAL`
    pub lb_type: String,
    #[serde(default)]
    pub vpc_cloud_id: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub ipv4_vips: Vec<String>,
    #[serde(default)]
    pub ipv6_vips: Vec<String>,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub created_time: Option<String>,
}
