//! VPC / virtual network model

use super::Tags;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vpc<E> {
    pub cloud_id: String,
    pub name: String,
    #[serde(default)]
    pub cidrs: Vec<String>,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub tags: Tags,
    pub extension: E,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TCloudVpcExtension {
    pub is_default: bool,
    #[serde(default)]
    pub dns_servers: Vec<String>,
    pub enable_multicast: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsVpcExtension {
    pub is_default: bool,
    pub state: Option<String>,
    pub instance_tenancy: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HuaWeiVpcExtension {
    pub status: Option<String>,
    pub enterprise_project_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzureVpcExtension {
    pub resource_group: String,
    pub location: Option<String>,
    #[serde(default)]
    pub dns_servers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcpVpcExtension {
    pub self_link: Option<String>,
    pub auto_create_subnetworks: bool,
    pub routing_mode: Option<String>,
    pub mtu: Option<i64>,
}

pub type TCloudVpc = Vpc<TCloudVpcExtension>;
pub type AwsVpc = Vpc<AwsVpcExtension>;
pub type HuaWeiVpc = Vpc<HuaWeiVpcExtension>;
pub type AzureVpc = Vpc<AzureVpcExtension>;
pub type GcpVpc = Vpc<GcpVpcExtension>;
