//! Security group model

use super::Tags;
use serde::{Deserialize, Serialize};

/// Security group (Azure: network security group)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityGroup<E> {
    pub cloud_id: String,
    pub name: String,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub tags: Tags,
    pub extension: E,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TCloudSecurityGroupExtension {
    pub project_id: Option<String>,
    pub created_time: Option<String>,
    pub updated_time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsSecurityGroupExtension {
    pub vpc_cloud_id: Option<String>,
    pub owner_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HuaWeiSecurityGroupExtension {
    pub project_id: Option<String>,
    pub enterprise_project_id: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzureSecurityGroupExtension {
    pub resource_group: String,
    pub location: Option<String>,
    pub provisioning_state: Option<String>,
    #[serde(default)]
    pub network_interface_ids: Vec<String>,
    #[serde(default)]
    pub subnet_ids: Vec<String>,
}

pub type TCloudSecurityGroup = SecurityGroup<TCloudSecurityGroupExtension>;
pub type AwsSecurityGroup = SecurityGroup<AwsSecurityGroupExtension>;
pub type HuaWeiSecurityGroup = SecurityGroup<HuaWeiSecurityGroupExtension>;
pub type AzureSecurityGroup = SecurityGroup<AzureSecurityGroupExtension>;
