//! Sync service
//!
//! One entry point per (vendor, kind) plus [`SyncService::sync`], which
//! dispatches on the scope's vendor. Top-level kinds run a full reconciler
//! with their child kinds cascaded; child kinds run a child pass over the
//! stored parents selected by the scope.

use crate::cascade::{ChildReconciler, ChildResync, resync_children};
use crate::core::{SyncConfig, SyncError, SyncResult};
use crate::diff::SyncKind;
use crate::driver::Reconciler;
use crate::report::SyncReport;
use crate::source::{ChildSource, CloudSource};
use crate::store::MirrorStore;
use crate::vendor::aws::{
    AwsApi, AwsRuleSource, AwsSecurityGroupKind, AwsSecurityGroupRuleKind, AwsSource, AwsVpcKind,
};
use crate::vendor::azure::{
    AzureApi, AzureRuleSource, AzureSecurityGroupKind, AzureSecurityGroupRuleKind, AzureSource,
    AzureVpcKind,
};
use crate::vendor::gcp::{GcpApi, GcpFirewallKind, GcpSource, GcpVpcKind};
use crate::vendor::huawei::{
    HuaWeiApi, HuaWeiRuleSource, HuaWeiSecurityGroupKind, HuaWeiSecurityGroupRuleKind,
    HuaWeiSource, HuaWeiVpcKind,
};
use crate::vendor::tcloud::{
    TCloudApi, TCloudListenerKind, TCloudListenerSource, TCloudLoadBalancerKind,
    TCloudRuleSource, TCloudSecurityGroupKind, TCloudSecurityGroupRuleKind, TCloudSource,
    TCloudVpcKind,
};
use shared::{ResourceKind, SyncScope, Vendor};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct SyncService {
    store: Arc<dyn MirrorStore>,
    config: SyncConfig,
    tcloud: Option<Arc<dyn TCloudApi>>,
    aws: Option<Arc<dyn AwsApi>>,
    huawei: Option<Arc<dyn HuaWeiApi>>,
    azure: Option<Arc<dyn AzureApi>>,
    gcp: Option<Arc<dyn GcpApi>>,
}

impl SyncService {
    pub fn new(store: Arc<dyn MirrorStore>, config: SyncConfig) -> Self {
        Self {
            store,
            config,
            tcloud: None,
            aws: None,
            huawei: None,
            azure: None,
            gcp: None,
        }
    }

    pub fn with_tcloud(mut self, api: Arc<dyn TCloudApi>) -> Self {
        self.tcloud = Some(api);
        self
    }

    pub fn with_aws(mut self, api: Arc<dyn AwsApi>) -> Self {
        self.aws = Some(api);
        self
    }

    pub fn with_huawei(mut self, api: Arc<dyn HuaWeiApi>) -> Self {
        self.huawei = Some(api);
        self
    }

    pub fn with_azure(mut self, api: Arc<dyn AzureApi>) -> Self {
        self.azure = Some(api);
        self
    }

    pub fn with_gcp(mut self, api: Arc<dyn GcpApi>) -> Self {
        self.gcp = Some(api);
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Reconcile `kind` for the scope's vendor
    pub async fn sync(
        &self,
        kind: ResourceKind,
        scope: &SyncScope,
        cancel: CancellationToken,
    ) -> SyncResult<SyncReport> {
        use ResourceKind::*;
        match (scope.vendor, kind) {
            (Vendor::TCloud, SecurityGroup) => self.sync_tcloud_security_group(scope, cancel).await,
            (Vendor::TCloud, SecurityGroupRule) => {
                self.sync_tcloud_security_group_rule(scope, cancel).await
            }
            (Vendor::TCloud, LoadBalancer) => self.sync_tcloud_load_balancer(scope, cancel).await,
            (Vendor::TCloud, Listener) => self.sync_tcloud_listener(scope, cancel).await,
            (Vendor::TCloud, Vpc) => self.sync_tcloud_vpc(scope, cancel).await,
            (Vendor::Aws, SecurityGroup) => self.sync_aws_security_group(scope, cancel).await,
            (Vendor::Aws, SecurityGroupRule) => {
                self.sync_aws_security_group_rule(scope, cancel).await
            }
            (Vendor::Aws, Vpc) => self.sync_aws_vpc(scope, cancel).await,
            (Vendor::HuaWei, SecurityGroup) => self.sync_huawei_security_group(scope, cancel).await,
            (Vendor::HuaWei, SecurityGroupRule) => {
                self.sync_huawei_security_group_rule(scope, cancel).await
            }
            (Vendor::HuaWei, Vpc) => self.sync_huawei_vpc(scope, cancel).await,
            (Vendor::Azure, SecurityGroup) => self.sync_azure_security_group(scope, cancel).await,
            (Vendor::Azure, SecurityGroupRule) => {
                self.sync_azure_security_group_rule(scope, cancel).await
            }
            (Vendor::Azure, Vpc) => self.sync_azure_vpc(scope, cancel).await,
            (Vendor::Gcp, Firewall) => self.sync_gcp_firewall(scope, cancel).await,
            (Vendor::Gcp, Vpc) => self.sync_gcp_vpc(scope, cancel).await,
            (vendor, kind) => Err(SyncError::UnsupportedKind { vendor, kind }),
        }
    }

    // ========== TCloud ==========

    pub async fn sync_tcloud_security_group(
        &self,
        scope: &SyncScope,
        cancel: CancellationToken,
    ) -> SyncResult<SyncReport> {
        let api = self.tcloud()?;
        let rules = self.child::<TCloudSecurityGroupRuleKind, _>(TCloudRuleSource::new(api.clone()));
        self.reconciler::<TCloudSecurityGroupKind, _>(TCloudSource::<TCloudSecurityGroupKind>::new(api))
            .with_child(rules)
            .run(scope, cancel)
            .await
    }

    pub async fn sync_tcloud_security_group_rule(
        &self,
        scope: &SyncScope,
        cancel: CancellationToken,
    ) -> SyncResult<SyncReport> {
        let rules = self.child::<TCloudSecurityGroupRuleKind, _>(TCloudRuleSource::new(self.tcloud()?));
        self.run_children(rules.as_ref(), Vendor::TCloud, scope, cancel)
            .await
    }

    pub async fn sync_tcloud_load_balancer(
        &self,
        scope: &SyncScope,
        cancel: CancellationToken,
    ) -> SyncResult<SyncReport> {
        let api = self.tcloud()?;
        let listeners = self.child::<TCloudListenerKind, _>(TCloudListenerSource::new(api.clone()));
        self.reconciler::<TCloudLoadBalancerKind, _>(TCloudSource::<TCloudLoadBalancerKind>::new(api))
            .with_child(listeners)
            .run(scope, cancel)
            .await
    }

    pub async fn sync_tcloud_listener(
        &self,
        scope: &SyncScope,
        cancel: CancellationToken,
    ) -> SyncResult<SyncReport> {
        let listeners = self.child::<TCloudListenerKind, _>(TCloudListenerSource::new(self.tcloud()?));
        self.run_children(listeners.as_ref(), Vendor::TCloud, scope, cancel)
            .await
    }

    pub async fn sync_tcloud_vpc(
        &self,
        scope: &SyncScope,
        cancel: CancellationToken,
    ) -> SyncResult<SyncReport> {
        self.reconciler::<TCloudVpcKind, _>(TCloudSource::<TCloudVpcKind>::new(self.tcloud()?))
            .run(scope, cancel)
            .await
    }

    // ========== AWS ==========

    pub async fn sync_aws_security_group(
        &self,
        scope: &SyncScope,
        cancel: CancellationToken,
    ) -> SyncResult<SyncReport> {
        let api = self.aws()?;
        let rules = self.child::<AwsSecurityGroupRuleKind, _>(AwsRuleSource::new(api.clone()));
        self.reconciler::<AwsSecurityGroupKind, _>(AwsSource::<AwsSecurityGroupKind>::new(api))
            .with_child(rules)
            .run(scope, cancel)
            .await
    }

    pub async fn sync_aws_security_group_rule(
        &self,
        scope: &SyncScope,
        cancel: CancellationToken,
    ) -> SyncResult<SyncReport> {
        let rules = self.child::<AwsSecurityGroupRuleKind, _>(AwsRuleSource::new(self.aws()?));
        self.run_children(rules.as_ref(), Vendor::Aws, scope, cancel)
            .await
    }

    pub async fn sync_aws_vpc(
        &self,
        scope: &SyncScope,
        cancel: CancellationToken,
    ) -> SyncResult<SyncReport> {
        self.reconciler::<AwsVpcKind, _>(AwsSource::<AwsVpcKind>::new(self.aws()?))
            .run(scope, cancel)
            .await
    }

    // ========== HuaWei ==========

    pub async fn sync_huawei_security_group(
        &self,
        scope: &SyncScope,
        cancel: CancellationToken,
    ) -> SyncResult<SyncReport> {
        let api = self.huawei()?;
        let rules = self.child::<HuaWeiSecurityGroupRuleKind, _>(HuaWeiRuleSource::new(api.clone()));
        self.reconciler::<HuaWeiSecurityGroupKind, _>(HuaWeiSource::<HuaWeiSecurityGroupKind>::new(api))
            .with_child(rules)
            .run(scope, cancel)
            .await
    }

    pub async fn sync_huawei_security_group_rule(
        &self,
        scope: &SyncScope,
        cancel: CancellationToken,
    ) -> SyncResult<SyncReport> {
        let rules = self.child::<HuaWeiSecurityGroupRuleKind, _>(HuaWeiRuleSource::new(self.huawei()?));
        self.run_children(rules.as_ref(), Vendor::HuaWei, scope, cancel)
            .await
    }

    pub async fn sync_huawei_vpc(
        &self,
        scope: &SyncScope,
        cancel: CancellationToken,
    ) -> SyncResult<SyncReport> {
        self.reconciler::<HuaWeiVpcKind, _>(HuaWeiSource::<HuaWeiVpcKind>::new(self.huawei()?))
            .run(scope, cancel)
            .await
    }

    // ========== Azure ==========

    pub async fn sync_azure_security_group(
        &self,
        scope: &SyncScope,
        cancel: CancellationToken,
    ) -> SyncResult<SyncReport> {
        let api = self.azure()?;
        let rules = self.child::<AzureSecurityGroupRuleKind, _>(AzureRuleSource::new(api.clone()));
        self.reconciler::<AzureSecurityGroupKind, _>(AzureSource::<AzureSecurityGroupKind>::new(api))
            .with_child(rules)
            .run(scope, cancel)
            .await
    }

    pub async fn sync_azure_security_group_rule(
        &self,
        scope: &SyncScope,
        cancel: CancellationToken,
    ) -> SyncResult<SyncReport> {
        let rules = self.child::<AzureSecurityGroupRuleKind, _>(AzureRuleSource::new(self.azure()?));
        self.run_children(rules.as_ref(), Vendor::Azure, scope, cancel)
            .await
    }

    pub async fn sync_azure_vpc(
        &self,
        scope: &SyncScope,
        cancel: CancellationToken,
    ) -> SyncResult<SyncReport> {
        self.reconciler::<AzureVpcKind, _>(AzureSource::<AzureVpcKind>::new(self.azure()?))
            .run(scope, cancel)
            .await
    }

    // ========== GCP ==========

    pub async fn sync_gcp_firewall(
        &self,
        scope: &SyncScope,
        cancel: CancellationToken,
    ) -> SyncResult<SyncReport> {
        self.reconciler::<GcpFirewallKind, _>(GcpSource::<GcpFirewallKind>::new(self.gcp()?))
            .run(scope, cancel)
            .await
    }

    pub async fn sync_gcp_vpc(
        &self,
        scope: &SyncScope,
        cancel: CancellationToken,
    ) -> SyncResult<SyncReport> {
        self.reconciler::<GcpVpcKind, _>(GcpSource::<GcpVpcKind>::new(self.gcp()?))
            .run(scope, cancel)
            .await
    }

    // ========== Helpers ==========

    fn reconciler<K, S>(&self, source: S) -> Reconciler<K, S>
    where
        K: SyncKind,
        S: CloudSource<Record = K::Cloud>,
    {
        Reconciler::new(Arc::new(source), self.store.clone(), &self.config)
    }

    fn child<K, S>(&self, source: S) -> Arc<ChildReconciler<K, S>>
    where
        K: SyncKind,
        S: ChildSource<Record = K::Cloud>,
    {
        Arc::new(ChildReconciler::new(
            Arc::new(source),
            self.store.clone(),
            &self.config,
        ))
    }

    /// Explicit child entry point, bounded by the run deadline
    async fn run_children(
        &self,
        child: &dyn ChildResync,
        vendor: Vendor,
        scope: &SyncScope,
        cancel: CancellationToken,
    ) -> SyncResult<SyncReport> {
        scope.validate_for(vendor)?;
        let report = SyncReport::new(child.kind(), scope, "child");
        let timeout = self.config.run_timeout;
        let pass = resync_children(
            child,
            self.store.as_ref(),
            scope,
            self.config.child_concurrency,
            &cancel,
        );
        let stats = match tokio::time::timeout(timeout, pass).await {
            Ok(result) => result?,
            Err(_) => return Err(SyncError::Timeout(timeout)),
        };

        let report = report.finish(stats);
        tracing::info!(
            vendor = %vendor,
            kind = %child.kind(),
            account_id = %scope.account_id,
            region = %scope.region,
            created = report.stats.child_created,
            updated = report.stats.child_updated,
            deleted = report.stats.child_deleted,
            skipped = report.stats.child_skipped,
            elapsed_ms = report.elapsed_ms,
            "child resync finished"
        );
        Ok(report)
    }

    fn tcloud(&self) -> SyncResult<Arc<dyn TCloudApi>> {
        self.tcloud
            .clone()
            .ok_or(SyncError::NotConfigured(Vendor::TCloud))
    }

    fn aws(&self) -> SyncResult<Arc<dyn AwsApi>> {
        self.aws.clone().ok_or(SyncError::NotConfigured(Vendor::Aws))
    }

    fn huawei(&self) -> SyncResult<Arc<dyn HuaWeiApi>> {
        self.huawei
            .clone()
            .ok_or(SyncError::NotConfigured(Vendor::HuaWei))
    }

    fn azure(&self) -> SyncResult<Arc<dyn AzureApi>> {
        self.azure
            .clone()
            .ok_or(SyncError::NotConfigured(Vendor::Azure))
    }

    fn gcp(&self) -> SyncResult<Arc<dyn GcpApi>> {
        self.gcp.clone().ok_or(SyncError::NotConfigured(Vendor::Gcp))
    }
}
