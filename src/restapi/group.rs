//! RBAC groups and the permission catalogue shared with roles.

use super::{ApiMember, InstanaDataObject};
use serde::{Deserialize, Serialize};

/// Every permission the Instana API accepts on roles and groups.
pub const SUPPORTED_PERMISSIONS: &[&str] = &[
    "CAN_CONFIGURE_APPLICATIONS",
    "CAN_CONFIGURE_EUM_APPLICATIONS",
    "CAN_CONFIGURE_AGENTS",
    "CAN_VIEW_TRACE_DETAILS",
    "CAN_VIEW_LOGS",
    "CAN_CONFIGURE_SESSION_SETTINGS",
    "CAN_CONFIGURE_INTEGRATIONS",
    "CAN_CONFIGURE_GLOBAL_APPLICATION_SMART_ALERTS",
    "CAN_CONFIGURE_GLOBAL_SYNTHETIC_SMART_ALERTS",
    "CAN_CONFIGURE_GLOBAL_INFRA_SMART_ALERTS",
    "CAN_CONFIGURE_GLOBAL_LOG_SMART_ALERTS",
    "CAN_CONFIGURE_GLOBAL_ALERT_PAYLOAD",
    "CAN_CONFIGURE_MOBILE_APP_MONITORING",
    "CAN_CONFIGURE_API_TOKENS",
    "CAN_CONFIGURE_SERVICE_LEVEL_INDICATORS",
    "CAN_CONFIGURE_AUTHENTICATION_METHODS",
    "CAN_CONFIGURE_RELEASES",
    "CAN_VIEW_AUDIT_LOG",
    "CAN_CONFIGURE_EVENTS_AND_ALERTS",
    "CAN_CONFIGURE_MAINTENANCE_WINDOWS",
    "CAN_CONFIGURE_APPLICATION_SMART_ALERTS",
    "CAN_CONFIGURE_WEBSITE_SMART_ALERTS",
    "CAN_CONFIGURE_MOBILE_APP_SMART_ALERTS",
    "CAN_CONFIGURE_AGENT_RUN_MODE",
    "CAN_CONFIGURE_SERVICE_MAPPING",
    "CAN_EDIT_ALL_ACCESSIBLE_CUSTOM_DASHBOARDS",
    "CAN_CONFIGURE_USERS",
    "CAN_INSTALL_NEW_AGENTS",
    "CAN_CONFIGURE_TEAMS",
    "CAN_CREATE_PUBLIC_CUSTOM_DASHBOARDS",
    "CAN_CONFIGURE_LOG_MANAGEMENT",
    "CAN_VIEW_ACCOUNT_AND_BILLING_INFORMATION",
    "CAN_VIEW_SYNTHETIC_TESTS",
    "CAN_VIEW_SYNTHETIC_LOCATIONS",
    "CAN_CREATE_THREAD_DUMP",
    "CAN_CREATE_HEAP_DUMP",
    "CAN_CONFIGURE_DATABASE_MANAGEMENT",
    "CAN_CONFIGURE_LOG_RETENTION_PERIOD",
    "CAN_CONFIGURE_PERSONAL_API_TOKENS",
    "ACCESS_INFRASTRUCTURE_ANALYZE",
    "CAN_VIEW_LOG_VOLUME",
    "CAN_RUN_AUTOMATION_ACTIONS",
    "CAN_VIEW_SYNTHETIC_TEST_RESULTS",
    "CAN_INVOKE_ALERT_CHANNEL",
    "CAN_MANUALLY_CLOSE_ISSUE",
    "CAN_DELETE_LOGS",
    "CAN_CONFIGURE_SYNTHETIC_TESTS",
    "CAN_VIEW_BUSINESS_PROCESS_DETAILS",
    "CAN_VIEW_BIZOPS_ALERTS",
    "CAN_USE_SYNTHETIC_CREDENTIALS",
    "CAN_DELETE_AUTOMATION_ACTION_HISTORY",
    "CAN_CONFIGURE_SYNTHETIC_LOCATIONS",
    "CAN_CONFIGURE_SYNTHETIC_CREDENTIALS",
    "CAN_CONFIGURE_SUBTRACES",
    "CAN_CONFIGURE_LLM",
    "CAN_CONFIGURE_BIZOPS",
    "CAN_CONFIGURE_AUTOMATION_POLICIES",
    "CAN_CONFIGURE_AUTOMATION_ACTIONS",
];

/// Binding of a group to a scope, optionally through a scope role.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeBinding {
    pub scope_id: String,
    #[serde(default)]
    pub scope_role_id: Option<String>,
}

impl ScopeBinding {
    /// Binding to `scope_id` without a scope role.
    pub fn scope(scope_id: impl Into<String>) -> Self {
        Self {
            scope_id: scope_id.into(),
            scope_role_id: None,
        }
    }
}

/// Permissions and scope restrictions of a group.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PermissionSet {
    #[serde(rename = "applicationIds", default)]
    pub application_ids: Vec<ScopeBinding>,
    #[serde(rename = "infraDfqFilter", default)]
    pub infra_dfq_filter: Option<ScopeBinding>,
    #[serde(rename = "kubernetesClusterUUIDs", default)]
    pub kubernetes_cluster_uuids: Vec<ScopeBinding>,
    #[serde(rename = "kubernetesNamespaceUIDs", default)]
    pub kubernetes_namespace_uids: Vec<ScopeBinding>,
    #[serde(rename = "mobileAppIds", default)]
    pub mobile_app_ids: Vec<ScopeBinding>,
    #[serde(rename = "websiteIds", default)]
    pub website_ids: Vec<ScopeBinding>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl PermissionSet {
    /// True when neither a permission nor a scope is assigned.
    ///
    /// An infra DFQ binding with an empty scope id does not count.
    pub fn is_empty(&self) -> bool {
        self.application_ids.is_empty()
            && self.kubernetes_cluster_uuids.is_empty()
            && self.kubernetes_namespace_uids.is_empty()
            && self.mobile_app_ids.is_empty()
            && self.website_ids.is_empty()
            && self.permissions.is_empty()
            && self
                .infra_dfq_filter
                .as_ref()
                .map_or(true, |binding| binding.scope_id.is_empty())
    }
}

/// An RBAC group.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub members: Vec<ApiMember>,
    #[serde(default)]
    pub permission_set: PermissionSet,
}

impl InstanaDataObject for Group {
    fn id_for_resource_path(&self) -> &str {
        &self.id
    }
}
