//! API tokens.

use super::InstanaDataObject;
use serde::{Deserialize, Serialize};

/// Invokes `$callback! { field => "jsonName", ... }` with every permission
/// and scope flag of an API token.
macro_rules! for_each_api_token_permission {
    ($callback:ident) => {
        $callback! {
            can_configure_service_mapping => "canConfigureServiceMapping",
            can_configure_eum_applications => "canConfigureEumApplications",
            can_configure_mobile_app_monitoring => "canConfigureMobileAppMonitoring",
            can_configure_users => "canConfigureUsers",
            can_install_new_agents => "canInstallNewAgents",
            can_configure_integrations => "canConfigureIntegrations",
            can_configure_events_and_alerts => "canConfigureEventsAndAlerts",
            can_configure_maintenance_windows => "canConfigureMaintenanceWindows",
            can_configure_application_smart_alerts => "canConfigureApplicationSmartAlerts",
            can_configure_website_smart_alerts => "canConfigureWebsiteSmartAlerts",
            can_configure_mobile_app_smart_alerts => "canConfigureMobileAppSmartAlerts",
            can_configure_api_tokens => "canConfigureApiTokens",
            can_configure_agent_run_mode => "canConfigureAgentRunMode",
            can_view_audit_log => "canViewAuditLog",
            can_configure_agents => "canConfigureAgents",
            can_configure_authentication_methods => "canConfigureAuthenticationMethods",
            can_configure_applications => "canConfigureApplications",
            can_configure_teams => "canConfigureTeams",
            can_configure_releases => "canConfigureReleases",
            can_configure_log_management => "canConfigureLogManagement",
            can_create_public_custom_dashboards => "canCreatePublicCustomDashboards",
            can_view_logs => "canViewLogs",
            can_view_trace_details => "canViewTraceDetails",
            can_configure_session_settings => "canConfigureSessionSettings",
            can_configure_service_level_indicators => "canConfigureServiceLevelIndicators",
            can_configure_global_alert_payload => "canConfigureGlobalAlertPayload",
            can_configure_global_application_smart_alerts => "canConfigureGlobalApplicationSmartAlerts",
            can_configure_global_synthetic_smart_alerts => "canConfigureGlobalSyntheticSmartAlerts",
            can_configure_global_infra_smart_alerts => "canConfigureGlobalInfraSmartAlerts",
            can_configure_global_log_smart_alerts => "canConfigureGlobalLogSmartAlerts",
            can_view_account_and_billing_information => "canViewAccountAndBillingInformation",
            can_edit_all_accessible_custom_dashboards => "canEditAllAccessibleCustomDashboards",
            limited_applications_scope => "limitedApplicationsScope",
            limited_biz_ops_scope => "limitedBizOpsScope",
            limited_websites_scope => "limitedWebsitesScope",
            limited_kubernetes_scope => "limitedKubernetesScope",
            limited_mobile_apps_scope => "limitedMobileAppsScope",
            limited_infrastructure_scope => "limitedInfrastructureScope",
            limited_synthetics_scope => "limitedSyntheticsScope",
            limited_vsphere_scope => "limitedVsphereScope",
            limited_phmc_scope => "limitedPhmcScope",
            limited_pvc_scope => "limitedPvcScope",
            limited_zhmc_scope => "limitedZhmcScope",
            limited_pcf_scope => "limitedPcfScope",
            limited_openstack_scope => "limitedOpenstackScope",
            limited_automation_scope => "limitedAutomationScope",
            limited_logs_scope => "limitedLogsScope",
            limited_nutanix_scope => "limitedNutanixScope",
            limited_xen_server_scope => "limitedXenServerScope",
            limited_windows_hypervisor_scope => "limitedWindowsHypervisorScope",
            limited_alert_channels_scope => "limitedAlertChannelsScope",
            limited_linux_kvm_hypervisor_scope => "limitedLinuxKvmHypervisorScope",
            limited_service_level_scope => "limitedServiceLevelScope",
            limited_ai_gateway_scope => "limitedAiGatewayScope",
            limited_gen_ai_scope => "limitedGenAIScope",
            can_configure_personal_api_tokens => "canConfigurePersonalApiTokens",
            can_configure_database_management => "canConfigureDatabaseManagement",
            can_configure_automation_actions => "canConfigureAutomationActions",
            can_configure_automation_policies => "canConfigureAutomationPolicies",
            can_run_automation_actions => "canRunAutomationActions",
            can_delete_automation_action_history => "canDeleteAutomationActionHistory",
            can_configure_synthetic_tests => "canConfigureSyntheticTests",
            can_configure_synthetic_locations => "canConfigureSyntheticLocations",
            can_configure_synthetic_credentials => "canConfigureSyntheticCredentials",
            can_view_synthetic_tests => "canViewSyntheticTests",
            can_view_synthetic_locations => "canViewSyntheticLocations",
            can_view_synthetic_test_results => "canViewSyntheticTestResults",
            can_use_synthetic_credentials => "canUseSyntheticCredentials",
            can_configure_bizops => "canConfigureBizops",
            can_view_business_processes => "canViewBusinessProcesses",
            can_view_business_process_details => "canViewBusinessProcessDetails",
            can_view_business_activities => "canViewBusinessActivities",
            can_view_biz_alerts => "canViewBizAlerts",
            can_delete_logs => "canDeleteLogs",
            can_create_heap_dump => "canCreateHeapDump",
            can_create_thread_dump => "canCreateThreadDump",
            can_manually_close_issue => "canManuallyCloseIssue",
            can_view_log_volume => "canViewLogVolume",
            can_configure_log_retention_period => "canConfigureLogRetentionPeriod",
            can_configure_subtraces => "canConfigureSubtraces",
            can_invoke_alert_channel => "canInvokeAlertChannel",
            can_configure_llm => "canConfigureLLM",
            can_configure_ai_agents => "canConfigureAiAgents",
            can_configure_apdex => "canConfigureApdex",
            can_configure_service_level_correction_windows => "canConfigureServiceLevelCorrectionWindows",
            can_configure_service_level_smart_alerts => "canConfigureServiceLevelSmartAlerts",
            can_configure_service_levels => "canConfigureServiceLevels",
        }
    };
}

pub(crate) use for_each_api_token_permission;

macro_rules! api_token_struct {
    ($($field:ident => $json:literal,)*) => {
        /// An Instana API token with its permission and scope flags.
        ///
        /// Flags missing in a response decode as `false`.
        #[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
        pub struct ApiToken {
            #[serde(default)]
            pub id: String,
            #[serde(rename = "accessGrantingToken", default)]
            pub access_granting_token: String,
            #[serde(rename = "internalId", default)]
            pub internal_id: String,
            pub name: String,
            $(
                #[serde(rename = $json, default)]
                pub $field: bool,
            )*
        }

        /// Names of all permission and scope flags, in declaration order.
        pub const API_TOKEN_PERMISSION_FLAGS: &[&str] = &[$(stringify!($field)),*];
    };
}

for_each_api_token_permission!(api_token_struct);

impl InstanaDataObject for ApiToken {
    fn id_for_resource_path(&self) -> &str {
        &self.internal_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flag_count_and_irregular_json_names() {
        assert_eq!(API_TOKEN_PERMISSION_FLAGS.len(), 87);

        let token = ApiToken {
            can_configure_llm: true,
            limited_gen_ai_scope: true,
            can_configure_api_tokens: true,
            ..Default::default()
        };
        let value = serde_json::to_value(&token).unwrap();
        assert_eq!(value["canConfigureLLM"], json!(true));
        assert_eq!(value["limitedGenAIScope"], json!(true));
        assert_eq!(value["canConfigureApiTokens"], json!(true));
        assert_eq!(value["canViewLogs"], json!(false));
    }

    #[test]
    fn test_missing_flags_decode_as_false() {
        let token: ApiToken = serde_json::from_value(json!({
            "id": "1",
            "internalId": "internal",
            "accessGrantingToken": "secret",
            "name": "ci",
            "canViewLogs": true
        }))
        .unwrap();
        assert!(token.can_view_logs);
        assert!(!token.can_configure_users);
        assert_eq!(token.id_for_resource_path(), "internal");
    }
}
