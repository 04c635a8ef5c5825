//! Instana REST API: data objects, transport and per-resource access.
//!
//! [`InstanaApi`] is the entry point; it owns one shared [`RestClient`] and
//! hands out a [`RestResource`] per object kind.

mod api_token;
mod client;
mod custom_event_specification;
mod group;
mod resource;
mod role;
mod sli_config;
mod slo_config;
mod slo_correction_config;
mod team;
mod website_monitoring_config;

pub(crate) use api_token::for_each_api_token_permission;
pub use api_token::{ApiToken, API_TOKEN_PERMISSION_FLAGS};
pub use client::{
    HttpRestClient, RestClient, ENTITY_NOT_FOUND_MESSAGE, REQUEST_TIMEOUT, WRITE_INTERVAL,
};
pub use custom_event_specification::{
    CustomEventSpecification, MetricPattern, RuleSpecification, RuleType, SEVERITY_CRITICAL,
    SEVERITY_WARNING,
};
pub use group::{Group, PermissionSet, ScopeBinding, SUPPORTED_PERMISSIONS};
pub use resource::{
    DefaultRestResource, RestResource, RestResourceMode, WebsiteMonitoringConfigRestResource,
};
pub use role::{ApiMember, Role};
pub use sli_config::{MetricConfiguration, SliConfig, SliEntity};
pub use slo_config::{RbacTag, SloConfig, SloEntity, SloIndicator, SloTimeWindow};
pub use slo_correction_config::{Scheduling, SloCorrectionConfig};
pub use team::{RestrictedApplicationFilter, Team, TeamInfo, TeamMember, TeamRole, TeamScope};
pub use website_monitoring_config::WebsiteMonitoringConfig;

use crate::error::ProviderError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Root path of the Instana REST API.
pub const INSTANA_API_BASE_PATH: &str = "/api";
/// Settings resources.
pub const SETTINGS_BASE_PATH: &str = "/api/settings";
/// Event settings resources.
pub const EVENT_SETTINGS_BASE_PATH: &str = "/api/events/settings";
/// Role based access control resources.
pub const RBAC_SETTINGS_BASE_PATH: &str = "/api/settings/rbac";

/// API tokens.
pub const API_TOKENS_RESOURCE_PATH: &str = "/api/settings/api-tokens";
/// RBAC roles.
pub const ROLES_RESOURCE_PATH: &str = "/api/settings/rbac/roles";
/// RBAC teams.
pub const TEAMS_RESOURCE_PATH: &str = "/api/settings/rbac/teams";
/// RBAC groups.
pub const GROUPS_RESOURCE_PATH: &str = "/api/settings/rbac/groups";
/// Service level indicator configurations.
pub const SLI_CONFIG_RESOURCE_PATH: &str = "/api/settings/v2/sli";
/// Service level objective configurations.
pub const SLO_CONFIG_RESOURCE_PATH: &str = "/api/settings/slo";
/// SLO correction windows.
pub const SLO_CORRECTION_CONFIG_RESOURCE_PATH: &str = "/api/settings/correction";
/// Custom event specifications.
pub const CUSTOM_EVENT_SPECIFICATION_RESOURCE_PATH: &str =
    "/api/events/settings/event-specifications/custom";
/// Website monitoring configurations.
pub const WEBSITE_MONITORING_CONFIG_RESOURCE_PATH: &str = "/api/website-monitoring/config";

/// An object exchanged with the Instana API.
pub trait InstanaDataObject: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// The id used in `{path}/{id}` URLs.
    fn id_for_resource_path(&self) -> &str;
}

/// Access to all Instana API resources used by the provider.
#[derive(Clone)]
pub struct InstanaApi {
    client: Arc<dyn RestClient>,
}

impl std::fmt::Debug for InstanaApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanaApi").finish_non_exhaustive()
    }
}

impl InstanaApi {
    /// Connect to `https://{endpoint}` using the given API token.
    pub fn new(
        api_token: &str,
        endpoint: &str,
        skip_tls_verification: bool,
    ) -> Result<Self, ProviderError> {
        let client = HttpRestClient::new(api_token, endpoint, skip_tls_verification)?;
        Ok(Self::with_client(Arc::new(client)))
    }

    /// Use an existing client, e.g. a mock in tests.
    pub fn with_client(client: Arc<dyn RestClient>) -> Self {
        Self { client }
    }

    fn default_resource<T: InstanaDataObject>(
        &self,
        mode: RestResourceMode,
        path: &'static str,
    ) -> Arc<dyn RestResource<T>> {
        Arc::new(DefaultRestResource::new(mode, path, self.client.clone()))
    }

    /// API tokens.
    pub fn api_tokens(&self) -> Arc<dyn RestResource<ApiToken>> {
        self.default_resource(RestResourceMode::CreatePostUpdatePut, API_TOKENS_RESOURCE_PATH)
    }

    /// RBAC roles.
    pub fn roles(&self) -> Arc<dyn RestResource<Role>> {
        self.default_resource(RestResourceMode::CreatePostUpdatePut, ROLES_RESOURCE_PATH)
    }

    /// RBAC teams.
    pub fn teams(&self) -> Arc<dyn RestResource<Team>> {
        self.default_resource(RestResourceMode::CreatePostUpdatePut, TEAMS_RESOURCE_PATH)
    }

    /// RBAC groups.
    pub fn groups(&self) -> Arc<dyn RestResource<Group>> {
        self.default_resource(RestResourceMode::CreatePostUpdatePut, GROUPS_RESOURCE_PATH)
    }

    /// SLI configs cannot be updated in place.
    pub fn sli_configs(&self) -> Arc<dyn RestResource<SliConfig>> {
        self.default_resource(
            RestResourceMode::CreatePostUpdateNotSupported,
            SLI_CONFIG_RESOURCE_PATH,
        )
    }

    /// SLO configurations.
    pub fn slo_configs(&self) -> Arc<dyn RestResource<SloConfig>> {
        self.default_resource(RestResourceMode::CreatePostUpdatePut, SLO_CONFIG_RESOURCE_PATH)
    }

    /// SLO correction configurations.
    pub fn slo_correction_configs(&self) -> Arc<dyn RestResource<SloCorrectionConfig>> {
        self.default_resource(
            RestResourceMode::CreatePostUpdatePut,
            SLO_CORRECTION_CONFIG_RESOURCE_PATH,
        )
    }

    /// Custom event specifications are created with a client generated id.
    pub fn custom_event_specifications(&self) -> Arc<dyn RestResource<CustomEventSpecification>> {
        self.default_resource(
            RestResourceMode::CreatePutUpdatePut,
            CUSTOM_EVENT_SPECIFICATION_RESOURCE_PATH,
        )
    }

    /// Website monitoring configurations; the name travels as query parameter.
    pub fn website_monitoring_configs(&self) -> Arc<dyn RestResource<WebsiteMonitoringConfig>> {
        Arc::new(WebsiteMonitoringConfigRestResource::new(
            WEBSITE_MONITORING_CONFIG_RESOURCE_PATH,
            self.client.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockRestClient;

    #[test]
    fn test_paths_compose_from_base_paths() {
        assert!(API_TOKENS_RESOURCE_PATH.starts_with(SETTINGS_BASE_PATH));
        assert!(ROLES_RESOURCE_PATH.starts_with(RBAC_SETTINGS_BASE_PATH));
        assert!(CUSTOM_EVENT_SPECIFICATION_RESOURCE_PATH.starts_with(EVENT_SETTINGS_BASE_PATH));
        assert!(WEBSITE_MONITORING_CONFIG_RESOURCE_PATH.starts_with(INSTANA_API_BASE_PATH));
    }

    #[tokio::test]
    async fn test_sli_configs_reject_update() {
        let api = InstanaApi::with_client(std::sync::Arc::new(MockRestClient::new()));
        let config = SliConfig {
            id: "sli-1".to_string(),
            sli_name: "name".to_string(),
            initial_evaluation_timestamp: None,
            metric_configuration: None,
            sli_entity: SliEntity::default(),
        };
        let err = api.sli_configs().update(&config).await.unwrap_err();
        assert!(matches!(err, ProviderError::Unimplemented(_)));
    }

    #[test]
    fn test_new_builds_http_client() {
        assert!(InstanaApi::new("token", "tenant.instana.io", false).is_ok());
    }
}
