//! The Instana provider: configuration, resource registry and the CRUD
//! flow shared by every resource handle.
//!
//! Each [`ResourceHandle`] is registered through a type-erased adapter so
//! the provider can dispatch on the resource type name the host sends.
//! Data sources are registered next to them under their own type names.

use crate::datasources::{CustomEventSpecificationDataSource, DataSourceHandle};
use crate::error::ProviderError;
use crate::resourcehandle::{upgrade_state, ResourceHandle, ResourceMetaData};
use crate::resources::{
    resource_type_name, ApiTokenResource, CustomEventSpecificationResource, GroupResource,
    RoleResource, SliConfigResource, SloConfigResource, SloCorrectionConfigResource, TeamResource,
    WebsiteMonitoringConfigResource,
};
use crate::restapi::{InstanaApi, InstanaDataObject, RestClient};
use crate::schema::{
    Attribute, Block, Diagnostic, Diagnostics, PlanModifier, ProviderSchema, Schema,
};
use crate::service::ProviderService;
use crate::state::{Plan, State};
use crate::tagfilter::{default_mapper, SharedTagFilterMapper};
use crate::types::{AttributeChange, ImportedResource, PlanResult};
use crate::validation::validate;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Environment variable consulted when `api_token` is not configured.
pub const API_TOKEN_ENV: &str = "INSTANA_API_TOKEN";
/// Environment variable consulted when `endpoint` is not configured.
pub const ENDPOINT_ENV: &str = "INSTANA_ENDPOINT";

const NOT_CONFIGURED_DETAIL: &str = "The provider hasn't been configured before apply, likely \
     because it depends on an unknown value from another resource.";

/// Settings of the `provider "instana"` block.
#[derive(Clone, Deserialize)]
pub struct ProviderConfig {
    pub api_token: String,
    /// Tenant host, e.g. `tenant-unit.instana.io`.
    pub endpoint: String,
    #[serde(default)]
    pub tls_skip_verify: bool,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_token", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("tls_skip_verify", &self.tls_skip_verify)
            .finish()
    }
}

impl ProviderConfig {
    /// Schema of the provider block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_attribute(
                "api_token",
                Attribute::required_string()
                    .sensitive()
                    .with_description("API token used to authenticate with the Instana backend."),
            )
            .with_attribute(
                "endpoint",
                Attribute::required_string()
                    .with_description("The DNS name of the Instana tenant, without protocol."),
            )
            .with_attribute(
                "tls_skip_verify",
                Attribute::optional_bool()
                    .with_default(Value::Bool(false))
                    .with_description("If set to true, TLS verification will be skipped."),
            )
    }

    /// Fill absent or empty `api_token` and `endpoint` from `lookup`.
    pub fn with_env_fallback<F>(config: &Value, lookup: F) -> Value
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut merged = match config {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        for (field, var) in [("api_token", API_TOKEN_ENV), ("endpoint", ENDPOINT_ENV)] {
            let configured = merged
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|v| !v.is_empty());
            if !configured {
                if let Some(value) = lookup(var).filter(|v| !v.is_empty()) {
                    merged.insert(field.to_string(), Value::String(value));
                }
            }
        }
        Value::Object(merged)
    }

    /// Validate and decode the merged configuration.
    pub fn from_value(config: &Value) -> Result<Self, Diagnostics> {
        let diagnostics = validate(&Self::schema(), config);
        if diagnostics.has_error() {
            return Err(diagnostics);
        }
        serde_json::from_value(config.clone()).map_err(|err| {
            Diagnostic::error("Invalid provider configuration")
                .with_detail(err.to_string())
                .into()
        })
    }
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn errors_to_result(diagnostics: Diagnostics) -> Result<Diagnostics, ProviderError> {
    if diagnostics.has_error() {
        return Err(ProviderError::Diagnostics(diagnostics));
    }
    for warning in diagnostics.iter() {
        warn!(%warning, "Resource mapping produced a warning");
    }
    Ok(diagnostics)
}

/// Object-safe view of a [`ResourceHandle`].
#[async_trait]
trait ManagedResource: Send + Sync {
    fn metadata(&self) -> &ResourceMetaData;

    async fn create(&self, api: &InstanaApi, plan: Plan) -> Result<State, ProviderError>;

    async fn read(&self, api: &InstanaApi, state: State) -> Result<State, ProviderError>;

    async fn update(
        &self,
        api: &InstanaApi,
        prior: State,
        plan: Plan,
    ) -> Result<State, ProviderError>;

    async fn delete(&self, api: &InstanaApi, state: State) -> Result<(), ProviderError>;

    fn import(&self, id: &str) -> Result<State, ProviderError>;

    fn upgrade(&self, version: i64, state: Value) -> Result<Value, ProviderError>;
}

struct Managed<H>(H);

#[async_trait]
impl<H: ResourceHandle> ManagedResource for Managed<H> {
    fn metadata(&self) -> &ResourceMetaData {
        self.0.metadata()
    }

    async fn create(&self, api: &InstanaApi, mut plan: Plan) -> Result<State, ProviderError> {
        let handle = &self.0;
        if !handle.metadata().skip_id_generation {
            errors_to_result(plan.set_attribute("id", &Uuid::new_v4().to_string()))?;
        }
        errors_to_result(handle.set_computed_fields(&mut plan))?;

        let object = handle.map_state_to_data_object(Some(&plan), None)?;
        let created = handle.rest_resource(api).create(&object).await?;
        debug!(id = created.id_for_resource_path(), "Object created");

        let mut state = State::from(plan.clone());
        errors_to_result(handle.update_state(&mut state, Some(&plan), &created))?;
        Ok(state)
    }

    async fn read(&self, api: &InstanaApi, mut state: State) -> Result<State, ProviderError> {
        let handle = &self.0;
        let id_field = handle.metadata().id_field();
        let id = state
            .get_attribute::<String>(id_field)?
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                ProviderError::Diagnostics(
                    Diagnostic::error("Resource ID is missing")
                        .with_detail("The resource ID is missing from the state.")
                        .with_attribute(id_field)
                        .into(),
                )
            })?;

        match handle.rest_resource(api).get_one(&id).await {
            Ok(object) => {
                errors_to_result(handle.update_state(&mut state, None, &object))?;
                Ok(state)
            },
            Err(err) if err.is_not_found() => {
                warn!(id = %id, "Object no longer exists, removing it from state");
                state.remove_resource();
                Ok(state)
            },
            Err(err) => Err(err),
        }
    }

    async fn update(
        &self,
        api: &InstanaApi,
        prior: State,
        plan: Plan,
    ) -> Result<State, ProviderError> {
        let handle = &self.0;
        let object = handle.map_state_to_data_object(Some(&plan), Some(&prior))?;
        let updated = handle.rest_resource(api).update(&object).await?;

        let mut state = State::from(plan.clone());
        errors_to_result(handle.update_state(&mut state, Some(&plan), &updated))?;
        Ok(state)
    }

    async fn delete(&self, api: &InstanaApi, state: State) -> Result<(), ProviderError> {
        let handle = &self.0;
        let object = handle.map_state_to_data_object(None, Some(&state))?;
        handle
            .rest_resource(api)
            .delete_by_id(object.id_for_resource_path())
            .await
    }

    fn import(&self, id: &str) -> Result<State, ProviderError> {
        let mut state = State::new();
        errors_to_result(state.set_attribute(self.0.metadata().id_field(), &id))?;
        Ok(state)
    }

    fn upgrade(&self, version: i64, state: Value) -> Result<Value, ProviderError> {
        let handle = &self.0;
        let upgraded = upgrade_state(
            &handle.state_upgraders(),
            version,
            handle.metadata().schema_version,
            Some(state),
        )?;
        Ok(upgraded)
    }
}

/// Terraform provider for Instana.
pub struct InstanaProvider {
    resources: BTreeMap<String, Arc<dyn ManagedResource>>,
    data_sources: BTreeMap<String, Arc<dyn DataSourceHandle>>,
    api: RwLock<Option<InstanaApi>>,
}

impl fmt::Debug for InstanaProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanaProvider")
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .field("data_sources", &self.data_sources.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Default for InstanaProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InstanaProvider {
    /// Provider with all resources and data sources and the default tag
    /// filter mapper.
    pub fn new() -> Self {
        Self::with_tag_filter_mapper(default_mapper())
    }

    /// Provider whose tag filter attributes go through `mapper`.
    pub fn with_tag_filter_mapper(mapper: SharedTagFilterMapper) -> Self {
        let mut provider = Self {
            resources: BTreeMap::new(),
            data_sources: BTreeMap::new(),
            api: RwLock::new(None),
        };
        provider.register(ApiTokenResource::new());
        provider.register(CustomEventSpecificationResource::with_tag_filter_mapper(mapper.clone()));
        provider.register(GroupResource::new());
        provider.register(RoleResource::new());
        provider.register(TeamResource::with_tag_filter_mapper(mapper.clone()));
        provider.register(SliConfigResource::with_tag_filter_mapper(mapper.clone()));
        provider.register(SloConfigResource::with_tag_filter_mapper(mapper));
        provider.register(SloCorrectionConfigResource::new());
        provider.register(WebsiteMonitoringConfigResource::new());
        provider.register_data_source(CustomEventSpecificationDataSource::new());
        provider
    }

    /// Provider already configured with `client`; `configure` is not needed.
    pub fn with_client(client: Arc<dyn RestClient>) -> Self {
        let mut provider = Self::new();
        provider.api = RwLock::new(Some(InstanaApi::with_client(client)));
        provider
    }

    fn register<H: ResourceHandle>(&mut self, handle: H) {
        let name = resource_type_name(handle.metadata().resource_name);
        self.resources.insert(name, Arc::new(Managed(handle)));
    }

    fn register_data_source<D: DataSourceHandle>(&mut self, data_source: D) {
        let name = resource_type_name(data_source.name());
        self.data_sources.insert(name, Arc::new(data_source));
    }

    fn resource(&self, resource_type: &str) -> Result<&Arc<dyn ManagedResource>, ProviderError> {
        self.resources
            .get(resource_type)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    fn data_source(
        &self,
        data_source_type: &str,
    ) -> Result<&Arc<dyn DataSourceHandle>, ProviderError> {
        self.data_sources.get(data_source_type).ok_or_else(|| {
            ProviderError::UnknownResource(format!("Unknown data source type: {}", data_source_type))
        })
    }

    async fn api(&self) -> Result<InstanaApi, ProviderError> {
        self.api.read().await.clone().ok_or_else(|| {
            ProviderError::FailedPrecondition(format!(
                "Provider not configured. {}",
                NOT_CONFIGURED_DETAIL
            ))
        })
    }
}

/// Fill unset attributes with their schema default, including attributes of
/// nested blocks present in the plan.
fn apply_defaults(block: &Block, map: &mut Map<String, Value>) {
    for (name, attribute) in &block.attributes {
        let Some(default) = &attribute.default else {
            continue;
        };
        if map.get(name).map_or(true, Value::is_null) {
            map.insert(name.clone(), default.clone());
        }
    }
    for (name, nested) in &block.blocks {
        match map.get_mut(name) {
            Some(Value::Object(inner)) => apply_defaults(&nested.block, inner),
            Some(Value::Array(items)) => items
                .iter_mut()
                .filter_map(Value::as_object_mut)
                .for_each(|inner| apply_defaults(&nested.block, inner)),
            _ => {},
        }
    }
}

/// Compute the planned state and the attribute changes for one resource.
fn plan_resource(
    metadata: &ResourceMetaData,
    prior: Option<&Value>,
    proposed: Value,
) -> PlanResult {
    let prior = prior.filter(|p| !p.is_null());
    let attributes = &metadata.schema.block.attributes;

    if proposed.is_null() {
        let changes = prior
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter(|(_, v)| !v.is_null())
                    .map(|(k, v)| AttributeChange::removed(k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default();
        return PlanResult::with_changes(Value::Null, changes, false);
    }

    let mut planned = proposed;
    if let Value::Object(map) = &mut planned {
        apply_defaults(&metadata.schema.block, map);
        for (name, attribute) in attributes {
            let keep_prior = attribute
                .plan_modifiers
                .contains(&PlanModifier::UseStateForUnknown)
                && map.get(name).map_or(true, Value::is_null);
            if !keep_prior {
                continue;
            }
            if let Some(value) = prior.and_then(|p| p.get(name)).filter(|v| !v.is_null()) {
                map.insert(name.clone(), value.clone());
            }
        }
    }

    let keys: BTreeSet<&String> = planned
        .as_object()
        .into_iter()
        .chain(prior.and_then(Value::as_object))
        .flat_map(|map| map.keys())
        .collect();
    let changes: Vec<AttributeChange> = keys
        .into_iter()
        .filter_map(|key| {
            let after = planned.get(key);
            let unknown = after.map_or(true, Value::is_null)
                && attributes.get(key).is_some_and(|a| a.flags.computed);
            if unknown {
                return None;
            }
            AttributeChange::between(key, prior.and_then(|p| p.get(key)), after)
        })
        .collect();

    let requires_replace = prior.is_some()
        && changes.iter().any(|change| {
            metadata.create_only
                || attributes.get(&change.path).is_some_and(|a| {
                    a.plan_modifiers.contains(&PlanModifier::RequiresReplace)
                })
        });

    PlanResult::with_changes(planned, changes, requires_replace)
}

#[async_trait]
impl ProviderService for InstanaProvider {
    fn schema(&self) -> ProviderSchema {
        let schema = self.resources.iter().fold(
            ProviderSchema::new().with_provider_config(ProviderConfig::schema()),
            |schema, (name, resource)| {
                schema.with_resource(name.clone(), resource.metadata().effective_schema())
            },
        );
        self.data_sources
            .iter()
            .fold(schema, |schema, (name, data_source)| {
                schema.with_data_source(name.clone(), data_source.schema())
            })
    }

    #[instrument(skip(self, config), name = "provider.validate_provider_config")]
    async fn validate_provider_config(&self, config: Value) -> Result<Diagnostics, ProviderError> {
        let merged = ProviderConfig::with_env_fallback(&config, env_lookup);
        Ok(validate(&ProviderConfig::schema(), &merged))
    }

    #[instrument(skip(self, config), name = "provider.configure")]
    async fn configure(&self, config: Value) -> Result<Diagnostics, ProviderError> {
        let merged = ProviderConfig::with_env_fallback(&config, env_lookup);
        let settings = ProviderConfig::from_value(&merged)
            .map_err(|diags| ProviderError::Configuration(diags.to_string()))?;
        if settings.tls_skip_verify {
            warn!("TLS verification is disabled");
        }

        let api = InstanaApi::new(
            &settings.api_token,
            &settings.endpoint,
            settings.tls_skip_verify,
        )?;
        *self.api.write().await = Some(api);
        info!(endpoint = %settings.endpoint, "Provider configured");
        Ok(Diagnostics::new())
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        info!("Stop called");
        *self.api.write().await = None;
        Ok(())
    }

    #[instrument(skip(self, config), name = "provider.validate_resource_config")]
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Diagnostics, ProviderError> {
        let resource = self.resource(resource_type)?;
        let mut diagnostics = validate(&resource.metadata().schema, &config);
        if let Some(message) = &resource.metadata().deprecation_message {
            diagnostics.add_warning("Deprecated resource", message.clone());
        }
        Ok(diagnostics)
    }

    #[instrument(skip(self, state), name = "provider.upgrade_resource_state")]
    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        self.resource(resource_type)?.upgrade(version, state)
    }

    #[instrument(skip(self, prior_state, proposed_state, _config), name = "provider.plan")]
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let resource = self.resource(resource_type)?;
        let plan = plan_resource(resource.metadata(), prior_state.as_ref(), proposed_state);
        debug!(
            changes = plan.changes.len(),
            requires_replace = plan.requires_replace,
            "Plan computed"
        );
        Ok(plan)
    }

    #[instrument(skip(self, planned_state), name = "provider.create")]
    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let api = self.api().await?;
        let state = resource.create(&api, Plan::from_value(planned_state)).await?;
        info!("Resource created");
        Ok(state.into_value())
    }

    #[instrument(skip(self, current_state), name = "provider.read")]
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let api = self.api().await?;
        let state = resource.read(&api, State::from_value(current_state)).await?;
        Ok(state.into_value())
    }

    #[instrument(skip(self, prior_state, planned_state), name = "provider.update")]
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let api = self.api().await?;
        let state = resource
            .update(&api, State::from_value(prior_state), Plan::from_value(planned_state))
            .await?;
        info!("Resource updated");
        Ok(state.into_value())
    }

    #[instrument(skip(self, current_state), name = "provider.delete")]
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let resource = self.resource(resource_type)?;
        let api = self.api().await?;
        resource.delete(&api, State::from_value(current_state)).await?;
        info!("Resource deleted");
        Ok(())
    }

    #[instrument(skip(self, config), name = "provider.validate_data_source_config")]
    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Diagnostics, ProviderError> {
        let data_source = self.data_source(data_source_type)?;
        Ok(validate(&data_source.schema(), &config))
    }

    #[instrument(skip(self, config), name = "provider.read_data_source")]
    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let data_source = self.data_source(data_source_type)?;
        let api = self.api().await?;
        let state = data_source.read(&api, State::from_value(config)).await?;
        debug!("Data source read");
        Ok(state.into_value())
    }

    #[instrument(skip(self), name = "provider.import_resource")]
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let state = self.resource(resource_type)?.import(id)?;
        Ok(vec![ImportedResource::new(resource_type, state.into_value())])
    }
}
