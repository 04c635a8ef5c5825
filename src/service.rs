//! The lifecycle contract the host engine drives.
//!
//! [`ProviderService`] is the async surface the host calls for every
//! provider operation. States and plans cross this boundary as raw JSON;
//! a resource that no longer exists is reported as `Value::Null`.

use crate::error::ProviderError;
use crate::schema::{Diagnostics, ProviderSchema};
use crate::types::{ImportedResource, PlanResult, ProviderMetadata};
use serde_json::Value;
use std::collections::HashMap;

fn sorted_names<V>(map: &HashMap<String, V>) -> Vec<String> {
    let mut names: Vec<String> = map.keys().cloned().collect();
    names.sort();
    names
}

/// Trait implemented by a provider.
///
/// Only `schema`, `configure`, `plan` and the CRUD methods are required;
/// everything else has a conservative default.
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Return the provider's schema including all resources and data sources.
    fn schema(&self) -> ProviderSchema;

    /// Return provider metadata. Derived from the schema by default.
    fn metadata(&self) -> ProviderMetadata {
        let schema = self.schema();
        ProviderMetadata {
            resources: sorted_names(&schema.resources),
            data_sources: sorted_names(&schema.data_sources),
            capabilities: Default::default(),
        }
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate the provider configuration before configuring.
    async fn validate_provider_config(&self, config: Value) -> Result<Diagnostics, ProviderError> {
        let _ = config;
        Ok(Diagnostics::new())
    }

    /// Configure the provider with credentials and settings.
    async fn configure(&self, config: Value) -> Result<Diagnostics, ProviderError>;

    /// Stop the provider gracefully.
    async fn stop(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource's configuration before planning.
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Diagnostics, ProviderError> {
        let _ = (resource_type, config);
        Ok(Diagnostics::new())
    }

    /// Upgrade resource state stored with an older schema version.
    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        let _ = (resource_type, version);
        Ok(state)
    }

    /// Plan changes for a resource. A null `proposed_state` plans a destroy.
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError>;

    /// Create a new resource and return its state.
    async fn create(&self, resource_type: &str, planned_state: Value)
        -> Result<Value, ProviderError>;

    /// Refresh a resource. Returns `Value::Null` when it is gone.
    async fn read(&self, resource_type: &str, current_state: Value)
        -> Result<Value, ProviderError>;

    /// Update an existing resource and return its new state.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete a resource.
    async fn delete(&self, resource_type: &str, current_state: Value)
        -> Result<(), ProviderError>;

    // =========================================================================
    // Data Source Operations
    // =========================================================================

    /// Validate a data source's configuration.
    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Diagnostics, ProviderError> {
        let _ = (data_source_type, config);
        Ok(Diagnostics::new())
    }

    /// Look up an existing object and return the data source state.
    async fn read_data_source(
        &self,
        data_source_type: &str,
        _config: Value,
    ) -> Result<Value, ProviderError> {
        Err(ProviderError::UnknownResource(format!(
            "Unknown data source type: {}",
            data_source_type
        )))
    }

    /// Import an existing object by id.
    async fn import_resource(
        &self,
        resource_type: &str,
        _id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        Err(ProviderError::Unimplemented(format!(
            "Import not supported for resource type: {}",
            resource_type
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, Schema};
    use serde_json::json;

    struct EchoProvider;

    #[async_trait::async_trait]
    impl ProviderService for EchoProvider {
        fn schema(&self) -> ProviderSchema {
            ProviderSchema::new()
                .with_resource(
                    "instana_b",
                    Schema::v0().with_attribute("id", Attribute::computed_string()),
                )
                .with_resource(
                    "instana_a",
                    Schema::v0().with_attribute("id", Attribute::computed_string()),
                )
                .with_data_source("instana_lookup", Schema::v0())
        }

        async fn configure(&self, _config: Value) -> Result<Diagnostics, ProviderError> {
            Ok(Diagnostics::new())
        }

        async fn plan(
            &self,
            _resource_type: &str,
            _prior_state: Option<Value>,
            proposed_state: Value,
            _config: Value,
        ) -> Result<PlanResult, ProviderError> {
            Ok(PlanResult::no_change(proposed_state))
        }

        async fn create(&self, _type: &str, planned: Value) -> Result<Value, ProviderError> {
            Ok(planned)
        }

        async fn read(&self, _type: &str, current: Value) -> Result<Value, ProviderError> {
            Ok(current)
        }

        async fn update(
            &self,
            _type: &str,
            _prior: Value,
            planned: Value,
        ) -> Result<Value, ProviderError> {
            Ok(planned)
        }

        async fn delete(&self, _type: &str, _current: Value) -> Result<(), ProviderError> {
            Ok(())
        }
    }

    #[test]
    fn test_metadata_lists_sorted_resources() {
        let metadata = EchoProvider.metadata();
        assert_eq!(metadata.resources, vec!["instana_a", "instana_b"]);
        assert_eq!(metadata.data_sources, vec!["instana_lookup"]);
        assert!(!metadata.capabilities.plan_destroy);
    }

    #[tokio::test]
    async fn test_defaults() {
        let provider = EchoProvider;
        assert!(provider
            .validate_provider_config(json!({}))
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            provider
                .upgrade_resource_state("instana_a", 0, json!({"id": "1"}))
                .await
                .unwrap(),
            json!({"id": "1"})
        );

        let err = provider.import_resource("instana_a", "1").await.unwrap_err();
        assert!(matches!(err, ProviderError::Unimplemented(_)));

        let err = provider
            .read_data_source("instana_lookup", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }
}
