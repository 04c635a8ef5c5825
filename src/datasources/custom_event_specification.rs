//! `instana_custom_event_spec`
//!
//! Finds a custom event specification by `name` and `entity_type`. The
//! first match in the API listing wins.

use super::DataSourceHandle;
use crate::error::ProviderError;
use crate::restapi::{CustomEventSpecification, InstanaApi};
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::state::State;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Data source name without provider prefix.
pub const DATA_SOURCE_NAME: &str = "custom_event_spec";

/// State of the data source. Only `name` and `entity_type` are configured.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CustomEventSpecificationDataModel {
    pub id: Option<String>,
    pub name: String,
    pub entity_type: String,
    pub description: Option<String>,
    pub triggering: Option<bool>,
    pub enabled: Option<bool>,
    pub query: Option<String>,
    pub expiration_time: Option<i64>,
}

impl CustomEventSpecificationDataModel {
    fn matches(&self, spec: &CustomEventSpecification) -> bool {
        spec.name == self.name && spec.entity_type == self.entity_type
    }

    fn with_spec(self, spec: &CustomEventSpecification) -> Self {
        Self {
            id: Some(spec.id.clone()),
            description: spec.description.clone(),
            triggering: Some(spec.triggering),
            enabled: Some(spec.enabled),
            query: spec.query.clone(),
            expiration_time: spec.expiration_time,
            ..self
        }
    }
}

fn data_source_schema() -> Schema {
    Schema::v0()
        .with_description(
            "Data source for an Instana custom event specification. Custom events are \
             user-defined events in Instana.",
        )
        .with_attribute(
            "id",
            Attribute::computed_string().with_description("The ID of the custom event specification."),
        )
        .with_attribute(
            "name",
            Attribute::required_string()
                .with_description("The name of the custom event specification."),
        )
        .with_attribute(
            "entity_type",
            Attribute::required_string().with_description(
                "The entity type for which the custom event specification is created.",
            ),
        )
        .with_attribute("description", Attribute::computed_string())
        .with_attribute("triggering", Attribute::computed_bool())
        .with_attribute("enabled", Attribute::computed_bool())
        .with_attribute(
            "query",
            Attribute::computed_string()
                .with_description("Dynamic focus query for the custom event specification."),
        )
        .with_attribute(
            "expiration_time",
            Attribute::computed_int64().with_description(
                "The expiration time (grace period) to wait before the issue is closed.",
            ),
        )
}

/// Data source handle for custom event specifications.
#[derive(Debug, Default)]
pub struct CustomEventSpecificationDataSource;

impl CustomEventSpecificationDataSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DataSourceHandle for CustomEventSpecificationDataSource {
    fn name(&self) -> &'static str {
        DATA_SOURCE_NAME
    }

    fn schema(&self) -> Schema {
        data_source_schema()
    }

    async fn read(&self, api: &InstanaApi, config: State) -> Result<State, ProviderError> {
        let lookup: CustomEventSpecificationDataModel = config.get()?;
        let specs = api
            .custom_event_specifications()
            .get_all()
            .await
            .map_err(|err| {
                ProviderError::Diagnostics(
                    Diagnostic::error("Error reading custom event specifications")
                        .with_detail(format!("Could not read custom event specifications: {}", err))
                        .into(),
                )
            })?;
        debug!(count = specs.len(), "Custom event specifications listed");

        let Some(spec) = specs.iter().find(|spec| lookup.matches(spec)) else {
            return Err(ProviderError::Diagnostics(
                Diagnostic::error("Custom event specification not found")
                    .with_detail(format!(
                        "No custom event specification found for name '{}' and entity type '{}'",
                        lookup.name, lookup.entity_type
                    ))
                    .into(),
            ));
        };

        let mut state = State::new();
        let diagnostics = state.set(&lookup.with_spec(spec));
        if diagnostics.has_error() {
            return Err(ProviderError::Diagnostics(diagnostics));
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::restapi::CUSTOM_EVENT_SPECIFICATION_RESOURCE_PATH;
    use crate::testing::MockRestClient;
    use crate::validation::validate;
    use serde_json::json;
    use std::sync::Arc;

    fn api_with_specs() -> (Arc<MockRestClient>, InstanaApi) {
        let client = Arc::new(MockRestClient::new());
        client.insert(
            CUSTOM_EVENT_SPECIFICATION_RESOURCE_PATH,
            "ces-host",
            json!({
                "id": "ces-host",
                "name": "high cpu",
                "entityType": "host",
                "query": "entity.zone:prod",
                "triggering": true,
                "description": "cpu is high",
                "expirationTime": 60000,
                "enabled": true,
                "ruleLogicalOperator": "AND",
                "rules": []
            }),
        );
        client.insert(
            CUSTOM_EVENT_SPECIFICATION_RESOURCE_PATH,
            "ces-jvm",
            json!({
                "id": "ces-jvm",
                "name": "high cpu",
                "entityType": "jvm",
                "triggering": false,
                "enabled": false,
                "ruleLogicalOperator": "AND",
                "rules": []
            }),
        );
        let api = InstanaApi::with_client(client.clone());
        (client, api)
    }

    fn config(name: &str, entity_type: &str) -> State {
        State::from_value(json!({"name": name, "entity_type": entity_type}))
    }

    #[tokio::test]
    async fn test_read_matches_name_and_entity_type() {
        let (client, api) = api_with_specs();
        let state = CustomEventSpecificationDataSource::new()
            .read(&api, config("high cpu", "host"))
            .await
            .unwrap();

        assert_eq!(
            state.raw(),
            &json!({
                "id": "ces-host",
                "name": "high cpu",
                "entity_type": "host",
                "description": "cpu is high",
                "triggering": true,
                "enabled": true,
                "query": "entity.zone:prod",
                "expiration_time": 60000
            })
        );
        assert_eq!(
            client.calls()[0].signature(),
            ("GET", CUSTOM_EVENT_SPECIFICATION_RESOURCE_PATH, None)
        );
    }

    #[tokio::test]
    async fn test_absent_optional_fields_are_null() {
        let (_, api) = api_with_specs();
        let state = CustomEventSpecificationDataSource::new()
            .read(&api, config("high cpu", "jvm"))
            .await
            .unwrap();

        assert_eq!(state.raw()["id"], json!("ces-jvm"));
        assert_eq!(state.raw()["description"], json!(null));
        assert_eq!(state.raw()["query"], json!(null));
        assert_eq!(state.raw()["expiration_time"], json!(null));
        assert_eq!(state.raw()["enabled"], json!(false));
    }

    #[tokio::test]
    async fn test_no_match_is_an_error() {
        let (_, api) = api_with_specs();
        let err = CustomEventSpecificationDataSource::new()
            .read(&api, config("high cpu", "process"))
            .await
            .unwrap_err();

        match err {
            ProviderError::Diagnostics(diags) => {
                assert_eq!(diags[0].summary, "Custom event specification not found");
                assert_eq!(
                    diags[0].detail.as_deref(),
                    Some("No custom event specification found for name 'high cpu' and entity type 'process'")
                );
            },
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_schema_only_lookup_keys_are_configurable() {
        let schema = CustomEventSpecificationDataSource::new().schema();
        for name in ["name", "entity_type"] {
            assert!(schema.block.attributes[name].flags.required, "{}", name);
        }
        for name in ["id", "description", "triggering", "enabled", "query", "expiration_time"] {
            let flags = &schema.block.attributes[name].flags;
            assert!(flags.computed && !flags.optional, "{}", name);
        }

        assert!(validate(&schema, config("a", "host").raw()).is_empty());
        assert!(validate(&schema, &json!({"name": "a"})).has_error());
    }
}
