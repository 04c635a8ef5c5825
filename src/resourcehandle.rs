//! The contract every Instana resource implements.
//!
//! A [`ResourceHandle`] pairs a [`Schema`] with two pure mappings:
//! [`ResourceHandle::update_state`] (API object to state) and
//! [`ResourceHandle::map_state_to_data_object`] (plan or state to API
//! object). The provider drives the REST calls; handles never do I/O.

use crate::restapi::{InstanaApi, InstanaDataObject, RestResource};
use crate::schema::{Diagnostic, Diagnostics, Schema};
use crate::state::{Plan, State};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Static description of a resource handle.
#[derive(Debug, Clone)]
pub struct ResourceMetaData {
    /// Resource name without provider prefix, e.g. `api_token`.
    pub resource_name: &'static str,
    /// Declared schema.
    pub schema: Schema,
    /// Current schema version; older states pass through the upgraders.
    pub schema_version: i64,
    /// When false the provider assigns a random `id` before create.
    pub skip_id_generation: bool,
    /// State attribute holding the API id, when it is not `id`.
    pub resource_id_field: Option<&'static str>,
    /// Objects cannot be updated; every change replaces them.
    pub create_only: bool,
    /// Shown to users of a deprecated resource.
    pub deprecation_message: Option<String>,
}

impl ResourceMetaData {
    /// Metadata with ID generation enabled and no deprecation.
    pub fn new(resource_name: &'static str, schema: Schema, schema_version: i64) -> Self {
        Self {
            resource_name,
            schema,
            schema_version,
            skip_id_generation: false,
            resource_id_field: None,
            create_only: false,
            deprecation_message: None,
        }
    }

    /// Let the API assign the id.
    pub fn skip_id_generation(mut self) -> Self {
        self.skip_id_generation = true;
        self
    }

    /// Read the API id from `field` instead of `id`.
    pub fn with_resource_id_field(mut self, field: &'static str) -> Self {
        self.resource_id_field = Some(field);
        self
    }

    /// Mark objects as immutable.
    pub fn create_only(mut self) -> Self {
        self.create_only = true;
        self
    }

    /// Mark the resource as deprecated.
    pub fn with_deprecation_message(mut self, message: impl Into<String>) -> Self {
        self.deprecation_message = Some(message.into());
        self
    }

    /// The state attribute holding the API id.
    pub fn id_field(&self) -> &'static str {
        self.resource_id_field.unwrap_or("id")
    }

    /// The schema as exposed to the host: version and deprecation applied.
    pub fn effective_schema(&self) -> Schema {
        let mut schema = self.schema.clone();
        schema.version = self.schema_version;
        if let Some(message) = &self.deprecation_message {
            schema = schema.with_deprecation_message(message.clone());
        }
        schema
    }
}

type UpgradeFn = dyn Fn(Option<&Value>) -> Result<Value, Diagnostics> + Send + Sync;

/// Converts a state stored with `from_version` into the next version.
#[derive(Clone)]
pub struct StateUpgrader {
    /// Version this upgrader accepts.
    pub from_version: i64,
    upgrade: Arc<UpgradeFn>,
}

impl fmt::Debug for StateUpgrader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateUpgrader")
            .field("from_version", &self.from_version)
            .finish_non_exhaustive()
    }
}

impl StateUpgrader {
    /// An upgrader running `upgrade` on states of `from_version`.
    pub fn new<F>(from_version: i64, upgrade: F) -> Self
    where
        F: Fn(Option<&Value>) -> Result<Value, Diagnostics> + Send + Sync + 'static,
    {
        Self {
            from_version,
            upgrade: Arc::new(upgrade),
        }
    }

    /// Keeps the stored state unchanged. A missing or null prior state is an error.
    pub fn pass_through(from_version: i64) -> Self {
        Self::new(from_version, |prior| match prior {
            Some(value) if !value.is_null() => Ok(value.clone()),
            _ => Err(Diagnostic::error("State Upgrade Error")
                .with_detail(
                    "The stored state could not be read with the current schema; an explicit \
                     state upgrade is required for this version.",
                )
                .into()),
        })
    }

    /// Run the upgrade.
    pub fn upgrade(&self, prior: Option<&Value>) -> Result<Value, Diagnostics> {
        (self.upgrade)(prior)
    }
}

/// One pass-through upgrader for every version below `schema_version`.
pub fn pass_through_upgraders(schema_version: i64) -> Vec<StateUpgrader> {
    (0..schema_version).map(StateUpgrader::pass_through).collect()
}

/// Upgrade `prior` stored with `from_version` to the current version.
pub fn upgrade_state(
    upgraders: &[StateUpgrader],
    from_version: i64,
    current_version: i64,
    prior: Option<Value>,
) -> Result<Value, Diagnostics> {
    if from_version > current_version {
        return Err(Diagnostic::error("State Upgrade Error")
            .with_detail(format!(
                "state version {} is newer than schema version {}",
                from_version, current_version
            ))
            .into());
    }
    let mut current = prior;
    for version in from_version..current_version {
        let upgrader = upgraders
            .iter()
            .find(|u| u.from_version == version)
            .ok_or_else(|| {
                Diagnostics::from(Diagnostic::error("State Upgrade Error").with_detail(format!(
                    "no state upgrader registered for version {}",
                    version
                )))
            })?;
        current = Some(upgrader.upgrade(current.as_ref())?);
    }
    current.ok_or_else(|| {
        Diagnostic::error("State Upgrade Error")
            .with_detail("no prior state available")
            .into()
    })
}

/// Read the resource Model from the plan, falling back to the state.
pub fn model_from<T: DeserializeOwned>(
    plan: Option<&Plan>,
    state: Option<&State>,
) -> Result<T, Diagnostics> {
    match (plan, state) {
        (Some(plan), _) => plan.get(),
        (None, Some(state)) => state.get(),
        (None, None) => Err(Diagnostic::error("Missing Input")
            .with_detail("neither plan nor state was provided")
            .into()),
    }
}

/// Per-resource implementation pairing a schema with bidirectional mappings.
pub trait ResourceHandle: Send + Sync + 'static {
    /// The Instana API object managed by this resource.
    type Object: InstanaDataObject;

    /// Static metadata, including the schema.
    fn metadata(&self) -> &ResourceMetaData;

    /// The REST resource used for CRUD calls.
    fn rest_resource(&self, api: &InstanaApi) -> Arc<dyn RestResource<Self::Object>>;

    /// Fill computed attributes of a plan before create.
    fn set_computed_fields(&self, _plan: &mut Plan) -> Diagnostics {
        Diagnostics::new()
    }

    /// Write the API object into state. `plan` is absent on read and import.
    fn update_state(
        &self,
        state: &mut State,
        plan: Option<&Plan>,
        object: &Self::Object,
    ) -> Diagnostics;

    /// Build the API object from the plan, or from the state when no plan exists.
    fn map_state_to_data_object(
        &self,
        plan: Option<&Plan>,
        state: Option<&State>,
    ) -> Result<Self::Object, Diagnostics>;

    /// Upgraders for every schema version older than the current one.
    fn state_upgraders(&self) -> Vec<StateUpgrader> {
        pass_through_upgraders(self.metadata().schema_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Attribute;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_metadata_builders() {
        let meta = ResourceMetaData::new("api_token", Schema::v0(), 2)
            .skip_id_generation()
            .with_resource_id_field("internal_id")
            .with_deprecation_message("use something else");

        assert!(meta.skip_id_generation);
        assert_eq!(meta.id_field(), "internal_id");
        let schema = meta.effective_schema();
        assert_eq!(schema.version, 2);
        assert_eq!(
            schema.deprecation_message.as_deref(),
            Some("use something else")
        );

        let plain = ResourceMetaData::new(
            "role",
            Schema::v0().with_attribute("id", Attribute::computed_string()),
            0,
        );
        assert_eq!(plain.id_field(), "id");
        assert!(!plain.create_only);
    }

    #[test]
    fn test_pass_through_upgraders() {
        let upgraders = pass_through_upgraders(2);
        assert_eq!(upgraders.len(), 2);
        assert_eq!(upgraders[1].from_version, 1);

        let prior = json!({"id": "1", "name": "n"});
        assert_eq!(upgraders[0].upgrade(Some(&prior)).unwrap(), prior);
    }

    #[test]
    fn test_null_prior_state_is_upgrade_error() {
        let upgrader = StateUpgrader::pass_through(0);
        for prior in [None, Some(Value::Null)] {
            let diags = upgrader.upgrade(prior.as_ref()).unwrap_err();
            assert_eq!(diags[0].summary, "State Upgrade Error");
        }
    }

    #[test]
    fn test_upgrade_state_chains_versions() {
        let upgraders = vec![
            StateUpgrader::new(0, |prior| {
                let mut value = prior.cloned().unwrap_or(Value::Null);
                value["v1"] = json!(true);
                Ok(value)
            }),
            StateUpgrader::pass_through(1),
        ];
        let upgraded = upgrade_state(&upgraders, 0, 2, Some(json!({"id": "x"}))).unwrap();
        assert_eq!(upgraded, json!({"id": "x", "v1": true}));

        let current = upgrade_state(&upgraders, 2, 2, Some(json!({"id": "x"}))).unwrap();
        assert_eq!(current, json!({"id": "x"}));

        assert!(upgrade_state(&upgraders, 3, 2, Some(json!({}))).is_err());
        assert!(upgrade_state(&[], 0, 1, Some(json!({}))).is_err());
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Model {
        name: String,
    }

    #[test]
    fn test_model_from_prefers_plan() {
        let plan = Plan::from_value(json!({"name": "planned"}));
        let state = State::from_value(json!({"name": "stored"}));

        let model: Model = model_from(Some(&plan), Some(&state)).unwrap();
        assert_eq!(model.name, "planned");
        let model: Model = model_from(None, Some(&state)).unwrap();
        assert_eq!(model.name, "stored");
        assert!(model_from::<Model>(None, None).is_err());
    }
}
