//! Test helpers for the provider and the REST layer.
//!
//! [`MockRestClient`] is an in-memory [`RestClient`] that records every call;
//! [`ProviderTester`] drives a [`ProviderService`] through the same steps the
//! host engine would.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use terraform_provider_instana::testing::{MockRestClient, ProviderTester};
//! use terraform_provider_instana::InstanaProvider;
//!
//! #[tokio::test]
//! async fn test_create_role() {
//!     let client = Arc::new(MockRestClient::new());
//!     let tester = ProviderTester::new(InstanaProvider::with_client(client.clone()));
//!
//!     let state = tester
//!         .lifecycle_create("instana_rbac_role", json!({"name": "viewer", "permissions": []}))
//!         .await
//!         .unwrap();
//!
//!     assert_eq!(state["name"], "viewer");
//! }
//! ```

use crate::error::ProviderError;
use crate::restapi::{RestClient, ENTITY_NOT_FOUND_MESSAGE};
use crate::schema::{Diagnostic, Diagnostics, ProviderSchema};
use crate::service::ProviderService;
use crate::types::{ImportedResource, PlanResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// One request seen by [`MockRestClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// HTTP method, e.g. `POST`.
    pub method: String,
    pub resource_path: String,
    /// The `{id}` path segment, if any.
    pub id: Option<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RecordedCall {
    /// `(method, path, id)` for compact assertions.
    pub fn signature(&self) -> (&str, &str, Option<&str>) {
        (&self.method, &self.resource_path, self.id.as_deref())
    }
}

#[derive(Debug, Default)]
struct MockStore {
    objects: HashMap<(String, String), Value>,
    calls: Vec<RecordedCall>,
    response: Option<Value>,
}

/// In-memory [`RestClient`].
///
/// Writes answer with the sent body (or the value given to
/// [`MockRestClient::respond_with`]) and store it under its `id`, so a
/// later `get_one` finds it. Unknown ids answer with
/// [`ProviderError::NotFound`], like a 404 from the API.
#[derive(Debug, Default)]
pub struct MockRestClient {
    store: Mutex<MockStore>,
}

impl MockRestClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object returned by `GET {path}/{id}`.
    pub fn insert(&self, resource_path: &str, id: &str, value: Value) {
        self.lock()
            .objects
            .insert((resource_path.to_string(), id.to_string()), value);
    }

    /// The object currently stored under `{path}/{id}`.
    pub fn stored(&self, resource_path: &str, id: &str) -> Option<Value> {
        self.lock()
            .objects
            .get(&(resource_path.to_string(), id.to_string()))
            .cloned()
    }

    /// Answer every following write with `value` instead of echoing the body.
    pub fn respond_with(&self, value: Value) {
        self.lock().response = Some(value);
    }

    /// All calls so far, oldest first.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockStore> {
        // A poisoned lock only means another test thread panicked mid-call.
        match self.store.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn record(
        &self,
        method: &str,
        resource_path: &str,
        id: Option<&str>,
        query: &[(String, String)],
        body: Option<&Value>,
    ) {
        self.lock().calls.push(RecordedCall {
            method: method.to_string(),
            resource_path: resource_path.to_string(),
            id: id.map(str::to_string),
            query: query.to_vec(),
            body: body.cloned(),
        });
    }

    fn write(&self, resource_path: &str, id: Option<&str>, sent: Value) -> Value {
        let mut store = self.lock();
        let response = store.response.clone().unwrap_or(sent);
        let key = id
            .map(str::to_string)
            .or_else(|| response.get("id").and_then(Value::as_str).map(str::to_string));
        if let Some(key) = key.filter(|k| !k.is_empty()) {
            store
                .objects
                .insert((resource_path.to_string(), key), response.clone());
        }
        response
    }
}

#[async_trait]
impl RestClient for MockRestClient {
    async fn get(&self, resource_path: &str) -> Result<Value, ProviderError> {
        self.record("GET", resource_path, None, &[], None);
        let store = self.lock();
        let items = store
            .objects
            .iter()
            .filter(|((path, _), _)| path == resource_path)
            .map(|(_, value)| value.clone())
            .collect();
        Ok(Value::Array(items))
    }

    async fn get_one(&self, id: &str, resource_path: &str) -> Result<Value, ProviderError> {
        self.record("GET", resource_path, Some(id), &[], None);
        self.stored(resource_path, id)
            .ok_or_else(|| ProviderError::NotFound(ENTITY_NOT_FOUND_MESSAGE.to_string()))
    }

    async fn post(&self, data: &Value, resource_path: &str) -> Result<Value, ProviderError> {
        self.record("POST", resource_path, None, &[], Some(data));
        Ok(self.write(resource_path, None, data.clone()))
    }

    async fn post_with_id(
        &self,
        id: &str,
        data: &Value,
        resource_path: &str,
    ) -> Result<Value, ProviderError> {
        self.record("POST", resource_path, Some(id), &[], Some(data));
        Ok(self.write(resource_path, Some(id), data.clone()))
    }

    async fn put(
        &self,
        id: &str,
        data: &Value,
        resource_path: &str,
    ) -> Result<Value, ProviderError> {
        self.record("PUT", resource_path, Some(id), &[], Some(data));
        Ok(self.write(resource_path, Some(id), data.clone()))
    }

    async fn delete(&self, id: &str, resource_path: &str) -> Result<(), ProviderError> {
        self.record("DELETE", resource_path, Some(id), &[], None);
        self.lock()
            .objects
            .remove(&(resource_path.to_string(), id.to_string()));
        Ok(())
    }

    async fn post_by_query(
        &self,
        resource_path: &str,
        query: &[(String, String)],
    ) -> Result<Value, ProviderError> {
        self.record("POST", resource_path, None, query, None);
        Ok(self.write(resource_path, None, query_object(query)))
    }

    async fn put_by_query(
        &self,
        resource_path: &str,
        id: &str,
        query: &[(String, String)],
    ) -> Result<Value, ProviderError> {
        self.record("PUT", resource_path, Some(id), query, None);
        let mut sent = query_object(query);
        sent["id"] = Value::String(id.to_string());
        Ok(self.write(resource_path, Some(id), sent))
    }
}

fn query_object(query: &[(String, String)]) -> Value {
    Value::Object(
        query
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}

/// Drives a [`ProviderService`] the way the host engine does.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Resource type names, sorted.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    /// Data source type names, sorted.
    pub fn data_source_types(&self) -> Vec<String> {
        self.provider.metadata().data_sources
    }

    /// Fails with the error diagnostics, if any.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_provider_config(config).await?;
        check_diagnostics(diagnostics)
    }

    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    pub async fn plan_create(
        &self,
        resource_type: &str,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, proposed_state.clone(), proposed_state)
            .await
    }

    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(
                resource_type,
                Some(prior_state),
                proposed_state.clone(),
                proposed_state,
            )
            .await
    }

    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null, Value::Null)
            .await
    }

    pub async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    pub async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    pub async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    pub async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_data_source_config(data_source_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    pub async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.read_data_source(data_source_type, config).await
    }

    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    pub async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .upgrade_resource_state(resource_type, version, state)
            .await
    }

    /// plan, create, read. Returns the state after read.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self.plan_create(resource_type, config).await?;
        let created = self.create(resource_type, plan.planned_state).await?;
        self.read(resource_type, created).await
    }

    /// plan, update, read. Returns the state after read.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self
            .plan_update(resource_type, prior_state.clone(), proposed_state)
            .await?;
        let updated = self
            .update(resource_type, prior_state, plan.planned_state)
            .await?;
        self.read(resource_type, updated).await
    }

    /// import, read. Returns the refreshed state.
    pub async fn lifecycle_import(&self, resource_type: &str, id: &str) -> Result<Value, ProviderError> {
        let imported = self.import_resource(resource_type, id).await?;
        let state = imported
            .into_iter()
            .next()
            .map(|r| r.state)
            .unwrap_or(Value::Null);
        self.read(resource_type, state).await
    }

    /// create, update, delete. Returns the state after the update.
    pub async fn lifecycle_crud(
        &self,
        resource_type: &str,
        initial_config: Value,
        updated_config: Value,
    ) -> Result<Value, ProviderError> {
        let created = self.lifecycle_create(resource_type, initial_config).await?;
        let updated = self
            .lifecycle_update(resource_type, created, updated_config)
            .await?;
        self.plan_delete(resource_type, updated.clone()).await?;
        self.delete(resource_type, updated.clone()).await?;
        Ok(updated)
    }
}

/// Failure of a tester operation.
#[derive(Debug)]
pub enum TestError {
    /// The operation returned error diagnostics.
    Diagnostics(Diagnostics),
    Provider(ProviderError),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags.iter() {
                    writeln!(f, "  {}", diag)?;
                }
                Ok(())
            },
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

fn check_diagnostics(diagnostics: Diagnostics) -> Result<(), TestError> {
    if diagnostics.has_error() {
        Err(TestError::Diagnostics(
            diagnostics.into_iter().filter(Diagnostic::is_error).collect::<Vec<_>>().into(),
        ))
    } else {
        Ok(())
    }
}

/// Panics unless the plan sets attributes without replacing.
pub fn assert_plan_creates(plan: &PlanResult) {
    assert!(
        !plan.changes.is_empty(),
        "Expected plan to have changes for create, but got no changes"
    );
    assert!(!plan.requires_replace, "Expected plan to create, not replace");
}

pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, but got {} change(s): {:?}",
        plan.changes.len(),
        plan.changed_paths()
    );
}

pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(
        plan.requires_replace,
        "Expected plan to require replacement, but it does not"
    );
}

pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(
        !plan.changes.is_empty() && !plan.requires_replace,
        "Expected an in-place update, got changes {:?} (replace: {})",
        plan.changed_paths(),
        plan.requires_replace
    );
}

pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    assert!(
        plan.changes.iter().any(|c| c.path == path),
        "Expected plan to change attribute '{}'. Changed attributes: {:?}",
        path,
        plan.changed_paths()
    );
}

pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<_> = diagnostics.iter().filter(|d| d.is_error()).collect();
    assert!(
        errors.is_empty(),
        "Expected no errors, but got {} error(s): {:?}",
        errors.len(),
        errors.iter().map(|d| &d.summary).collect::<Vec<_>>()
    );
}

pub fn assert_has_errors(diagnostics: &[Diagnostic]) {
    assert!(
        diagnostics.iter().any(Diagnostic::is_error),
        "Expected at least one error, but got none"
    );
}

/// Panics unless an error's summary or detail contains `substring`.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let found = diagnostics.iter().filter(|d| d.is_error()).any(|d| {
        d.summary.contains(substring)
            || d.detail.as_deref().is_some_and(|detail| detail.contains(substring))
    });
    assert!(
        found,
        "Expected an error containing '{}'. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| d.is_error())
            .map(|d| &d.summary)
            .collect::<Vec<_>>()
    );
}
