//! Plain data exchanged through [`crate::service::ProviderService`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A change of one top-level attribute between prior state and plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// Attribute name.
    pub path: String,
    /// Prior value; `None` when the attribute is being set for the first time.
    pub before: Option<Value>,
    /// Planned value; `None` when the attribute is being cleared.
    pub after: Option<Value>,
}

impl AttributeChange {
    pub fn new(path: impl Into<String>, before: Option<Value>, after: Option<Value>) -> Self {
        Self {
            path: path.into(),
            before,
            after,
        }
    }

    pub fn added(path: impl Into<String>, value: Value) -> Self {
        Self::new(path, None, Some(value))
    }

    pub fn removed(path: impl Into<String>, value: Value) -> Self {
        Self::new(path, Some(value), None)
    }

    pub fn modified(path: impl Into<String>, before: Value, after: Value) -> Self {
        Self::new(path, Some(before), Some(after))
    }

    /// Compare two attribute values; JSON null counts as absent.
    pub fn between(path: &str, before: Option<&Value>, after: Option<&Value>) -> Option<Self> {
        let before = before.filter(|v| !v.is_null());
        let after = after.filter(|v| !v.is_null());
        match (before, after) {
            (None, None) => None,
            (Some(b), Some(a)) if b == a => None,
            (b, a) => Some(Self::new(path, b.cloned(), a.cloned())),
        }
    }
}

/// Outcome of planning one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// State the apply step will work from; null for a destroy.
    pub planned_state: Value,
    /// Top-level attributes that differ from the prior state.
    pub changes: Vec<AttributeChange>,
    /// The object has to be deleted and created again.
    pub requires_replace: bool,
}

impl PlanResult {
    /// Nothing to do.
    pub fn no_change(state: Value) -> Self {
        Self {
            planned_state: state,
            changes: Vec::new(),
            requires_replace: false,
        }
    }

    pub fn with_changes(
        planned_state: Value,
        changes: Vec<AttributeChange>,
        requires_replace: bool,
    ) -> Self {
        Self {
            planned_state,
            changes,
            requires_replace,
        }
    }

    /// Names of the changed attributes in plan order.
    pub fn changed_paths(&self) -> Vec<&str> {
        self.changes.iter().map(|c| c.path.as_str()).collect()
    }

    /// True when the planned state is null.
    pub fn is_destroy(&self) -> bool {
        self.planned_state.is_null()
    }
}

/// State produced by an import, to be refreshed by a read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    /// Full resource type name.
    pub resource_type: String,
    pub state: Value,
}

impl ImportedResource {
    pub fn new(resource_type: impl Into<String>, state: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            state,
        }
    }
}

/// Resource and data source type names and capabilities of a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// Resource type names, e.g. `instana_rbac_role`.
    pub resources: Vec<String>,
    /// Data source type names, e.g. `instana_custom_event_spec`.
    #[serde(default)]
    pub data_sources: Vec<String>,
    pub capabilities: ServerCapabilities,
}

/// Optional protocol features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServerCapabilities {
    /// The provider answers `plan` with a null proposed state.
    pub plan_destroy: bool,
}
