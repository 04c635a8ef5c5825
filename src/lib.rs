//! Terraform provider for Instana
//!
//! Every Instana object kind the provider manages is a *resource handle*:
//! a declarative [`schema::Schema`] plus two pure mappings between provider
//! state and the Instana REST API object. [`InstanaProvider`] registers all
//! handles and runs the shared create/read/update/delete flow against the
//! API.
//!
//! # Resources
//!
//! | type | API path |
//! |---|---|
//! | `instana_api_token` | `/api/settings/api-tokens` |
//! | `instana_rbac_role` | `/api/settings/rbac/roles` |
//! | `instana_rbac_group` | `/api/settings/rbac/groups` |
//! | `instana_rbac_team` | `/api/settings/rbac/teams` |
//! | `instana_sli_config` | `/api/settings/v2/sli` |
//! | `instana_slo_config` | `/api/settings/slo` |
//! | `instana_slo_correction_config` | `/api/settings/correction` |
//! | `instana_custom_event_specification` | `/api/events/settings/event-specifications/custom` |
//! | `instana_website_monitoring_config` | `/api/website-monitoring/config` |
//!
//! # Data Sources
//!
//! `instana_custom_event_spec` looks up a custom event specification by
//! `name` and `entity_type`.
//!
//! # Quick Start
//!
//! ```ignore
//! use terraform_provider_instana::{InstanaProvider, ProviderService};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     terraform_provider_instana::init_logging();
//!
//!     let provider = InstanaProvider::new();
//!     provider
//!         .configure(json!({"api_token": "...", "endpoint": "tenant-unit.instana.io"}))
//!         .await?;
//!
//!     let plan = provider
//!         .plan("instana_rbac_role", None, json!({"name": "viewer", "permissions": []}), json!({}))
//!         .await?;
//!     let state = provider.create("instana_rbac_role", plan.planned_state).await?;
//!     println!("{}", state["id"]);
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! `api_token` and `endpoint` fall back to `INSTANA_API_TOKEN` and
//! `INSTANA_ENDPOINT` when they are not set in the provider block.

#![warn(clippy::all)]

pub mod datasources;
pub mod error;
pub mod logging;
pub mod provider;
pub mod resourcehandle;
pub mod resources;
pub mod restapi;
pub mod schema;
pub mod service;
pub mod state;
pub mod tagfilter;
pub mod testing;
pub mod types;
pub mod validation;

// Re-export main types at crate root
pub use datasources::DataSourceHandle;
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::{InstanaProvider, ProviderConfig};
pub use resourcehandle::{ResourceHandle, ResourceMetaData};
pub use schema::{Diagnostic, Diagnostics, ProviderSchema};
pub use service::ProviderService;
pub use state::{Plan, State};
pub use types::{AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities};
pub use validation::{is_valid, validate, validate_result};

pub use async_trait::async_trait;

pub use serde_json;
pub use tracing;
