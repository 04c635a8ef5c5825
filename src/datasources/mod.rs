//! Read-only data sources. Each one looks up an existing Instana object
//! from its configuration and exposes the object's attributes as state.

pub mod custom_event_specification;

pub use custom_event_specification::{
    CustomEventSpecificationDataModel, CustomEventSpecificationDataSource,
};

use crate::error::ProviderError;
use crate::restapi::InstanaApi;
use crate::schema::Schema;
use crate::state::State;
use async_trait::async_trait;

/// The contract every data source implements.
#[async_trait]
pub trait DataSourceHandle: Send + Sync + 'static {
    /// Name without provider prefix, e.g. `custom_event_spec`.
    fn name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    /// Resolve the object described by `config` and return the full state.
    async fn read(&self, api: &InstanaApi, config: State) -> Result<State, ProviderError>;
}
