use super::InstanaDataObject;
use serde::{Deserialize, Serialize};

/// A website monitored by Instana EUM.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsiteMonitoringConfig {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub app_name: String,
}

impl InstanaDataObject for WebsiteMonitoringConfig {
    fn id_for_resource_path(&self) -> &str {
        &self.id
    }
}
