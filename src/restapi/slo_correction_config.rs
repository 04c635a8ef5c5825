use super::InstanaDataObject;
use serde::{Deserialize, Serialize};

/// When a correction window applies.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scheduling {
    /// Unix timestamp in milliseconds.
    pub start_time: i64,
    pub duration: i64,
    /// Upper-case unit such as `MINUTE` or `HOUR`.
    pub duration_unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrent_rule: Option<String>,
    #[serde(default)]
    pub recurrent: bool,
}

/// A time window excluded from SLO evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SloCorrectionConfig {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub active: bool,
    pub scheduling: Scheduling,
    #[serde(default)]
    pub slo_ids: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl InstanaDataObject for SloCorrectionConfig {
    fn id_for_resource_path(&self) -> &str {
        &self.id
    }
}
