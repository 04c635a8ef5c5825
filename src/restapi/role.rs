use super::InstanaDataObject;
use serde::{Deserialize, Serialize};

/// A user assigned to a role or group.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMember {
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// An RBAC role.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Role {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub members: Vec<ApiMember>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl InstanaDataObject for Role {
    fn id_for_resource_path(&self) -> &str {
        &self.id
    }
}
