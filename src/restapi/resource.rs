//! Typed CRUD access to a single Instana API resource path.

use super::client::RestClient;
use super::{InstanaDataObject, WebsiteMonitoringConfig};
use crate::error::ProviderError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// CRUD operations on one kind of Instana data object.
#[async_trait]
pub trait RestResource<T: InstanaDataObject>: Send + Sync {
    /// Fetch the object with the given id.
    async fn get_one(&self, id: &str) -> Result<T, ProviderError>;

    /// Fetch every object stored under the resource path.
    async fn get_all(&self) -> Result<Vec<T>, ProviderError>;

    /// Create a new object and return what the API stored.
    async fn create(&self, data: &T) -> Result<T, ProviderError>;

    /// Update an existing object and return what the API stored.
    async fn update(&self, data: &T) -> Result<T, ProviderError>;

    /// Delete the given object.
    async fn delete(&self, data: &T) -> Result<(), ProviderError> {
        self.delete_by_id(data.id_for_resource_path()).await
    }

    /// Delete the object with the given id.
    async fn delete_by_id(&self, id: &str) -> Result<(), ProviderError>;
}

/// HTTP verbs used for create and update of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestResourceMode {
    /// `POST {path}` to create, `PUT {path}/{id}` to update.
    CreatePostUpdatePut,
    /// `PUT {path}/{id}` for both.
    CreatePutUpdatePut,
    /// `POST {path}` to create, `POST {path}/{id}` to update.
    CreatePostUpdatePost,
    /// `POST {path}` to create; objects are immutable.
    CreatePostUpdateNotSupported,
}

/// [`RestResource`] for resources that exchange the data object as JSON body.
pub struct DefaultRestResource<T> {
    mode: RestResourceMode,
    resource_path: &'static str,
    client: Arc<dyn RestClient>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> DefaultRestResource<T> {
    /// Create a resource bound to `resource_path`.
    pub fn new(
        mode: RestResourceMode,
        resource_path: &'static str,
        client: Arc<dyn RestClient>,
    ) -> Self {
        Self {
            mode,
            resource_path,
            client,
            _marker: PhantomData,
        }
    }

    /// The create/update mode of this resource.
    pub fn mode(&self) -> RestResourceMode {
        self.mode
    }

    /// The API path of this resource.
    pub fn resource_path(&self) -> &'static str {
        self.resource_path
    }
}

/// Decode a list response; a null body is an empty list.
fn decode_list<T: DeserializeOwned>(response: Value) -> Result<Vec<T>, ProviderError> {
    if response.is_null() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_value(response)?)
}

impl<T: InstanaDataObject> DefaultRestResource<T> {
    fn encode(data: &T) -> Result<Value, ProviderError> {
        Ok(serde_json::to_value(data)?)
    }

    /// Decode a response; an empty body means the API stored what was sent.
    fn decode(response: Value, sent: &T) -> Result<T, ProviderError> {
        if response.is_null() {
            return Ok(sent.clone());
        }
        Ok(serde_json::from_value(response)?)
    }
}

#[async_trait]
impl<T: InstanaDataObject> RestResource<T> for DefaultRestResource<T> {
    async fn get_one(&self, id: &str) -> Result<T, ProviderError> {
        let response = self.client.get_one(id, self.resource_path).await?;
        if response.is_null() {
            return Err(ProviderError::NotFound(format!(
                "empty response for {}/{}",
                self.resource_path, id
            )));
        }
        Ok(serde_json::from_value(response)?)
    }

    async fn get_all(&self) -> Result<Vec<T>, ProviderError> {
        debug!(path = self.resource_path, "Listing objects");
        decode_list(self.client.get(self.resource_path).await?)
    }

    async fn create(&self, data: &T) -> Result<T, ProviderError> {
        let body = Self::encode(data)?;
        debug!(path = self.resource_path, mode = ?self.mode, "Creating object");
        let response = match self.mode {
            RestResourceMode::CreatePutUpdatePut => {
                self.client
                    .put(data.id_for_resource_path(), &body, self.resource_path)
                    .await?
            },
            RestResourceMode::CreatePostUpdatePut
            | RestResourceMode::CreatePostUpdatePost
            | RestResourceMode::CreatePostUpdateNotSupported => {
                self.client.post(&body, self.resource_path).await?
            },
        };
        Self::decode(response, data)
    }

    async fn update(&self, data: &T) -> Result<T, ProviderError> {
        let id = data.id_for_resource_path();
        debug!(path = self.resource_path, id, mode = ?self.mode, "Updating object");
        let response = match self.mode {
            RestResourceMode::CreatePostUpdatePut | RestResourceMode::CreatePutUpdatePut => {
                self.client
                    .put(id, &Self::encode(data)?, self.resource_path)
                    .await?
            },
            RestResourceMode::CreatePostUpdatePost => {
                self.client
                    .post_with_id(id, &Self::encode(data)?, self.resource_path)
                    .await?
            },
            RestResourceMode::CreatePostUpdateNotSupported => {
                return Err(ProviderError::Unimplemented(format!(
                    "update is not supported for {}",
                    self.resource_path
                )))
            },
        };
        Self::decode(response, data)
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), ProviderError> {
        self.client.delete(id, self.resource_path).await
    }
}

/// Website monitoring configs take the name as query parameter and no body.
pub struct WebsiteMonitoringConfigRestResource {
    resource_path: &'static str,
    client: Arc<dyn RestClient>,
}

impl WebsiteMonitoringConfigRestResource {
    /// Create the resource bound to `resource_path`.
    pub fn new(resource_path: &'static str, client: Arc<dyn RestClient>) -> Self {
        Self {
            resource_path,
            client,
        }
    }

    fn name_query(data: &WebsiteMonitoringConfig) -> Vec<(String, String)> {
        vec![("name".to_string(), data.name.clone())]
    }
}

#[async_trait]
impl RestResource<WebsiteMonitoringConfig> for WebsiteMonitoringConfigRestResource {
    async fn get_one(&self, id: &str) -> Result<WebsiteMonitoringConfig, ProviderError> {
        let response = self.client.get_one(id, self.resource_path).await?;
        Ok(serde_json::from_value(response)?)
    }

    async fn get_all(&self) -> Result<Vec<WebsiteMonitoringConfig>, ProviderError> {
        decode_list(self.client.get(self.resource_path).await?)
    }

    async fn create(
        &self,
        data: &WebsiteMonitoringConfig,
    ) -> Result<WebsiteMonitoringConfig, ProviderError> {
        let response = self
            .client
            .post_by_query(self.resource_path, &Self::name_query(data))
            .await?;
        Ok(serde_json::from_value(response)?)
    }

    async fn update(
        &self,
        data: &WebsiteMonitoringConfig,
    ) -> Result<WebsiteMonitoringConfig, ProviderError> {
        let response = self
            .client
            .put_by_query(self.resource_path, &data.id, &Self::name_query(data))
            .await?;
        Ok(serde_json::from_value(response)?)
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), ProviderError> {
        self.client.delete(id, self.resource_path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::restapi::{Role, ROLES_RESOURCE_PATH, WEBSITE_MONITORING_CONFIG_RESOURCE_PATH};
    use crate::testing::MockRestClient;
    use serde_json::json;

    fn role() -> Role {
        Role {
            id: "role-1".to_string(),
            name: "Viewer".to_string(),
            members: vec![],
            permissions: vec!["CAN_VIEW_LOGS".to_string()],
        }
    }

    fn resource(mode: RestResourceMode, client: &Arc<MockRestClient>) -> DefaultRestResource<Role> {
        DefaultRestResource::new(mode, ROLES_RESOURCE_PATH, client.clone())
    }

    #[tokio::test]
    async fn test_create_post_update_put() {
        let client = Arc::new(MockRestClient::new());
        let res = resource(RestResourceMode::CreatePostUpdatePut, &client);

        let created = res.create(&role()).await.unwrap();
        assert_eq!(created, role());
        res.update(&role()).await.unwrap();

        let calls = client.calls();
        assert_eq!(calls[0].signature(), ("POST", ROLES_RESOURCE_PATH, None));
        assert_eq!(calls[1].signature(), ("PUT", ROLES_RESOURCE_PATH, Some("role-1")));
    }

    #[tokio::test]
    async fn test_create_put_update_put() {
        let client = Arc::new(MockRestClient::new());
        let res = resource(RestResourceMode::CreatePutUpdatePut, &client);

        res.create(&role()).await.unwrap();
        res.update(&role()).await.unwrap();

        let calls = client.calls();
        assert_eq!(calls[0].signature(), ("PUT", ROLES_RESOURCE_PATH, Some("role-1")));
        assert_eq!(calls[1].signature(), ("PUT", ROLES_RESOURCE_PATH, Some("role-1")));
    }

    #[tokio::test]
    async fn test_create_post_update_post() {
        let client = Arc::new(MockRestClient::new());
        let res = resource(RestResourceMode::CreatePostUpdatePost, &client);

        res.update(&role()).await.unwrap();

        assert_eq!(
            client.calls()[0].signature(),
            ("POST", ROLES_RESOURCE_PATH, Some("role-1"))
        );
    }

    #[tokio::test]
    async fn test_update_not_supported() {
        let client = Arc::new(MockRestClient::new());
        let res = resource(RestResourceMode::CreatePostUpdateNotSupported, &client);

        let err = res.update(&role()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Unimplemented(_)));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_get_one_decodes_response() {
        let client = Arc::new(MockRestClient::new());
        client.insert(
            ROLES_RESOURCE_PATH,
            "role-1",
            json!({"id": "role-1", "name": "Viewer", "members": [], "permissions": ["CAN_VIEW_LOGS"]}),
        );
        let res = resource(RestResourceMode::CreatePostUpdatePut, &client);

        assert_eq!(res.get_one("role-1").await.unwrap(), role());
        assert!(res.get_one("other").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_get_all_lists_objects_of_the_path() {
        let client = Arc::new(MockRestClient::new());
        let res = resource(RestResourceMode::CreatePostUpdatePut, &client);
        assert!(res.get_all().await.unwrap().is_empty());

        client.insert(
            ROLES_RESOURCE_PATH,
            "role-1",
            json!({"id": "role-1", "name": "Viewer", "members": [], "permissions": ["CAN_VIEW_LOGS"]}),
        );
        client.insert(WEBSITE_MONITORING_CONFIG_RESOURCE_PATH, "w1", json!({"id": "w1"}));

        assert_eq!(res.get_all().await.unwrap(), vec![role()]);
        assert_eq!(client.calls()[0].signature(), ("GET", ROLES_RESOURCE_PATH, None));
    }

    #[tokio::test]
    async fn test_delete_uses_object_id() {
        let client = Arc::new(MockRestClient::new());
        let res = resource(RestResourceMode::CreatePostUpdatePut, &client);

        res.delete(&role()).await.unwrap();

        assert_eq!(
            client.calls()[0].signature(),
            ("DELETE", ROLES_RESOURCE_PATH, Some("role-1"))
        );
    }

    #[tokio::test]
    async fn test_website_monitoring_uses_name_query() {
        let client = Arc::new(MockRestClient::new());
        client.respond_with(json!({"id": "w1", "name": "shop", "appName": "shop-app"}));
        let res =
            WebsiteMonitoringConfigRestResource::new(WEBSITE_MONITORING_CONFIG_RESOURCE_PATH, client.clone());

        let config = WebsiteMonitoringConfig {
            id: String::new(),
            name: "shop".to_string(),
            app_name: String::new(),
        };
        let created = res.create(&config).await.unwrap();
        assert_eq!(created.app_name, "shop-app");

        let call = &client.calls()[0];
        assert_eq!(call.method, "POST");
        assert_eq!(call.query, vec![("name".to_string(), "shop".to_string())]);
        assert!(call.body.is_none());
    }
}
