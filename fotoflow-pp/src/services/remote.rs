//! HTTP object-store backend
//!
//! Implements `ObjectStore` against the remote storage gateway's REST API
//! with bearer-token auth. Every non-success status surfaces as a `Remote`
//! error carrying the status and body so delivery logs stay diagnosable.

use fotoflow_common::{Error, Result};
use reqwest::multipart;
use serde::Deserialize;

use crate::services::uploader::{ObjectStore, RemoteFolder};

pub struct HttpObjectStore {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Deserialize)]
struct FolderResponse {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct FolderListResponse {
    folders: Vec<FolderResponse>,
}

#[derive(Deserialize)]
struct ShareResponse {
    link: String,
}

impl HttpObjectStore {
    pub fn new(base_url: String, token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    async fn check(response: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(Error::Remote(format!("{context}: HTTP {status}: {body}")))
    }
}

#[async_trait::async_trait]
impl ObjectStore for HttpObjectStore {
    async fn find_folder(&self, name: &str, parent: Option<&str>) -> Result<Option<RemoteFolder>> {
        let mut request = self
            .client
            .get(format!("{}/folders", self.base_url))
            .bearer_auth(&self.token)
            .query(&[("name", name)]);
        if let Some(parent) = parent {
            request = request.query(&[("parent", parent)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Remote(format!("folder lookup: {e}")))?;
        let list: FolderListResponse = Self::check(response, "folder lookup")
            .await?
            .json()
            .await
            .map_err(|e| Error::Remote(format!("folder lookup response: {e}")))?;

        Ok(list.folders.into_iter().next().map(|f| RemoteFolder {
            id: f.id,
            name: f.name,
        }))
    }

    async fn create_folder(&self, name: &str, parent: Option<&str>) -> Result<RemoteFolder> {
        let response = self
            .client
            .post(format!("{}/folders", self.base_url))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "name": name, "parent": parent }))
            .send()
            .await
            .map_err(|e| Error::Remote(format!("folder create: {e}")))?;
        let folder: FolderResponse = Self::check(response, "folder create")
            .await?
            .json()
            .await
            .map_err(|e| Error::Remote(format!("folder create response: {e}")))?;

        Ok(RemoteFolder {
            id: folder.id,
            name: folder.name,
        })
    }

    async fn upload_file(&self, folder_id: &str, filename: &str, bytes: Vec<u8>) -> Result<()> {
        let part = multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(format!("{}/folders/{}/files", self.base_url, folder_id))
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Remote(format!("file upload: {e}")))?;
        Self::check(response, "file upload").await?;
        Ok(())
    }

    async fn share_folder(&self, folder_id: &str) -> Result<String> {
        let response = self
            .client
            .post(format!(
                "{}/folders/{}/permissions",
                self.base_url, folder_id
            ))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "type": "anyone", "role": "reader" }))
            .send()
            .await
            .map_err(|e| Error::Remote(format!("folder share: {e}")))?;
        let share: ShareResponse = Self::check(response, "folder share")
            .await?
            .json()
            .await
            .map_err(|e| Error::Remote(format!("folder share response: {e}")))?;

        Ok(share.link)
    }
}
