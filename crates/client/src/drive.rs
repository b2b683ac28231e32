use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::warn;

use recipe_common::api::FileDescriptor;
use recipe_common::drive::{folder_query, DriveApi, LIST_PAGE_SIZE};
use recipe_common::error::DriveError;

use crate::auth::Credential;

/// Drive v3 REST client.
pub struct DriveClient {
    client: Client,
    base_url: String,
    token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<FileDescriptor>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct NameOnly {
    name: String,
}

#[derive(Deserialize)]
struct Created {
    id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CopyRequest<'a> {
    name: &'a str,
    mime_type: &'a str,
}

impl DriveClient {
    pub fn new(client: Client, base_url: &str, credential: &Credential) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: credential.access_token().to_string(),
        }
    }

    fn file_url(&self, file_id: &str, suffix: &str) -> String {
        format!("{}/files/{}{}", self.base_url, urlencoding::encode(file_id), suffix)
    }

    async fn send(&self, op: &str, req: RequestBuilder) -> Result<Response, DriveError> {
        let resp = req
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| DriveError::request(op, e))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(DriveError::Status {
            op: op.to_string(),
            status: status.as_u16(),
            message: error_message(&body),
        })
    }

    async fn bytes(&self, op: &str, req: RequestBuilder) -> Result<Vec<u8>, DriveError> {
        let resp = self.send(op, req).await?;
        resp.bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| DriveError::decode(op, e))
    }
}

/// Pull `error.message` out of a Google API error body, falling back to the
/// (truncated) body itself.
fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct Envelope {
        error: Inner,
    }
    #[derive(Deserialize)]
    struct Inner {
        message: String,
    }

    match serde_json::from_str::<Envelope>(body) {
        Ok(env) => env.error.message,
        Err(_) => body.chars().take(200).collect(),
    }
}

#[async_trait]
impl DriveApi for DriveClient {
    async fn list_folder(
        &self,
        folder_id: &str,
        mime_types: &[&str],
    ) -> Result<Vec<FileDescriptor>, DriveError> {
        const OP: &str = "files.list";
        let query = folder_query(folder_id, mime_types);
        let page_size = LIST_PAGE_SIZE.to_string();
        let req = self.client.get(format!("{}/files", self.base_url)).query(&[
            ("q", query.as_str()),
            ("fields", "nextPageToken, files(id, name, mimeType)"),
            ("pageSize", page_size.as_str()),
        ]);
        let list: FileList = self
            .send(OP, req)
            .await?
            .json()
            .await
            .map_err(|e| DriveError::decode(OP, e))?;
        if list.next_page_token.is_some() {
            warn!(
                "folder {folder_id} has more than {LIST_PAGE_SIZE} matching entries; \
                 only the first {} are imported",
                list.files.len()
            );
        }
        Ok(list.files)
    }

    async fn folder_name(&self, folder_id: &str) -> Result<String, DriveError> {
        const OP: &str = "files.get";
        let req = self
            .client
            .get(self.file_url(folder_id, ""))
            .query(&[("fields", "name")]);
        let named: NameOnly = self
            .send(OP, req)
            .await?
            .json()
            .await
            .map_err(|e| DriveError::decode(OP, e))?;
        Ok(named.name)
    }

    async fn download(&self, file_id: &str) -> Result<Vec<u8>, DriveError> {
        let req = self
            .client
            .get(self.file_url(file_id, ""))
            .query(&[("alt", "media")]);
        self.bytes("files.get(media)", req).await
    }

    async fn export(&self, file_id: &str, mime_type: &str) -> Result<Vec<u8>, DriveError> {
        let req = self
            .client
            .get(self.file_url(file_id, "/export"))
            .query(&[("mimeType", mime_type)]);
        self.bytes("files.export", req).await
    }

    async fn copy_as(
        &self,
        file_id: &str,
        name: &str,
        mime_type: &str,
    ) -> Result<String, DriveError> {
        const OP: &str = "files.copy";
        let req = self
            .client
            .post(self.file_url(file_id, "/copy"))
            .json(&CopyRequest { name, mime_type });
        let created: Created = self
            .send(OP, req)
            .await?
            .json()
            .await
            .map_err(|e| DriveError::decode(OP, e))?;
        Ok(created.id)
    }

    async fn delete(&self, file_id: &str) -> Result<(), DriveError> {
        let req = self.client.delete(self.file_url(file_id, ""));
        self.send("files.delete", req).await?;
        Ok(())
    }
}
