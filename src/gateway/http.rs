use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use super::{GatewayError, GatewayResult, RemoteStore};
use crate::config::ServerConfig;
use crate::model::{Contact, ContactDraft, Tag, TagDraft, TagId};

const LIST_CONTACTS: &str = "list";
const CREATE_CONTACT: &str = "create";
const EDIT_CONTACT: &str = "edit";
const DELETE_CONTACT: &str = "delete";
const LIST_TAGS: &str = "tags/list";
const CREATE_TAG: &str = "tags/create";
const EDIT_TAG: &str = "tags/edit";
const DELETE_TAG: &str = "tags/delete";

#[derive(Serialize)]
struct TagEditBody<'a> {
    id: TagId,
    name: &'a str,
    color: &'a str,
}

/// Reqwest-backed gateway against the contacts server.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: Url,
}

impl HttpGateway {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let base_url = normalize_base(&config.base_url)?;
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("building http client")?;
        Ok(Self { client, base_url })
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self> {
        Ok(Self {
            client,
            base_url: normalize_base(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> GatewayResult<Url> {
        self.base_url
            .join(path)
            .map_err(|err| GatewayError::Server(format!("invalid endpoint {path}: {err}")))
    }

    fn endpoint_with_query(&self, path: &str, key: &str, value: &str) -> GatewayResult<Url> {
        let mut url = self.endpoint(path)?;
        url.query_pairs_mut().append_pair(key, value);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> GatewayResult<Response> {
        let response = request.send().await.map_err(|err| {
            tracing::warn!(error = %err, "request to contacts server failed");
            GatewayError::Server(format!("request failed: {err}"))
        })?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let err = GatewayError::from_response(status, &body);
        tracing::warn!(%status, kind = %err.kind(), message = err.message(), "server rejected request");
        Err(err)
    }

    async fn fetch_list<T: DeserializeOwned>(&self, path: &str) -> GatewayResult<Vec<T>> {
        let url = self.endpoint(path)?;
        tracing::debug!(%url, "GET");
        let response = self
            .send(self.client.get(url).header("Accept", "application/json"))
            .await?;
        let body = response
            .bytes()
            .await
            .map_err(|err| GatewayError::Server(format!("reading response: {err}")))?;
        decode_list(path, &body)
    }
}

/// An empty result set arrives as `null`.
fn decode_list<T: DeserializeOwned>(path: &str, body: &[u8]) -> GatewayResult<Vec<T>> {
    let items: Option<Vec<T>> = serde_json::from_slice(body).map_err(|err| {
        GatewayError::Server(format!("undecodable response from {path}: {err}"))
    })?;
    Ok(items.unwrap_or_default())
}

#[async_trait]
impl RemoteStore for HttpGateway {
    async fn list_contacts(&self) -> GatewayResult<Vec<Contact>> {
        self.fetch_list(LIST_CONTACTS).await
    }

    async fn create_contact(&self, draft: &ContactDraft) -> GatewayResult<()> {
        let url = self.endpoint(CREATE_CONTACT)?;
        tracing::debug!(%url, name = %draft.name, "POST");
        self.send(self.client.post(url).json(draft)).await?;
        Ok(())
    }

    async fn edit_contact(&self, draft: &ContactDraft) -> GatewayResult<()> {
        let url = self.endpoint(EDIT_CONTACT)?;
        tracing::debug!(%url, name = %draft.name, "POST");
        self.send(self.client.post(url).json(draft)).await?;
        Ok(())
    }

    async fn delete_contact(&self, name: &str) -> GatewayResult<()> {
        let url = self.endpoint_with_query(DELETE_CONTACT, "name", name)?;
        tracing::debug!(%url, "DELETE");
        self.send(self.client.delete(url)).await?;
        Ok(())
    }

    async fn list_tags(&self) -> GatewayResult<Vec<Tag>> {
        self.fetch_list(LIST_TAGS).await
    }

    async fn create_tag(&self, draft: &TagDraft) -> GatewayResult<()> {
        let url = self.endpoint(CREATE_TAG)?;
        tracing::debug!(%url, name = %draft.name, "POST");
        self.send(self.client.post(url).json(draft)).await?;
        Ok(())
    }

    async fn edit_tag(&self, id: TagId, draft: &TagDraft) -> GatewayResult<()> {
        let url = self.endpoint(EDIT_TAG)?;
        tracing::debug!(%url, id, "PUT");
        let body = TagEditBody {
            id,
            name: &draft.name,
            color: &draft.color,
        };
        self.send(self.client.put(url).json(&body)).await?;
        Ok(())
    }

    async fn delete_tag(&self, id: TagId) -> GatewayResult<()> {
        let url = self.endpoint_with_query(DELETE_TAG, "id", &id.to_string())?;
        tracing::debug!(%url, "DELETE");
        self.send(self.client.delete(url)).await?;
        Ok(())
    }
}

/// Endpoint paths are relative, so the base must end with a slash for `join`
/// to keep any path prefix.
fn normalize_base(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_owned()
    } else {
        format!("{trimmed}/")
    };
    Url::parse(&with_slash).with_context(|| format!("parsing server url {trimmed:?}"))
}
