use reqwest::Client;

use crate::api::types::{
    BlockPatch, FetchPageResponse, NewBlockPayload, PageLocator, RawBlock, ToggleTodoResponse,
};
use crate::error::{Error, Result};

#[derive(Clone)]
pub struct NotesClient {
    client: Client,
    base_url: String,
    token: String,
}

impl NotesClient {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    pub async fn fetch_page(&self, locator: &PageLocator) -> Result<FetchPageResponse> {
        let path = match locator {
            PageLocator::Id(id) => format!("/pages/{}", id),
            PageLocator::Date(date) => format!("/pages/daily/{}", date.format("%Y-%m-%d")),
            PageLocator::Slug(slug) => format!("/pages/slug/{}", slug),
        };
        let resp = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .header("Authorization", format!("Bearer {}", self.token))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }

        let body = resp.json::<FetchPageResponse>().await?;
        Ok(body)
    }

    pub async fn create_block(&self, payload: &NewBlockPayload) -> Result<RawBlock> {
        let resp = self
            .client
            .post(format!("{}/blocks", self.base_url))
            .header("Authorization", format!("Bearer {}", self.token))
            .json(payload)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }

        let body = resp.json::<RawBlock>().await?;
        Ok(body)
    }

    pub async fn update_block(&self, uuid: &str, patch: &BlockPatch) -> Result<RawBlock> {
        let resp = self
            .client
            .patch(format!("{}/blocks/{}", self.base_url, uuid))
            .header("Authorization", format!("Bearer {}", self.token))
            .json(patch)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }

        let body = resp.json::<RawBlock>().await?;
        Ok(body)
    }

    /// Deletion cascades to descendants server-side.
    pub async fn delete_block(&self, uuid: &str) -> Result<()> {
        let resp = self
            .client
            .delete(format!("{}/blocks/{}", self.base_url, uuid))
            .header("Authorization", format!("Bearer {}", self.token))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }

        Ok(())
    }

    pub async fn toggle_block_todo(&self, uuid: &str) -> Result<ToggleTodoResponse> {
        let resp = self
            .client
            .post(format!("{}/blocks/{}/toggle-todo", self.base_url, uuid))
            .header("Authorization", format!("Bearer {}", self.token))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }

        let body = resp.json::<ToggleTodoResponse>().await?;
        Ok(body)
    }
}

async fn api_error(resp: reqwest::Response) -> Error {
    let status = resp.status().as_u16();
    let message = resp.text().await.unwrap_or_default();
    tracing::warn!(status, %message, "request failed");
    Error::Api { status, message }
}
