use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;

use crate::error::AppError;
use crate::models::{CreatedPost, NewPost};

/// Post creation and vote seeding, owned by the feedback backend.
#[async_trait]
pub trait PostsApi: Send + Sync {
    async fn create_post(&self, post: &NewPost) -> Result<CreatedPost, AppError>;
    async fn seed_votes(&self, post_id: &str, count: u32) -> Result<(), AppError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SeedVotesRequest<'a> {
    post_id: &'a str,
    count: u32,
}

#[derive(Clone)]
pub struct HttpPostsApi {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpPostsApi {
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn ensure_success(response: Response, action: &str) -> Result<Response, AppError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(AppError::PostsApi(format!("{} failed with {}: {}", action, status, body)))
    }
}

#[async_trait]
impl PostsApi for HttpPostsApi {
    async fn create_post(&self, post: &NewPost) -> Result<CreatedPost, AppError> {
        let url = format!("{}/posts", self.base_url);
        tracing::debug!("Creating post '{}' on board {}", post.title, post.board_id);

        let response = self
            .authorize(self.client.post(&url).json(post))
            .send()
            .await
            .map_err(|e| AppError::PostsApi(format!("Failed to reach {}: {}", url, e)))?;

        Self::ensure_success(response, "Create post")
            .await?
            .json::<CreatedPost>()
            .await
            .map_err(|e| AppError::PostsApi(format!("Invalid create post response: {}", e)))
    }

    async fn seed_votes(&self, post_id: &str, count: u32) -> Result<(), AppError> {
        let url = format!("{}/posts/{}/votes", self.base_url, post_id);
        tracing::debug!("Seeding {} votes on post {}", count, post_id);

        let response = self
            .authorize(self.client.post(&url).json(&SeedVotesRequest { post_id, count }))
            .send()
            .await
            .map_err(|e| AppError::PostsApi(format!("Failed to reach {}: {}", url, e)))?;

        Self::ensure_success(response, "Seed votes").await?;
        Ok(())
    }
}
