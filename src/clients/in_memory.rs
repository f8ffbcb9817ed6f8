use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::clients::PostsApi;
use crate::error::AppError;
use crate::models::{CreatedPost, NewPost};

/// Records every call; titles listed in `reject_titles` fail creation and
/// `fail_votes` makes every vote seed fail.
#[derive(Default)]
pub struct InMemoryPostsApi {
    pub reject_titles: HashSet<String>,
    pub fail_votes: bool,
    pub created: Mutex<Vec<NewPost>>,
    pub seeded: Mutex<Vec<(String, u32)>>,
}

impl InMemoryPostsApi {
    pub fn rejecting(titles: &[&str]) -> Self {
        Self {
            reject_titles: titles.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl PostsApi for InMemoryPostsApi {
    async fn create_post(&self, post: &NewPost) -> Result<CreatedPost, AppError> {
        if self.reject_titles.contains(&post.title) {
            return Err(AppError::PostsApi(format!("duplicate post '{}'", post.title)));
        }

        let mut created = self.created.lock();
        created.push(post.clone());
        Ok(CreatedPost {
            id: format!("post-{}", created.len()),
            title: post.title.clone(),
        })
    }

    async fn seed_votes(&self, post_id: &str, count: u32) -> Result<(), AppError> {
        self.seeded.lock().push((post_id.to_string(), count));
        if self.fail_votes {
            return Err(AppError::PostsApi("votes table locked".to_string()));
        }
        Ok(())
    }
}
