pub mod posts_api;

#[cfg(test)]
pub mod in_memory;

pub use posts_api::{HttpPostsApi, PostsApi};
