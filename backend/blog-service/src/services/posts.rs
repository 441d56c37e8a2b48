/// Post service - handles post creation, retrieval, and management
use crate::db::{PageRequest, Store};
use crate::error::{codes, AppError, Result};
use crate::middleware::{authorize, check_permission, require_caller, Identity, Operation};
use crate::models::{NewPost, Post, PostChanges, PostPatchRequest, PostRequest};
use crate::services::register_caller;
use std::sync::Arc;
use validator::Validate;

pub struct PostService {
    store: Arc<dyn Store>,
}

impl PostService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// List posts, optionally windowed
    pub async fn list_posts(&self, page: Option<PageRequest>) -> Result<Vec<Post>> {
        Ok(self.store.list_posts(page).await?)
    }

    pub async fn count_posts(&self) -> Result<i64> {
        Ok(self.store.count_posts().await?)
    }

    /// Get a post by ID
    pub async fn get_post(&self, post_id: i64) -> Result<Post> {
        self.store
            .find_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found", post_id)))
    }

    /// Create a new post authored by the caller
    pub async fn create_post(&self, identity: &Identity, req: PostRequest) -> Result<Post> {
        check_permission(identity, Operation::Create)?;
        let caller = require_caller(identity)?;
        req.validate()?;
        register_caller(self.store.as_ref(), caller).await?;

        let group = req.group.flatten();
        self.ensure_group(group).await?;

        let post = self
            .store
            .insert_post(NewPost {
                author_id: caller.id,
                text: req.text,
                image: req.image.flatten(),
                group,
            })
            .await?;

        tracing::info!(post_id = post.id, user_id = %caller.id, "post created");
        Ok(post)
    }

    /// Replace a post's content (PUT)
    pub async fn update_post(
        &self,
        identity: &Identity,
        post_id: i64,
        req: PostRequest,
    ) -> Result<Post> {
        check_permission(identity, Operation::Update)?;
        let post = self.get_post(post_id).await?;
        authorize(identity, &post, Operation::Update)?;
        req.validate()?;

        self.apply_changes(post_id, req.into()).await
    }

    /// Change some of a post's fields (PATCH)
    pub async fn partial_update_post(
        &self,
        identity: &Identity,
        post_id: i64,
        req: PostPatchRequest,
    ) -> Result<Post> {
        check_permission(identity, Operation::PartialUpdate)?;
        let post = self.get_post(post_id).await?;
        authorize(identity, &post, Operation::PartialUpdate)?;
        req.validate()?;

        self.apply_changes(post_id, req.into()).await
    }

    /// Delete a post
    pub async fn delete_post(&self, identity: &Identity, post_id: i64) -> Result<()> {
        check_permission(identity, Operation::Delete)?;
        let post = self.get_post(post_id).await?;
        authorize(identity, &post, Operation::Delete)?;

        if !self.store.delete_post(post_id).await? {
            return Err(AppError::NotFound(format!("Post {} not found", post_id)));
        }

        tracing::info!(post_id, user_id = %post.author_id, "post deleted");
        Ok(())
    }

    async fn apply_changes(&self, post_id: i64, changes: PostChanges) -> Result<Post> {
        if let Some(group) = changes.group {
            self.ensure_group(group).await?;
        }

        self.store
            .update_post(post_id, changes)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found", post_id)))
    }

    async fn ensure_group(&self, group: Option<i64>) -> Result<()> {
        let Some(group_id) = group else {
            return Ok(());
        };
        if self.store.find_group(group_id).await?.is_none() {
            return Err(AppError::validation(
                codes::INVALID,
                format!("group: Invalid pk \"{}\" - object does not exist.", group_id),
            ));
        }
        Ok(())
    }
}
