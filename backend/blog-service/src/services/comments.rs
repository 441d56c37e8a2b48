/// Comment service - comments are always addressed through their parent post
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::middleware::{authorize, check_permission, require_caller, Identity, Operation};
use crate::models::{Comment, CommentPatchRequest, CommentRequest, NewComment, Post};
use crate::services::register_caller;
use std::sync::Arc;
use validator::Validate;

pub struct CommentService {
    store: Arc<dyn Store>,
}

impl CommentService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Resolve the post named in the request path.
    async fn resolve_post(&self, post_id: i64) -> Result<Post> {
        self.store
            .find_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found", post_id)))
    }

    async fn find_scoped(&self, post: &Post, comment_id: i64) -> Result<Comment> {
        self.store
            .find_comment(post.id, comment_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Comment {} not found on post {}",
                    comment_id, post.id
                ))
            })
    }

    /// Get comments for a post
    pub async fn get_post_comments(&self, post_id: i64) -> Result<Vec<Comment>> {
        let post = self.resolve_post(post_id).await?;
        Ok(self.store.list_comments(post.id).await?)
    }

    /// Get a single comment of a post
    pub async fn get_comment(&self, post_id: i64, comment_id: i64) -> Result<Comment> {
        let post = self.resolve_post(post_id).await?;
        self.find_scoped(&post, comment_id).await
    }

    /// Create a new comment on the path's post, authored by the caller
    pub async fn create_comment(
        &self,
        identity: &Identity,
        post_id: i64,
        req: CommentRequest,
    ) -> Result<Comment> {
        check_permission(identity, Operation::Create)?;
        let caller = require_caller(identity)?;
        let post = self.resolve_post(post_id).await?;
        req.validate()?;
        register_caller(self.store.as_ref(), caller).await?;

        let comment = self
            .store
            .insert_comment(NewComment {
                post_id: post.id,
                author_id: caller.id,
                text: req.text,
            })
            .await?;

        tracing::info!(
            comment_id = comment.id,
            post_id = post.id,
            user_id = %caller.id,
            "comment created"
        );
        Ok(comment)
    }

    /// Replace comment text (PUT)
    pub async fn update_comment(
        &self,
        identity: &Identity,
        post_id: i64,
        comment_id: i64,
        req: CommentRequest,
    ) -> Result<Comment> {
        self.change_text(identity, post_id, comment_id, Operation::Update, || {
            req.validate()?;
            Ok(Some(req.text.clone()))
        })
        .await
    }

    /// Change comment text if given (PATCH)
    pub async fn partial_update_comment(
        &self,
        identity: &Identity,
        post_id: i64,
        comment_id: i64,
        req: CommentPatchRequest,
    ) -> Result<Comment> {
        self.change_text(identity, post_id, comment_id, Operation::PartialUpdate, || {
            req.validate()?;
            Ok(req.text.clone())
        })
        .await
    }

    /// Delete a comment
    pub async fn delete_comment(
        &self,
        identity: &Identity,
        post_id: i64,
        comment_id: i64,
    ) -> Result<()> {
        check_permission(identity, Operation::Delete)?;
        let post = self.resolve_post(post_id).await?;
        let comment = self.find_scoped(&post, comment_id).await?;
        authorize(identity, &comment, Operation::Delete)?;

        if !self.store.delete_comment(post.id, comment.id).await? {
            return Err(AppError::NotFound(format!("Comment {} not found", comment_id)));
        }

        tracing::info!(comment_id, post_id, "comment deleted");
        Ok(())
    }

    async fn change_text<F>(
        &self,
        identity: &Identity,
        post_id: i64,
        comment_id: i64,
        op: Operation,
        text: F,
    ) -> Result<Comment>
    where
        F: FnOnce() -> Result<Option<String>>,
    {
        check_permission(identity, op)?;
        let post = self.resolve_post(post_id).await?;
        let comment = self.find_scoped(&post, comment_id).await?;
        authorize(identity, &comment, op)?;

        let Some(text) = text()? else {
            return Ok(comment);
        };

        self.store
            .update_comment(post.id, comment.id, &text)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment {} not found", comment_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::middleware::Caller;
    use crate::models::NewPost;

    struct Fixture {
        service: CommentService,
        alice: Identity,
        bob: Identity,
        first_post: i64,
        second_post: i64,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let alice = store.insert_user("alice").await;
        let bob = store.insert_user("bob").await;

        let mut posts = Vec::new();
        for text in ["first", "second"] {
            let post = store
                .insert_post(NewPost {
                    author_id: alice.id,
                    text: text.into(),
                    image: None,
                    group: None,
                })
                .await
                .unwrap();
            posts.push(post.id);
        }

        Fixture {
            service: CommentService::new(store),
            alice: Identity::from(Caller {
                id: alice.id,
                username: alice.username,
            }),
            bob: Identity::from(Caller {
                id: bob.id,
                username: bob.username,
            }),
            first_post: posts[0],
            second_post: posts[1],
        }
    }

    fn body(text: &str) -> CommentRequest {
        CommentRequest {
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn comment_belongs_to_path_post_and_caller() {
        let f = fixture().await;
        let comment = f
            .service
            .create_comment(&f.bob, f.first_post, body("nice"))
            .await
            .unwrap();
        assert_eq!(comment.post, f.first_post);
        assert_eq!(comment.author, "bob");
    }

    #[tokio::test]
    async fn listing_never_crosses_posts() {
        let f = fixture().await;
        f.service
            .create_comment(&f.alice, f.first_post, body("on first"))
            .await
            .unwrap();
        f.service
            .create_comment(&f.alice, f.second_post, body("on second"))
            .await
            .unwrap();

        let listed = f.service.get_post_comments(f.first_post).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed.iter().all(|c| c.post == f.first_post));
    }

    #[tokio::test]
    async fn foreign_post_scope_hides_comment() {
        let f = fixture().await;
        let comment = f
            .service
            .create_comment(&f.alice, f.first_post, body("mine"))
            .await
            .unwrap();

        assert!(matches!(
            f.service.get_comment(f.second_post, comment.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            f.service
                .update_comment(&f.alice, f.second_post, comment.id, body("moved"))
                .await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            f.service
                .delete_comment(&f.alice, f.second_post, comment.id)
                .await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn missing_parent_post_is_not_found() {
        let f = fixture().await;
        assert!(matches!(
            f.service.create_comment(&f.alice, 999, body("x")).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            f.service.get_post_comments(999).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn only_author_changes_comment() {
        let f = fixture().await;
        let comment = f
            .service
            .create_comment(&f.alice, f.first_post, body("original"))
            .await
            .unwrap();

        assert!(matches!(
            f.service
                .update_comment(&f.bob, f.first_post, comment.id, body("edited"))
                .await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            f.service
                .delete_comment(&Identity::Anonymous, f.first_post, comment.id)
                .await,
            Err(AppError::Unauthorized(_))
        ));

        let updated = f
            .service
            .partial_update_comment(
                &f.alice,
                f.first_post,
                comment.id,
                CommentPatchRequest {
                    text: Some("edited".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.text, "edited");
    }
}
