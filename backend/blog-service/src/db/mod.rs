/// Database access layer
///
/// This module provides:
/// - The `Store` trait the services are written against
/// - `MemoryStore`: process-local tables, used by tests and database-less runs
/// - `PgStore`: PostgreSQL repositories backed by sqlx
use crate::models::{
    Comment, Follow, Group, NewComment, NewPost, Post, PostChanges, User,
};
use thiserror::Error;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Error, Debug)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// A foreign key points at a row that does not exist
    #[error("{0} does not exist")]
    MissingReference(String),

    /// A check constraint rejected the write
    #[error("check constraint violated: {0}")]
    CheckViolation(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Limit/offset window over a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: i64,
    pub offset: i64,
}

/// Trait defining persistence for the blog entities.
/// Both `MemoryStore` and `PgStore` implement this.
///
/// Comment lookups always take the parent post id: a comment is only visible
/// through the post it belongs to.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    // Users
    /// Records an authenticated caller, refreshing the stored username.
    /// Users are issued by the identity provider and first seen here.
    async fn ensure_user(&self, user_id: Uuid, username: &str) -> StoreResult<User>;
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    // Groups
    async fn list_groups(&self) -> StoreResult<Vec<Group>>;
    async fn find_group(&self, group_id: i64) -> StoreResult<Option<Group>>;

    // Posts
    /// Posts ordered by id; `None` returns every post.
    async fn list_posts(&self, page: Option<PageRequest>) -> StoreResult<Vec<Post>>;
    async fn count_posts(&self) -> StoreResult<i64>;
    async fn find_post(&self, post_id: i64) -> StoreResult<Option<Post>>;
    async fn insert_post(&self, post: NewPost) -> StoreResult<Post>;
    async fn update_post(&self, post_id: i64, changes: PostChanges)
        -> StoreResult<Option<Post>>;
    /// Removes the post together with its comments.
    async fn delete_post(&self, post_id: i64) -> StoreResult<bool>;

    // Comments
    async fn list_comments(&self, post_id: i64) -> StoreResult<Vec<Comment>>;
    async fn find_comment(&self, post_id: i64, comment_id: i64)
        -> StoreResult<Option<Comment>>;
    async fn insert_comment(&self, comment: NewComment) -> StoreResult<Comment>;
    async fn update_comment(
        &self,
        post_id: i64,
        comment_id: i64,
        text: &str,
    ) -> StoreResult<Option<Comment>>;
    async fn delete_comment(&self, post_id: i64, comment_id: i64) -> StoreResult<bool>;

    // Follows
    /// Edges where `user == user_id`, optionally narrowed to followed usernames
    /// containing `search` (case-insensitive).
    async fn list_follows(&self, user_id: Uuid, search: Option<&str>)
        -> StoreResult<Vec<Follow>>;
    async fn follow_exists(&self, user_id: Uuid, following_id: Uuid) -> StoreResult<bool>;
    /// Fails with `UniqueViolation` when the pair already exists.
    async fn insert_follow(&self, user_id: Uuid, following_id: Uuid) -> StoreResult<Follow>;
}
