/// Business logic layer for blog-service
///
/// Each service composes the caller's identity, the store and the ownership
/// policy:
/// - Post service: post lifecycle, owner-only writes
/// - Group service: read-only communities
/// - Comment service: comments scoped to their parent post
/// - Follow service: the caller's own follow edges, guarded by `FollowValidator`
pub mod comments;
pub mod follow;
pub mod follow_validator;
pub mod groups;
pub mod posts;

// Re-export commonly used services
pub use comments::CommentService;
pub use follow::FollowService;
pub use follow_validator::FollowValidator;
pub use groups::GroupService;
pub use posts::PostService;

use crate::db::{Store, StoreError};
use crate::error::{AppError, Result};
use crate::middleware::Caller;

/// Mirrors the authenticated caller into the user table so it can own rows
/// and be found as a follow target.
pub(crate) async fn register_caller(store: &dyn Store, caller: &Caller) -> Result<()> {
    store
        .ensure_user(caller.id, &caller.username)
        .await
        .map_err(|err| match err {
            StoreError::UniqueViolation(_) => AppError::Unauthorized(format!(
                "Username '{}' belongs to another account",
                caller.username
            )),
            other => other.into(),
        })?;
    Ok(())
}
