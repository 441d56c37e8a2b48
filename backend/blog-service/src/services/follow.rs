use crate::db::{Store, StoreError};
use crate::error::{AppError, Result};
use crate::middleware::{check_permission, require_caller, Identity, Operation};
use crate::models::{Follow, FollowRequest};
use crate::services::{register_caller, FollowValidator};
use std::sync::Arc;
use validator::Validate;

/// Follow service. Every operation acts on the caller's own edges and needs an
/// authenticated caller, reads included.
#[derive(Clone)]
pub struct FollowService {
    store: Arc<dyn Store>,
}

impl FollowService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Edges where the caller is the follower, optionally filtered by a
    /// substring of the followed username.
    pub async fn list_follows(
        &self,
        identity: &Identity,
        search: Option<&str>,
    ) -> Result<Vec<Follow>> {
        let caller = require_caller(identity)?;
        register_caller(self.store.as_ref(), caller).await?;
        let search = search.map(str::trim).filter(|s| !s.is_empty());

        Ok(self.store.list_follows(caller.id, search).await?)
    }

    /// Start following the user named in the request body.
    pub async fn create_follow(&self, identity: &Identity, req: FollowRequest) -> Result<Follow> {
        check_permission(identity, Operation::Create)?;
        let caller = require_caller(identity)?;
        req.validate()?;
        register_caller(self.store.as_ref(), caller).await?;

        let target = self
            .store
            .find_user_by_username(&req.following)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User '{}' does not exist", req.following)))?;

        FollowValidator::new(self.store.as_ref())
            .validate_follow(caller, &target)
            .await?;

        let follow = self
            .store
            .insert_follow(caller.id, target.id)
            .await
            .map_err(|err| match err {
                // lost a race with an identical request
                StoreError::UniqueViolation(_) => AppError::duplicate_follow(),
                StoreError::CheckViolation(_) => AppError::self_follow(),
                other => other.into(),
            })?;

        tracing::info!(
            follow_id = follow.id,
            user_id = %caller.id,
            following_id = %target.id,
            "follow created"
        );
        Ok(follow)
    }
}
