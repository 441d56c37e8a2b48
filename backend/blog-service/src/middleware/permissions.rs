/// Authorization module for blog-service
///
/// Ownership-based permission checks for posts, comments and follows. Reads
/// are open to everyone; writes need an authenticated caller, and writes to an
/// existing resource need that caller to own it.
use uuid::Uuid;

use super::{Caller, Identity};
use crate::error::AppError;
use crate::models::{Comment, Follow, Post};

/// Result type for permission checks
pub type PermissionResult = Result<(), AppError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Retrieve,
    Create,
    Update,
    PartialUpdate,
    Delete,
}

impl Operation {
    pub fn is_read(self) -> bool {
        matches!(self, Operation::List | Operation::Retrieve)
    }
}

/// A resource with a single owning user
pub trait Owned {
    fn owner_id(&self) -> Uuid;
}

impl Owned for Post {
    fn owner_id(&self) -> Uuid {
        self.author_id
    }
}

impl Owned for Comment {
    fn owner_id(&self) -> Uuid {
        self.author_id
    }
}

impl Owned for Follow {
    fn owner_id(&self) -> Uuid {
        self.user_id
    }
}

/// Returns the caller, or `Unauthorized` for anonymous requests.
pub fn require_caller(identity: &Identity) -> Result<&Caller, AppError> {
    identity.caller().ok_or_else(|| {
        AppError::Unauthorized("Authentication credentials were not provided".to_string())
    })
}

/// Request-level check, made before any resource is loaded
pub fn check_permission(identity: &Identity, op: Operation) -> PermissionResult {
    if op.is_read() {
        return Ok(());
    }
    require_caller(identity).map(|_| ())
}

/// Object-level check against a loaded resource
pub fn check_object_permission<R: Owned + ?Sized>(
    identity: &Identity,
    resource: &R,
    op: Operation,
) -> PermissionResult {
    if op.is_read() {
        return Ok(());
    }
    let caller = require_caller(identity)?;
    if caller.id == resource.owner_id() {
        Ok(())
    } else {
        tracing::debug!(
            user_id = %caller.id,
            owner_id = %resource.owner_id(),
            ?op,
            "ownership check denied"
        );
        Err(AppError::Forbidden(
            "You don't have permission to modify this resource".to_string(),
        ))
    }
}

/// Full check for an operation on an existing resource.
pub fn authorize<R: Owned + ?Sized>(
    identity: &Identity,
    resource: &R,
    op: Operation,
) -> PermissionResult {
    check_permission(identity, op)?;
    check_object_permission(identity, resource, op)
}
