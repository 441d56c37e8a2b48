/// Follow relationship rules
///
/// Both rules run in a single pass: the pair-uniqueness lookup alone would let a
/// caller follow themselves while no edge exists yet.
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::middleware::Caller;
use crate::models::User;

pub struct FollowValidator<'a> {
    store: &'a dyn Store,
}

impl<'a> FollowValidator<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Checks that `caller` may start following `target`.
    ///
    /// The store's unique constraint stays the authoritative guard; this check
    /// only gives the caller a precise error before the insert.
    pub async fn validate_follow(&self, caller: &Caller, target: &User) -> Result<()> {
        if caller.id == target.id {
            return Err(AppError::self_follow());
        }

        if self.store.follow_exists(caller.id, target.id).await? {
            return Err(AppError::duplicate_follow());
        }

        Ok(())
    }
}
