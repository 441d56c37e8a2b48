/// Group service - read-only access to communities
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::Group;
use std::sync::Arc;

pub struct GroupService {
    store: Arc<dyn Store>,
}

impl GroupService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list_groups(&self) -> Result<Vec<Group>> {
        Ok(self.store.list_groups().await?)
    }

    pub async fn get_group(&self, group_id: i64) -> Result<Group> {
        self.store
            .find_group(group_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Group {} not found", group_id)))
    }
}
