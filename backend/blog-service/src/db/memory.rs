/// In-process store used by tests and by runs without `DATABASE_URL`
use super::{PageRequest, Store, StoreError, StoreResult};
use crate::models::{
    Comment, Follow, Group, NewComment, NewPost, Post, PostChanges, User,
};
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct PostRow {
    id: i64,
    text: String,
    pub_date: chrono::DateTime<Utc>,
    author_id: Uuid,
    image: Option<String>,
    group: Option<i64>,
}

#[derive(Debug, Clone)]
struct CommentRow {
    id: i64,
    post_id: i64,
    author_id: Uuid,
    text: String,
    created: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
struct FollowRow {
    id: i64,
    user_id: Uuid,
    following_id: Uuid,
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<Uuid, User>,
    groups: BTreeMap<i64, Group>,
    posts: BTreeMap<i64, PostRow>,
    comments: BTreeMap<i64, CommentRow>,
    follows: BTreeMap<i64, FollowRow>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn username(&self, user_id: Uuid) -> StoreResult<String> {
        self.users
            .get(&user_id)
            .map(|u| u.username.clone())
            .ok_or_else(|| StoreError::MissingReference("user".to_string()))
    }

    fn post(&self, row: &PostRow) -> StoreResult<Post> {
        Ok(Post {
            id: row.id,
            text: row.text.clone(),
            pub_date: row.pub_date,
            author_id: row.author_id,
            author: self.username(row.author_id)?,
            image: row.image.clone(),
            group: row.group,
        })
    }

    fn comment(&self, row: &CommentRow) -> StoreResult<Comment> {
        Ok(Comment {
            id: row.id,
            author_id: row.author_id,
            author: self.username(row.author_id)?,
            post: row.post_id,
            text: row.text.clone(),
            created: row.created,
        })
    }

    fn follow(&self, row: &FollowRow) -> StoreResult<Follow> {
        Ok(Follow {
            id: row.id,
            user_id: row.user_id,
            user: self.username(row.user_id)?,
            following_id: row.following_id,
            following: self.username(row.following_id)?,
        })
    }

    fn check_group(&self, group: Option<i64>) -> StoreResult<()> {
        match group {
            Some(id) if !self.groups.contains_key(&id) => {
                Err(StoreError::MissingReference("group".to_string()))
            }
            _ => Ok(()),
        }
    }
}

/// `BTreeMap` tables behind a single `RwLock`, with ids shared across tables
/// and handed out in increasing order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user. Users are provisioned by the identity provider, so
    /// this is not part of the `Store` surface.
    pub async fn insert_user(&self, username: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
        };
        self.tables
            .write()
            .await
            .users
            .insert(user.id, user.clone());
        user
    }

    /// Seeds a group. Groups are read-only through the API.
    pub async fn insert_group(&self, title: &str, slug: &str, description: &str) -> Group {
        let mut tables = self.tables.write().await;
        let group = Group {
            id: tables.next_id(),
            title: title.to_string(),
            slug: slug.to_string(),
            description: description.to_string(),
        };
        tables.groups.insert(group.id, group.clone());
        group
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn ensure_user(&self, user_id: Uuid, username: &str) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|u| u.username == username && u.id != user_id)
        {
            return Err(StoreError::UniqueViolation("users_username_key".to_string()));
        }

        let user = User {
            id: user_id,
            username: username.to_string(),
        };
        tables.users.insert(user_id, user.clone());
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn list_groups(&self) -> StoreResult<Vec<Group>> {
        Ok(self.tables.read().await.groups.values().cloned().collect())
    }

    async fn find_group(&self, group_id: i64) -> StoreResult<Option<Group>> {
        Ok(self.tables.read().await.groups.get(&group_id).cloned())
    }

    async fn list_posts(&self, page: Option<PageRequest>) -> StoreResult<Vec<Post>> {
        let tables = self.tables.read().await;
        let (skip, take) = match page {
            Some(p) => (p.offset.max(0) as usize, p.limit.max(0) as usize),
            None => (0, usize::MAX),
        };
        tables
            .posts
            .values()
            .skip(skip)
            .take(take)
            .map(|row| tables.post(row))
            .collect()
    }

    async fn count_posts(&self) -> StoreResult<i64> {
        Ok(self.tables.read().await.posts.len() as i64)
    }

    async fn find_post(&self, post_id: i64) -> StoreResult<Option<Post>> {
        let tables = self.tables.read().await;
        tables.posts.get(&post_id).map(|row| tables.post(row)).transpose()
    }

    async fn insert_post(&self, post: NewPost) -> StoreResult<Post> {
        let mut tables = self.tables.write().await;
        tables.username(post.author_id)?;
        tables.check_group(post.group)?;

        let row = PostRow {
            id: tables.next_id(),
            text: post.text,
            pub_date: Utc::now(),
            author_id: post.author_id,
            image: post.image,
            group: post.group,
        };
        tables.posts.insert(row.id, row.clone());
        tables.post(&row)
    }

    async fn update_post(
        &self,
        post_id: i64,
        changes: PostChanges,
    ) -> StoreResult<Option<Post>> {
        let mut tables = self.tables.write().await;
        if let Some(group) = changes.group {
            tables.check_group(group)?;
        }

        let Some(row) = tables.posts.get_mut(&post_id) else {
            return Ok(None);
        };
        if let Some(text) = changes.text {
            row.text = text;
        }
        if let Some(image) = changes.image {
            row.image = image;
        }
        if let Some(group) = changes.group {
            row.group = group;
        }

        let row = row.clone();
        tables.post(&row).map(Some)
    }

    async fn delete_post(&self, post_id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.posts.remove(&post_id).is_none() {
            return Ok(false);
        }
        tables.comments.retain(|_, c| c.post_id != post_id);
        Ok(true)
    }

    async fn list_comments(&self, post_id: i64) -> StoreResult<Vec<Comment>> {
        let tables = self.tables.read().await;
        tables
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .map(|row| tables.comment(row))
            .collect()
    }

    async fn find_comment(
        &self,
        post_id: i64,
        comment_id: i64,
    ) -> StoreResult<Option<Comment>> {
        let tables = self.tables.read().await;
        tables
            .comments
            .get(&comment_id)
            .filter(|c| c.post_id == post_id)
            .map(|row| tables.comment(row))
            .transpose()
    }

    async fn insert_comment(&self, comment: NewComment) -> StoreResult<Comment> {
        let mut tables = self.tables.write().await;
        tables.username(comment.author_id)?;
        if !tables.posts.contains_key(&comment.post_id) {
            return Err(StoreError::MissingReference("post".to_string()));
        }

        let row = CommentRow {
            id: tables.next_id(),
            post_id: comment.post_id,
            author_id: comment.author_id,
            text: comment.text,
            created: Utc::now(),
        };
        tables.comments.insert(row.id, row.clone());
        tables.comment(&row)
    }

    async fn update_comment(
        &self,
        post_id: i64,
        comment_id: i64,
        text: &str,
    ) -> StoreResult<Option<Comment>> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables
            .comments
            .get_mut(&comment_id)
            .filter(|c| c.post_id == post_id)
        else {
            return Ok(None);
        };
        row.text = text.to_string();

        let row = row.clone();
        tables.comment(&row).map(Some)
    }

    async fn delete_comment(&self, post_id: i64, comment_id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let in_scope = tables
            .comments
            .get(&comment_id)
            .is_some_and(|c| c.post_id == post_id);
        if in_scope {
            tables.comments.remove(&comment_id);
        }
        Ok(in_scope)
    }

    async fn list_follows(
        &self,
        user_id: Uuid,
        search: Option<&str>,
    ) -> StoreResult<Vec<Follow>> {
        let tables = self.tables.read().await;
        let needle = search.map(str::to_lowercase);

        let mut follows = Vec::new();
        for row in tables.follows.values().filter(|f| f.user_id == user_id) {
            let follow = tables.follow(row)?;
            let matches = needle
                .as_deref()
                .map_or(true, |n| follow.following.to_lowercase().contains(n));
            if matches {
                follows.push(follow);
            }
        }
        Ok(follows)
    }

    async fn follow_exists(&self, user_id: Uuid, following_id: Uuid) -> StoreResult<bool> {
        Ok(self
            .tables
            .read()
            .await
            .follows
            .values()
            .any(|f| f.user_id == user_id && f.following_id == following_id))
    }

    async fn insert_follow(&self, user_id: Uuid, following_id: Uuid) -> StoreResult<Follow> {
        let mut tables = self.tables.write().await;
        tables.username(user_id)?;
        tables.username(following_id)?;

        if user_id == following_id {
            return Err(StoreError::CheckViolation("follows_no_self_follow".to_string()));
        }
        // Checked under the write lock, so concurrent inserts of one pair cannot both land.
        if tables
            .follows
            .values()
            .any(|f| f.user_id == user_id && f.following_id == following_id)
        {
            return Err(StoreError::UniqueViolation(
                "follows_user_following_key".to_string(),
            ));
        }

        let row = FollowRow {
            id: tables.next_id(),
            user_id,
            following_id,
        };
        tables.follows.insert(row.id, row);
        tables.follow(&row)
    }
}
