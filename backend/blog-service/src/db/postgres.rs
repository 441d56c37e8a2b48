/// PostgreSQL store
///
/// Joins every entity with `users` so rows come back with usernames already
/// resolved. Schema lives in `migrations/`; the `follows` table carries the
/// authoritative `UNIQUE (user_id, following_id)` constraint.
use super::{PageRequest, Store, StoreError, StoreResult};
use crate::models::{
    Comment, Follow, Group, NewComment, NewPost, Post, PostChanges, User,
};
use sqlx::PgPool;
use uuid::Uuid;

const POST_COLUMNS: &str = r#"
    p.id, p.text, p.pub_date, p.author_id, u.username AS author, p.image, p.group_id AS "group"
"#;

const COMMENT_COLUMNS: &str = r#"
    c.id, c.author_id, u.username AS author, c.post_id AS post, c.text, c.created
"#;

const FOLLOW_COLUMNS: &str = r#"
    f.id, f.user_id, u.username AS "user", f.following_id, t.username AS following
"#;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Translates constraint violations into store errors; everything else stays
/// a database error.
fn map_db_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        let constraint = db_err.constraint().unwrap_or_default().to_string();
        match db_err.code().as_deref() {
            Some("23505") => return StoreError::UniqueViolation(constraint),
            Some("23514") => return StoreError::CheckViolation(constraint),
            Some("23503") => {
                let what = if constraint.contains("group") {
                    "group"
                } else if constraint.contains("post_id") {
                    "post"
                } else {
                    "user"
                };
                return StoreError::MissingReference(what.to_string());
            }
            _ => {}
        }
    }
    StoreError::Database(err)
}

/// Escapes LIKE metacharacters so the search term matches literally.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

#[async_trait::async_trait]
impl Store for PgStore {
    async fn ensure_user(&self, user_id: Uuid, username: &str) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET username = EXCLUDED.username
            RETURNING id, username
            "#,
        )
        .bind(user_id)
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT id, username FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(user)
    }

    async fn list_groups(&self) -> StoreResult<Vec<Group>> {
        let groups = sqlx::query_as::<_, Group>(
            "SELECT id, title, slug, description FROM groups ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(groups)
    }

    async fn find_group(&self, group_id: i64) -> StoreResult<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT id, title, slug, description FROM groups WHERE id = $1",
        )
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(group)
    }

    async fn list_posts(&self, page: Option<PageRequest>) -> StoreResult<Vec<Post>> {
        // LIMIT NULL means no limit
        let (limit, offset) = match page {
            Some(p) => (Some(p.limit), p.offset),
            None => (None, 0),
        };

        let sql = format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts p
            JOIN users u ON u.id = p.author_id
            ORDER BY p.id
            LIMIT $1 OFFSET $2
            "#
        );
        let posts = sqlx::query_as::<_, Post>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(posts)
    }

    async fn count_posts(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(count)
    }

    async fn find_post(&self, post_id: i64) -> StoreResult<Option<Post>> {
        let sql = format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts p
            JOIN users u ON u.id = p.author_id
            WHERE p.id = $1
            "#
        );
        let post = sqlx::query_as::<_, Post>(&sql)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(post)
    }

    async fn insert_post(&self, post: NewPost) -> StoreResult<Post> {
        let sql = format!(
            r#"
            WITH p AS (
                INSERT INTO posts (author_id, text, image, group_id)
                VALUES ($1, $2, $3, $4)
                RETURNING *
            )
            SELECT {POST_COLUMNS}
            FROM p
            JOIN users u ON u.id = p.author_id
            "#
        );
        let created = sqlx::query_as::<_, Post>(&sql)
            .bind(post.author_id)
            .bind(post.text)
            .bind(post.image)
            .bind(post.group)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(created)
    }

    async fn update_post(
        &self,
        post_id: i64,
        changes: PostChanges,
    ) -> StoreResult<Option<Post>> {
        let sql = format!(
            r#"
            WITH p AS (
                UPDATE posts
                SET text = COALESCE($2, text),
                    image = CASE WHEN $3 THEN $4 ELSE image END,
                    group_id = CASE WHEN $5 THEN $6 ELSE group_id END
                WHERE id = $1
                RETURNING *
            )
            SELECT {POST_COLUMNS}
            FROM p
            JOIN users u ON u.id = p.author_id
            "#
        );
        let updated = sqlx::query_as::<_, Post>(&sql)
            .bind(post_id)
            .bind(changes.text)
            .bind(changes.image.is_some())
            .bind(changes.image.flatten())
            .bind(changes.group.is_some())
            .bind(changes.group.flatten())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(updated)
    }

    async fn delete_post(&self, post_id: i64) -> StoreResult<bool> {
        // comments go with it via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_comments(&self, post_id: i64) -> StoreResult<Vec<Comment>> {
        let sql = format!(
            r#"
            SELECT {COMMENT_COLUMNS}
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.post_id = $1
            ORDER BY c.id
            "#
        );
        let comments = sqlx::query_as::<_, Comment>(&sql)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(comments)
    }

    async fn find_comment(
        &self,
        post_id: i64,
        comment_id: i64,
    ) -> StoreResult<Option<Comment>> {
        let sql = format!(
            r#"
            SELECT {COMMENT_COLUMNS}
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.id = $1 AND c.post_id = $2
            "#
        );
        let comment = sqlx::query_as::<_, Comment>(&sql)
            .bind(comment_id)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(comment)
    }

    async fn insert_comment(&self, comment: NewComment) -> StoreResult<Comment> {
        let sql = format!(
            r#"
            WITH c AS (
                INSERT INTO comments (post_id, author_id, text)
                VALUES ($1, $2, $3)
                RETURNING *
            )
            SELECT {COMMENT_COLUMNS}
            FROM c
            JOIN users u ON u.id = c.author_id
            "#
        );
        let created = sqlx::query_as::<_, Comment>(&sql)
            .bind(comment.post_id)
            .bind(comment.author_id)
            .bind(comment.text)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(created)
    }

    async fn update_comment(
        &self,
        post_id: i64,
        comment_id: i64,
        text: &str,
    ) -> StoreResult<Option<Comment>> {
        let sql = format!(
            r#"
            WITH c AS (
                UPDATE comments
                SET text = $3
                WHERE id = $1 AND post_id = $2
                RETURNING *
            )
            SELECT {COMMENT_COLUMNS}
            FROM c
            JOIN users u ON u.id = c.author_id
            "#
        );
        let updated = sqlx::query_as::<_, Comment>(&sql)
            .bind(comment_id)
            .bind(post_id)
            .bind(text)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(updated)
    }

    async fn delete_comment(&self, post_id: i64, comment_id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1 AND post_id = $2")
            .bind(comment_id)
            .bind(post_id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_follows(
        &self,
        user_id: Uuid,
        search: Option<&str>,
    ) -> StoreResult<Vec<Follow>> {
        let sql = format!(
            r#"
            SELECT {FOLLOW_COLUMNS}
            FROM follows f
            JOIN users u ON u.id = f.user_id
            JOIN users t ON t.id = f.following_id
            WHERE f.user_id = $1
              AND ($2::text IS NULL OR t.username ILIKE $2 ESCAPE '\')
            ORDER BY f.id
            "#
        );
        let follows = sqlx::query_as::<_, Follow>(&sql)
            .bind(user_id)
            .bind(search.map(like_pattern))
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(follows)
    }

    async fn follow_exists(&self, user_id: Uuid, following_id: Uuid) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE user_id = $1 AND following_id = $2)",
        )
        .bind(user_id)
        .bind(following_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(exists)
    }

    async fn insert_follow(&self, user_id: Uuid, following_id: Uuid) -> StoreResult<Follow> {
        let sql = format!(
            r#"
            WITH f AS (
                INSERT INTO follows (user_id, following_id)
                VALUES ($1, $2)
                RETURNING *
            )
            SELECT {FOLLOW_COLUMNS}
            FROM f
            JOIN users u ON u.id = f.user_id
            JOIN users t ON t.id = f.following_id
            "#
        );
        let created = sqlx::query_as::<_, Follow>(&sql)
            .bind(user_id)
            .bind(following_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(created)
    }
}
