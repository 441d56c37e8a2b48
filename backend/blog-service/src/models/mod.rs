/// Data models for blog-service
///
/// Entities are returned by the store already joined with the owning user's
/// username, which is what the API renders in `author`, `user` and `following`.
/// Owner ids never appear in responses.
///
/// Request bodies deliberately carry no owner or parent fields: `author`, `post`
/// and `user` always come from the caller and the request path.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A registered user, owned by the external identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
}

/// A community that posts can be grouped into
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Group {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    #[serde(skip)]
    pub author_id: Uuid,
    /// Author username
    pub author: String,
    pub image: Option<String>,
    pub group: Option<i64>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    #[serde(skip)]
    pub author_id: Uuid,
    /// Author username
    pub author: String,
    pub post: i64,
    pub text: String,
    pub created: DateTime<Utc>,
}

/// Follow edge: `user` follows `following`
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Follow {
    pub id: i64,
    #[serde(skip)]
    pub user_id: Uuid,
    pub user: String,
    #[serde(skip)]
    pub following_id: Uuid,
    pub following: String,
}

// =====================================================================
// Store inputs
// =====================================================================

#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: Uuid,
    pub text: String,
    pub image: Option<String>,
    pub group: Option<i64>,
}

/// Field changes applied to a post. `None` leaves the field untouched;
/// `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub text: Option<String>,
    pub image: Option<Option<String>>,
    pub group: Option<Option<i64>>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: i64,
    pub author_id: Uuid,
    pub text: String,
}

// =====================================================================
// Request bodies
// =====================================================================

/// Body of `POST /posts/` and `PUT /posts/{id}/`
#[derive(Debug, Deserialize, Validate)]
pub struct PostRequest {
    #[validate(length(min = 1, code = "blank", message = "This field may not be blank."))]
    pub text: String,
    #[serde(default, deserialize_with = "nullable")]
    pub image: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub group: Option<Option<i64>>,
}

/// Body of `PATCH /posts/{id}/`
#[derive(Debug, Default, Deserialize, Validate)]
pub struct PostPatchRequest {
    #[validate(length(min = 1, code = "blank", message = "This field may not be blank."))]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub image: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub group: Option<Option<i64>>,
}

impl From<PostRequest> for PostChanges {
    fn from(req: PostRequest) -> Self {
        Self {
            text: Some(req.text),
            image: req.image,
            group: req.group,
        }
    }
}

impl From<PostPatchRequest> for PostChanges {
    fn from(req: PostPatchRequest) -> Self {
        Self {
            text: req.text,
            image: req.image,
            group: req.group,
        }
    }
}

/// Body of `POST /comments/` and `PUT /comments/{id}/`
#[derive(Debug, Deserialize, Validate)]
pub struct CommentRequest {
    #[validate(length(min = 1, code = "blank", message = "This field may not be blank."))]
    pub text: String,
}

/// Body of `PATCH /comments/{id}/`
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CommentPatchRequest {
    #[validate(length(min = 1, code = "blank", message = "This field may not be blank."))]
    pub text: Option<String>,
}

/// Body of `POST /follow/`
#[derive(Debug, Deserialize, Validate)]
pub struct FollowRequest {
    /// Username of the user to follow
    #[validate(length(min = 1, code = "blank", message = "This field may not be blank."))]
    pub following: String,
}

/// Distinguishes an absent field from an explicit `null`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
