/// Post handlers - HTTP endpoints for post operations
use crate::db::PageRequest;
use crate::error::Result;
use crate::handlers::{json_body, JsonBody};
use crate::middleware::{check_permission, Identity, Operation};
use crate::models::{Post, PostPatchRequest, PostRequest};
use crate::services::PostService;
use crate::AppState;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

/// Pagination query parameters
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Limit/offset page of posts
#[derive(Debug, Serialize)]
pub struct PostPage {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<Post>,
}

fn page_link(path: &str, limit: i64, offset: i64) -> String {
    if offset <= 0 {
        format!("{}?limit={}", path, limit)
    } else {
        format!("{}?limit={}&offset={}", path, limit, offset)
    }
}

/// List posts; paginated when a positive `limit` is given
pub async fn list_posts(
    state: web::Data<AppState>,
    _identity: Identity,
    req: HttpRequest,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    let service = PostService::new(state.store.clone());

    // A missing or non-positive limit means no paging.
    let Some(limit) = query.limit.filter(|&l| l > 0) else {
        let posts = service.list_posts(None).await?;
        return Ok(HttpResponse::Ok().json(posts));
    };
    let limit = limit.min(state.pagination.max_limit);

    let count = service.count_posts().await?;
    let offset = query.offset.unwrap_or(0).clamp(0, count);
    let results = service
        .list_posts(Some(PageRequest { limit, offset }))
        .await?;

    let path = req.path();
    let next = (offset.saturating_add(limit) < count)
        .then(|| page_link(path, limit, offset + limit));
    let previous = (offset > 0).then(|| page_link(path, limit, (offset - limit).max(0)));

    Ok(HttpResponse::Ok().json(PostPage {
        count,
        next,
        previous,
        results,
    }))
}

/// Get a post by ID
pub async fn get_post(
    state: web::Data<AppState>,
    _identity: Identity,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let service = PostService::new(state.store.clone());
    let post = service.get_post(*post_id).await?;
    Ok(HttpResponse::Ok().json(post))
}

/// Create a new post
pub async fn create_post(
    state: web::Data<AppState>,
    identity: Identity,
    req: JsonBody<PostRequest>,
) -> Result<HttpResponse> {
    check_permission(&identity, Operation::Create)?;
    let req = json_body(req)?;

    let service = PostService::new(state.store.clone());
    let post = service.create_post(&identity, req).await?;
    Ok(HttpResponse::Created().json(post))
}

/// Replace a post
pub async fn update_post(
    state: web::Data<AppState>,
    identity: Identity,
    post_id: web::Path<i64>,
    req: JsonBody<PostRequest>,
) -> Result<HttpResponse> {
    check_permission(&identity, Operation::Update)?;
    let req = json_body(req)?;

    let service = PostService::new(state.store.clone());
    let post = service
        .update_post(&identity, *post_id, req)
        .await?;
    Ok(HttpResponse::Ok().json(post))
}

/// Patch a post
pub async fn partial_update_post(
    state: web::Data<AppState>,
    identity: Identity,
    post_id: web::Path<i64>,
    req: JsonBody<PostPatchRequest>,
) -> Result<HttpResponse> {
    check_permission(&identity, Operation::PartialUpdate)?;
    let req = json_body(req)?;

    let service = PostService::new(state.store.clone());
    let post = service
        .partial_update_post(&identity, *post_id, req)
        .await?;
    Ok(HttpResponse::Ok().json(post))
}

/// Delete a post
pub async fn delete_post(
    state: web::Data<AppState>,
    identity: Identity,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let service = PostService::new(state.store.clone());
    service.delete_post(&identity, *post_id).await?;
    Ok(HttpResponse::NoContent().finish())
}
