/// Comment handlers - HTTP endpoints nested under `/posts/{post_id}/comments/`
use crate::error::Result;
use crate::handlers::{json_body, JsonBody};
use crate::middleware::{check_permission, Identity, Operation};
use crate::models::{CommentPatchRequest, CommentRequest};
use crate::services::CommentService;
use crate::AppState;
use actix_web::{web, HttpResponse};

/// Get comments for a post
pub async fn get_post_comments(
    state: web::Data<AppState>,
    _identity: Identity,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let service = CommentService::new(state.store.clone());
    let comments = service.get_post_comments(*post_id).await?;
    Ok(HttpResponse::Ok().json(comments))
}

/// Create a new comment
pub async fn create_comment(
    state: web::Data<AppState>,
    identity: Identity,
    post_id: web::Path<i64>,
    req: JsonBody<CommentRequest>,
) -> Result<HttpResponse> {
    check_permission(&identity, Operation::Create)?;
    let req = json_body(req)?;

    let service = CommentService::new(state.store.clone());
    let comment = service
        .create_comment(&identity, *post_id, req)
        .await?;
    Ok(HttpResponse::Created().json(comment))
}

/// Get a single comment
pub async fn get_comment(
    state: web::Data<AppState>,
    _identity: Identity,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    let service = CommentService::new(state.store.clone());
    let comment = service.get_comment(post_id, comment_id).await?;
    Ok(HttpResponse::Ok().json(comment))
}

/// Replace a comment
pub async fn update_comment(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<(i64, i64)>,
    req: JsonBody<CommentRequest>,
) -> Result<HttpResponse> {
    check_permission(&identity, Operation::Update)?;
    let req = json_body(req)?;

    let (post_id, comment_id) = path.into_inner();
    let service = CommentService::new(state.store.clone());
    let comment = service
        .update_comment(&identity, post_id, comment_id, req)
        .await?;
    Ok(HttpResponse::Ok().json(comment))
}

/// Patch a comment
pub async fn partial_update_comment(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<(i64, i64)>,
    req: JsonBody<CommentPatchRequest>,
) -> Result<HttpResponse> {
    check_permission(&identity, Operation::PartialUpdate)?;
    let req = json_body(req)?;

    let (post_id, comment_id) = path.into_inner();
    let service = CommentService::new(state.store.clone());
    let comment = service
        .partial_update_comment(&identity, post_id, comment_id, req)
        .await?;
    Ok(HttpResponse::Ok().json(comment))
}

/// Delete a comment
pub async fn delete_comment(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    let service = CommentService::new(state.store.clone());
    service
        .delete_comment(&identity, post_id, comment_id)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
