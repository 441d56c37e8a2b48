/// Follow handlers - the caller's own follow edges
use crate::error::Result;
use crate::handlers::{json_body, JsonBody};
use crate::middleware::{check_permission, Identity, Operation};
use crate::models::FollowRequest;
use crate::services::FollowService;
use crate::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct FollowSearchParams {
    /// Substring of the followed username
    pub search: Option<String>,
}

pub async fn list_follows(
    state: web::Data<AppState>,
    identity: Identity,
    query: web::Query<FollowSearchParams>,
) -> Result<HttpResponse> {
    let service = FollowService::new(state.store.clone());
    let follows = service
        .list_follows(&identity, query.search.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(follows))
}

pub async fn create_follow(
    state: web::Data<AppState>,
    identity: Identity,
    req: JsonBody<FollowRequest>,
) -> Result<HttpResponse> {
    check_permission(&identity, Operation::Create)?;
    let req = json_body(req)?;

    let service = FollowService::new(state.store.clone());
    let follow = service.create_follow(&identity, req).await?;
    Ok(HttpResponse::Created().json(follow))
}
