/// Group handlers - read-only; no write routes are registered for groups
use crate::error::Result;
use crate::middleware::Identity;
use crate::services::GroupService;
use crate::AppState;
use actix_web::{web, HttpResponse};

pub async fn list_groups(state: web::Data<AppState>, _identity: Identity) -> Result<HttpResponse> {
    let groups = GroupService::new(state.store.clone()).list_groups().await?;
    Ok(HttpResponse::Ok().json(groups))
}

pub async fn get_group(
    state: web::Data<AppState>,
    _identity: Identity,
    group_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let group = GroupService::new(state.store.clone())
        .get_group(*group_id)
        .await?;
    Ok(HttpResponse::Ok().json(group))
}
