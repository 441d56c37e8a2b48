/// HTTP handlers for blog endpoints
///
/// This module contains handlers for:
/// - Posts: list, create, read, replace, patch, delete
/// - Groups: list and read only
/// - Comments: the same operations, always nested under a post
/// - Follow: list and create the caller's own follow edges
///
/// `configure` mounts everything under `/api/v1`.
pub mod comments;
pub mod follow;
pub mod groups;
pub mod posts;

use crate::error::{codes, AppError, Result};
use actix_web::{web, HttpResponse};

/// Maps JSON body failures (bad syntax, missing or mistyped fields) to a 400
/// with the same body shape as every other error.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let (code, message) = match &err {
            actix_web::error::JsonPayloadError::Deserialize(e) if e.is_data() => {
                let message = e.to_string();
                let code = if message.starts_with("missing field") {
                    codes::REQUIRED
                } else {
                    codes::INVALID
                };
                (code, message)
            }
            other => (codes::INVALID, other.to_string()),
        };
        AppError::validation(code, message).into()
    })
}

/// A JSON body whose extraction failure is held back until the caller has
/// passed the request-level permission check.
pub type JsonBody<T> = std::result::Result<web::Json<T>, actix_web::Error>;

/// Unwraps a deferred body, recovering the `AppError` built by `json_config`.
pub fn json_body<T>(body: JsonBody<T>) -> Result<T> {
    body.map(web::Json::into_inner).map_err(|err| {
        err.as_error::<AppError>()
            .cloned()
            .unwrap_or_else(|| AppError::validation(codes::INVALID, err.to_string()))
    })
}

/// Liveness probe
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Register all API routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/api/v1/health/", web::get().to(health))
        .service(
            web::scope("/api/v1")
                .service(
                    web::resource("/posts/")
                        .route(web::get().to(posts::list_posts))
                        .route(web::post().to(posts::create_post)),
                )
                .service(
                    web::resource("/posts/{post_id}/")
                        .route(web::get().to(posts::get_post))
                        .route(web::put().to(posts::update_post))
                        .route(web::patch().to(posts::partial_update_post))
                        .route(web::delete().to(posts::delete_post)),
                )
                .service(
                    web::resource("/posts/{post_id}/comments/")
                        .route(web::get().to(comments::get_post_comments))
                        .route(web::post().to(comments::create_comment)),
                )
                .service(
                    web::resource("/posts/{post_id}/comments/{comment_id}/")
                        .route(web::get().to(comments::get_comment))
                        .route(web::put().to(comments::update_comment))
                        .route(web::patch().to(comments::partial_update_comment))
                        .route(web::delete().to(comments::delete_comment)),
                )
                .service(web::resource("/groups/").route(web::get().to(groups::list_groups)))
                .service(
                    web::resource("/groups/{group_id}/").route(web::get().to(groups::get_group)),
                )
                .service(
                    web::resource("/follow/")
                        .route(web::get().to(follow::list_follows))
                        .route(web::post().to(follow::create_follow)),
                ),
        );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FollowRequest;

    #[test]
    fn deferred_body_keeps_its_validation_code() {
        let failed: JsonBody<FollowRequest> =
            Err(AppError::validation(codes::REQUIRED, "missing field `following`").into());
        let err = json_body(failed).unwrap_err();
        assert_eq!(err.code(), Some(codes::REQUIRED));
    }
}
