//! Comment endpoints.

use actix_web::{HttpResponse, web};

use forum_core::domain::NewComment;
use forum_core::error::RepoError;
use forum_shared::dto::{CreateCommentRequest, CreateCommentResponse};

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// POST /api/comment/create
pub async fn create_comment(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<CreateCommentRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    if req.data.trim().is_empty() {
        return Err(AppError::BadRequest("comment text is required".to_string()));
    }

    let comment_id = state
        .comments
        .create(NewComment {
            author: identity.into_inner(),
            post_id: req.post_id,
            data: req.data,
        })
        .await
        .map_err(|e| match e {
            RepoError::NotFound => AppError::NotFound("post not found".to_string()),
            other => other.into(),
        })?;

    Ok(HttpResponse::Ok().json(CreateCommentResponse { comment_id }))
}
