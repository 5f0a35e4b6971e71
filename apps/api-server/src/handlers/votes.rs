//! Vote endpoint.

use actix_web::{HttpResponse, web};

use forum_core::domain::VoteValue;
use forum_shared::dto::VoteRequest;

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::observability::RequestId;
use crate::state::AppState;

/// POST|PUT /api/post/vote
///
/// Toggles the caller's vote. The engine runs under the request timeout;
/// if it fires, the open transaction is dropped and rolled back.
pub async fn vote(
    state: web::Data<AppState>,
    identity: Identity,
    request_id: RequestId,
    body: web::Json<VoteRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let voter = identity.into_inner();

    if req.user_id.is_some_and(|claimed| claimed != voter.user_id) {
        tracing::warn!(
            request_id = %request_id.as_str(),
            user_id = voter.user_id,
            claimed = ?req.user_id,
            "Vote body names another user"
        );
        return Err(AppError::Unauthorized(
            "user_id does not match the authenticated user".to_string(),
        ));
    }

    let value = VoteValue::try_from(req.vote)?;

    let outcome = tokio::time::timeout(
        state.request_timeout,
        state.votes.apply_vote(&voter, req.post_id, value),
    )
    .await
    .map_err(|_| AppError::Internal(format!("vote on post {} timed out", req.post_id)))??;

    tracing::info!(
        request_id = %request_id.as_str(),
        user_id = voter.user_id,
        post_id = req.post_id,
        ?outcome,
        "Vote applied"
    );

    Ok(HttpResponse::Ok().finish())
}
