//! Post endpoints.

use actix_web::{HttpResponse, web};

use forum_core::domain::{NewPost, Page, PostAggregate, PostQuery, VoteValue};
use forum_shared::dto::{
    CommentResponse, CreatePostRequest, CreatePostResponse, PageParams, PostResponse,
};

use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

const MAX_PAGE_SIZE: u64 = 100;

fn post_response(aggregate: PostAggregate) -> PostResponse {
    PostResponse {
        post_id: aggregate.post.id,
        user_id: aggregate.post.user_id,
        username: aggregate.post.username,
        title: aggregate.post.title,
        data: aggregate.post.data,
        likes: aggregate.likes,
        dislikes: aggregate.dislikes,
        vote_status: aggregate.viewer_vote.status_code(),
        comments: aggregate
            .comments
            .into_iter()
            .map(|c| CommentResponse {
                comment_id: c.id,
                post_id: c.post_id,
                user_id: c.user_id,
                username: c.username,
                data: c.data,
            })
            .collect(),
        comments_count: aggregate.comments_count,
        categories: aggregate.categories,
    }
}

fn post_id(raw: &str) -> AppResult<i64> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("invalid post id: {}", raw)))
}

/// Invalid and negative user ids name no user.
fn user_id(raw: &str) -> AppResult<i64> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id >= 0)
        .ok_or_else(|| AppError::NotFound("user not found".to_string()))
}

async fn list(state: &AppState, query: PostQuery) -> AppResult<Vec<PostResponse>> {
    let aggregates = state.aggregator.list(&query).await?;
    Ok(aggregates.into_iter().map(post_response).collect())
}

/// GET /api/post/{id}
pub async fn get_post(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let post_id = post_id(&path)?;
    let aggregate = state
        .aggregator
        .aggregate_for_viewer(post_id, viewer.0.as_ref())
        .await?;

    Ok(HttpResponse::Ok().json(post_response(aggregate)))
}

/// GET /api/posts/{category}
pub async fn posts_by_category(
    state: web::Data<AppState>,
    path: web::Path<String>,
    params: web::Query<PageParams>,
) -> AppResult<HttpResponse> {
    let defaults = Page::default();
    let page = Page {
        limit: params.limit.unwrap_or(defaults.limit).min(MAX_PAGE_SIZE),
        offset: params.offset.unwrap_or(defaults.offset),
    };

    let posts = list(
        &state,
        PostQuery::Category {
            name: path.into_inner(),
            page,
        },
    )
    .await?;

    if posts.is_empty() {
        return Err(AppError::NotFound("posts not found".to_string()));
    }
    Ok(HttpResponse::Ok().json(posts))
}

/// GET /api/profile/posts/{user_id}
pub async fn posts_by_author(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let user_id = user_id(&path)?;
    let posts = list(&state, PostQuery::Author(user_id)).await?;
    Ok(HttpResponse::Ok().json(posts))
}

/// GET /api/profile/liked-posts/{user_id}
pub async fn liked_posts(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let user_id = user_id(&path)?;
    let posts = list(
        &state,
        PostQuery::VotedBy {
            user_id,
            value: VoteValue::Like,
        },
    )
    .await?;
    Ok(HttpResponse::Ok().json(posts))
}

/// GET /api/profile/disliked-posts/{user_id}
pub async fn disliked_posts(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let user_id = user_id(&path)?;
    let posts = list(
        &state,
        PostQuery::VotedBy {
            user_id,
            value: VoteValue::Dislike,
        },
    )
    .await?;
    Ok(HttpResponse::Ok().json(posts))
}

/// POST /api/post/create
pub async fn create_post(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<CreatePostRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    if req.title.trim().is_empty() || req.data.trim().is_empty() {
        return Err(AppError::BadRequest("title and data are required".to_string()));
    }

    let author = identity.into_inner();
    let user_id = author.user_id;
    let post_id = state
        .posts
        .create(NewPost::new(author, req.title, req.data, req.categories))
        .await?;

    tracing::info!(post_id, user_id, "Post created");
    Ok(HttpResponse::Ok().json(CreatePostResponse { post_id }))
}

/// DELETE /api/post/delete/{id}
pub async fn delete_post(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let post_id = post_id(&path)?;
    let user_id = identity.user().user_id;

    if !state.posts.delete(post_id, user_id).await? {
        return Err(AppError::NotFound("post not found".to_string()));
    }

    tracing::info!(post_id, user_id, "Post deleted");
    Ok(HttpResponse::Ok().finish())
}
