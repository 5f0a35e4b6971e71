//! Category endpoints.

use actix_web::{HttpResponse, web};

use forum_shared::dto::CategoryResponse;

use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// GET /api/categories
pub async fn list_categories(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let categories: Vec<CategoryResponse> = state
        .categories
        .list_all()
        .await?
        .into_iter()
        .map(|c| CategoryResponse {
            id: c.id,
            name: c.name,
            description: c.description,
        })
        .collect();

    if categories.is_empty() {
        return Err(AppError::NotFound("categories not found".to_string()));
    }
    Ok(HttpResponse::Ok().json(categories))
}
