//! HTTP handlers and route configuration.

mod categories;
mod comments;
mod health;
mod posts;
mod votes;

use actix_web::{HttpRequest, HttpResponse, error::InternalError, web};

use crate::middleware::error::AppError;

/// Fallback for known paths hit with an unsupported method.
async fn method_not_allowed(req: HttpRequest) -> HttpResponse {
    AppError::MethodNotAllowed.respond_to(&req)
}

/// Malformed JSON bodies are answered with 400 in the common error shape.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(|err, req| {
            let response = AppError::BadRequest(err.to_string()).respond_to(req);
            InternalError::from_response(err, response).into()
        })
}

/// Malformed query strings are answered with 400 in the common error shape.
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, req| {
        let response = AppError::BadRequest(err.to_string()).respond_to(req);
        InternalError::from_response(err, response).into()
    })
}

/// Configure all application routes.
///
/// Fixed paths under `/post` are registered before `/post/{id}`.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(
                web::resource("/health")
                    .route(web::get().to(health::health_check))
                    .default_service(web::to(method_not_allowed)),
            )
            .service(
                web::resource("/post/vote")
                    .route(web::post().to(votes::vote))
                    .route(web::put().to(votes::vote))
                    .default_service(web::to(method_not_allowed)),
            )
            .service(
                web::resource("/post/create")
                    .route(web::post().to(posts::create_post))
                    .default_service(web::to(method_not_allowed)),
            )
            .service(
                web::resource("/post/delete/{id}")
                    .route(web::delete().to(posts::delete_post))
                    .default_service(web::to(method_not_allowed)),
            )
            .service(
                web::resource("/post/{id}")
                    .route(web::get().to(posts::get_post))
                    .default_service(web::to(method_not_allowed)),
            )
            .service(
                web::resource("/posts/{category}")
                    .route(web::get().to(posts::posts_by_category))
                    .default_service(web::to(method_not_allowed)),
            )
            .service(
                web::resource("/profile/posts/{user_id}")
                    .route(web::get().to(posts::posts_by_author))
                    .default_service(web::to(method_not_allowed)),
            )
            .service(
                web::resource("/profile/liked-posts/{user_id}")
                    .route(web::get().to(posts::liked_posts))
                    .default_service(web::to(method_not_allowed)),
            )
            .service(
                web::resource("/profile/disliked-posts/{user_id}")
                    .route(web::get().to(posts::disliked_posts))
                    .default_service(web::to(method_not_allowed)),
            )
            .service(
                web::resource("/comment/create")
                    .route(web::post().to(comments::create_comment))
                    .default_service(web::to(method_not_allowed)),
            )
            .service(
                web::resource("/categories")
                    .route(web::get().to(categories::list_categories))
                    .default_service(web::to(method_not_allowed)),
            ),
    );
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use actix_web::{App, http::StatusCode, test, web};
    use serde_json::{Value, json};

    use forum_core::ports::TokenService;
    use forum_infra::{FixedWindowLimiter, InMemoryForumStore, JwtConfig, JwtTokenService, RateLimitConfig};

    use super::*;
    use crate::middleware::admission::AdmissionMiddleware;
    use crate::observability::RequestIdMiddleware;
    use crate::state::{AppState, Stores};

    struct Harness {
        state: AppState,
        store: InMemoryForumStore,
        tokens: Arc<dyn TokenService>,
    }

    impl Harness {
        fn new(max_requests: u32) -> Self {
            let store = InMemoryForumStore::new();
            let limiter = Arc::new(FixedWindowLimiter::new(RateLimitConfig::new(
                max_requests,
                Duration::from_secs(60),
            )));
            let state = AppState::from_parts(
                Stores::in_memory(store.clone()),
                limiter,
                Duration::from_secs(5),
                3,
            );
            let tokens: Arc<dyn TokenService> = Arc::new(JwtTokenService::new(JwtConfig::default()));
            Self {
                state,
                store,
                tokens,
            }
        }

        fn bearer(&self, user_id: i64, username: &str) -> (&'static str, String) {
            let token = self.tokens.generate_token(user_id, username).unwrap();
            ("Authorization", format!("Bearer {}", token))
        }
    }

    macro_rules! app {
        ($h:expr) => {
            test::init_service(
                App::new()
                    .wrap(AdmissionMiddleware::new($h.state.limiter.clone(), false))
                    .wrap(RequestIdMiddleware)
                    .app_data(web::Data::new($h.state.clone()))
                    .app_data(web::Data::new($h.tokens.clone()))
                    .app_data(json_config())
                    .app_data(query_config())
                    .configure(configure_routes),
            )
            .await
        };
    }

    async fn seed_post(h: &Harness) -> i64 {
        use forum_core::domain::{AuthenticatedUser, NewPost};
        use forum_core::ports::PostRepository;

        PostRepository::create(
            &h.store,
            NewPost::new(
                AuthenticatedUser::new(1, "alice"),
                "First".to_string(),
                "Hello".to_string(),
                vec!["rust".to_string()],
            ),
        )
        .await
        .unwrap()
    }

    #[actix_web::test]
    async fn test_vote_toggles_and_aggregates() {
        let h = Harness::new(100);
        let post_id = seed_post(&h).await;
        let app = app!(h);

        let vote = |value: i64| {
            test::TestRequest::post()
                .uri("/api/post/vote")
                .insert_header(h.bearer(2, "bob"))
                .set_json(json!({"user_id": 2, "post_id": post_id, "vote": value}))
                .to_request()
        };
        let read = || {
            test::TestRequest::get()
                .uri(&format!("/api/post/{}", post_id))
                .insert_header(h.bearer(2, "bob"))
                .to_request()
        };

        let res = test::call_service(&app, vote(1)).await;
        assert_eq!(res.status(), StatusCode::OK);
        let post: Value = test::call_and_read_body_json(&app, read()).await;
        assert_eq!(post["likes"], 1);
        assert_eq!(post["vote_status"], 1);

        // Switching moves the vote.
        test::call_service(&app, vote(0)).await;
        let post: Value = test::call_and_read_body_json(&app, read()).await;
        assert_eq!((post["likes"].clone(), post["dislikes"].clone()), (json!(0), json!(1)));
        assert_eq!(post["vote_status"], 2);

        // Repeating it retracts.
        test::call_service(&app, vote(0)).await;
        let post: Value = test::call_and_read_body_json(&app, read()).await;
        assert_eq!(post["dislikes"], 0);
        assert_eq!(post["vote_status"], 0);
        assert_eq!(h.store.vote_rows().await, 0);
    }

    #[actix_web::test]
    async fn test_vote_errors() {
        let h = Harness::new(100);
        let post_id = seed_post(&h).await;
        let app = app!(h);

        let anonymous = test::TestRequest::put()
            .uri("/api/post/vote")
            .set_json(json!({"post_id": post_id, "vote": 1}))
            .to_request();
        let res = test::call_service(&app, anonymous).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let request_id = res
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["status"], 401);
        assert_eq!(body["msg"], "authentication required");
        assert_eq!(body["request_id"].as_str(), request_id.as_deref());
        assert!(request_id.is_some());

        let impersonating = test::TestRequest::post()
            .uri("/api/post/vote")
            .insert_header(h.bearer(2, "bob"))
            .set_json(json!({"user_id": 3, "post_id": post_id, "vote": 1}))
            .to_request();
        assert_eq!(
            test::call_service(&app, impersonating).await.status(),
            StatusCode::UNAUTHORIZED
        );

        let bad_value = test::TestRequest::post()
            .uri("/api/post/vote")
            .insert_header(h.bearer(2, "bob"))
            .set_json(json!({"post_id": post_id, "vote": 5}))
            .to_request();
        let res = test::call_service(&app, bad_value).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["status"], 400);

        let malformed = test::TestRequest::post()
            .uri("/api/post/vote")
            .insert_header(h.bearer(2, "bob"))
            .insert_header(("Content-Type", "application/json"))
            .set_payload("{not json")
            .to_request();
        assert_eq!(test::call_service(&app, malformed).await.status(), StatusCode::BAD_REQUEST);

        let unknown_post = test::TestRequest::post()
            .uri("/api/post/vote")
            .insert_header(h.bearer(2, "bob"))
            .set_json(json!({"post_id": 999, "vote": 1}))
            .to_request();
        assert_eq!(test::call_service(&app, unknown_post).await.status(), StatusCode::NOT_FOUND);

        let wrong_method = test::TestRequest::get().uri("/api/post/vote").to_request();
        let res = test::call_service(&app, wrong_method).await;
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["msg"], "not allowed method");
        assert!(body["request_id"].is_string());
    }

    #[actix_web::test]
    async fn test_sixth_request_is_rate_limited() {
        let h = Harness::new(5);
        let app = app!(h);

        for _ in 0..5 {
            let req = test::TestRequest::get().uri("/api/health").to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        }

        let req = test::TestRequest::post()
            .uri("/api/post/vote")
            .set_json(json!({"post_id": 1, "vote": 1}))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(res.headers().contains_key("retry-after"));
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["status"], 429);
    }

    #[actix_web::test]
    async fn test_post_reads() {
        let h = Harness::new(100);
        let app = app!(h);

        let req = test::TestRequest::get().uri("/api/posts/ALL").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let post_id = seed_post(&h).await;

        let posts: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/posts/rust?limit=10").to_request(),
        )
        .await;
        assert_eq!(posts[0]["post_id"], post_id);
        assert_eq!(posts[0]["username"], "alice");

        let req = test::TestRequest::get().uri("/api/post/abc").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get().uri("/api/post/424242").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get().uri("/api/profile/posts/-1").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let authored: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/profile/posts/1").to_request(),
        )
        .await;
        assert_eq!(authored.as_array().map(Vec::len), Some(1));

        let liked: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/profile/liked-posts/2").to_request(),
        )
        .await;
        assert_eq!(liked, json!([]));
    }

    #[actix_web::test]
    async fn test_create_comment_and_delete() {
        let h = Harness::new(100);
        let app = app!(h);

        let created: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post()
                .uri("/api/post/create")
                .insert_header(h.bearer(1, "alice"))
                .set_json(json!({"title": "Hi", "data": "Body", "categories": ["news"]}))
                .to_request(),
        )
        .await;
        let post_id = created["post_id"].as_i64().unwrap();

        let categories: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/categories").to_request(),
        )
        .await;
        assert_eq!(categories[0]["name"], "news");

        let comment = test::TestRequest::post()
            .uri("/api/comment/create")
            .insert_header(h.bearer(2, "bob"))
            .set_json(json!({"post_id": post_id, "data": "welcome"}))
            .to_request();
        assert_eq!(test::call_service(&app, comment).await.status(), StatusCode::OK);

        let orphan = test::TestRequest::post()
            .uri("/api/comment/create")
            .insert_header(h.bearer(2, "bob"))
            .set_json(json!({"post_id": 999, "data": "hello?"}))
            .to_request();
        assert_eq!(test::call_service(&app, orphan).await.status(), StatusCode::NOT_FOUND);

        let post: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri(&format!("/api/post/{}", post_id)).to_request(),
        )
        .await;
        assert_eq!(post["comments_count"], 1);
        assert_eq!(post["comments"][0]["username"], "bob");

        let not_owner = test::TestRequest::delete()
            .uri(&format!("/api/post/delete/{}", post_id))
            .insert_header(h.bearer(2, "bob"))
            .to_request();
        assert_eq!(test::call_service(&app, not_owner).await.status(), StatusCode::NOT_FOUND);

        let owner = test::TestRequest::delete()
            .uri(&format!("/api/post/delete/{}", post_id))
            .insert_header(h.bearer(1, "alice"))
            .to_request();
        assert_eq!(test::call_service(&app, owner).await.status(), StatusCode::OK);
    }
}
