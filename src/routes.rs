// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, profile, subject, test, tutor},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Public: auth, subjects, questions, single answer feedback.
/// * Bearer token: test submission, user stats, achievements, tutor.
/// * Admin role: question management.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let test_routes = Router::new()
        .route("/questions/{subject_id}", get(subject::get_test_paper))
        .route("/answer", post(test::answer_question))
        .route("/explanation", post(test::explain))
        // Protected test routes
        .merge(
            Router::new()
                .route("/submit", post(test::submit_test))
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let user_routes = Router::new()
        .route("/api/user/current", get(profile::get_current_user))
        .route("/api/user/stats", get(profile::get_user_stats))
        .route("/api/achievements", get(profile::get_achievements))
        .route("/api/tutor/ask", post(tutor::ask))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let admin_routes = Router::new()
        .route("/questions", post(admin::create_question))
        .route("/questions/{id}", delete(admin::delete_question))
        // Double middleware protection: Auth first, then Admin check
        .route_layer(middleware::from_fn(admin_middleware))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .route("/api/subjects", get(subject::list_subjects))
        .route("/api/questions/{subject_id}", get(subject::list_questions))
        .nest("/api/test", test_routes)
        .merge(user_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
