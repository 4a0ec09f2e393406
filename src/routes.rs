use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware::{from_fn, Next},
    Extension, Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::warn;

use crate::{
    handlers::{
        admin_handlers::admin_handler, auth_handlers::auth_handler,
        feedback_handlers::feedback_handler, interviewer_handlers::interviewer_handler,
        student_handlers::student_handler,
    },
    middleware::{auth, role_check},
    models::UserRole,
    uploads::MAX_UPLOAD_BYTES,
    AppState,
};

/// Room for two maximum-size files plus multipart framing.
const BODY_LIMIT: usize = 2 * MAX_UPLOAD_BYTES + 1024 * 1024;

fn role_gated(router: Router, role: UserRole) -> Router {
    router.layer(from_fn(move |req: Request, next: Next| {
        role_check(req, next, vec![role])
    }))
}

fn cors(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true);

    match HeaderValue::from_str(origin) {
        Ok(origin) => layer.allow_origin(AllowOrigin::exact(origin)),
        Err(e) => {
            warn!(error = %e, %origin, "invalid FRONTEND_ORIGIN, cross-origin requests disabled");
            layer
        }
    }
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .nest("/student", role_gated(student_handler(), UserRole::Student))
        .nest(
            "/interviewer",
            role_gated(interviewer_handler(), UserRole::Interviewer),
        )
        .nest("/admin", role_gated(admin_handler(), UserRole::Admin))
        .nest("/feedback", feedback_handler())
        .layer(from_fn(auth));

    let api = Router::new()
        .nest("/auth", auth_handler())
        .merge(protected);

    Router::new()
        .nest("/api", api)
        .nest_service("/uploads", ServeDir::new(&app_state.env.upload_dir))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .layer(cors(&app_state.env.frontend_origin))
        .layer(Extension(app_state))
}
