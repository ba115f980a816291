// src/routes.rs

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Json, Router,
};
use utoipa::OpenApi;

use crate::{config::AppState, docs::ApiDoc, handlers, middleware::auth::auth_guard};

pub fn router(app_state: AppState, upload_max_bytes: usize) -> Router {
    // Define as rotas de usuário (protegidas pelo middleware)
    let user_routes = Router::new()
        .route("/me", get(handlers::usuarios::get_me))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let carregamento_routes = Router::new()
        .route("/", get(handlers::carregamentos::listar_carregamentos))
        .route("/{id}", get(handlers::carregamentos::get_carregamento))
        .route("/{id}/etapas/{etapa}", get(handlers::carregamentos::get_etapa))
        .route(
            "/{id}/etapas/{etapa}/avancar",
            post(handlers::carregamentos::avancar_etapa)
                .layer(DefaultBodyLimit::max(upload_max_bytes)),
        )
        .route("/{id}/anexos/{campo}", get(handlers::carregamentos::get_anexo_url))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    Router::new()
        .route("/api/health", get(handlers::usuarios::health))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .nest("/api/users", user_routes)
        .nest("/api/carregamentos", carregamento_routes)
        .with_state(app_state)
}
