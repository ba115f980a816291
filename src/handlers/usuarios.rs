// src/handlers/usuarios.rs

use axum::Json;

use crate::{middleware::auth::AuthenticatedActor, models::auth::ActorContext};

// Handler da rota protegida /me: papel e vínculo já resolvidos pelo guard
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Users",
    responses(
        (status = 200, description = "Usuário autenticado", body = ActorContext),
        (status = 401, description = "Token ausente ou inválido"),
        (status = 403, description = "Usuário sem papel atribuído")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_me(AuthenticatedActor(ator): AuthenticatedActor) -> Json<ActorContext> {
    Json(ator)
}

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses((status = 200, description = "Serviço no ar", body = String))
)]
pub async fn health() -> &'static str {
    "OK"
}
