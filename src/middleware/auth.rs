// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::auth::ActorContext,
};

// O guardião das rotas protegidas: valida o Bearer e deixa o ator
// resolvido nos "extensions" da requisição
pub async fn auth_guard(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (mut parts, body) = request.into_parts();
    let locale = Locale::from_headers(&parts.headers);

    let TypedHeader(Authorization(bearer)) =
        TypedHeader::<Authorization<Bearer>>::from_request_parts(&mut parts, &app_state)
            .await
            .map_err(|_| AppError::InvalidToken.to_api_error(&locale, &app_state.i18n_store))?;

    let ator = app_state
        .auth_service
        .validate_token(bearer.token())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tracing::debug!("Requisição autenticada: usuário {} ({})", ator.user_id, ator.role.as_str());

    parts.extensions.insert(ator);
    Ok(next.run(Request::from_parts(parts, body)).await)
}

// Extrator para obter o ator autenticado diretamente nos handlers
pub struct AuthenticatedActor(pub ActorContext);

impl<S> FromRequestParts<S> for AuthenticatedActor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<ActorContext>() {
            Some(ator) => Ok(AuthenticatedActor(ator.clone())),
            // Rota montada sem o auth_guard
            None => {
                let locale = Locale::from_headers(&parts.headers);
                Err(AppError::InvalidToken.to_api_error(&locale, &crate::common::i18n::I18nStore::new()))
            }
        }
    }
}
