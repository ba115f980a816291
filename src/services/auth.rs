// src/services/auth.rs
//
// A autenticação é da plataforma; aqui só validamos o JWT que ela emite
// e descobrimos quem é o ator.

use std::sync::Arc;

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::{
    common::error::AppError,
    db::ActorDirectory,
    models::auth::{ActorContext, Claims},
};

#[derive(Clone)]
pub struct AuthService {
    actors: Arc<dyn ActorDirectory>,
    jwt_secret: String,
    jwt_audience: String,
}

impl AuthService {
    pub fn new(actors: Arc<dyn ActorDirectory>, jwt_secret: String, jwt_audience: String) -> Self {
        Self { actors, jwt_secret, jwt_audience }
    }

    pub async fn validate_token(&self, token: &str) -> Result<ActorContext, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[self.jwt_audience.as_str()]);

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|e| {
            tracing::debug!("JWT recusado: {}", e);
            AppError::InvalidToken
        })?;

        self.actors
            .resolver(token_data.claims.sub)
            .await?
            .ok_or(AppError::UsuarioSemPapel)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;
    use std::collections::HashMap;
    use uuid::Uuid;

    pub(crate) const SEGREDO: &str = "segredo-de-teste-com-32-caracteres!";

    #[derive(Default)]
    pub(crate) struct MemoryActors(pub HashMap<Uuid, ActorContext>);

    #[async_trait]
    impl ActorDirectory for MemoryActors {
        async fn resolver(&self, user_id: Uuid) -> Result<Option<ActorContext>, AppError> {
            Ok(self.0.get(&user_id).cloned())
        }
    }

    pub(crate) fn token_para(user_id: Uuid, aud: &str, segredo: &str) -> String {
        let claims = json!({
            "sub": user_id,
            "aud": aud,
            "exp": (Utc::now() + chrono::Duration::hours(1)).timestamp(),
            "iat": Utc::now().timestamp(),
        });
        encode(&Header::default(), &claims, &EncodingKey::from_secret(segredo.as_bytes())).unwrap()
    }

    fn servico(atores: Vec<ActorContext>) -> AuthService {
        let mapa = atores.into_iter().map(|a| (a.user_id, a)).collect();
        AuthService::new(Arc::new(MemoryActors(mapa)), SEGREDO.into(), "authenticated".into())
    }

    #[tokio::test]
    async fn valid_token_resolves_actor() {
        let ator = ActorContext::new(Uuid::new_v4(), crate::models::auth::Role::Armazem, Some(Uuid::new_v4()));
        let svc = servico(vec![ator.clone()]);
        let resolvido = svc
            .validate_token(&token_para(ator.user_id, "authenticated", SEGREDO))
            .await
            .unwrap();
        assert_eq!(resolvido, ator);
    }

    #[tokio::test]
    async fn wrong_secret_or_audience_is_rejected() {
        let ator = ActorContext::new(Uuid::new_v4(), crate::models::auth::Role::Admin, None);
        let svc = servico(vec![ator.clone()]);

        let r = svc.validate_token(&token_para(ator.user_id, "authenticated", "outro-segredo")).await;
        assert!(matches!(r, Err(AppError::InvalidToken)));

        let r = svc.validate_token(&token_para(ator.user_id, "anon", SEGREDO)).await;
        assert!(matches!(r, Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn user_without_role_is_refused() {
        let svc = servico(vec![]);
        let r = svc.validate_token(&token_para(Uuid::new_v4(), "authenticated", SEGREDO)).await;
        assert!(matches!(r, Err(AppError::UsuarioSemPapel)));
    }
}
