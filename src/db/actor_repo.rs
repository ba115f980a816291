// src/db/actor_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::auth::{ActorContext, Role},
};

/// Resolve papel e entidade vinculada de um usuário autenticado.
#[async_trait]
pub trait ActorDirectory: Send + Sync {
    async fn resolver(&self, user_id: Uuid) -> Result<Option<ActorContext>, AppError>;
}

// Repositório responsável pelas tabelas de papéis e vínculos
#[derive(Clone)]
pub struct ActorRepository {
    pool: PgPool,
}

impl ActorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn papeis(&self, user_id: Uuid) -> Result<Vec<Role>, AppError> {
        let roles = sqlx::query_scalar::<_, Role>("SELECT role FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(roles)
    }

    async fn entidade_vinculada(&self, user_id: Uuid, role: Role) -> Result<Option<Uuid>, AppError> {
        // Tabelas fixas por papel; nada vindo do usuário entra no SQL
        let sql = match role {
            Role::Armazem => "SELECT id FROM armazens WHERE user_id = $1 LIMIT 1",
            Role::Cliente => "SELECT id FROM clientes WHERE user_id = $1 LIMIT 1",
            Role::Representante => "SELECT id FROM representantes WHERE user_id = $1 LIMIT 1",
            Role::Admin | Role::Logistica => return Ok(None),
        };

        let id = sqlx::query_scalar::<_, Uuid>(sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }
}

#[async_trait]
impl ActorDirectory for ActorRepository {
    async fn resolver(&self, user_id: Uuid) -> Result<Option<ActorContext>, AppError> {
        let Some(role) = self
            .papeis(user_id)
            .await?
            .into_iter()
            .min_by_key(|r| r.precedencia())
        else {
            return Ok(None);
        };

        let linked_entity_id = if role.exige_vinculo() {
            let vinculo = self.entidade_vinculada(user_id, role).await?;
            if vinculo.is_none() {
                tracing::warn!("Usuário {} com papel {} sem entidade vinculada", user_id, role.as_str());
            }
            vinculo
        } else {
            None
        };

        Ok(Some(ActorContext::new(user_id, role, linked_entity_id)))
    }
}
