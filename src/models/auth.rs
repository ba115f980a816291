// src/models/auth.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// Papéis do sistema. A ordem de `precedencia` decide qual papel vale
// quando o usuário tem mais de um vínculo em `user_roles`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "app_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Logistica,
    Armazem,
    Cliente,
    Representante,
}

impl Role {
    pub fn precedencia(self) -> u8 {
        match self {
            Role::Admin => 0,
            Role::Logistica => 1,
            Role::Armazem => 2,
            Role::Cliente => 3,
            Role::Representante => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Logistica => "logistica",
            Role::Armazem => "armazem",
            Role::Cliente => "cliente",
            Role::Representante => "representante",
        }
    }

    /// Papéis que só enxergam dados através de uma entidade vinculada
    /// (armazém, cliente ou representante).
    pub fn exige_vinculo(self) -> bool {
        match self {
            Role::Admin | Role::Logistica => false,
            Role::Armazem | Role::Cliente | Role::Representante => true,
        }
    }
}

// Quem está fazendo a requisição, já resolvido. Passado explicitamente
// para cada serviço em vez de ficar num estado global.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActorContext {
    pub user_id: Uuid,
    pub role: Role,
    // armazem_id, cliente_id ou representante_id, conforme o papel
    pub linked_entity_id: Option<Uuid>,
}

impl ActorContext {
    pub fn new(user_id: Uuid, role: Role, linked_entity_id: Option<Uuid>) -> Self {
        Self { user_id, role, linked_entity_id }
    }

    pub fn escopo(&self) -> EscopoVisibilidade {
        match (self.role, self.linked_entity_id) {
            (Role::Admin | Role::Logistica, _) => EscopoVisibilidade::Tudo,
            (Role::Armazem, Some(id)) => EscopoVisibilidade::Armazem(id),
            (Role::Cliente, Some(id)) => EscopoVisibilidade::Cliente(id),
            (Role::Representante, Some(id)) => EscopoVisibilidade::Representante(id),
            (Role::Armazem | Role::Cliente | Role::Representante, None) => EscopoVisibilidade::Nenhum,
        }
    }
}

// Quais carregamentos o ator pode ler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscopoVisibilidade {
    Tudo,
    Armazem(Uuid),
    Cliente(Uuid),
    Representante(Uuid),
    Nenhum,
}

impl EscopoVisibilidade {
    pub fn permite(&self, armazem_id: Uuid, cliente_id: Uuid, representante_id: Option<Uuid>) -> bool {
        match *self {
            EscopoVisibilidade::Tudo => true,
            EscopoVisibilidade::Armazem(id) => id == armazem_id,
            EscopoVisibilidade::Cliente(id) => id == cliente_id,
            EscopoVisibilidade::Representante(id) => representante_id == Some(id),
            EscopoVisibilidade::Nenhum => false,
        }
    }
}

// Estrutura de dados ("claims") dentro do JWT da plataforma
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // Subject (ID do usuário)
    pub exp: usize, // Expiration time
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_follows_role_and_link() {
        let armazem = Uuid::new_v4();
        let cliente = Uuid::new_v4();
        let rep = Uuid::new_v4();

        let admin = ActorContext::new(Uuid::new_v4(), Role::Admin, None);
        assert!(admin.escopo().permite(armazem, cliente, None));

        let op = ActorContext::new(Uuid::new_v4(), Role::Armazem, Some(armazem));
        assert!(op.escopo().permite(armazem, Uuid::new_v4(), None));
        assert!(!op.escopo().permite(Uuid::new_v4(), cliente, None));

        let cli = ActorContext::new(Uuid::new_v4(), Role::Cliente, Some(cliente));
        assert!(cli.escopo().permite(Uuid::new_v4(), cliente, None));
        assert!(!cli.escopo().permite(armazem, Uuid::new_v4(), None));

        let representante = ActorContext::new(Uuid::new_v4(), Role::Representante, Some(rep));
        assert!(representante.escopo().permite(armazem, cliente, Some(rep)));
        assert!(!representante.escopo().permite(armazem, cliente, None));

        let sem_vinculo = ActorContext::new(Uuid::new_v4(), Role::Cliente, None);
        assert_eq!(sem_vinculo.escopo(), EscopoVisibilidade::Nenhum);
    }

    #[test]
    fn most_privileged_role_has_lowest_precedence() {
        let mut roles = vec![Role::Cliente, Role::Logistica, Role::Armazem];
        roles.sort_by_key(|r| r.precedencia());
        assert_eq!(roles[0], Role::Logistica);
    }
}
