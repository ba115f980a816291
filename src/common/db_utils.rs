use sqlx::{PgPool, Postgres, Transaction};

use crate::common::error::AppError;
use crate::models::auth::ActorContext;

// ---
// Helper RLS: A "Chave" para o Banco de Dados
// ---
/// Abre uma transação e define as variáveis lidas pelas políticas RLS.
/// `is_local = true` faz os valores morrerem no commit, então a conexão
/// volta limpa para a pool.
pub(crate) async fn begin_rls_transaction(
    pool: &PgPool,
    ator: &ActorContext,
) -> Result<Transaction<'static, Postgres>, AppError> {
    // O operador '?' converte automaticamente sqlx::Error -> AppError::DatabaseError
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT set_config('app.user_id', $1, true)")
        .bind(ator.user_id.to_string())
        .execute(&mut *tx)
        .await?;

    sqlx::query("SELECT set_config('app.role', $1, true)")
        .bind(ator.role.as_str())
        .execute(&mut *tx)
        .await?;

    Ok(tx)
}
