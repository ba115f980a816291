// src/db/carregamento_repo.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{db_utils::begin_rls_transaction, error::AppError},
    models::{
        auth::{ActorContext, EscopoVisibilidade},
        carregamento::{Agendamento, Carregamento, CarregamentoCompleto, CarregamentoResumo, StatusCarregamento},
    },
    services::etapas::{AtualizacaoEtapa, TransicaoInvalida},
};

#[async_trait]
pub trait CarregamentoStore: Send + Sync {
    async fn buscar(&self, ator: &ActorContext, id: Uuid) -> Result<Option<CarregamentoCompleto>, AppError>;

    async fn listar(
        &self,
        ator: &ActorContext,
        escopo: EscopoVisibilidade,
        status: Option<StatusCarregamento>,
    ) -> Result<Vec<CarregamentoResumo>, AppError>;

    /// Escrita única e condicional. `None` quando o registro já saiu da
    /// etapa esperada (outra pessoa avançou antes).
    async fn aplicar_atualizacao(
        &self,
        ator: &ActorContext,
        id: Uuid,
        atualizacao: &AtualizacaoEtapa,
    ) -> Result<Option<Carregamento>, AppError>;
}

#[derive(Clone)]
pub struct CarregamentoRepository {
    pool: PgPool,
}

impl CarregamentoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Monta o UPDATE de uma etapa a partir das colunas da definição estática.
fn montar_update(id: Uuid, at: &AtualizacaoEtapa) -> Result<QueryBuilder<'static, Postgres>, AppError> {
    let def = at.definicao();
    let campo_data = def.campo_data.ok_or(TransicaoInvalida::JaFinalizado)?;
    let anexo = def
        .anexo_obrigatorio
        .ok_or(TransicaoInvalida::JaFinalizado)?;

    let mut qb = QueryBuilder::<Postgres>::new("UPDATE carregamentos SET ");
    {
        let mut sets = qb.separated(", ");

        sets.push(format!("{} = ", campo_data)).push_bind_unseparated(at.data);

        if let (Some(campo), Some(obs)) = (def.campo_observacao, &at.observacao) {
            sets.push(format!("{} = ", campo)).push_bind_unseparated(obs.clone());
        }

        sets.push(format!("{} = ", anexo.campo_url))
            .push_bind_unseparated(at.url_anexo.clone());

        if let (Some(opcional), Some(url)) = (def.anexo_opcional, &at.url_anexo_opcional) {
            sets.push(format!("{} = ", opcional.campo_url))
                .push_bind_unseparated(url.clone());
        }

        sets.push("etapa_atual = ").push_bind_unseparated(at.nova_etapa.number());

        if let Some(status) = at.novo_status {
            sets.push("status = ").push_bind_unseparated(status);
        }

        sets.push("updated_at = NOW()");
    }

    // Guarda otimista: só grava se ninguém avançou a etapa desde a leitura
    qb.push(" WHERE id = ")
        .push_bind(id)
        .push(" AND etapa_atual = ")
        .push_bind(at.etapa.number())
        .push(" AND status <> 'finalizado' AND ")
        .push(campo_data)
        .push(" IS NULL RETURNING *");

    Ok(qb)
}

#[async_trait]
impl CarregamentoStore for CarregamentoRepository {
    async fn buscar(&self, ator: &ActorContext, id: Uuid) -> Result<Option<CarregamentoCompleto>, AppError> {
        let mut tx = begin_rls_transaction(&self.pool, ator).await?;

        let carregamento = sqlx::query_as::<_, Carregamento>("SELECT * FROM carregamentos WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(carregamento) = carregamento else {
            return Ok(None);
        };

        let agendamento = sqlx::query_as::<_, Agendamento>(
            r#"
            SELECT id, data_retirada, horario, quantidade, placa_caminhao,
                   motorista_nome, motorista_documento
            FROM agendamentos
            WHERE id = $1
            "#,
        )
        .bind(carregamento.agendamento_id)
        .fetch_optional(&mut *tx)
        .await?;

        let cliente = sqlx::query_as::<_, (String, Option<Uuid>)>(
            "SELECT nome, representante_id FROM clientes WHERE id = $1",
        )
        .bind(carregamento.cliente_id)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        let (cliente_nome, representante_id) = match cliente {
            Some((nome, rep)) => (Some(nome), rep),
            None => (None, None),
        };

        Ok(Some(CarregamentoCompleto {
            carregamento,
            agendamento,
            cliente_nome,
            representante_id,
        }))
    }

    async fn listar(
        &self,
        ator: &ActorContext,
        escopo: EscopoVisibilidade,
        status: Option<StatusCarregamento>,
    ) -> Result<Vec<CarregamentoResumo>, AppError> {
        let (armazem, cliente, representante) = match escopo {
            EscopoVisibilidade::Tudo => (None, None, None),
            EscopoVisibilidade::Armazem(id) => (Some(id), None, None),
            EscopoVisibilidade::Cliente(id) => (None, Some(id), None),
            EscopoVisibilidade::Representante(id) => (None, None, Some(id)),
            EscopoVisibilidade::Nenhum => return Ok(Vec::new()),
        };

        let mut tx = begin_rls_transaction(&self.pool, ator).await?;

        let linhas = sqlx::query_as::<_, CarregamentoResumo>(
            r#"
            SELECT
                c.id, c.etapa_atual, c.status, c.cliente_id, c.armazem_id,
                cl.representante_id, cl.nome AS cliente_nome,
                a.placa_caminhao, a.motorista_nome, a.data_retirada,
                c.data_chegada, c.created_at
            FROM carregamentos c
            LEFT JOIN clientes cl ON cl.id = c.cliente_id
            LEFT JOIN agendamentos a ON a.id = c.agendamento_id
            WHERE ($1::uuid IS NULL OR c.armazem_id = $1)
              AND ($2::uuid IS NULL OR c.cliente_id = $2)
              AND ($3::uuid IS NULL OR cl.representante_id = $3)
              AND ($4::status_carregamento IS NULL OR c.status = $4)
            ORDER BY c.created_at DESC
            "#,
        )
        .bind(armazem)
        .bind(cliente)
        .bind(representante)
        .bind(status)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(linhas)
    }

    async fn aplicar_atualizacao(
        &self,
        ator: &ActorContext,
        id: Uuid,
        atualizacao: &AtualizacaoEtapa,
    ) -> Result<Option<Carregamento>, AppError> {
        let mut qb = montar_update(id, atualizacao)?;

        let mut tx = begin_rls_transaction(&self.pool, ator).await?;
        let atualizado = qb
            .build_query_as::<Carregamento>()
            .fetch_optional(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(atualizado)
    }
}
