use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::{
    common::i18n::I18nStore,
    middleware::i18n::Locale,
    models::carregamento::TipoAnexo,
    services::etapas::TransicaoInvalida,
};

// Erros da aplicação. Os handlers nunca devolvem AppError direto:
// convertem para ApiError com a mensagem no idioma do usuário.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Transição inválida: {0}")]
    Transicao(#[from] TransicaoInvalida),

    #[error("Falha no upload: {0}")]
    Upload(String),

    #[error("Falha ao gravar o carregamento: {0}")]
    Persistencia(String),

    #[error("Etapa desatualizada: o registro mudou desde a leitura")]
    EtapaDesatualizada,

    #[error("Carregamento não encontrado")]
    NaoEncontrado,

    #[error("Anexo não encontrado")]
    AnexoNaoEncontrado,

    #[error("Acesso negado ao carregamento")]
    AcessoNegado,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Usuário sem papel atribuído")]
    UsuarioSemPapel,

    #[error("Formulário inválido: {0}")]
    Multipart(String),

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

// O que o cliente recebe
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    /// Status HTTP, chave de mensagem e detalhes opcionais.
    fn classificar(&self) -> (StatusCode, &'static str, Option<Value>) {
        match self {
            AppError::ValidationError(errors) => {
                let details: serde_json::Map<String, Value> = errors
                    .field_errors()
                    .into_iter()
                    .map(|(field, field_errors)| {
                        let messages: Vec<String> = field_errors
                            .iter()
                            .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                            .collect();
                        (field.to_string(), json!(messages))
                    })
                    .collect();
                (StatusCode::UNPROCESSABLE_ENTITY, "validacao", Some(Value::Object(details)))
            }
            AppError::Transicao(t) => match t {
                TransicaoInvalida::JaFinalizado => (StatusCode::CONFLICT, "carregamento_finalizado", None),
                TransicaoInvalida::SemPermissao => (StatusCode::FORBIDDEN, "sem_permissao_etapa", None),
                TransicaoInvalida::EtapaInexistente(n) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "etapa_inexistente",
                    Some(json!({ "etapa": n })),
                ),
                TransicaoInvalida::EtapaIncorreta { atual, selecionada } => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "etapa_incorreta",
                    Some(json!({ "etapaAtual": atual.number(), "etapaSelecionada": selecionada.number() })),
                ),
                TransicaoInvalida::HistoricoImutavel(etapa) => (
                    StatusCode::CONFLICT,
                    "historico_imutavel",
                    Some(json!({ "etapa": etapa.number() })),
                ),
                TransicaoInvalida::AnexoObrigatorio(TipoAnexo::NotaFiscal) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "nota_fiscal_obrigatoria", None)
                }
                TransicaoInvalida::AnexoObrigatorio(tipo) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "foto_obrigatoria",
                    Some(json!({ "tipo": tipo })),
                ),
                TransicaoInvalida::AnexoInvalido(tipo) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "anexo_invalido",
                    Some(json!({ "tipo": tipo })),
                ),
            },
            AppError::Upload(_) => (StatusCode::BAD_GATEWAY, "falha_upload", None),
            AppError::Persistencia(_) => (StatusCode::INTERNAL_SERVER_ERROR, "falha_persistencia", None),
            AppError::EtapaDesatualizada => (StatusCode::CONFLICT, "etapa_desatualizada", None),
            AppError::NaoEncontrado => (StatusCode::NOT_FOUND, "carregamento_nao_encontrado", None),
            AppError::AnexoNaoEncontrado => (StatusCode::NOT_FOUND, "anexo_nao_encontrado", None),
            AppError::AcessoNegado => (StatusCode::FORBIDDEN, "acesso_negado", None),
            AppError::InvalidToken | AppError::JwtError(_) => (StatusCode::UNAUTHORIZED, "token_invalido", None),
            AppError::UsuarioSemPapel => (StatusCode::FORBIDDEN, "usuario_sem_papel", None),
            AppError::Multipart(m) => (StatusCode::BAD_REQUEST, "formulario_invalido", Some(json!({ "motivo": m }))),
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "erro_interno", None)
            }
        }
    }

    pub fn to_api_error(self, locale: &Locale, store: &I18nStore) -> ApiError {
        let (status, chave, details) = self.classificar();

        // O detalhe técnico fica só no log
        if status.is_server_error() {
            tracing::error!("Erro Interno do Servidor: {}", self);
        } else {
            tracing::debug!("Requisição recusada: {}", self);
        }

        ApiError {
            status,
            error: store.get(&locale.0, chave),
            details,
        }
    }
}
