// src/handlers/carregamentos.rs

use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedActor, i18n::Locale},
    models::carregamento::{Anexo, CampoAnexo, CarregamentoCompleto, CarregamentoResumo, StatusCarregamento},
    services::{
        carregamento_service::{DetalheCarregamento, UrlAssinada},
        etapas::{PedidoAvanco, VisaoEtapa},
    },
};

// ---
// Payloads
// ---
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListarQuery {
    /// aguardando | em_andamento | finalizado. `em_andamento` vem do agendamento;
    /// o avanço de etapas só grava `finalizado`.
    pub status: Option<StatusCarregamento>,

    /// Placa, motorista ou cliente
    #[validate(length(max = 100, message = "A busca pode ter no máximo 100 caracteres."))]
    pub busca: Option<String>,
}

/// Formulário multipart lido por `avancar_etapa`.
#[derive(Debug, Default, Validate)]
pub struct FormularioAvanco {
    pub foto: Option<Anexo>,
    pub nota_fiscal: Option<Anexo>,
    pub xml: Option<Anexo>,

    #[validate(length(max = 2000, message = "A observação pode ter no máximo 2000 caracteres."))]
    pub observacao: Option<String>,
}

impl FormularioAvanco {
    pub async fn ler(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = FormularioAvanco::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Multipart(e.body_text()))?
        {
            let nome = field.name().unwrap_or_default().to_string();

            if nome == "observacao" {
                let texto = field.text().await.map_err(|e| AppError::Multipart(e.body_text()))?;
                form.observacao = Some(texto);
                continue;
            }

            let nome_arquivo = field.file_name().unwrap_or(nome.as_str()).to_string();
            let content_type = field.content_type().unwrap_or_default().to_string();
            let dados = field.bytes().await.map_err(|e| AppError::Multipart(e.body_text()))?;

            // Campo de arquivo enviado vazio conta como ausente
            if dados.is_empty() {
                continue;
            }

            let anexo = Anexo { nome_arquivo, content_type, dados: dados.to_vec() };
            match nome.as_str() {
                "foto" => form.foto = Some(anexo),
                "notaFiscal" => form.nota_fiscal = Some(anexo),
                "xml" => form.xml = Some(anexo),
                outro => tracing::debug!("Campo multipart ignorado: {}", outro),
            }
        }

        Ok(form)
    }

    pub fn into_pedido(self, etapa_selecionada: i32) -> PedidoAvanco {
        PedidoAvanco {
            etapa_selecionada,
            foto: self.foto,
            nota_fiscal: self.nota_fiscal,
            xml: self.xml,
            observacao: self.observacao,
        }
    }
}

// Só para a documentação OpenAPI do corpo multipart
#[derive(Deserialize, ToSchema)]
#[allow(dead_code)]
#[serde(rename_all = "camelCase")]
pub struct FormularioAvancoSchema {
    /// Foto da etapa (etapas 1 a 4)
    #[schema(value_type = Option<String>, format = Binary)]
    foto: Option<Vec<u8>>,
    /// PDF da nota fiscal (etapa 5)
    #[schema(value_type = Option<String>, format = Binary)]
    nota_fiscal: Option<Vec<u8>>,
    /// XML da nota fiscal (opcional, etapa 5)
    #[schema(value_type = Option<String>, format = Binary)]
    xml: Option<Vec<u8>>,
    observacao: Option<String>,
}

// ---
// Handlers
// ---
#[utoipa::path(
    get,
    path = "/api/carregamentos",
    tag = "Carregamentos",
    params(ListarQuery),
    responses(
        (status = 200, description = "Carregamentos visíveis para o usuário", body = Vec<CarregamentoResumo>),
        (status = 422, description = "Filtro inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn listar_carregamentos(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(ator): AuthenticatedActor,
    Query(query): Query<ListarQuery>,
) -> Result<Json<Vec<CarregamentoResumo>>, ApiError> {
    query
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let linhas = app_state
        .carregamento_service
        .listar(&ator, query.status, query.busca.as_deref())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(linhas))
}

#[utoipa::path(
    get,
    path = "/api/carregamentos/{id}",
    tag = "Carregamentos",
    params(("id" = Uuid, Path, description = "ID do carregamento")),
    responses(
        (status = 200, description = "Carregamento com etapas e estatísticas", body = DetalheCarregamento),
        (status = 403, description = "Fora do escopo do usuário"),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_carregamento(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(ator): AuthenticatedActor,
    Path(id): Path<Uuid>,
) -> Result<Json<DetalheCarregamento>, ApiError> {
    let detalhe = app_state
        .carregamento_service
        .detalhe(&ator, id, Utc::now())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(detalhe))
}

#[utoipa::path(
    get,
    path = "/api/carregamentos/{id}/etapas/{etapa}",
    tag = "Carregamentos",
    params(
        ("id" = Uuid, Path, description = "ID do carregamento"),
        ("etapa" = i32, Path, description = "Número da etapa (1 a 6)")
    ),
    responses(
        (status = 200, description = "O que a etapa mostra para este usuário", body = VisaoEtapa),
        (status = 422, description = "Etapa inexistente")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_etapa(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(ator): AuthenticatedActor,
    Path((id, etapa)): Path<(Uuid, i32)>,
) -> Result<Json<VisaoEtapa>, ApiError> {
    let visao = app_state
        .carregamento_service
        .visao(&ator, id, etapa)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(visao))
}

#[utoipa::path(
    post,
    path = "/api/carregamentos/{id}/etapas/{etapa}/avancar",
    tag = "Carregamentos",
    request_body(content = FormularioAvancoSchema, content_type = "multipart/form-data"),
    params(
        ("id" = Uuid, Path, description = "ID do carregamento"),
        ("etapa" = i32, Path, description = "Etapa que está sendo concluída")
    ),
    responses(
        (status = 200, description = "Etapa concluída", body = CarregamentoCompleto),
        (status = 403, description = "Usuário não é o armazém do carregamento"),
        (status = 409, description = "Carregamento finalizado ou alterado por outra pessoa"),
        (status = 422, description = "Etapa incorreta ou anexo ausente"),
        (status = 502, description = "Falha no envio dos arquivos")
    ),
    security(("api_jwt" = []))
)]
pub async fn avancar_etapa(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(ator): AuthenticatedActor,
    Path((id, etapa)): Path<(Uuid, i32)>,
    multipart: Multipart,
) -> Result<Json<CarregamentoCompleto>, ApiError> {
    let form = FormularioAvanco::ler(multipart)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    form.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let atualizado = app_state
        .carregamento_service
        .avancar_etapa(&ator, id, form.into_pedido(etapa))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(atualizado))
}

#[utoipa::path(
    get,
    path = "/api/carregamentos/{id}/anexos/{campo}",
    tag = "Carregamentos",
    params(
        ("id" = Uuid, Path, description = "ID do carregamento"),
        ("campo" = CampoAnexo, Path, description = "foto_chegada, nota_fiscal, xml...")
    ),
    responses(
        (status = 200, description = "URL assinada e temporária", body = UrlAssinada),
        (status = 404, description = "Anexo não enviado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_anexo_url(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedActor(ator): AuthenticatedActor,
    Path((id, campo)): Path<(Uuid, CampoAnexo)>,
) -> Result<Json<UrlAssinada>, ApiError> {
    let assinada = app_state
        .carregamento_service
        .url_anexo(&ator, id, campo)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(assinada))
}
