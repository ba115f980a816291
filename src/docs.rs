// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::usuarios::health,

        // --- Users ---
        handlers::usuarios::get_me,

        // --- Carregamentos ---
        handlers::carregamentos::listar_carregamentos,
        handlers::carregamentos::get_carregamento,
        handlers::carregamentos::get_etapa,
        handlers::carregamentos::avancar_etapa,
        handlers::carregamentos::get_anexo_url,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::Role,
            models::auth::ActorContext,

            // --- Carregamentos ---
            models::carregamento::StatusCarregamento,
            models::carregamento::Etapa,
            models::carregamento::TipoAnexo,
            models::carregamento::CampoAnexo,
            models::carregamento::Carregamento,
            models::carregamento::LinkAnexo,
            models::carregamento::Agendamento,
            models::carregamento::CarregamentoCompleto,
            models::carregamento::CarregamentoResumo,

            // --- Etapas e estatísticas ---
            services::etapas::VisaoEtapa,
            services::etapas::EtapaResumo,
            services::estatisticas::DuracaoEtapa,
            services::estatisticas::EstatisticasCarregamento,
            services::carregamento_service::DetalheCarregamento,
            services::carregamento_service::UrlAssinada,

            // --- Payloads ---
            handlers::carregamentos::FormularioAvancoSchema,
        )
    ),
    tags(
        (name = "Health", description = "Verificação de disponibilidade"),
        (name = "Users", description = "Dados do Usuário e Perfil"),
        (name = "Carregamentos", description = "Etapas do carregamento: chegada até a documentação")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
