// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::i18n::I18nStore,
    db::{ActorRepository, CarregamentoRepository},
    services::{auth::AuthService, carregamento_service::CarregamentoService, storage::S3Storage},
};

const AUDIENCIA_PADRAO: &str = "authenticated";
const BIND_PADRAO: &str = "0.0.0.0:3000";
const VALIDADE_URL_PADRAO_SECS: u64 = 3600;
const UPLOAD_MAX_PADRAO: usize = 20 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key: String,
    pub secret_key: String,
    pub public_base_url: String,
}

// Tudo o que vem do ambiente (.env em desenvolvimento)
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub bind_addr: String,
    pub storage: StorageSettings,
    pub signed_url_ttl: Duration,
    pub upload_max_bytes: usize,
}

fn obrigatoria(nome: &str) -> anyhow::Result<String> {
    env::var(nome).with_context(|| format!("{} deve ser definida", nome))
}

fn opcional(nome: &str) -> Option<String> {
    env::var(nome).ok().filter(|v| !v.trim().is_empty())
}

fn numero_ou<T: std::str::FromStr>(nome: &str, padrao: T) -> anyhow::Result<T> {
    match opcional(nome) {
        Some(valor) => valor
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} inválida: '{}'", nome, valor)),
        None => Ok(padrao),
    }
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let storage = StorageSettings {
            bucket: obrigatoria("S3_BUCKET")?,
            region: opcional("S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            endpoint: opcional("S3_ENDPOINT"),
            access_key: obrigatoria("S3_ACCESS_KEY")?,
            secret_key: obrigatoria("S3_SECRET_KEY")?,
            public_base_url: obrigatoria("STORAGE_PUBLIC_BASE_URL")?,
        };

        Ok(Self {
            database_url: obrigatoria("DATABASE_URL")?,
            jwt_secret: obrigatoria("JWT_SECRET")?,
            jwt_audience: opcional("JWT_AUDIENCE").unwrap_or_else(|| AUDIENCIA_PADRAO.to_string()),
            bind_addr: opcional("BIND_ADDR").unwrap_or_else(|| BIND_PADRAO.to_string()),
            storage,
            signed_url_ttl: Duration::from_secs(numero_ou("SIGNED_URL_TTL_SECS", VALIDADE_URL_PADRAO_SECS)?),
            upload_max_bytes: numero_ou("UPLOAD_MAX_BYTES", UPLOAD_MAX_PADRAO)?,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub carregamento_service: CarregamentoService,
    pub i18n_store: Arc<I18nStore>,
}

impl AppState {
    pub fn new(auth_service: AuthService, carregamento_service: CarregamentoService) -> Self {
        Self {
            auth_service,
            carregamento_service,
            i18n_store: Arc::new(I18nStore::new()),
        }
    }

    /// Monta o gráfico de dependências de produção sobre a pool.
    pub fn from_settings(settings: &Settings, db_pool: PgPool) -> Self {
        let actor_repo = ActorRepository::new(db_pool.clone());
        let carregamento_repo = CarregamentoRepository::new(db_pool);
        let storage = S3Storage::new(&settings.storage);

        let auth_service = AuthService::new(
            Arc::new(actor_repo),
            settings.jwt_secret.clone(),
            settings.jwt_audience.clone(),
        );
        let carregamento_service = CarregamentoService::new(
            Arc::new(carregamento_repo),
            Arc::new(storage),
            settings.signed_url_ttl,
        );

        Self::new(auth_service, carregamento_service)
    }
}

pub async fn connect_db(database_url: &str) -> anyhow::Result<PgPool> {
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect(database_url)
        .await
        .context("Falha ao conectar ao banco de dados")?;

    tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
    Ok(db_pool)
}
