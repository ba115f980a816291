// src/services/storage.rs
//
// Armazenamento dos anexos (fotos, nota fiscal, XML) em bucket S3 compatível.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::StorageSettings,
    models::carregamento::{Etapa, TipoAnexo},
};

#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Envia o arquivo e devolve a URL durável que vai para o registro.
    async fn upload(&self, chave: &str, dados: Vec<u8>, content_type: &str) -> Result<String, AppError>;

    /// URL assinada e temporária para uma URL devolvida por `upload`.
    async fn signed_url(&self, url: &str, validade: Duration) -> Result<String, AppError>;
}

/// carregamentos/{id}/etapa-{n}/{tipo}-{uuid}.{ext}
pub fn chave_anexo(carregamento_id: Uuid, etapa: Etapa, tipo: TipoAnexo, extensao: &str) -> String {
    format!(
        "carregamentos/{}/etapa-{}/{}-{}.{}",
        carregamento_id,
        etapa.number(),
        tipo.slug(),
        Uuid::new_v4(),
        extensao
    )
}

pub fn content_type_for_extension(ext: &str) -> &'static str {
    match ext.to_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "pdf" => "application/pdf",
        "xml" => "application/xml",
        _ => "application/octet-stream",
    }
}

fn url_publica(base: &str, bucket: &str, chave: &str) -> String {
    format!("{}/{}/{}", base.trim_end_matches('/'), bucket, chave)
}

fn chave_da_url<'a>(base: &str, bucket: &str, url: &'a str) -> Option<&'a str> {
    let prefixo = format!("{}/{}/", base.trim_end_matches('/'), bucket);
    url.strip_prefix(prefixo.as_str()).filter(|chave| !chave.is_empty())
}

#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl S3Storage {
    pub fn new(config: &StorageSettings) -> Self {
        let credentials = Credentials::new(&config.access_key, &config.secret_key, None, None, "nexor");

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true); // Necessário para MinIO

        if let Some(ref endpoint) = config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        tracing::info!("Storage S3 configurado: bucket={}", config.bucket);

        Self {
            client: Client::from_conf(s3_config_builder.build()),
            bucket: config.bucket.clone(),
            public_base_url: config.public_base_url.clone(),
        }
    }
}

#[async_trait]
impl FileStorage for S3Storage {
    async fn upload(&self, chave: &str, dados: Vec<u8>, content_type: &str) -> Result<String, AppError> {
        let body = aws_sdk_s3::primitives::ByteStream::from(dados);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(chave)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| AppError::Upload(format!("put_object {}: {}", chave, e)))?;

        Ok(url_publica(&self.public_base_url, &self.bucket, chave))
    }

    async fn signed_url(&self, url: &str, validade: Duration) -> Result<String, AppError> {
        let chave = chave_da_url(&self.public_base_url, &self.bucket, url).ok_or(AppError::AnexoNaoEncontrado)?;

        let presigning = PresigningConfig::expires_in(validade)
            .map_err(|e| anyhow::anyhow!("Configuração de URL assinada inválida: {}", e))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(chave)
            .presigned(presigning)
            .await
            .map_err(|e| anyhow::anyhow!("Falha ao assinar {}: {}", chave, e))?;

        Ok(request.uri().to_string())
    }
}
