// src/services/carregamento_service.rs

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::CarregamentoStore,
    models::{
        auth::{ActorContext, EscopoVisibilidade},
        carregamento::{CampoAnexo, CarregamentoCompleto, CarregamentoResumo, Etapa, StatusCarregamento},
    },
    services::{
        estatisticas::EstatisticasCarregamento,
        etapas::{self, AnexosEnviados, EtapaResumo, PedidoAvanco, TransicaoInvalida, VisaoEtapa},
        storage::{chave_anexo, content_type_for_extension, FileStorage},
    },
};

// Tela de detalhe: registro, visão de cada etapa e estatísticas
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DetalheCarregamento {
    #[serde(flatten)]
    pub completo: CarregamentoCompleto,
    pub etapas: Vec<EtapaResumo>,
    pub estatisticas: EstatisticasCarregamento,
    pub pode_avancar: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UrlAssinada {
    pub url: String,
    pub expira_em: DateTime<Utc>,
}

#[derive(Clone)]
pub struct CarregamentoService {
    store: Arc<dyn CarregamentoStore>,
    storage: Arc<dyn FileStorage>,
    validade_url_assinada: Duration,
}

impl CarregamentoService {
    pub fn new(
        store: Arc<dyn CarregamentoStore>,
        storage: Arc<dyn FileStorage>,
        validade_url_assinada: Duration,
    ) -> Self {
        Self { store, storage, validade_url_assinada }
    }

    pub async fn listar(
        &self,
        ator: &ActorContext,
        status: Option<StatusCarregamento>,
        busca: Option<&str>,
    ) -> Result<Vec<CarregamentoResumo>, AppError> {
        let escopo = ator.escopo();
        if escopo == EscopoVisibilidade::Nenhum {
            tracing::debug!("Ator {} sem entidade vinculada; listagem vazia", ator.user_id);
            return Ok(Vec::new());
        }

        let termo = busca
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let linhas = self.store.listar(ator, escopo, status).await?;

        Ok(linhas
            .into_iter()
            // O store já filtra; a checagem aqui garante o escopo mesmo assim
            .filter(|l| escopo.permite(l.armazem_id, l.cliente_id, l.representante_id))
            .filter(|l| match &termo {
                None => true,
                Some(t) => [&l.placa_caminhao, &l.motorista_nome, &l.cliente_nome]
                    .into_iter()
                    .flatten()
                    .any(|campo| campo.to_lowercase().contains(t.as_str())),
            })
            .collect())
    }

    pub async fn buscar(&self, ator: &ActorContext, id: Uuid) -> Result<CarregamentoCompleto, AppError> {
        let completo = self
            .store
            .buscar(ator, id)
            .await?
            .ok_or(AppError::NaoEncontrado)?;

        let reg = &completo.carregamento;
        if !ator.escopo().permite(reg.armazem_id, reg.cliente_id, completo.representante_id) {
            tracing::warn!("Ator {} tentou ler o carregamento {} fora do seu escopo", ator.user_id, id);
            return Err(AppError::AcessoNegado);
        }

        Ok(completo)
    }

    pub async fn detalhe(
        &self,
        ator: &ActorContext,
        id: Uuid,
        agora: DateTime<Utc>,
    ) -> Result<DetalheCarregamento, AppError> {
        let completo = self.buscar(ator, id).await?;
        let reg = &completo.carregamento;

        let etapas = etapas::resumo_etapas(reg, ator);
        let estatisticas = EstatisticasCarregamento::calcular(reg, agora);
        let pode_avancar = !reg.finalizado() && etapas::pode_operar(reg, ator);

        Ok(DetalheCarregamento { completo, etapas, estatisticas, pode_avancar })
    }

    pub async fn visao(&self, ator: &ActorContext, id: Uuid, etapa: i32) -> Result<VisaoEtapa, AppError> {
        let selecionada = Etapa::from_number(etapa).ok_or(TransicaoInvalida::EtapaInexistente(etapa))?;
        let completo = self.buscar(ator, id).await?;
        Ok(etapas::visao_etapa(&completo.carregamento, ator, selecionada))
    }

    /// Conclui a etapa atual: valida, envia os anexos e grava tudo numa
    /// escrita única. Qualquer falha antes da escrita deixa o registro intacto.
    pub async fn avancar_etapa(
        &self,
        ator: &ActorContext,
        id: Uuid,
        mut pedido: PedidoAvanco,
    ) -> Result<CarregamentoCompleto, AppError> {
        let mut completo = self.buscar(ator, id).await?;
        let def = etapas::validar_avanco(&completo.carregamento, ator, &pedido)?;

        let mut enviados = AnexosEnviados::default();
        let mut chaves: Vec<String> = Vec::new();

        let requisitos = [
            def.anexo_obrigatorio.map(|r| (r, true)),
            def.anexo_opcional.map(|r| (r, false)),
        ];
        for (req, obrigatorio) in requisitos.into_iter().flatten() {
            let Some(anexo) = pedido.retirar(req.tipo) else {
                continue;
            };

            let extensao = anexo.extensao_para_chave();
            let chave = chave_anexo(id, def.etapa, req.tipo, &extensao);
            let content_type = if anexo.content_type.is_empty() {
                content_type_for_extension(&extensao).to_string()
            } else {
                anexo.content_type.clone()
            };

            let url = match self.storage.upload(&chave, anexo.dados, &content_type).await {
                Ok(url) => url,
                Err(e) => {
                    if !chaves.is_empty() {
                        tracing::warn!("Upload abortado; arquivos órfãos no storage: {:?}", chaves);
                    }
                    return Err(match e {
                        AppError::Upload(msg) => AppError::Upload(msg),
                        outro => AppError::Upload(outro.to_string()),
                    });
                }
            };

            chaves.push(chave);
            if obrigatorio {
                enviados.obrigatorio = Some(url);
            } else {
                enviados.opcional = Some(url);
            }
        }

        let atualizacao =
            etapas::planejar_atualizacao(def, enviados, pedido.observacao_preenchida(), Utc::now())?;

        match self.store.aplicar_atualizacao(ator, id, &atualizacao).await {
            Ok(Some(carregamento)) => {
                tracing::info!(
                    "Carregamento {} avançou da etapa {} para {}",
                    id,
                    atualizacao.etapa.number(),
                    atualizacao.nova_etapa.number()
                );
                completo.carregamento = carregamento;
                Ok(completo)
            }
            Ok(None) => {
                tracing::warn!(
                    "Carregamento {} mudou antes da gravação da etapa {}; arquivos órfãos: {:?}",
                    id,
                    atualizacao.etapa.number(),
                    chaves
                );
                Err(AppError::EtapaDesatualizada)
            }
            Err(e) => {
                tracing::warn!("Falha ao gravar o carregamento {}; arquivos órfãos: {:?}", id, chaves);
                Err(match e {
                    AppError::Persistencia(msg) => AppError::Persistencia(msg),
                    outro => AppError::Persistencia(outro.to_string()),
                })
            }
        }
    }

    pub async fn url_anexo(&self, ator: &ActorContext, id: Uuid, campo: CampoAnexo) -> Result<UrlAssinada, AppError> {
        let completo = self.buscar(ator, id).await?;
        let url = completo
            .carregamento
            .url_do_campo(campo)
            .ok_or(AppError::AnexoNaoEncontrado)?;

        let assinada = self.storage.signed_url(url, self.validade_url_assinada).await?;
        let validade = chrono::Duration::from_std(self.validade_url_assinada)
            .map_err(|e| anyhow::anyhow!("Validade de URL assinada inválida: {}", e))?;

        Ok(UrlAssinada { url: assinada, expira_em: Utc::now() + validade })
    }
}
