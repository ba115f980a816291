// src/services/etapas.rs
//
// Regras da máquina de etapas do carregamento:
// chegada -> início -> carregando -> finalização -> documentação -> finalizado.
// Nada aqui faz I/O; o CarregamentoService cuida do upload e da escrita.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::models::{
    auth::{ActorContext, Role},
    carregamento::{Anexo, Carregamento, Etapa, LinkAnexo, StatusCarregamento, TipoAnexo},
};

// --- Definições estáticas ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequisitoAnexo {
    pub tipo: TipoAnexo,
    pub campo_url: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefinicaoEtapa {
    pub etapa: Etapa,
    pub nome: &'static str,
    pub campo_data: Option<&'static str>,
    pub campo_observacao: Option<&'static str>,
    pub anexo_obrigatorio: Option<RequisitoAnexo>,
    pub anexo_opcional: Option<RequisitoAnexo>,
}

const fn etapa_com_foto(
    etapa: Etapa,
    nome: &'static str,
    campo_data: &'static str,
    campo_observacao: &'static str,
    campo_foto: &'static str,
) -> DefinicaoEtapa {
    DefinicaoEtapa {
        etapa,
        nome,
        campo_data: Some(campo_data),
        campo_observacao: Some(campo_observacao),
        anexo_obrigatorio: Some(RequisitoAnexo { tipo: TipoAnexo::Foto, campo_url: campo_foto }),
        anexo_opcional: None,
    }
}

pub const ETAPAS: [DefinicaoEtapa; 6] = [
    etapa_com_foto(Etapa::Chegada, "Chegada", "data_chegada", "observacao_chegada", "url_foto_chegada"),
    etapa_com_foto(Etapa::Inicio, "Início", "data_inicio", "observacao_inicio", "url_foto_inicio"),
    etapa_com_foto(Etapa::Carregando, "Carregando", "data_carregando", "observacao_carregando", "url_foto_carregando"),
    etapa_com_foto(Etapa::Finalizacao, "Finalização", "data_finalizacao", "observacao_finalizacao", "url_foto_finalizacao"),
    DefinicaoEtapa {
        etapa: Etapa::Documentacao,
        nome: "Documentação",
        campo_data: Some("data_documentacao"),
        campo_observacao: Some("observacao_documentacao"),
        anexo_obrigatorio: Some(RequisitoAnexo { tipo: TipoAnexo::NotaFiscal, campo_url: "url_nota_fiscal" }),
        anexo_opcional: Some(RequisitoAnexo { tipo: TipoAnexo::Xml, campo_url: "url_xml" }),
    },
    DefinicaoEtapa {
        etapa: Etapa::Finalizado,
        nome: "Finalizado",
        campo_data: None,
        campo_observacao: None,
        anexo_obrigatorio: None,
        anexo_opcional: None,
    },
];

pub fn definicao(etapa: Etapa) -> &'static DefinicaoEtapa {
    &ETAPAS[etapa as usize - 1]
}

// --- Erros de transição ---

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransicaoInvalida {
    #[error("carregamento já finalizado")]
    JaFinalizado,

    #[error("ator sem permissão para operar o carregamento")]
    SemPermissao,

    #[error("etapa {0} não existe")]
    EtapaInexistente(i32),

    #[error("etapa selecionada {selecionada:?} difere da etapa atual {atual:?}")]
    EtapaIncorreta { atual: Etapa, selecionada: Etapa },

    #[error("etapa {0:?} já registrada")]
    HistoricoImutavel(Etapa),

    #[error("anexo obrigatório ausente: {0:?}")]
    AnexoObrigatorio(TipoAnexo),

    #[error("anexo com tipo inválido: {0:?}")]
    AnexoInvalido(TipoAnexo),
}

// --- Pedido e plano de atualização ---

/// O que o operador enviou para concluir uma etapa.
#[derive(Debug, Clone, Default)]
pub struct PedidoAvanco {
    pub etapa_selecionada: i32,
    pub foto: Option<Anexo>,
    pub nota_fiscal: Option<Anexo>,
    pub xml: Option<Anexo>,
    pub observacao: Option<String>,
}

impl PedidoAvanco {
    pub fn anexo(&self, tipo: TipoAnexo) -> Option<&Anexo> {
        match tipo {
            TipoAnexo::Foto => self.foto.as_ref(),
            TipoAnexo::NotaFiscal => self.nota_fiscal.as_ref(),
            TipoAnexo::Xml => self.xml.as_ref(),
        }
    }

    pub fn retirar(&mut self, tipo: TipoAnexo) -> Option<Anexo> {
        match tipo {
            TipoAnexo::Foto => self.foto.take(),
            TipoAnexo::NotaFiscal => self.nota_fiscal.take(),
            TipoAnexo::Xml => self.xml.take(),
        }
    }

    /// Observação aparada; texto em branco conta como ausente.
    pub fn observacao_preenchida(&self) -> Option<&str> {
        self.observacao
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

fn tipo_confere(tipo: TipoAnexo, anexo: &Anexo) -> bool {
    match tipo {
        TipoAnexo::Foto => anexo.is_imagem(),
        TipoAnexo::NotaFiscal => anexo.is_pdf(),
        TipoAnexo::Xml => anexo.is_xml(),
    }
}

/// URLs devolvidas pelo storage para os anexos já enviados.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnexosEnviados {
    pub obrigatorio: Option<String>,
    pub opcional: Option<String>,
}

/// A escrita única que conclui uma etapa.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtualizacaoEtapa {
    pub etapa: Etapa,
    pub data: DateTime<Utc>,
    pub observacao: Option<String>,
    pub url_anexo: String,
    pub url_anexo_opcional: Option<String>,
    pub nova_etapa: Etapa,
    pub novo_status: Option<StatusCarregamento>,
}

impl AtualizacaoEtapa {
    pub fn definicao(&self) -> &'static DefinicaoEtapa {
        definicao(self.etapa)
    }
}

/// Só o armazém vinculado ao carregamento pode operar as etapas.
pub fn pode_operar(registro: &Carregamento, ator: &ActorContext) -> bool {
    match ator.role {
        Role::Armazem => ator.linked_entity_id == Some(registro.armazem_id),
        Role::Admin | Role::Logistica | Role::Cliente | Role::Representante => false,
    }
}

/// Checa as pré-condições do avanço, nesta ordem: finalizado, permissão,
/// etapa selecionada, histórico e anexos.
pub fn validar_avanco(
    registro: &Carregamento,
    ator: &ActorContext,
    pedido: &PedidoAvanco,
) -> Result<&'static DefinicaoEtapa, TransicaoInvalida> {
    if registro.finalizado() || registro.etapa().is_some_and(Etapa::is_terminal) {
        return Err(TransicaoInvalida::JaFinalizado);
    }

    if !pode_operar(registro, ator) {
        return Err(TransicaoInvalida::SemPermissao);
    }

    let atual = registro
        .etapa()
        .ok_or(TransicaoInvalida::EtapaInexistente(registro.etapa_atual))?;
    let selecionada = Etapa::from_number(pedido.etapa_selecionada)
        .ok_or(TransicaoInvalida::EtapaInexistente(pedido.etapa_selecionada))?;

    if selecionada != atual {
        return Err(TransicaoInvalida::EtapaIncorreta { atual, selecionada });
    }

    if registro.data_da_etapa(atual).is_some() {
        return Err(TransicaoInvalida::HistoricoImutavel(atual));
    }

    let def = definicao(atual);

    if let Some(req) = def.anexo_obrigatorio {
        let anexo = pedido
            .anexo(req.tipo)
            .ok_or(TransicaoInvalida::AnexoObrigatorio(req.tipo))?;
        if !tipo_confere(req.tipo, anexo) {
            return Err(TransicaoInvalida::AnexoInvalido(req.tipo));
        }
    }

    if let Some(req) = def.anexo_opcional {
        if let Some(anexo) = pedido.anexo(req.tipo) {
            if !tipo_confere(req.tipo, anexo) {
                return Err(TransicaoInvalida::AnexoInvalido(req.tipo));
            }
        }
    }

    Ok(def)
}

pub fn planejar_atualizacao(
    def: &DefinicaoEtapa,
    enviados: AnexosEnviados,
    observacao: Option<&str>,
    agora: DateTime<Utc>,
) -> Result<AtualizacaoEtapa, TransicaoInvalida> {
    let nova_etapa = def.etapa.next().ok_or(TransicaoInvalida::JaFinalizado)?;

    let url_anexo = match def.anexo_obrigatorio {
        Some(req) => enviados
            .obrigatorio
            .ok_or(TransicaoInvalida::AnexoObrigatorio(req.tipo))?,
        None => return Err(TransicaoInvalida::JaFinalizado),
    };

    let url_anexo_opcional = def.anexo_opcional.and(enviados.opcional);

    let novo_status = nova_etapa
        .is_terminal()
        .then_some(StatusCarregamento::Finalizado);

    Ok(AtualizacaoEtapa {
        etapa: def.etapa,
        data: agora,
        observacao: observacao
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        url_anexo,
        url_anexo_opcional,
        nova_etapa,
        novo_status,
    })
}

/// Aplica a atualização num registro em memória (espelha o UPDATE do repositório).
#[cfg(test)]
pub fn aplicar(registro: &mut Carregamento, at: &AtualizacaoEtapa) {
    let data = Some(at.data);
    let obs = at.observacao.clone();
    let url = Some(at.url_anexo.clone());
    match at.etapa {
        Etapa::Chegada => {
            registro.data_chegada = data;
            registro.url_foto_chegada = url;
            if obs.is_some() {
                registro.observacao_chegada = obs;
            }
        }
        Etapa::Inicio => {
            registro.data_inicio = data;
            registro.url_foto_inicio = url;
            if obs.is_some() {
                registro.observacao_inicio = obs;
            }
        }
        Etapa::Carregando => {
            registro.data_carregando = data;
            registro.url_foto_carregando = url;
            if obs.is_some() {
                registro.observacao_carregando = obs;
            }
        }
        Etapa::Finalizacao => {
            registro.data_finalizacao = data;
            registro.url_foto_finalizacao = url;
            if obs.is_some() {
                registro.observacao_finalizacao = obs;
            }
        }
        Etapa::Documentacao => {
            registro.data_documentacao = data;
            registro.url_nota_fiscal = url;
            if at.url_anexo_opcional.is_some() {
                registro.url_xml = at.url_anexo_opcional.clone();
            }
            if obs.is_some() {
                registro.observacao_documentacao = obs;
            }
        }
        Etapa::Finalizado => return,
    }
    registro.etapa_atual = at.nova_etapa.number();
    if let Some(status) = at.novo_status {
        registro.status = status;
    }
    registro.updated_at = at.data;
}

// --- Visão de cada etapa (somente leitura) ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "estado", rename_all = "snake_case")]
pub enum VisaoEtapa {
    ProcessoFinalizado,
    Concluida {
        data: Option<DateTime<Utc>>,
        observacao: Option<String>,
        anexos: Vec<LinkAnexo>,
    },
    Editavel {
        #[serde(rename = "anexoObrigatorio")]
        anexo_obrigatorio: Option<TipoAnexo>,
        #[serde(rename = "anexoOpcional")]
        anexo_opcional: Option<TipoAnexo>,
    },
    AguardandoArmazem,
    AguardandoEtapaAnterior,
}

pub fn visao_etapa(registro: &Carregamento, ator: &ActorContext, selecionada: Etapa) -> VisaoEtapa {
    let atual = match registro.etapa() {
        Some(etapa) if !registro.finalizado() && !etapa.is_terminal() => etapa,
        _ => return VisaoEtapa::ProcessoFinalizado,
    };

    if selecionada < atual {
        VisaoEtapa::Concluida {
            data: registro.data_da_etapa(selecionada),
            observacao: registro.observacao_da_etapa(selecionada).map(str::to_string),
            anexos: registro.anexos_da_etapa(selecionada),
        }
    } else if selecionada > atual {
        VisaoEtapa::AguardandoEtapaAnterior
    } else if pode_operar(registro, ator) {
        let def = definicao(atual);
        VisaoEtapa::Editavel {
            anexo_obrigatorio: def.anexo_obrigatorio.map(|r| r.tipo),
            anexo_opcional: def.anexo_opcional.map(|r| r.tipo),
        }
    } else {
        VisaoEtapa::AguardandoArmazem
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EtapaResumo {
    pub numero: i32,
    pub nome: String,
    pub visao: VisaoEtapa,
}

pub fn resumo_etapas(registro: &Carregamento, ator: &ActorContext) -> Vec<EtapaResumo> {
    ETAPAS
        .iter()
        .map(|def| EtapaResumo {
            numero: def.etapa.number(),
            nome: def.nome.to_string(),
            visao: visao_etapa(registro, ator, def.etapa),
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;
    use uuid::Uuid;

    pub(crate) fn registro(etapa: i32) -> Carregamento {
        let criado = Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap();
        Carregamento {
            id: Uuid::new_v4(),
            agendamento_id: Uuid::new_v4(),
            cliente_id: Uuid::new_v4(),
            armazem_id: Uuid::new_v4(),
            etapa_atual: etapa,
            status: StatusCarregamento::EmAndamento,
            data_chegada: None,
            data_inicio: None,
            data_carregando: None,
            data_finalizacao: None,
            data_documentacao: None,
            observacao_chegada: None,
            observacao_inicio: None,
            observacao_carregando: None,
            observacao_finalizacao: None,
            observacao_documentacao: None,
            url_foto_chegada: None,
            url_foto_inicio: None,
            url_foto_carregando: None,
            url_foto_finalizacao: None,
            url_nota_fiscal: None,
            url_xml: None,
            created_at: criado,
            updated_at: criado,
        }
    }

    pub(crate) fn operador(reg: &Carregamento) -> ActorContext {
        ActorContext::new(Uuid::new_v4(), Role::Armazem, Some(reg.armazem_id))
    }

    pub(crate) fn foto() -> Anexo {
        Anexo {
            nome_arquivo: "caminhao.jpg".into(),
            content_type: "image/jpeg".into(),
            dados: vec![0xFF, 0xD8, 0xFF],
        }
    }

    pub(crate) fn pdf() -> Anexo {
        Anexo {
            nome_arquivo: "nf-123.pdf".into(),
            content_type: "application/pdf".into(),
            dados: b"%PDF-1.4".to_vec(),
        }
    }

    pub(crate) fn xml() -> Anexo {
        Anexo {
            nome_arquivo: "nf-123.xml".into(),
            content_type: "application/xml".into(),
            dados: b"<nfeProc/>".to_vec(),
        }
    }

    fn pedido_com_foto(etapa: i32) -> PedidoAvanco {
        PedidoAvanco { etapa_selecionada: etapa, foto: Some(foto()), ..Default::default() }
    }

    fn enviados(url: &str) -> AnexosEnviados {
        AnexosEnviados { obrigatorio: Some(url.to_string()), opcional: None }
    }

    #[test]
    fn stage_table_is_ordered_and_complete() {
        for (i, def) in ETAPAS.iter().enumerate() {
            assert_eq!(def.etapa.number(), i as i32 + 1);
        }
        assert!(ETAPAS[..5].iter().all(|d| d.campo_data.is_some() && d.anexo_obrigatorio.is_some()));
        assert_eq!(ETAPAS[4].anexo_obrigatorio.map(|r| r.tipo), Some(TipoAnexo::NotaFiscal));
        assert_eq!(ETAPAS[4].anexo_opcional.map(|r| r.tipo), Some(TipoAnexo::Xml));
        assert_eq!(ETAPAS[5].campo_data, None);
    }

    #[test]
    fn arrival_with_photo_advances_to_start() {
        let reg = registro(1);
        let ator = operador(&reg);
        let def = validar_avanco(&reg, &ator, &pedido_com_foto(1)).unwrap();
        let agora = Utc::now();
        let at = planejar_atualizacao(def, enviados("https://s/foto.jpg"), None, agora).unwrap();

        assert_eq!(at.etapa, Etapa::Chegada);
        assert_eq!(at.nova_etapa, Etapa::Inicio);
        assert_eq!(at.novo_status, None);
        assert_eq!(at.observacao, None);

        let mut depois = reg.clone();
        aplicar(&mut depois, &at);
        assert_eq!(depois.data_chegada, Some(agora));
        assert_eq!(depois.etapa_atual, 2);
        assert_eq!(depois.status, reg.status);
    }

    #[test]
    fn documentation_finishes_the_process() {
        let reg = registro(5);
        let ator = operador(&reg);
        let pedido = PedidoAvanco {
            etapa_selecionada: 5,
            nota_fiscal: Some(pdf()),
            xml: Some(xml()),
            observacao: Some("NF conferida".into()),
            ..Default::default()
        };
        let def = validar_avanco(&reg, &ator, &pedido).unwrap();
        let at = planejar_atualizacao(
            def,
            AnexosEnviados {
                obrigatorio: Some("https://s/nf.pdf".into()),
                opcional: Some("https://s/nf.xml".into()),
            },
            pedido.observacao_preenchida(),
            Utc::now(),
        )
        .unwrap();

        let mut depois = reg.clone();
        aplicar(&mut depois, &at);
        assert_eq!(depois.url_nota_fiscal.as_deref(), Some("https://s/nf.pdf"));
        assert_eq!(depois.url_xml.as_deref(), Some("https://s/nf.xml"));
        assert_eq!(depois.observacao_documentacao.as_deref(), Some("NF conferida"));
        assert_eq!(depois.etapa_atual, 6);
        assert_eq!(depois.status, StatusCarregamento::Finalizado);
    }

    #[test]
    fn client_cannot_advance() {
        let reg = registro(3);
        let cliente = ActorContext::new(Uuid::new_v4(), Role::Cliente, Some(reg.cliente_id));
        assert_eq!(
            validar_avanco(&reg, &cliente, &pedido_com_foto(3)),
            Err(TransicaoInvalida::SemPermissao)
        );
    }

    #[test]
    fn admin_and_other_warehouses_cannot_advance() {
        let reg = registro(2);
        for ator in [
            ActorContext::new(Uuid::new_v4(), Role::Admin, None),
            ActorContext::new(Uuid::new_v4(), Role::Logistica, None),
            ActorContext::new(Uuid::new_v4(), Role::Armazem, Some(Uuid::new_v4())),
            ActorContext::new(Uuid::new_v4(), Role::Armazem, None),
        ] {
            assert_eq!(
                validar_avanco(&reg, &ator, &pedido_com_foto(2)),
                Err(TransicaoInvalida::SemPermissao)
            );
        }
    }

    #[test]
    fn missing_photo_is_rejected() {
        let reg = registro(2);
        let ator = operador(&reg);
        let pedido = PedidoAvanco { etapa_selecionada: 2, ..Default::default() };
        assert_eq!(
            validar_avanco(&reg, &ator, &pedido),
            Err(TransicaoInvalida::AnexoObrigatorio(TipoAnexo::Foto))
        );
    }

    #[test]
    fn documentation_requires_pdf_even_with_xml() {
        let reg = registro(5);
        let ator = operador(&reg);
        let pedido = PedidoAvanco { etapa_selecionada: 5, xml: Some(xml()), ..Default::default() };
        assert_eq!(
            validar_avanco(&reg, &ator, &pedido),
            Err(TransicaoInvalida::AnexoObrigatorio(TipoAnexo::NotaFiscal))
        );
    }

    #[test]
    fn wrong_file_kinds_are_rejected() {
        let reg = registro(1);
        let ator = operador(&reg);
        let pedido = PedidoAvanco { etapa_selecionada: 1, foto: Some(pdf()), ..Default::default() };
        assert_eq!(
            validar_avanco(&reg, &ator, &pedido),
            Err(TransicaoInvalida::AnexoInvalido(TipoAnexo::Foto))
        );

        let reg = registro(5);
        let ator = operador(&reg);
        let pedido = PedidoAvanco {
            etapa_selecionada: 5,
            nota_fiscal: Some(pdf()),
            xml: Some(foto()),
            ..Default::default()
        };
        assert_eq!(
            validar_avanco(&reg, &ator, &pedido),
            Err(TransicaoInvalida::AnexoInvalido(TipoAnexo::Xml))
        );

        // Nome de foto não disfarça um PDF, nem o contrário
        let reg = registro(2);
        let ator = operador(&reg);
        let disfarcado = Anexo { nome_arquivo: "foto.jpg".into(), ..pdf() };
        let pedido = PedidoAvanco { etapa_selecionada: 2, foto: Some(disfarcado), ..Default::default() };
        assert_eq!(
            validar_avanco(&reg, &ator, &pedido),
            Err(TransicaoInvalida::AnexoInvalido(TipoAnexo::Foto))
        );

        let reg = registro(5);
        let ator = operador(&reg);
        let disfarcada = Anexo { nome_arquivo: "nf-123.pdf".into(), ..foto() };
        let pedido = PedidoAvanco { etapa_selecionada: 5, nota_fiscal: Some(disfarcada), ..Default::default() };
        assert_eq!(
            validar_avanco(&reg, &ator, &pedido),
            Err(TransicaoInvalida::AnexoInvalido(TipoAnexo::NotaFiscal))
        );
    }

    #[test]
    fn only_the_current_stage_can_be_advanced() {
        let reg = registro(3);
        let ator = operador(&reg);
        assert_eq!(
            validar_avanco(&reg, &ator, &pedido_com_foto(2)),
            Err(TransicaoInvalida::EtapaIncorreta { atual: Etapa::Carregando, selecionada: Etapa::Inicio })
        );
        assert_eq!(
            validar_avanco(&reg, &ator, &pedido_com_foto(9)),
            Err(TransicaoInvalida::EtapaInexistente(9))
        );
    }

    #[test]
    fn finished_record_rejects_everyone() {
        let mut reg = registro(6);
        reg.status = StatusCarregamento::Finalizado;
        let operador = operador(&reg);
        let admin = ActorContext::new(Uuid::new_v4(), Role::Admin, None);
        for ator in [operador, admin] {
            for etapa in 1..=6 {
                assert_eq!(
                    validar_avanco(&reg, &ator, &pedido_com_foto(etapa)),
                    Err(TransicaoInvalida::JaFinalizado)
                );
            }
        }
    }

    #[test]
    fn recorded_stage_cannot_be_rewritten() {
        let mut reg = registro(2);
        reg.data_inicio = Some(Utc::now());
        let ator = operador(&reg);
        assert_eq!(
            validar_avanco(&reg, &ator, &pedido_com_foto(2)),
            Err(TransicaoInvalida::HistoricoImutavel(Etapa::Inicio))
        );
    }

    #[test]
    fn blank_observation_is_not_written() {
        let def = definicao(Etapa::Carregando);
        let at = planejar_atualizacao(def, enviados("u"), Some("   "), Utc::now()).unwrap();
        assert_eq!(at.observacao, None);
        let at = planejar_atualizacao(def, enviados("u"), Some(" lona rasgada "), Utc::now()).unwrap();
        assert_eq!(at.observacao.as_deref(), Some("lona rasgada"));
    }

    #[test]
    fn terminal_stage_has_no_plan() {
        let def = definicao(Etapa::Finalizado);
        assert_eq!(
            planejar_atualizacao(def, enviados("u"), None, Utc::now()),
            Err(TransicaoInvalida::JaFinalizado)
        );
    }

    #[test]
    fn stage_views_follow_the_current_stage() {
        let mut reg = registro(3);
        reg.data_chegada = Some(Utc::now());
        reg.observacao_chegada = Some("ok".into());
        reg.url_foto_chegada = Some("https://s/1.jpg".into());
        let op = operador(&reg);
        let cliente = ActorContext::new(Uuid::new_v4(), Role::Cliente, Some(reg.cliente_id));

        match visao_etapa(&reg, &cliente, Etapa::Chegada) {
            VisaoEtapa::Concluida { observacao, anexos, .. } => {
                assert_eq!(observacao.as_deref(), Some("ok"));
                assert_eq!(anexos.len(), 1);
            }
            outra => panic!("esperava concluída, veio {outra:?}"),
        }
        assert_eq!(
            visao_etapa(&reg, &op, Etapa::Carregando),
            VisaoEtapa::Editavel { anexo_obrigatorio: Some(TipoAnexo::Foto), anexo_opcional: None }
        );
        assert_eq!(visao_etapa(&reg, &cliente, Etapa::Carregando), VisaoEtapa::AguardandoArmazem);
        assert_eq!(visao_etapa(&reg, &op, Etapa::Documentacao), VisaoEtapa::AguardandoEtapaAnterior);

        reg.etapa_atual = 6;
        reg.status = StatusCarregamento::Finalizado;
        for etapa in Etapa::TODAS {
            assert_eq!(visao_etapa(&reg, &op, etapa), VisaoEtapa::ProcessoFinalizado);
        }
    }

    #[test]
    fn stage_summary_lists_all_six() {
        let reg = registro(1);
        let resumo = resumo_etapas(&reg, &operador(&reg));
        assert_eq!(resumo.len(), 6);
        assert_eq!(resumo[0].nome, "Chegada");
        assert!(matches!(resumo[0].visao, VisaoEtapa::Editavel { .. }));
        assert!(matches!(resumo[5].visao, VisaoEtapa::AguardandoEtapaAnterior));
    }

    proptest! {
        // Sequências arbitrárias de tentativas: cada sucesso sobe exatamente uma
        // etapa, datas já gravadas nunca mudam e finalizado <=> etapa 6.
        #[test]
        fn advancing_is_monotonic_and_append_only(tentativas in proptest::collection::vec((1i32..=7, any::<bool>(), any::<bool>()), 0..20)) {
            let mut reg = registro(1);
            reg.status = StatusCarregamento::Aguardando;
            let op = operador(&reg);
            let mut agora = Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap();

            for (etapa, com_anexo, ator_certo) in tentativas {
                agora += Duration::minutes(7);
                let ator = if ator_certo { op.clone() } else { ActorContext::new(Uuid::new_v4(), Role::Logistica, None) };
                let pedido = PedidoAvanco {
                    etapa_selecionada: etapa,
                    foto: com_anexo.then(foto),
                    nota_fiscal: com_anexo.then(pdf),
                    ..Default::default()
                };
                let antes = reg.clone();
                match validar_avanco(&reg, &ator, &pedido) {
                    Ok(def) => {
                        let at = planejar_atualizacao(def, enviados("u"), None, agora).unwrap();
                        aplicar(&mut reg, &at);
                        prop_assert_eq!(reg.etapa_atual, antes.etapa_atual + 1);
                    }
                    Err(_) => {
                        prop_assert_eq!(reg.etapa_atual, antes.etapa_atual);
                    }
                }
                for e in Etapa::TODAS {
                    if let Some(t) = antes.data_da_etapa(e) {
                        prop_assert_eq!(reg.data_da_etapa(e), Some(t));
                    }
                }
                prop_assert_eq!(reg.finalizado(), reg.etapa_atual == 6);
            }
        }
    }
}
