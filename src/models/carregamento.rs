// src/models/carregamento.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "status_carregamento", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StatusCarregamento {
    Aguardando,
    EmAndamento,
    Finalizado,
}

/// As seis etapas do carregamento, na ordem em que acontecem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Etapa {
    Chegada = 1,
    Inicio = 2,
    Carregando = 3,
    Finalizacao = 4,
    Documentacao = 5,
    Finalizado = 6,
}

impl Etapa {
    #[cfg(test)]
    pub const TODAS: [Etapa; 6] = [
        Etapa::Chegada,
        Etapa::Inicio,
        Etapa::Carregando,
        Etapa::Finalizacao,
        Etapa::Documentacao,
        Etapa::Finalizado,
    ];

    pub fn from_number(n: i32) -> Option<Etapa> {
        match n {
            1 => Some(Etapa::Chegada),
            2 => Some(Etapa::Inicio),
            3 => Some(Etapa::Carregando),
            4 => Some(Etapa::Finalizacao),
            5 => Some(Etapa::Documentacao),
            6 => Some(Etapa::Finalizado),
            _ => None,
        }
    }

    pub fn number(self) -> i32 {
        self as i32
    }

    pub fn next(self) -> Option<Etapa> {
        Etapa::from_number(self.number() + 1)
    }

    pub fn is_terminal(self) -> bool {
        self == Etapa::Finalizado
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TipoAnexo {
    Foto,
    NotaFiscal,
    Xml,
}

impl TipoAnexo {
    pub fn slug(self) -> &'static str {
        match self {
            TipoAnexo::Foto => "foto",
            TipoAnexo::NotaFiscal => "nota-fiscal",
            TipoAnexo::Xml => "xml",
        }
    }
}

/// Anexos que podem ser baixados por URL assinada.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CampoAnexo {
    FotoChegada,
    FotoInicio,
    FotoCarregando,
    FotoFinalizacao,
    NotaFiscal,
    Xml,
}

// --- Structs do banco ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Carregamento {
    pub id: Uuid,
    pub agendamento_id: Uuid,
    pub cliente_id: Uuid,
    pub armazem_id: Uuid,
    #[schema(example = 1)]
    pub etapa_atual: i32,
    pub status: StatusCarregamento,

    pub data_chegada: Option<DateTime<Utc>>,
    pub data_inicio: Option<DateTime<Utc>>,
    pub data_carregando: Option<DateTime<Utc>>,
    pub data_finalizacao: Option<DateTime<Utc>>,
    pub data_documentacao: Option<DateTime<Utc>>,

    pub observacao_chegada: Option<String>,
    pub observacao_inicio: Option<String>,
    pub observacao_carregando: Option<String>,
    pub observacao_finalizacao: Option<String>,
    #[schema(example = "NF conferida")]
    pub observacao_documentacao: Option<String>,

    pub url_foto_chegada: Option<String>,
    pub url_foto_inicio: Option<String>,
    pub url_foto_carregando: Option<String>,
    pub url_foto_finalizacao: Option<String>,
    pub url_nota_fiscal: Option<String>,
    pub url_xml: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Carregamento {
    /// A etapa atual como enum. Valores fora de 1..=6 não passam pelo
    /// CHECK da tabela, mas caem em `None` em vez de pânico.
    pub fn etapa(&self) -> Option<Etapa> {
        Etapa::from_number(self.etapa_atual)
    }

    pub fn finalizado(&self) -> bool {
        self.status == StatusCarregamento::Finalizado
    }

    pub fn data_da_etapa(&self, etapa: Etapa) -> Option<DateTime<Utc>> {
        match etapa {
            Etapa::Chegada => self.data_chegada,
            Etapa::Inicio => self.data_inicio,
            Etapa::Carregando => self.data_carregando,
            Etapa::Finalizacao => self.data_finalizacao,
            Etapa::Documentacao => self.data_documentacao,
            Etapa::Finalizado => None,
        }
    }

    pub fn observacao_da_etapa(&self, etapa: Etapa) -> Option<&str> {
        let obs = match etapa {
            Etapa::Chegada => &self.observacao_chegada,
            Etapa::Inicio => &self.observacao_inicio,
            Etapa::Carregando => &self.observacao_carregando,
            Etapa::Finalizacao => &self.observacao_finalizacao,
            Etapa::Documentacao => &self.observacao_documentacao,
            Etapa::Finalizado => return None,
        };
        obs.as_deref()
    }

    pub fn anexos_da_etapa(&self, etapa: Etapa) -> Vec<LinkAnexo> {
        let foto = |url: &Option<String>| {
            url.iter()
                .map(|u| LinkAnexo { tipo: TipoAnexo::Foto, url: u.clone() })
                .collect::<Vec<_>>()
        };
        match etapa {
            Etapa::Chegada => foto(&self.url_foto_chegada),
            Etapa::Inicio => foto(&self.url_foto_inicio),
            Etapa::Carregando => foto(&self.url_foto_carregando),
            Etapa::Finalizacao => foto(&self.url_foto_finalizacao),
            Etapa::Documentacao => {
                let mut links = Vec::new();
                if let Some(u) = &self.url_nota_fiscal {
                    links.push(LinkAnexo { tipo: TipoAnexo::NotaFiscal, url: u.clone() });
                }
                if let Some(u) = &self.url_xml {
                    links.push(LinkAnexo { tipo: TipoAnexo::Xml, url: u.clone() });
                }
                links
            }
            Etapa::Finalizado => Vec::new(),
        }
    }

    pub fn url_do_campo(&self, campo: CampoAnexo) -> Option<&str> {
        let url = match campo {
            CampoAnexo::FotoChegada => &self.url_foto_chegada,
            CampoAnexo::FotoInicio => &self.url_foto_inicio,
            CampoAnexo::FotoCarregando => &self.url_foto_carregando,
            CampoAnexo::FotoFinalizacao => &self.url_foto_finalizacao,
            CampoAnexo::NotaFiscal => &self.url_nota_fiscal,
            CampoAnexo::Xml => &self.url_xml,
        };
        url.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LinkAnexo {
    pub tipo: TipoAnexo,
    pub url: String,
}

// O agendamento de retirada que originou o carregamento
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Agendamento {
    pub id: Uuid,
    pub data_retirada: NaiveDate,
    #[schema(example = "08:30")]
    pub horario: Option<String>,
    #[schema(example = "32.5")]
    pub quantidade: Decimal,
    #[schema(example = "ABC1D23")]
    pub placa_caminhao: String,
    pub motorista_nome: String,
    pub motorista_documento: Option<String>,
}

// Registro + agendamento + cliente, como a tela de detalhe precisa
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CarregamentoCompleto {
    #[serde(flatten)]
    pub carregamento: Carregamento,
    pub agendamento: Option<Agendamento>,
    pub cliente_nome: Option<String>,
    #[serde(skip)]
    pub representante_id: Option<Uuid>,
}

// Linha da listagem
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CarregamentoResumo {
    pub id: Uuid,
    pub etapa_atual: i32,
    pub status: StatusCarregamento,
    pub cliente_id: Uuid,
    pub armazem_id: Uuid,
    #[serde(skip)]
    pub representante_id: Option<Uuid>,
    pub cliente_nome: Option<String>,
    pub placa_caminhao: Option<String>,
    pub motorista_nome: Option<String>,
    pub data_retirada: Option<NaiveDate>,
    pub data_chegada: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// --- Entrada de arquivos ---

/// Arquivo recebido do formulário, ainda não enviado ao storage.
#[derive(Debug, Clone)]
pub struct Anexo {
    pub nome_arquivo: String,
    pub content_type: String,
    pub dados: Vec<u8>,
}

impl Anexo {
    fn extensao(&self) -> Option<String> {
        self.nome_arquivo
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }

    /// Content type sem parâmetros ("text/xml; charset=utf-8" -> "text/xml").
    /// `None` quando o cliente não declarou um tipo específico.
    fn tipo_declarado(&self) -> Option<String> {
        let mime = self
            .content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match mime.as_str() {
            "" | "application/octet-stream" => None,
            _ => Some(mime),
        }
    }

    // O tipo declarado manda; a extensão só vale quando ele é genérico
    pub fn is_imagem(&self) -> bool {
        match self.tipo_declarado() {
            Some(mime) => mime.starts_with("image/"),
            None => matches!(self.extensao().as_deref(), Some("jpg" | "jpeg" | "png" | "webp" | "heic")),
        }
    }

    pub fn is_pdf(&self) -> bool {
        match self.tipo_declarado() {
            Some(mime) => mime == "application/pdf",
            None => self.extensao().as_deref() == Some("pdf"),
        }
    }

    pub fn is_xml(&self) -> bool {
        match self.tipo_declarado() {
            Some(mime) => matches!(mime.as_str(), "application/xml" | "text/xml"),
            None => self.extensao().as_deref() == Some("xml"),
        }
    }

    /// Extensão usada na chave do storage.
    pub fn extensao_para_chave(&self) -> String {
        self.extensao().unwrap_or_else(|| "bin".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anexo(nome_arquivo: &str, content_type: &str) -> Anexo {
        Anexo { nome_arquivo: nome_arquivo.into(), content_type: content_type.into(), dados: vec![1] }
    }

    #[test]
    fn declared_type_wins_over_extension() {
        assert!(!anexo("foto.jpg", "application/pdf").is_imagem());
        assert!(anexo("foto.jpg", "application/pdf").is_pdf());
        assert!(!anexo("nf.pdf", "image/jpeg").is_pdf());
        assert!(!anexo("nf.xml", "application/pdf").is_xml());
    }

    #[test]
    fn extension_decides_when_type_is_generic() {
        assert!(anexo("caminhao.JPG", "").is_imagem());
        assert!(anexo("nf.pdf", "application/octet-stream").is_pdf());
        assert!(anexo("nf.xml", "").is_xml());
        assert!(!anexo("arquivo", "").is_imagem());
    }

    #[test]
    fn type_parameters_are_ignored() {
        assert!(anexo("nf", "text/xml; charset=utf-8").is_xml());
        assert!(anexo("nf", "Application/PDF").is_pdf());
    }
}
