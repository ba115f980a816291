// src/services/estatisticas.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::carregamento::{Carregamento, Etapa};

// Etapas com data registrada, na ordem
const ETAPAS_COM_DATA: [Etapa; 5] = [
    Etapa::Chegada,
    Etapa::Inicio,
    Etapa::Carregando,
    Etapa::Finalizacao,
    Etapa::Documentacao,
];

fn minutos_entre(inicio: DateTime<Utc>, fim: DateTime<Utc>) -> i64 {
    (fim - inicio).num_minutes()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DuracaoEtapa {
    pub de: Etapa,
    pub para: Etapa,
    pub minutos: i64,
}

pub fn minutos_desde_inicio(registro: &Carregamento, agora: DateTime<Utc>) -> Option<i64> {
    registro.data_chegada.map(|inicio| minutos_entre(inicio, agora))
}

/// Chegada até documentação; só existe depois de finalizado.
pub fn duracao_total(registro: &Carregamento) -> Option<i64> {
    if !registro.finalizado() {
        return None;
    }
    match (registro.data_chegada, registro.data_documentacao) {
        (Some(inicio), Some(fim)) => Some(minutos_entre(inicio, fim)),
        _ => None,
    }
}

/// Pares consecutivos em que as duas datas existem. Lacunas são puladas, nunca viram zero.
pub fn duracoes_por_etapa(registro: &Carregamento) -> Vec<DuracaoEtapa> {
    ETAPAS_COM_DATA
        .windows(2)
        .filter_map(|par| {
            let inicio = registro.data_da_etapa(par[0])?;
            let fim = registro.data_da_etapa(par[1])?;
            Some(DuracaoEtapa { de: par[0], para: par[1], minutos: minutos_entre(inicio, fim) })
        })
        .collect()
}

/// Média arredondada para o minuto mais próximo.
pub fn duracao_media(duracoes: &[DuracaoEtapa]) -> Option<i64> {
    if duracoes.is_empty() {
        return None;
    }
    let soma: i64 = duracoes.iter().map(|d| d.minutos).sum();
    Some((soma as f64 / duracoes.len() as f64).round() as i64)
}

/// 45 -> "45min", 120 -> "2h", 135 -> "2h 15min"
pub fn formatar_duracao(minutos: i64) -> String {
    if minutos < 60 {
        return format!("{}min", minutos);
    }
    let horas = minutos / 60;
    let resto = minutos % 60;
    if resto == 0 {
        format!("{}h", horas)
    } else {
        format!("{}h {}min", horas, resto)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EstatisticasCarregamento {
    pub minutos_desde_inicio: Option<i64>,
    pub tempo_desde_inicio: Option<String>,
    pub duracao_total_minutos: Option<i64>,
    pub duracao_total: Option<String>,
    pub duracoes_por_etapa: Vec<DuracaoEtapa>,
    pub media_por_etapa_minutos: Option<i64>,
    pub media_por_etapa: Option<String>,
}

impl EstatisticasCarregamento {
    pub fn calcular(registro: &Carregamento, agora: DateTime<Utc>) -> Self {
        let desde_inicio = minutos_desde_inicio(registro, agora);
        let total = duracao_total(registro);
        let duracoes = duracoes_por_etapa(registro);
        let media = duracao_media(&duracoes);

        Self {
            minutos_desde_inicio: desde_inicio,
            tempo_desde_inicio: desde_inicio.map(formatar_duracao),
            duracao_total_minutos: total,
            duracao_total: total.map(formatar_duracao),
            duracoes_por_etapa: duracoes,
            media_por_etapa_minutos: media,
            media_por_etapa: media.map(formatar_duracao),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::carregamento::StatusCarregamento;
    use crate::services::etapas::tests::registro;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap()
    }

    #[test]
    fn gaps_are_skipped_not_zeroed() {
        let mut reg = registro(5);
        reg.data_chegada = Some(t0());
        reg.data_inicio = Some(t0() + Duration::minutes(30));
        reg.data_finalizacao = Some(t0() + Duration::minutes(90));

        let minutos: Vec<i64> = duracoes_por_etapa(&reg).iter().map(|d| d.minutos).collect();
        assert_eq!(minutos, vec![30]);
        assert_eq!(duracao_media(&duracoes_por_etapa(&reg)), Some(30));
    }

    #[test]
    fn average_is_absent_without_pairs() {
        let mut reg = registro(2);
        reg.data_chegada = Some(t0());
        assert!(duracoes_por_etapa(&reg).is_empty());
        assert_eq!(duracao_media(&[]), None);

        let est = EstatisticasCarregamento::calcular(&reg, t0() + Duration::minutes(75));
        assert_eq!(est.minutos_desde_inicio, Some(75));
        assert_eq!(est.tempo_desde_inicio.as_deref(), Some("1h 15min"));
        assert_eq!(est.media_por_etapa, None);
        assert_eq!(est.duracao_total, None);
    }

    #[test]
    fn total_only_when_finished() {
        let mut reg = registro(6);
        reg.data_chegada = Some(t0());
        reg.data_inicio = Some(t0() + Duration::minutes(10));
        reg.data_carregando = Some(t0() + Duration::minutes(25));
        reg.data_finalizacao = Some(t0() + Duration::minutes(100));
        reg.data_documentacao = Some(t0() + Duration::minutes(120));
        assert_eq!(duracao_total(&reg), None);

        reg.status = StatusCarregamento::Finalizado;
        assert_eq!(duracao_total(&reg), Some(120));

        let duracoes = duracoes_por_etapa(&reg);
        assert_eq!(duracoes.iter().map(|d| d.minutos).collect::<Vec<_>>(), vec![10, 15, 75, 20]);
        assert_eq!(duracoes[0].de, Etapa::Chegada);
        assert_eq!(duracoes[3].para, Etapa::Documentacao);
        assert_eq!(duracao_media(&duracoes), Some(30));
    }

    #[test]
    fn no_elapsed_time_before_arrival() {
        let reg = registro(1);
        assert_eq!(minutos_desde_inicio(&reg, t0()), None);
    }

    #[test]
    fn duration_formatting() {
        assert_eq!(formatar_duracao(0), "0min");
        assert_eq!(formatar_duracao(59), "59min");
        assert_eq!(formatar_duracao(60), "1h");
        assert_eq!(formatar_duracao(61), "1h 1min");
        assert_eq!(formatar_duracao(180), "3h");
        assert_eq!(formatar_duracao(135), "2h 15min");
    }
}
