use std::collections::BTreeMap;

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::db::repository;
use crate::error::AppError;
use crate::models::{ConcluidoPorConteudo, ReportRecord, Status};

/// Calendar days covered by a report, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportRange {
    /// Missing bounds fall back to a `default_days` window ending today, or ending at
    /// `end` when only the start is missing. Bounds too close to the edge of the
    /// calendar to step a window from count as missing.
    pub fn resolve(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
        default_days: i64,
    ) -> Self {
        let back = Days::new(default_days.max(0) as u64);
        let usable = |d: &NaiveDate| {
            d.checked_add_days(Days::new(1)).is_some() && d.checked_sub_days(back).is_some()
        };
        let end = end.filter(usable).unwrap_or(today);
        let start = start
            .filter(usable)
            .or_else(|| end.checked_sub_days(back))
            .unwrap_or(end);
        Self { start, end }
    }

    /// Timestamp bounds `[start 00:00, day after end 00:00)`.
    pub fn bounds(&self) -> (NaiveDateTime, NaiveDateTime) {
        let start = self.start.and_time(NaiveTime::MIN);
        let end = self
            .end
            .checked_add_days(Days::new(1))
            .map_or(NaiveDateTime::MAX, |d| d.and_time(NaiveTime::MIN));
        (start, end)
    }
}

/// Parses `YYYY-MM-DD` or an ISO datetime, keeping only the date. Garbage and years
/// outside 1..=9999 yield `None`.
pub fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| crate::models::agendamento::parse_datetime(raw).map(|dt| dt.date()))
        .filter(|d| (1..=9999).contains(&d.year()))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub id: String,
    pub inicio: NaiveDateTime,
    pub duracao_minutos: i64,
    pub status: Status,
    pub aluno: String,
    pub serie: String,
    pub turno: String,
    pub professor: String,
    pub especialidade: String,
    pub conteudo: String,
    pub descritor: String,
    pub duracao_horas: f64,
    pub mes: String,
}

impl From<ReportRecord> for ReportRow {
    fn from(r: ReportRecord) -> Self {
        let duracao_minutos = r.duracao_minutos.unwrap_or(0);
        Self {
            mes: r.inicio.format("%Y-%m").to_string(),
            duracao_horas: duracao_minutos as f64 / 60.0,
            id: r.id,
            inicio: r.inicio,
            duracao_minutos,
            status: r.status,
            aluno: r.aluno.unwrap_or_default(),
            serie: r.serie.unwrap_or_default(),
            turno: r.turno.unwrap_or_default(),
            professor: r.professor.unwrap_or_default(),
            especialidade: r.especialidade.unwrap_or_default(),
            conteudo: r.conteudo.unwrap_or_default(),
            descritor: r.descritor.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PorProfessor {
    pub professor: String,
    pub agendamentos: usize,
    pub horas: f64,
}

impl From<GroupTotal> for PorProfessor {
    fn from(g: GroupTotal) -> Self {
        Self {
            professor: g.chave,
            agendamentos: g.agendamentos,
            horas: g.horas,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PorAluno {
    pub aluno: String,
    pub agendamentos: usize,
    pub horas: f64,
}

impl From<GroupTotal> for PorAluno {
    fn from(g: GroupTotal) -> Self {
        Self {
            aluno: g.chave,
            agendamentos: g.agendamentos,
            horas: g.horas,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PorConteudo {
    pub conteudo: String,
    pub agendamentos: usize,
    pub horas: f64,
}

impl From<GroupTotal> for PorConteudo {
    fn from(g: GroupTotal) -> Self {
        Self {
            conteudo: g.chave,
            agendamentos: g.agendamentos,
            horas: g.horas,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PorMes {
    pub mes: String,
    pub agendamentos: usize,
    pub horas: f64,
}

impl From<GroupTotal> for PorMes {
    fn from(g: GroupTotal) -> Self {
        Self {
            mes: g.chave,
            agendamentos: g.agendamentos,
            horas: g.horas,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupTotal {
    pub chave: String,
    pub agendamentos: usize,
    pub horas: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resumo {
    pub periodo_inicial: NaiveDate,
    pub periodo_final: NaiveDate,
    pub total_agendamentos: usize,
    pub total_horas: f64,
    pub media_duracao_min: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportBundle {
    pub resumo: Resumo,
    pub by_professor: Vec<PorProfessor>,
    pub by_aluno: Vec<PorAluno>,
    pub by_conteudo: Vec<PorConteudo>,
    pub monthly: Vec<PorMes>,
    pub agendamentos_rows: Vec<ReportRow>,
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Counts and hour sums per key, keys in ascending order.
fn group_by<F>(rows: &[ReportRow], key: F) -> Vec<GroupTotal>
where
    F: Fn(&ReportRow) -> &str,
{
    let mut groups: BTreeMap<&str, (usize, i64)> = BTreeMap::new();
    for row in rows {
        let entry = groups.entry(key(row)).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += row.duracao_minutos;
    }
    groups
        .into_iter()
        .map(|(chave, (agendamentos, minutos))| GroupTotal {
            chave: chave.to_string(),
            agendamentos,
            horas: round_to(minutos as f64 / 60.0, 2),
        })
        .collect()
}

/// Busiest first; the sort is stable so ties stay in key order.
fn by_count_desc<T: From<GroupTotal>>(mut groups: Vec<GroupTotal>) -> Vec<T> {
    groups.sort_by(|a, b| b.agendamentos.cmp(&a.agendamentos));
    groups.into_iter().map(T::from).collect()
}

/// Builds the full bundle from already fetched rows.
pub fn aggregate(range: ReportRange, records: Vec<ReportRecord>) -> ReportBundle {
    let rows: Vec<ReportRow> = records.into_iter().map(ReportRow::from).collect();

    let total_agendamentos = rows.len();
    let total_minutos: i64 = rows.iter().map(|r| r.duracao_minutos).sum();
    let media_duracao_min = if total_agendamentos == 0 {
        0.0
    } else {
        round_to(total_minutos as f64 / total_agendamentos as f64, 1)
    };

    let resumo = Resumo {
        periodo_inicial: range.start,
        periodo_final: range.end,
        total_agendamentos,
        total_horas: round_to(total_minutos as f64 / 60.0, 2),
        media_duracao_min,
    };

    ReportBundle {
        resumo,
        by_professor: by_count_desc(group_by(&rows, |r| r.professor.as_str())),
        by_aluno: by_count_desc(group_by(&rows, |r| r.aluno.as_str())),
        by_conteudo: by_count_desc(group_by(&rows, |r| r.conteudo.as_str())),
        monthly: group_by(&rows, |r| r.mes.as_str())
            .into_iter()
            .map(PorMes::from)
            .collect(),
        agendamentos_rows: rows,
    }
}

pub async fn generate(db: &SqlitePool, range: ReportRange) -> Result<ReportBundle, AppError> {
    let (start, end) = range.bounds();
    let records = repository::fetch_report_records(db, start, end).await?;
    let bundle = aggregate(range, records);
    info!(
        "report {}..{}: {} agendamentos, {} h",
        range.start, range.end, bundle.resumo.total_agendamentos, bundle.resumo.total_horas
    );
    Ok(bundle)
}

/// Completed appointments per content within the range, busiest first.
pub async fn concluidos_por_conteudo(
    db: &SqlitePool,
    range: ReportRange,
) -> Result<Vec<ConcluidoPorConteudo>, AppError> {
    let (start, end) = range.bounds();
    Ok(repository::fetch_concluidos_por_conteudo(db, start, end).await?)
}
