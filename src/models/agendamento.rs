use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum Status {
    #[default]
    Agendado,
    Concluido,
    Cancelado,
}

impl Status {
    /// Statuses that occupy the calendar and therefore take part in overlap checks.
    pub const BLOCKING: [Status; 2] = [Status::Agendado, Status::Concluido];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Agendado => "AGENDADO",
            Status::Concluido => "CONCLUIDO",
            Status::Cancelado => "CANCELADO",
        }
    }

    pub fn is_blocking(&self) -> bool {
        Self::BLOCKING.contains(self)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl FromStr for Status {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AGENDADO" => Ok(Status::Agendado),
            "CONCLUIDO" => Ok(Status::Concluido),
            "CANCELADO" => Ok(Status::Cancelado),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Interval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Interval {
    /// `None` when the end falls outside the representable calendar.
    pub fn new(start: NaiveDateTime, duracao_minutos: i64) -> Option<Self> {
        let end = TimeDelta::try_minutes(duracao_minutos)
            .and_then(|d| start.checked_add_signed(d))?;
        Some(Self { start, end })
    }

    /// Touching intervals do not overlap.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Open time window `(start, end)` used to pre-filter overlap candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Whose calendar an overlap lookup runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party<'a> {
    Aluno(&'a str),
    Professor(&'a str),
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Agendamento {
    pub id: String,
    pub aluno_id: String,
    pub conteudo_id: String,
    pub professor_id: String,
    pub inicio: NaiveDateTime,
    pub duracao_minutos: Option<i64>,
    pub status: Status,
    pub observacoes: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Agendamento {
    pub fn draft(&self) -> AgendamentoDraft {
        AgendamentoDraft {
            aluno_id: self.aluno_id.clone(),
            conteudo_id: self.conteudo_id.clone(),
            professor_id: self.professor_id.clone(),
            inicio: self.inicio,
            duracao_minutos: self.duracao_minutos,
            status: self.status,
            observacoes: self.observacoes.clone(),
        }
    }
}

/// Appointment fields as submitted for a write, before validation fills the duration in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgendamentoDraft {
    pub aluno_id: String,
    pub conteudo_id: String,
    pub professor_id: String,
    pub inicio: NaiveDateTime,
    pub duracao_minutos: Option<i64>,
    pub status: Status,
    pub observacoes: String,
}

impl AgendamentoDraft {
    pub fn apply(&mut self, req: UpdateAgendamentoRequest) {
        if let Some(aluno_id) = req.aluno_id {
            self.aluno_id = aluno_id;
        }
        if let Some(conteudo_id) = req.conteudo_id {
            self.conteudo_id = conteudo_id;
        }
        if let Some(professor_id) = req.professor_id {
            self.professor_id = professor_id;
        }
        if let Some(inicio) = req.inicio {
            self.inicio = inicio;
        }
        if let Some(duracao) = req.duracao_minutos {
            self.duracao_minutos = Some(duracao);
        }
        if let Some(status) = req.status {
            self.status = status;
        }
        if let Some(observacoes) = req.observacoes {
            self.observacoes = observacoes;
        }
    }
}

impl From<NewAgendamentoRequest> for AgendamentoDraft {
    fn from(req: NewAgendamentoRequest) -> Self {
        Self {
            aluno_id: req.aluno_id,
            conteudo_id: req.conteudo_id,
            professor_id: req.professor_id,
            inicio: req.inicio,
            duracao_minutos: req.duracao_minutos,
            status: req.status.unwrap_or_default(),
            observacoes: req.observacoes.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAgendamentoRequest {
    pub aluno_id: String,
    pub conteudo_id: String,
    pub professor_id: String,
    #[serde(deserialize_with = "deserialize_inicio")]
    pub inicio: NaiveDateTime,
    pub duracao_minutos: Option<i64>,
    pub status: Option<Status>,
    pub observacoes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAgendamentoRequest {
    pub aluno_id: Option<String>,
    pub conteudo_id: Option<String>,
    pub professor_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_inicio_opt")]
    pub inicio: Option<NaiveDateTime>,
    pub duracao_minutos: Option<i64>,
    pub status: Option<Status>,
    pub observacoes: Option<String>,
}

/// Raw status code from the status-change form; validated by the service.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusChangeRequest {
    pub status: String,
}

/// Existing appointment returned by an overlap lookup, with its effective duration resolved.
#[derive(Debug, Clone, FromRow)]
pub struct OverlapCandidate {
    pub id: String,
    pub inicio: NaiveDateTime,
    pub duracao_minutos: i64,
    pub aluno_nome: String,
    pub professor_nome: String,
}

impl OverlapCandidate {
    /// A stored end past the calendar is read as open-ended.
    pub fn interval(&self) -> Interval {
        Interval::new(self.inicio, self.duracao_minutos).unwrap_or(Interval {
            start: self.inicio,
            end: NaiveDateTime::MAX,
        })
    }
}

/// Listing row joined with display names.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AgendamentoView {
    pub id: String,
    pub aluno_id: String,
    pub aluno: String,
    pub conteudo_id: String,
    pub conteudo: String,
    pub professor_id: String,
    pub professor: String,
    pub inicio: NaiveDateTime,
    pub duracao_minutos: Option<i64>,
    pub status: Status,
    pub observacoes: String,
}

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Accepts ISO timestamps with or without seconds, as sent by `datetime-local` inputs.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

fn deserialize_inicio<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_datetime(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid datetime: {raw}")))
}

fn deserialize_inicio_opt<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_datetime(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid datetime: {raw}"))),
        None => Ok(None),
    }
}
