use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::FromRow;

use super::Status;

/// Appointment joined with its student, content and professor for reporting.
/// The joins are outer joins, so every display field may be missing.
#[derive(Debug, Clone, FromRow)]
pub struct ReportRecord {
    pub id: String,
    pub inicio: NaiveDateTime,
    pub duracao_minutos: Option<i64>,
    pub status: Status,
    pub aluno: Option<String>,
    pub serie: Option<String>,
    pub turno: Option<String>,
    pub professor: Option<String>,
    pub especialidade: Option<String>,
    pub conteudo: Option<String>,
    pub descritor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct ConcluidoPorConteudo {
    pub conteudo: String,
    pub total: i64,
}
