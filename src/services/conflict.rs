use chrono::{Datelike, NaiveDateTime, TimeDelta};
use thiserror::Error;
use tracing::{debug, warn};

use crate::db::AgendamentoStore;
use crate::error::AppError;
use crate::models::{
    AgendamentoDraft, Interval, MAX_DURACAO_MINUTOS, OverlapCandidate, Party, TimeWindow,
};

/// Default look-around, in hours, for the professor calendar scan.
pub const DEFAULT_SCAN_WINDOW_HOURS: i64 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConflictError {
    #[error(
        "Este aluno já possui um atendimento nesse horário com o professor {} ({} - {}).",
        .professor,
        .intervalo.start.format("%H:%M"),
        .intervalo.end.format("%H:%M")
    )]
    Aluno {
        agendamento_id: String,
        professor: String,
        intervalo: Interval,
    },

    #[error(
        "Este professor já possui um atendimento nesse horário com o aluno {} ({} - {}).",
        .aluno,
        .intervalo.start.format("%H:%M"),
        .intervalo.end.format("%H:%M")
    )]
    Professor {
        agendamento_id: String,
        aluno: String,
        intervalo: Interval,
    },
}

impl ConflictError {
    /// Id of the existing appointment that blocks the write.
    pub fn agendamento_id(&self) -> &str {
        match self {
            ConflictError::Aluno { agendamento_id, .. }
            | ConflictError::Professor { agendamento_id, .. } => agendamento_id,
        }
    }
}

/// Rejects appointment writes that would double-book a student or a professor.
///
/// The student calendar is checked first, then the professor calendar. Within
/// each, candidates are examined in start order and the first real overlap wins.
/// Only appointments starting inside the professor scan window are considered
/// for the professor check, so the window has to exceed the longest duration in use.
/// The student lookback is the larger of the window and the candidate's own duration.
pub struct ConflictValidator<'a> {
    store: &'a dyn AgendamentoStore,
    scan_window: TimeDelta,
}

impl<'a> ConflictValidator<'a> {
    pub fn new(store: &'a dyn AgendamentoStore, scan_window_hours: i64) -> Self {
        Self {
            store,
            scan_window: TimeDelta::try_hours(scan_window_hours).unwrap_or(TimeDelta::MAX),
        }
    }

    /// Fills in the draft's duration when unset, then checks both calendars.
    /// `excluding` is the id of the appointment being edited, if any.
    pub async fn validate(
        &self,
        candidate: &mut AgendamentoDraft,
        excluding: Option<&str>,
    ) -> Result<(), AppError> {
        let duracao = self.resolve_duracao(candidate).await?;
        let intervalo = Interval::new(candidate.inicio, duracao)
            .filter(|i| (1..=9999).contains(&i.start.year()) && (1..=9999).contains(&i.end.year()))
            .ok_or_else(|| {
                AppError::BadRequest(format!("inicio fora do calendário suportado: {}", candidate.inicio))
            })?;

        let duracao = TimeDelta::minutes(duracao);
        if duracao > self.scan_window {
            warn!(
                "duracao of {} min exceeds the {} h scan window; earlier overlaps may go unnoticed",
                duracao.num_minutes(),
                self.scan_window.num_hours()
            );
        }

        let lookback = duracao.max(self.scan_window);
        let aluno_window = TimeWindow {
            start: earlier(intervalo.start, lookback),
            end: intervalo.end,
        };
        if let Some(other) = self
            .first_overlap(Party::Aluno(&candidate.aluno_id), aluno_window, excluding, &intervalo)
            .await?
        {
            warn!(
                "rejecting agendamento for aluno {}: overlaps {}",
                candidate.aluno_id, other.id
            );
            return Err(ConflictError::Aluno {
                intervalo: other.interval(),
                agendamento_id: other.id,
                professor: other.professor_nome,
            }
            .into());
        }

        let professor_window = TimeWindow {
            start: earlier(intervalo.start, self.scan_window),
            end: later(intervalo.end, self.scan_window),
        };
        if let Some(other) = self
            .first_overlap(
                Party::Professor(&candidate.professor_id),
                professor_window,
                excluding,
                &intervalo,
            )
            .await?
        {
            warn!(
                "rejecting agendamento for professor {}: overlaps {}",
                candidate.professor_id, other.id
            );
            return Err(ConflictError::Professor {
                intervalo: other.interval(),
                agendamento_id: other.id,
                aluno: other.aluno_nome,
            }
            .into());
        }

        Ok(())
    }

    /// A zero duration counts as unset and falls back to the content default.
    async fn resolve_duracao(&self, candidate: &mut AgendamentoDraft) -> Result<i64, AppError> {
        match candidate.duracao_minutos {
            Some(d) if d < 0 || d > MAX_DURACAO_MINUTOS => Err(invalid_duracao(d)),
            Some(d) if d > 0 => Ok(d),
            _ => {
                let d = self
                    .store
                    .conteudo_duracao(&candidate.conteudo_id)
                    .await?
                    .ok_or(AppError::NotFound)?;
                if !(1..=MAX_DURACAO_MINUTOS).contains(&d) {
                    return Err(invalid_duracao(d));
                }
                debug!("duracao resolved from conteudo {}: {} min", candidate.conteudo_id, d);
                candidate.duracao_minutos = Some(d);
                Ok(d)
            }
        }
    }

    async fn first_overlap(
        &self,
        party: Party<'_>,
        window: TimeWindow,
        excluding: Option<&str>,
        intervalo: &Interval,
    ) -> Result<Option<OverlapCandidate>, AppError> {
        let candidates = self
            .store
            .find_overlap_candidates(party, window, excluding)
            .await?;
        Ok(candidates
            .into_iter()
            .find(|other| other.interval().overlaps(intervalo)))
    }
}

fn invalid_duracao(d: i64) -> AppError {
    AppError::BadRequest(format!(
        "duracao_minutos inválida: {} (permitido de 1 a {})",
        d, MAX_DURACAO_MINUTOS
    ))
}

fn earlier(t: NaiveDateTime, by: TimeDelta) -> NaiveDateTime {
    t.checked_sub_signed(by).unwrap_or(NaiveDateTime::MIN)
}

fn later(t: NaiveDateTime, by: TimeDelta) -> NaiveDateTime {
    t.checked_add_signed(by).unwrap_or(NaiveDateTime::MAX)
}
