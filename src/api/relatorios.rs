use axum::Json;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::ConcluidoPorConteudo;
use crate::services::access::{Caller, Permission};
use crate::services::pagination::{Page, paginate};
use crate::services::report::{
    self, PorAluno, PorConteudo, PorMes, PorProfessor, ReportBundle, ReportRange, ReportRow,
    Resumo,
};
use crate::services::spreadsheet;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ReportParams {
    start: Option<String>,
    end: Option<String>,
    page: Option<String>,
}

impl ReportParams {
    fn dates(&self) -> (Option<NaiveDate>, Option<NaiveDate>) {
        (
            report::parse_date(self.start.as_deref()),
            report::parse_date(self.end.as_deref()),
        )
    }

    fn range(&self, state: &AppState) -> ReportRange {
        let (start, end) = self.dates();
        ReportRange::resolve(
            start,
            end,
            Local::now().date_naive(),
            state.config.report_default_days,
        )
    }
}

#[derive(Serialize)]
pub struct ReportPage {
    periodo: ReportRange,
    resumo: Resumo,
    by_professor: Vec<PorProfessor>,
    by_aluno: Vec<PorAluno>,
    by_conteudo: Vec<PorConteudo>,
    monthly: Vec<PorMes>,
    agendamentos: Page<ReportRow>,
}

pub async fn report_page(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<ReportParams>,
) -> Result<Json<ReportPage>, AppError> {
    caller.require(Permission::ViewRelatorio)?;
    let range = params.range(&state);
    let bundle = report::generate(&state.db, range).await?;
    let agendamentos = paginate(
        &bundle.agendamentos_rows,
        params.page.as_deref(),
        state.config.report_page_size,
    );
    Ok(Json(ReportPage {
        periodo: range,
        resumo: bundle.resumo,
        by_professor: bundle.by_professor,
        by_aluno: bundle.by_aluno,
        by_conteudo: bundle.by_conteudo,
        monthly: bundle.monthly,
        agendamentos,
    }))
}

pub async fn report_json(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<ReportParams>,
) -> Result<Json<ReportBundle>, AppError> {
    caller.require(Permission::ViewRelatorio)?;
    let bundle = report::generate(&state.db, params.range(&state)).await?;
    Ok(Json(bundle))
}

pub async fn report_excel(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<ReportParams>,
) -> Result<Response, AppError> {
    caller.require(Permission::ExportRelatorio)?;
    let bundle = report::generate(&state.db, params.range(&state)).await?;
    let bytes = spreadsheet::render(&bundle)?;

    // the file is named after the requested bounds, not the resolved window
    let today = Local::now().date_naive();
    let (start, end) = params.dates();
    let filename = spreadsheet::filename(start.unwrap_or(today), end.unwrap_or(today));

    Ok((
        [
            (header::CONTENT_TYPE, spreadsheet::CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response())
}

pub async fn concluidos(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<ReportParams>,
) -> Result<Json<Vec<ConcluidoPorConteudo>>, AppError> {
    caller.require(Permission::ViewRelatorio)?;
    let rows = report::concluidos_por_conteudo(&state.db, params.range(&state)).await?;
    Ok(Json(rows))
}
