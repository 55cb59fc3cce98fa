use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use crate::db::repository;
use crate::error::AppError;
use crate::models::*;
use crate::services::access::{self, Caller, Permission, Scope};
use crate::services::pagination::{Page, PageInfo};
use crate::services::scheduling::SchedulingService;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct PageParams {
    page: Option<String>,
}

fn service(state: &AppState) -> SchedulingService {
    SchedulingService::new(state.db.clone(), state.config.professor_scan_window_hours)
}

/// Loads an appointment the caller is allowed to see. Out-of-scope ids look missing.
async fn load_in_scope(
    state: &AppState,
    caller: &Caller,
    id: &str,
) -> Result<Agendamento, AppError> {
    let agendamento = repository::find_agendamento_by_id(&state.db, id)
        .await?
        .ok_or(AppError::NotFound)?;
    let scope = access::scope_for(&state.db, caller).await?;
    if scope.allows(&agendamento.professor_id) {
        Ok(agendamento)
    } else {
        Err(AppError::NotFound)
    }
}

pub async fn list_agendamentos(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<AgendamentoView>>, AppError> {
    caller.require(Permission::ViewAgendamento)?;
    let per_page = state.config.agendamento_page_size;

    let professor_id = match access::scope_for(&state.db, &caller).await? {
        Scope::All => None,
        Scope::Professor(id) => Some(id),
        Scope::Nothing => {
            return Ok(Json(Page {
                info: PageInfo::resolve(params.page.as_deref(), 0, per_page),
                items: Vec::new(),
            }));
        }
    };

    let total = repository::count_agendamentos(&state.db, professor_id.as_deref()).await?;
    let info = PageInfo::resolve(params.page.as_deref(), total.max(0) as usize, per_page);
    let items = repository::fetch_agendamento_views(
        &state.db,
        professor_id.as_deref(),
        info.per_page as i64,
        info.offset() as i64,
    )
    .await?;
    Ok(Json(Page { info, items }))
}

pub async fn get_agendamento(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Agendamento>, AppError> {
    caller.require(Permission::ViewAgendamento)?;
    Ok(Json(load_in_scope(&state, &caller, &id).await?))
}

pub async fn create_agendamento(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<NewAgendamentoRequest>,
) -> Result<(StatusCode, Json<Agendamento>), AppError> {
    caller.require(Permission::AddAgendamento)?;
    let agendamento = service(&state).create(req).await?;
    Ok((StatusCode::CREATED, Json(agendamento)))
}

pub async fn update_agendamento(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Json(req): Json<UpdateAgendamentoRequest>,
) -> Result<Json<Agendamento>, AppError> {
    caller.require(Permission::ChangeAgendamento)?;
    load_in_scope(&state, &caller, &id).await?;
    let agendamento = service(&state).update(&id, req).await?;
    Ok(Json(agendamento))
}

pub async fn change_status(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Json(req): Json<StatusChangeRequest>,
) -> Result<Json<Agendamento>, AppError> {
    caller.require(Permission::ChangeAgendamento)?;
    let agendamento = service(&state)
        .change_status(&caller, &id, &req.status)
        .await?;
    Ok(Json(agendamento))
}

pub async fn delete_agendamento(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    caller.require(Permission::DeleteAgendamento)?;
    service(&state).delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
