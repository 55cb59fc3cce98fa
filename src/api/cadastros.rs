use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::info;

use crate::db::repository;
use crate::error::AppError;
use crate::models::*;
use crate::services::access::{Caller, Permission};
use crate::state::AppState;

fn no_content(found: bool) -> Result<StatusCode, AppError> {
    if found {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

/// Full listing, or the active students of one grade and shift when both are given.
pub async fn list_alunos(
    State(state): State<AppState>,
    caller: Caller,
    Query(filter): Query<AlunoFilter>,
) -> Result<Response, AppError> {
    caller.require(Permission::ViewAluno)?;
    match (filter.serie.as_deref(), filter.turno.as_deref()) {
        (Some(serie), Some(turno)) => {
            let options = repository::fetch_alunos_by_serie_turno(&state.db, serie, turno).await?;
            Ok(Json(options).into_response())
        }
        _ => {
            let alunos = repository::fetch_alunos(&state.db).await?;
            Ok(Json(alunos).into_response())
        }
    }
}

pub async fn get_aluno(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Aluno>, AppError> {
    caller.require(Permission::ViewAluno)?;
    let aluno = repository::find_aluno_by_id(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(aluno))
}

pub async fn create_aluno(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<NewAlunoRequest>,
) -> Result<Json<Aluno>, AppError> {
    caller.require(Permission::AddAluno)?;
    let aluno = repository::insert_aluno(&state.db, req).await?;
    info!("aluno {} created by {}", aluno.id, caller.username);
    Ok(Json(aluno))
}

pub async fn update_aluno(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Json(req): Json<UpdateAlunoRequest>,
) -> Result<Json<Aluno>, AppError> {
    caller.require(Permission::ChangeAluno)?;
    let aluno = repository::update_aluno(&state.db, &id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(aluno))
}

pub async fn deactivate_aluno(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    caller.require(Permission::ChangeAluno)?;
    no_content(repository::deactivate_aluno(&state.db, &id).await?)
}

pub async fn delete_aluno(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    caller.require(Permission::DeleteAluno)?;
    let ok = repository::delete_aluno(&state.db, &id).await?;
    if ok {
        info!("aluno {} deleted by {}", id, caller.username);
    }
    no_content(ok)
}

// Read access follows agendamento visibility so scheduling forms can list choices.

pub async fn list_professores(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<Professor>>, AppError> {
    caller.require(Permission::ViewAgendamento)?;
    Ok(Json(repository::fetch_professores(&state.db).await?))
}

pub async fn get_professor(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Professor>, AppError> {
    caller.require(Permission::ViewAgendamento)?;
    let professor = repository::find_professor_by_id(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(professor))
}

pub async fn create_professor(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<NewProfessorRequest>,
) -> Result<Json<Professor>, AppError> {
    caller.require(Permission::ManageProfessor)?;
    let professor = repository::insert_professor(&state.db, req).await?;
    info!("professor {} created by {}", professor.id, caller.username);
    Ok(Json(professor))
}

pub async fn update_professor(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Json(req): Json<UpdateProfessorRequest>,
) -> Result<Json<Professor>, AppError> {
    caller.require(Permission::ManageProfessor)?;
    let professor = repository::update_professor(&state.db, &id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(professor))
}

pub async fn delete_professor(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    caller.require(Permission::ManageProfessor)?;
    no_content(repository::delete_professor(&state.db, &id).await?)
}

pub async fn list_conteudos(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<Conteudo>>, AppError> {
    caller.require(Permission::ViewAgendamento)?;
    Ok(Json(repository::fetch_conteudos(&state.db).await?))
}

pub async fn get_conteudo(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Conteudo>, AppError> {
    caller.require(Permission::ViewAgendamento)?;
    let conteudo = repository::find_conteudo_by_id(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(conteudo))
}

pub async fn create_conteudo(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<NewConteudoRequest>,
) -> Result<Json<Conteudo>, AppError> {
    caller.require(Permission::ManageConteudo)?;
    let conteudo = repository::insert_conteudo(&state.db, req).await?;
    info!("conteudo {} created by {}", conteudo.id, caller.username);
    Ok(Json(conteudo))
}

pub async fn update_conteudo(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Json(req): Json<UpdateConteudoRequest>,
) -> Result<Json<Conteudo>, AppError> {
    caller.require(Permission::ManageConteudo)?;
    let conteudo = repository::update_conteudo(&state.db, &id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(conteudo))
}

pub async fn delete_conteudo(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    caller.require(Permission::ManageConteudo)?;
    no_content(repository::delete_conteudo(&state.db, &id).await?)
}
