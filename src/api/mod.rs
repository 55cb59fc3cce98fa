mod agendamentos;
mod cadastros;
pub mod caller;
mod relatorios;

use axum::Json;
use axum::routing::post;
use axum::{Router, extract::State, http::StatusCode, routing::get};

use crate::error::AppError;
use crate::services::access::{self, Caller, HomeView};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/home", get(home))
        .route("/alunos", get(cadastros::list_alunos).post(cadastros::create_aluno))
        .route(
            "/alunos/{id}",
            get(cadastros::get_aluno)
                .put(cadastros::update_aluno)
                .delete(cadastros::delete_aluno),
        )
        .route("/alunos/{id}/desativar", post(cadastros::deactivate_aluno))
        .route(
            "/professores",
            get(cadastros::list_professores).post(cadastros::create_professor),
        )
        .route(
            "/professores/{id}",
            get(cadastros::get_professor)
                .put(cadastros::update_professor)
                .delete(cadastros::delete_professor),
        )
        .route(
            "/conteudos",
            get(cadastros::list_conteudos).post(cadastros::create_conteudo),
        )
        .route(
            "/conteudos/{id}",
            get(cadastros::get_conteudo)
                .put(cadastros::update_conteudo)
                .delete(cadastros::delete_conteudo),
        )
        .route(
            "/agendamentos",
            get(agendamentos::list_agendamentos).post(agendamentos::create_agendamento),
        )
        .route(
            "/agendamentos/{id}",
            get(agendamentos::get_agendamento)
                .put(agendamentos::update_agendamento)
                .delete(agendamentos::delete_agendamento),
        )
        .route("/agendamentos/{id}/status", post(agendamentos::change_status))
        .route("/relatorios/conteudos", get(relatorios::report_page))
        .route("/relatorios/conteudos/json", get(relatorios::report_json))
        .route("/relatorios/conteudos/excel", get(relatorios::report_excel))
        .route("/relatorios/concluidos", get(relatorios::concluidos))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn home(State(state): State<AppState>, caller: Caller) -> Result<Json<HomeView>, AppError> {
    let view = access::home(&state.db, &caller).await?;
    Ok(Json(view))
}
