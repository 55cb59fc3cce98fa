use sqlx::SqlitePool;
use tracing::info;

use crate::db::{SqliteStore, repository};
use crate::error::AppError;
use crate::models::{Agendamento, AgendamentoDraft, NewAgendamentoRequest, Status, UpdateAgendamentoRequest};
use crate::services::access::{self, Caller};
use crate::services::conflict::ConflictValidator;

/// Appointment writes. Every create and update passes the conflict validator before
/// anything reaches the database.
pub struct SchedulingService {
    db: SqlitePool,
    store: SqliteStore,
    scan_window_hours: i64,
}

impl SchedulingService {
    pub fn new(db: SqlitePool, scan_window_hours: i64) -> Self {
        Self {
            store: SqliteStore::new(db.clone()),
            db,
            scan_window_hours,
        }
    }

    fn validator(&self) -> ConflictValidator<'_> {
        ConflictValidator::new(&self.store, self.scan_window_hours)
    }

    pub async fn create(&self, req: NewAgendamentoRequest) -> Result<Agendamento, AppError> {
        let mut draft = AgendamentoDraft::from(req);
        self.validator().validate(&mut draft, None).await?;
        let agendamento = repository::insert_agendamento(&self.db, &draft).await?;
        info!(
            "agendamento {} created: aluno={} professor={} inicio={}",
            agendamento.id, agendamento.aluno_id, agendamento.professor_id, agendamento.inicio
        );
        Ok(agendamento)
    }

    pub async fn update(
        &self,
        id: &str,
        req: UpdateAgendamentoRequest,
    ) -> Result<Agendamento, AppError> {
        let current = repository::find_agendamento_by_id(&self.db, id)
            .await?
            .ok_or(AppError::NotFound)?;
        let mut draft = current.draft();
        draft.apply(req);
        self.save(id, draft).await
    }

    /// Professors may only move their own appointments between statuses.
    pub async fn change_status(
        &self,
        caller: &Caller,
        id: &str,
        raw_status: &str,
    ) -> Result<Agendamento, AppError> {
        let status: Status = raw_status
            .parse()
            .map_err(|_| AppError::BadRequest("Status inválido.".to_string()))?;

        let current = repository::find_agendamento_by_id(&self.db, id)
            .await?
            .ok_or(AppError::NotFound)?;

        if caller.acts_as_professor() {
            let own = access::professor_for(&self.db, caller)
                .await?
                .is_some_and(|p| p.id == current.professor_id);
            if !own {
                return Err(AppError::Forbidden);
            }
        }

        let mut draft = current.draft();
        draft.status = status;
        self.save(id, draft).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        if repository::delete_agendamento(&self.db, id).await? {
            info!("agendamento {} deleted", id);
            Ok(())
        } else {
            Err(AppError::NotFound)
        }
    }

    async fn save(&self, id: &str, mut draft: AgendamentoDraft) -> Result<Agendamento, AppError> {
        self.validator().validate(&mut draft, Some(id)).await?;
        let agendamento = repository::update_agendamento(&self.db, id, &draft)
            .await?
            .ok_or(AppError::NotFound)?;
        info!("agendamento {} updated: status={}", agendamento.id, agendamento.status);
        Ok(agendamento)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_memory;
    use crate::models::{
        Aluno, Conteudo, NewAlunoRequest, NewConteudoRequest, NewProfessorRequest, Professor,
    };
    use crate::services::access::Role;
    use crate::services::conflict::{ConflictError, DEFAULT_SCAN_WINDOW_HOURS};
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    struct Fixture {
        service: SchedulingService,
        pool: SqlitePool,
        aluno: Aluno,
        professor: Professor,
        conteudo: Conteudo,
    }

    async fn fixture() -> Fixture {
        let pool = connect_memory().await.expect("Failed to create test db");
        let aluno = repository::insert_aluno(
            &pool,
            NewAlunoRequest {
                nome: "Aluno Teste".to_string(),
                serie: "2".to_string(),
                turno: "T".to_string(),
                telefone: None,
            },
        )
        .await
        .unwrap();
        let professor = repository::insert_professor(
            &pool,
            NewProfessorRequest {
                nome: "Professor Teste".to_string(),
                user_id: Some("prof-1".to_string()),
                especialidade: "Português".to_string(),
            },
        )
        .await
        .unwrap();
        let conteudo = repository::insert_conteudo(
            &pool,
            NewConteudoRequest {
                nome: "Conteudo Teste".to_string(),
                descricao: "desc".to_string(),
                duracao_minutos: 60,
                descritor: Some("d".to_string()),
            },
        )
        .await
        .unwrap();
        Fixture {
            service: SchedulingService::new(pool.clone(), DEFAULT_SCAN_WINDOW_HOURS),
            pool,
            aluno,
            professor,
            conteudo,
        }
    }

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 4, 7)
            .unwrap()
            .and_hms_opt(14, 0, 0)
            .unwrap()
    }

    fn request(f: &Fixture, aluno_id: &str, professor_id: &str, inicio: NaiveDateTime) -> NewAgendamentoRequest {
        NewAgendamentoRequest {
            aluno_id: aluno_id.to_string(),
            conteudo_id: f.conteudo.id.clone(),
            professor_id: professor_id.to_string(),
            inicio,
            duracao_minutos: None,
            status: None,
            observacoes: None,
        }
    }

    async fn another_aluno(f: &Fixture, nome: &str) -> Aluno {
        repository::insert_aluno(
            &f.pool,
            NewAlunoRequest {
                nome: nome.to_string(),
                serie: "2".to_string(),
                turno: "T".to_string(),
                telefone: None,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_default_duration_touch_and_overlap() {
        let f = fixture().await;

        let first = f
            .service
            .create(request(&f, &f.aluno.id, &f.professor.id, t0()))
            .await
            .expect("first agendamento");
        assert_eq!(first.duracao_minutos, Some(60));

        let second = f
            .service
            .create(request(&f, &f.aluno.id, &f.professor.id, t0() + Duration::minutes(60)))
            .await
            .expect("touching agendamento");
        assert_eq!(second.inicio, t0() + Duration::minutes(60));

        let err = f
            .service
            .create(request(&f, &f.aluno.id, &f.professor.id, t0() + Duration::minutes(30)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(ConflictError::Aluno { .. })));

        let stored = repository::count_agendamentos(&f.pool, None).await.unwrap();
        assert_eq!(stored, 2);
    }

    #[tokio::test]
    async fn test_professor_double_booking() {
        let f = fixture().await;
        let outro = another_aluno(&f, "Bruno").await;

        f.service
            .create(request(&f, &f.aluno.id, &f.professor.id, t0()))
            .await
            .unwrap();
        let err = f
            .service
            .create(request(&f, &outro.id, &f.professor.id, t0() + Duration::minutes(59)))
            .await
            .unwrap_err();
        match err {
            AppError::Conflict(ConflictError::Professor { aluno, .. }) => {
                assert_eq!(aluno, "Aluno Teste")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_update_ignores_itself_but_not_others() {
        let f = fixture().await;
        let first = f
            .service
            .create(request(&f, &f.aluno.id, &f.professor.id, t0()))
            .await
            .unwrap();
        let second = f
            .service
            .create(request(&f, &f.aluno.id, &f.professor.id, t0() + Duration::hours(2)))
            .await
            .unwrap();

        let moved = f
            .service
            .update(
                &first.id,
                UpdateAgendamentoRequest {
                    inicio: Some(t0() + Duration::minutes(15)),
                    ..Default::default()
                },
            )
            .await
            .expect("shifting within its own slot");
        assert_eq!(moved.inicio, t0() + Duration::minutes(15));

        let err = f
            .service
            .update(
                &second.id,
                UpdateAgendamentoRequest {
                    inicio: Some(t0() + Duration::minutes(45)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let unchanged = repository::find_agendamento_by_id(&f.pool, &second.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unchanged.inicio, t0() + Duration::hours(2));
    }

    #[tokio::test]
    async fn test_cancelled_frees_the_slot() {
        let f = fixture().await;
        let first = f
            .service
            .create(request(&f, &f.aluno.id, &f.professor.id, t0()))
            .await
            .unwrap();
        let coord = Caller {
            username: "coord".to_string(),
            roles: vec![Role::Coordenacao],
            ..Default::default()
        };
        let cancelled = f
            .service
            .change_status(&coord, &first.id, "CANCELADO")
            .await
            .unwrap();
        assert_eq!(cancelled.status, Status::Cancelado);

        f.service
            .create(request(&f, &f.aluno.id, &f.professor.id, t0()))
            .await
            .expect("slot is free again");
    }

    #[tokio::test]
    async fn test_change_status_rules() {
        let f = fixture().await;
        let ag = f
            .service
            .create(request(&f, &f.aluno.id, &f.professor.id, t0()))
            .await
            .unwrap();

        let owner = Caller {
            user_id: Some("prof-1".to_string()),
            username: "prof".to_string(),
            roles: vec![Role::Professor],
            ..Default::default()
        };
        let stranger = Caller {
            user_id: Some("prof-2".to_string()),
            username: "someone".to_string(),
            roles: vec![Role::Professor],
            ..Default::default()
        };

        let err = f.service.change_status(&owner, &ag.id, "FEITO").await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = f
            .service
            .change_status(&stranger, &ag.id, "CONCLUIDO")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));

        let done = f
            .service
            .change_status(&owner, &ag.id, "CONCLUIDO")
            .await
            .unwrap();
        assert_eq!(done.status, Status::Concluido);

        let err = f
            .service
            .change_status(&owner, "missing", "CONCLUIDO")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn test_delete() {
        let f = fixture().await;
        let ag = f
            .service
            .create(request(&f, &f.aluno.id, &f.professor.id, t0()))
            .await
            .unwrap();
        f.service.delete(&ag.id).await.unwrap();
        assert!(matches!(f.service.delete(&ag.id).await, Err(AppError::NotFound)));
    }
}
