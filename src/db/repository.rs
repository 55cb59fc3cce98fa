use chrono::{Local, NaiveDateTime};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    Agendamento, AgendamentoDraft, AgendamentoView, Aluno, AlunoOption, ConcluidoPorConteudo,
    Conteudo, MAX_DURACAO_MINUTOS, NewAlunoRequest, NewConteudoRequest, NewProfessorRequest,
    OverlapCandidate, Party, Professor, ReportRecord, Status, TimeWindow, UpdateAlunoRequest,
    UpdateConteudoRequest, UpdateProfessorRequest,
};

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}

pub async fn fetch_alunos(db: &SqlitePool) -> Result<Vec<Aluno>, sqlx::Error> {
    sqlx::query_as::<_, Aluno>(
        "SELECT id, nome, serie, turno, telefone, ativo FROM alunos ORDER BY nome",
    )
    .fetch_all(db)
    .await
}

pub async fn fetch_alunos_by_serie_turno(
    db: &SqlitePool,
    serie: &str,
    turno: &str,
) -> Result<Vec<AlunoOption>, sqlx::Error> {
    sqlx::query_as::<_, AlunoOption>(
        r#"
        SELECT id, nome
        FROM alunos
        WHERE serie = ?1 AND turno = ?2 AND ativo = 1
        ORDER BY nome
        "#,
    )
    .bind(serie)
    .bind(turno)
    .fetch_all(db)
    .await
}

pub async fn find_aluno_by_id(db: &SqlitePool, id: &str) -> Result<Option<Aluno>, sqlx::Error> {
    sqlx::query_as::<_, Aluno>(
        "SELECT id, nome, serie, turno, telefone, ativo FROM alunos WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn insert_aluno(db: &SqlitePool, req: NewAlunoRequest) -> Result<Aluno, sqlx::Error> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO alunos (id, nome, serie, turno, telefone, ativo)
        VALUES (?1, ?2, ?3, ?4, ?5, 1)
        "#,
    )
    .bind(&id)
    .bind(&req.nome)
    .bind(&req.serie)
    .bind(&req.turno)
    .bind(&req.telefone)
    .execute(db)
    .await?;

    Ok(Aluno {
        id,
        nome: req.nome,
        serie: req.serie,
        turno: req.turno,
        telefone: req.telefone,
        ativo: true,
    })
}

pub async fn update_aluno(
    db: &SqlitePool,
    id: &str,
    req: UpdateAlunoRequest,
) -> Result<Option<Aluno>, sqlx::Error> {
    let mut current = match find_aluno_by_id(db, id).await? {
        Some(a) => a,
        None => return Ok(None),
    };

    if let Some(nome) = req.nome {
        current.nome = nome;
    }
    if let Some(serie) = req.serie {
        current.serie = serie;
    }
    if let Some(turno) = req.turno {
        current.turno = turno;
    }
    if let Some(telefone) = req.telefone {
        current.telefone = Some(telefone);
    }
    if let Some(ativo) = req.ativo {
        current.ativo = ativo;
    }

    sqlx::query(
        r#"
        UPDATE alunos
        SET nome = ?1, serie = ?2, turno = ?3, telefone = ?4, ativo = ?5
        WHERE id = ?6
        "#,
    )
    .bind(&current.nome)
    .bind(&current.serie)
    .bind(&current.turno)
    .bind(&current.telefone)
    .bind(current.ativo)
    .bind(id)
    .execute(db)
    .await?;

    Ok(Some(current))
}

pub async fn deactivate_aluno(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE alunos SET ativo = 0 WHERE id = ?1")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

/// Removes the student together with all of their appointments.
pub async fn delete_aluno(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM alunos WHERE id = ?1")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

pub async fn fetch_professores(db: &SqlitePool) -> Result<Vec<Professor>, sqlx::Error> {
    sqlx::query_as::<_, Professor>(
        "SELECT id, nome, user_id, especialidade FROM professores ORDER BY nome",
    )
    .fetch_all(db)
    .await
}

pub async fn find_professor_by_id(
    db: &SqlitePool,
    id: &str,
) -> Result<Option<Professor>, sqlx::Error> {
    sqlx::query_as::<_, Professor>(
        "SELECT id, nome, user_id, especialidade FROM professores WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn find_professor_by_user_id(
    db: &SqlitePool,
    user_id: &str,
) -> Result<Option<Professor>, sqlx::Error> {
    sqlx::query_as::<_, Professor>(
        "SELECT id, nome, user_id, especialidade FROM professores WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(db)
    .await
}

/// Case-insensitive name lookup. Done in Rust because SQLite's `lower()` only folds ASCII.
pub async fn find_professor_by_nome(
    db: &SqlitePool,
    nome: &str,
) -> Result<Option<Professor>, sqlx::Error> {
    let wanted = nome.trim().to_lowercase();
    let found = fetch_professores(db)
        .await?
        .into_iter()
        .find(|p| p.nome.trim().to_lowercase() == wanted);
    Ok(found)
}

pub async fn insert_professor(
    db: &SqlitePool,
    req: NewProfessorRequest,
) -> Result<Professor, AppError> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO professores (id, nome, user_id, especialidade)
        VALUES (?1, ?2, ?3, ?4)
        "#,
    )
    .bind(&id)
    .bind(&req.nome)
    .bind(&req.user_id)
    .bind(&req.especialidade)
    .execute(db)
    .await
    .map_err(duplicate_user_link)?;

    Ok(Professor {
        id,
        nome: req.nome,
        user_id: req.user_id,
        especialidade: req.especialidade,
    })
}

pub async fn update_professor(
    db: &SqlitePool,
    id: &str,
    req: UpdateProfessorRequest,
) -> Result<Option<Professor>, AppError> {
    let mut current = match find_professor_by_id(db, id).await? {
        Some(p) => p,
        None => return Ok(None),
    };

    if let Some(nome) = req.nome {
        current.nome = nome;
    }
    if let Some(user_id) = req.user_id {
        current.user_id = Some(user_id);
    }
    if let Some(especialidade) = req.especialidade {
        current.especialidade = especialidade;
    }

    sqlx::query("UPDATE professores SET nome = ?1, user_id = ?2, especialidade = ?3 WHERE id = ?4")
        .bind(&current.nome)
        .bind(&current.user_id)
        .bind(&current.especialidade)
        .bind(id)
        .execute(db)
        .await
        .map_err(duplicate_user_link)?;

    Ok(Some(current))
}

fn duplicate_user_link(err: sqlx::Error) -> AppError {
    if is_unique_violation(&err) {
        AppError::Duplicate("Este usuário já está vinculado a outro professor.".to_string())
    } else {
        AppError::Database(err)
    }
}

pub async fn delete_professor(db: &SqlitePool, id: &str) -> Result<bool, AppError> {
    let in_use: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM agendamentos WHERE professor_id = ?1")
            .bind(id)
            .fetch_one(db)
            .await?;
    if in_use > 0 {
        return Err(protected("professor", in_use));
    }

    let result = sqlx::query("DELETE FROM professores WHERE id = ?1")
        .bind(id)
        .execute(db)
        .await
        .map_err(|e| protect_on_fk(e, "professor"))?
        .rows_affected();

    Ok(result > 0)
}

fn protected(entidade: &str, count: i64) -> AppError {
    AppError::Protected(format!(
        "Não é possível excluir este {}: há {} agendamento(s) vinculado(s).",
        entidade, count
    ))
}

fn protect_on_fk(err: sqlx::Error, entidade: &str) -> AppError {
    if is_foreign_key_violation(&err) {
        AppError::Protected(format!(
            "Não é possível excluir este {}: há agendamentos vinculados.",
            entidade
        ))
    } else {
        AppError::Database(err)
    }
}

pub async fn fetch_conteudos(db: &SqlitePool) -> Result<Vec<Conteudo>, sqlx::Error> {
    sqlx::query_as::<_, Conteudo>(
        "SELECT id, nome, descricao, duracao_minutos, descritor FROM conteudos ORDER BY nome",
    )
    .fetch_all(db)
    .await
}

pub async fn find_conteudo_by_id(
    db: &SqlitePool,
    id: &str,
) -> Result<Option<Conteudo>, sqlx::Error> {
    sqlx::query_as::<_, Conteudo>(
        "SELECT id, nome, descricao, duracao_minutos, descritor FROM conteudos WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

fn check_duracao(duracao_minutos: i64) -> Result<(), AppError> {
    if duracao_minutos <= 0 {
        return Err(AppError::BadRequest(
            "duracao_minutos deve ser maior que zero".to_string(),
        ));
    }
    if duracao_minutos > MAX_DURACAO_MINUTOS {
        return Err(AppError::BadRequest(format!(
            "duracao_minutos não pode passar de {} minutos",
            MAX_DURACAO_MINUTOS
        )));
    }
    Ok(())
}

pub async fn insert_conteudo(
    db: &SqlitePool,
    req: NewConteudoRequest,
) -> Result<Conteudo, AppError> {
    check_duracao(req.duracao_minutos)?;
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO conteudos (id, nome, descricao, duracao_minutos, descritor)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&id)
    .bind(&req.nome)
    .bind(&req.descricao)
    .bind(req.duracao_minutos)
    .bind(&req.descritor)
    .execute(db)
    .await?;

    Ok(Conteudo {
        id,
        nome: req.nome,
        descricao: req.descricao,
        duracao_minutos: req.duracao_minutos,
        descritor: req.descritor,
    })
}

pub async fn update_conteudo(
    db: &SqlitePool,
    id: &str,
    req: UpdateConteudoRequest,
) -> Result<Option<Conteudo>, AppError> {
    let mut current = match find_conteudo_by_id(db, id).await? {
        Some(c) => c,
        None => return Ok(None),
    };

    if let Some(nome) = req.nome {
        current.nome = nome;
    }
    if let Some(descricao) = req.descricao {
        current.descricao = descricao;
    }
    if let Some(duracao) = req.duracao_minutos {
        check_duracao(duracao)?;
        current.duracao_minutos = duracao;
    }
    if let Some(descritor) = req.descritor {
        current.descritor = Some(descritor);
    }

    sqlx::query(
        r#"
        UPDATE conteudos
        SET nome = ?1, descricao = ?2, duracao_minutos = ?3, descritor = ?4
        WHERE id = ?5
        "#,
    )
    .bind(&current.nome)
    .bind(&current.descricao)
    .bind(current.duracao_minutos)
    .bind(&current.descritor)
    .bind(id)
    .execute(db)
    .await?;

    Ok(Some(current))
}

pub async fn delete_conteudo(db: &SqlitePool, id: &str) -> Result<bool, AppError> {
    let in_use: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM agendamentos WHERE conteudo_id = ?1")
            .bind(id)
            .fetch_one(db)
            .await?;
    if in_use > 0 {
        return Err(protected("conteúdo", in_use));
    }

    let result = sqlx::query("DELETE FROM conteudos WHERE id = ?1")
        .bind(id)
        .execute(db)
        .await
        .map_err(|e| protect_on_fk(e, "conteúdo"))?
        .rows_affected();

    Ok(result > 0)
}

const AGENDAMENTO_COLUMNS: &str = "id, aluno_id, conteudo_id, professor_id, inicio, \
     duracao_minutos, status, observacoes, created_at, updated_at";

pub async fn find_agendamento_by_id(
    db: &SqlitePool,
    id: &str,
) -> Result<Option<Agendamento>, sqlx::Error> {
    let sql = format!("SELECT {} FROM agendamentos WHERE id = ?", AGENDAMENTO_COLUMNS);
    sqlx::query_as::<_, Agendamento>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await
}

fn invalid_reference(err: sqlx::Error) -> AppError {
    if is_foreign_key_violation(&err) {
        AppError::BadRequest("aluno, professor ou conteúdo inexistente".to_string())
    } else {
        AppError::Database(err)
    }
}

/// Persists an already validated draft.
pub async fn insert_agendamento(
    db: &SqlitePool,
    draft: &AgendamentoDraft,
) -> Result<Agendamento, AppError> {
    let id = Uuid::new_v4().to_string();
    let now = now();

    sqlx::query(
        r#"
        INSERT INTO agendamentos
            (id, aluno_id, conteudo_id, professor_id, inicio, duracao_minutos,
            status, observacoes, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
        "#,
    )
    .bind(&id)
    .bind(&draft.aluno_id)
    .bind(&draft.conteudo_id)
    .bind(&draft.professor_id)
    .bind(draft.inicio)
    .bind(draft.duracao_minutos)
    .bind(draft.status)
    .bind(&draft.observacoes)
    .bind(now)
    .execute(db)
    .await
    .map_err(invalid_reference)?;

    Ok(Agendamento {
        id,
        aluno_id: draft.aluno_id.clone(),
        conteudo_id: draft.conteudo_id.clone(),
        professor_id: draft.professor_id.clone(),
        inicio: draft.inicio,
        duracao_minutos: draft.duracao_minutos,
        status: draft.status,
        observacoes: draft.observacoes.clone(),
        created_at: now,
        updated_at: now,
    })
}

/// Overwrites an appointment with an already validated draft.
pub async fn update_agendamento(
    db: &SqlitePool,
    id: &str,
    draft: &AgendamentoDraft,
) -> Result<Option<Agendamento>, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE agendamentos
        SET aluno_id = ?1,
            conteudo_id = ?2,
            professor_id = ?3,
            inicio = ?4,
            duracao_minutos = ?5,
            status = ?6,
            observacoes = ?7,
            updated_at = ?8
        WHERE id = ?9
        "#,
    )
    .bind(&draft.aluno_id)
    .bind(&draft.conteudo_id)
    .bind(&draft.professor_id)
    .bind(draft.inicio)
    .bind(draft.duracao_minutos)
    .bind(draft.status)
    .bind(&draft.observacoes)
    .bind(now())
    .bind(id)
    .execute(db)
    .await
    .map_err(invalid_reference)?
    .rows_affected();

    if result == 0 {
        return Ok(None);
    }
    Ok(find_agendamento_by_id(db, id).await?)
}

pub async fn delete_agendamento(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM agendamentos WHERE id = ?1")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

/// Newest first. `professor_id = None` lists every professor's appointments.
pub async fn fetch_agendamento_views(
    db: &SqlitePool,
    professor_id: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<AgendamentoView>, sqlx::Error> {
    sqlx::query_as::<_, AgendamentoView>(
        r#"
        SELECT
            a.id,
            a.aluno_id,
            COALESCE(al.nome, '') AS aluno,
            a.conteudo_id,
            COALESCE(c.nome, '') AS conteudo,
            a.professor_id,
            COALESCE(p.nome, '') AS professor,
            a.inicio,
            a.duracao_minutos,
            a.status,
            a.observacoes
        FROM agendamentos a
        LEFT JOIN alunos al ON al.id = a.aluno_id
        LEFT JOIN conteudos c ON c.id = a.conteudo_id
        LEFT JOIN professores p ON p.id = a.professor_id
        WHERE (?1 IS NULL OR a.professor_id = ?1)
        ORDER BY a.inicio DESC, a.id
        LIMIT ?2 OFFSET ?3
        "#,
    )
    .bind(professor_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
}

pub async fn count_agendamentos(
    db: &SqlitePool,
    professor_id: Option<&str>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM agendamentos WHERE (?1 IS NULL OR professor_id = ?1)")
        .bind(professor_id)
        .fetch_one(db)
        .await
}

fn blocking_status_list() -> String {
    Status::BLOCKING
        .iter()
        .map(|s| format!("'{}'", s.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Appointments of one student or professor that start strictly inside `window`
/// and still occupy the calendar. Durations left unset fall back to the content default.
pub async fn find_overlap_candidates(
    db: &SqlitePool,
    party: Party<'_>,
    window: TimeWindow,
    exclude: Option<&str>,
) -> Result<Vec<OverlapCandidate>, sqlx::Error> {
    let (column, party_id) = match party {
        Party::Aluno(id) => ("aluno_id", id),
        Party::Professor(id) => ("professor_id", id),
    };

    let sql = format!(
        r#"
        SELECT
            a.id,
            a.inicio,
            COALESCE(a.duracao_minutos, c.duracao_minutos) AS duracao_minutos,
            COALESCE(al.nome, '') AS aluno_nome,
            COALESCE(p.nome, '') AS professor_nome
        FROM agendamentos a
        JOIN conteudos c ON c.id = a.conteudo_id
        LEFT JOIN alunos al ON al.id = a.aluno_id
        LEFT JOIN professores p ON p.id = a.professor_id
        WHERE a.{column} = ?1
          AND a.status IN ({statuses})
          AND a.inicio > ?2
          AND a.inicio < ?3
          AND (?4 IS NULL OR a.id <> ?4)
        ORDER BY a.inicio, a.id
        "#,
        column = column,
        statuses = blocking_status_list(),
    );

    sqlx::query_as::<_, OverlapCandidate>(&sql)
        .bind(party_id)
        .bind(window.start)
        .bind(window.end)
        .bind(exclude)
        .fetch_all(db)
        .await
}

/// Every appointment starting in `[start, end)`, oldest first.
pub async fn fetch_report_records(
    db: &SqlitePool,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<Vec<ReportRecord>, sqlx::Error> {
    sqlx::query_as::<_, ReportRecord>(
        r#"
        SELECT
            a.id,
            a.inicio,
            a.duracao_minutos,
            a.status,
            al.nome AS aluno,
            al.serie AS serie,
            al.turno AS turno,
            p.nome AS professor,
            p.especialidade AS especialidade,
            c.nome AS conteudo,
            c.descritor AS descritor
        FROM agendamentos a
        LEFT JOIN alunos al ON al.id = a.aluno_id
        LEFT JOIN conteudos c ON c.id = a.conteudo_id
        LEFT JOIN professores p ON p.id = a.professor_id
        WHERE a.inicio >= ?1 AND a.inicio < ?2
        ORDER BY a.inicio, a.id
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(db)
    .await
}

pub async fn fetch_concluidos_por_conteudo(
    db: &SqlitePool,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<Vec<ConcluidoPorConteudo>, sqlx::Error> {
    sqlx::query_as::<_, ConcluidoPorConteudo>(
        r#"
        SELECT c.nome AS conteudo, COUNT(a.id) AS total
        FROM agendamentos a
        JOIN conteudos c ON c.id = a.conteudo_id
        WHERE a.status = ?1 AND a.inicio >= ?2 AND a.inicio < ?3
        GROUP BY c.id, c.nome
        ORDER BY total DESC, c.nome
        "#,
    )
    .bind(Status::Concluido)
    .bind(start)
    .bind(end)
    .fetch_all(db)
    .await
}
