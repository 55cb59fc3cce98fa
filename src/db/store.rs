use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::db::repository;
use crate::error::AppError;
use crate::models::{OverlapCandidate, Party, TimeWindow};

/// Lookups the conflict validator needs from storage.
#[async_trait]
pub trait AgendamentoStore: Send + Sync {
    /// Appointments of `party` with a blocking status that start strictly inside
    /// `window`, ordered by start, skipping `exclude`.
    async fn find_overlap_candidates(
        &self,
        party: Party<'_>,
        window: TimeWindow,
        exclude: Option<&str>,
    ) -> Result<Vec<OverlapCandidate>, AppError>;

    /// Default duration of a content, `None` when it does not exist.
    async fn conteudo_duracao(&self, conteudo_id: &str) -> Result<Option<i64>, AppError>;
}

#[derive(Clone)]
pub struct SqliteStore {
    db: SqlitePool,
}

impl SqliteStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AgendamentoStore for SqliteStore {
    async fn find_overlap_candidates(
        &self,
        party: Party<'_>,
        window: TimeWindow,
        exclude: Option<&str>,
    ) -> Result<Vec<OverlapCandidate>, AppError> {
        let found = repository::find_overlap_candidates(&self.db, party, window, exclude).await?;
        Ok(found)
    }

    async fn conteudo_duracao(&self, conteudo_id: &str) -> Result<Option<i64>, AppError> {
        let conteudo = repository::find_conteudo_by_id(&self.db, conteudo_id).await?;
        Ok(conteudo.map(|c| c.duracao_minutos))
    }
}
