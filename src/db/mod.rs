pub mod repository;
pub mod store;

use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

pub use store::{AgendamentoStore, SqliteStore};

pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
}

/// In-memory database with the schema applied. A single connection, since every
/// `:memory:` connection would otherwise get its own empty database.
pub async fn connect_memory() -> Result<SqlitePool, crate::error::AppError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}
