use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const DEFAULT_DURACAO_MINUTOS: i64 = 60;

/// Longest session a content or an appointment may last.
pub const MAX_DURACAO_MINUTOS: i64 = 24 * 60;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Conteudo {
    pub id: String,
    pub nome: String,
    pub descricao: String,
    pub duracao_minutos: i64,
    pub descritor: Option<String>,
}

fn default_duracao() -> i64 {
    DEFAULT_DURACAO_MINUTOS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewConteudoRequest {
    pub nome: String,
    #[serde(default)]
    pub descricao: String,
    #[serde(default = "default_duracao")]
    pub duracao_minutos: i64,
    pub descritor: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateConteudoRequest {
    pub nome: Option<String>,
    pub descricao: Option<String>,
    pub duracao_minutos: Option<i64>,
    pub descritor: Option<String>,
}
