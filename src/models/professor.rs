use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Professor {
    pub id: String,
    pub nome: String,
    /// Identity of the linked user account, unique across professors.
    pub user_id: Option<String>,
    pub especialidade: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProfessorRequest {
    pub nome: String,
    pub user_id: Option<String>,
    #[serde(default)]
    pub especialidade: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfessorRequest {
    pub nome: Option<String>,
    pub user_id: Option<String>,
    pub especialidade: Option<String>,
}
