use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Aluno {
    pub id: String,
    pub nome: String,
    pub serie: String,
    pub turno: String,
    pub telefone: Option<String>,
    pub ativo: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAlunoRequest {
    pub nome: String,
    #[serde(default)]
    pub serie: String,
    #[serde(default)]
    pub turno: String,
    pub telefone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAlunoRequest {
    pub nome: Option<String>,
    pub serie: Option<String>,
    pub turno: Option<String>,
    pub telefone: Option<String>,
    pub ativo: Option<bool>,
}

/// Grade + shift pair used to narrow the student picker on the scheduling form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlunoFilter {
    pub serie: Option<String>,
    pub turno: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AlunoOption {
    pub id: String,
    pub nome: String,
}
