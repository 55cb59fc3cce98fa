use serde::Serialize;
use sqlx::SqlitePool;

use crate::db::repository;
use crate::error::AppError;
use crate::models::{AgendamentoView, Professor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Role {
    Diretoria,
    Coordenacao,
    Professor,
}

impl Role {
    /// Maps a group name from the identity provider. Matching ignores case and
    /// accepts "Coordenacao" without the cedilla.
    pub fn from_group(name: &str) -> Option<Role> {
        match name.trim().to_lowercase().as_str() {
            "diretoria" => Some(Role::Diretoria),
            "coordenação" | "coordenacao" => Some(Role::Coordenacao),
            "professor" => Some(Role::Professor),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ViewAgendamento,
    AddAgendamento,
    ChangeAgendamento,
    DeleteAgendamento,
    ViewAluno,
    AddAluno,
    ChangeAluno,
    DeleteAluno,
    ManageProfessor,
    ManageConteudo,
    ViewRelatorio,
    ExportRelatorio,
}

impl Permission {
    fn granted_to(self, role: Role) -> bool {
        use Permission::*;
        match role {
            Role::Diretoria => true,
            Role::Coordenacao => matches!(
                self,
                ViewAgendamento
                    | AddAgendamento
                    | ChangeAgendamento
                    | DeleteAgendamento
                    | ViewAluno
                    | AddAluno
                    | ChangeAluno
                    | DeleteAluno
            ),
            Role::Professor => matches!(self, ViewAgendamento | ChangeAgendamento | ViewAluno),
        }
    }
}

/// Authenticated identity as handed over by the upstream auth layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Option<String>,
    pub username: String,
    pub full_name: Option<String>,
    pub is_superuser: bool,
    pub roles: Vec<Role>,
}

impl Caller {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn can(&self, permission: Permission) -> bool {
        self.is_superuser || self.roles.iter().any(|r| permission.granted_to(*r))
    }

    pub fn require(&self, permission: Permission) -> Result<(), AppError> {
        if self.can(permission) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    /// Sees every appointment regardless of professor.
    pub fn sees_everything(&self) -> bool {
        self.is_superuser || self.has_role(Role::Diretoria) || self.has_role(Role::Coordenacao)
    }

    /// Restricted to their own appointments.
    pub fn acts_as_professor(&self) -> bool {
        !self.sees_everything() && self.has_role(Role::Professor)
    }

    /// Full name when known, otherwise the username.
    pub fn display_name(&self) -> &str {
        match self.full_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.username,
        }
    }
}

/// Links a caller to their professor record: by user id first, then by name.
pub async fn professor_for(db: &SqlitePool, caller: &Caller) -> Result<Option<Professor>, AppError> {
    if let Some(user_id) = caller.user_id.as_deref() {
        if let Some(professor) = repository::find_professor_by_user_id(db, user_id).await? {
            return Ok(Some(professor));
        }
    }
    Ok(repository::find_professor_by_nome(db, caller.display_name()).await?)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    All,
    Professor(String),
    Nothing,
}

impl Scope {
    pub fn allows(&self, professor_id: &str) -> bool {
        match self {
            Scope::All => true,
            Scope::Professor(id) => id == professor_id,
            Scope::Nothing => false,
        }
    }
}

/// Which appointments a caller may list.
pub async fn scope_for(db: &SqlitePool, caller: &Caller) -> Result<Scope, AppError> {
    if caller.sees_everything() {
        return Ok(Scope::All);
    }
    if caller.has_role(Role::Professor) {
        return Ok(match professor_for(db, caller).await? {
            Some(p) => Scope::Professor(p.id),
            None => Scope::Nothing,
        });
    }
    Ok(Scope::Nothing)
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum HomeView {
    Admin,
    Coordenacao {
        agendamentos: Vec<AgendamentoView>,
    },
    Professor {
        professor: Option<Professor>,
        agendamentos: Vec<AgendamentoView>,
    },
    Default,
}

/// Landing view for a caller, picked by their most privileged role.
pub async fn home(db: &SqlitePool, caller: &Caller) -> Result<HomeView, AppError> {
    if caller.is_superuser || caller.has_role(Role::Diretoria) {
        return Ok(HomeView::Admin);
    }

    if caller.has_role(Role::Coordenacao) {
        let agendamentos = repository::fetch_agendamento_views(db, None, -1, 0).await?;
        return Ok(HomeView::Coordenacao { agendamentos });
    }

    if caller.has_role(Role::Professor) {
        let professor = professor_for(db, caller).await?;
        let agendamentos = match &professor {
            Some(p) => repository::fetch_agendamento_views(db, Some(&p.id), -1, 0).await?,
            None => Vec::new(),
        };
        return Ok(HomeView::Professor {
            professor,
            agendamentos,
        });
    }

    Ok(HomeView::Default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_memory;
    use crate::models::NewProfessorRequest;

    fn caller(roles: &[Role]) -> Caller {
        Caller {
            user_id: Some("7".to_string()),
            username: "maria".to_string(),
            full_name: Some("Maria Alves".to_string()),
            is_superuser: false,
            roles: roles.to_vec(),
        }
    }

    #[test]
    fn test_permission_matrix() {
        let coord = caller(&[Role::Coordenacao]);
        assert!(coord.can(Permission::DeleteAgendamento));
        assert!(coord.can(Permission::AddAluno));
        assert!(!coord.can(Permission::ViewRelatorio));
        assert!(!coord.can(Permission::ManageConteudo));

        let prof = caller(&[Role::Professor]);
        assert!(prof.can(Permission::ChangeAgendamento));
        assert!(!prof.can(Permission::AddAgendamento));
        assert!(!prof.can(Permission::DeleteAluno));
        assert!(prof.acts_as_professor());

        let diretoria = caller(&[Role::Diretoria]);
        assert!(diretoria.can(Permission::ExportRelatorio));

        let nobody = caller(&[]);
        assert!(!nobody.can(Permission::ViewAgendamento));
        assert!(matches!(nobody.require(Permission::ViewAluno), Err(AppError::Forbidden)));

        let root = Caller {
            is_superuser: true,
            ..caller(&[])
        };
        assert!(root.can(Permission::ManageProfessor));
    }

    #[test]
    fn test_group_names() {
        assert_eq!(Role::from_group("Coordenação"), Some(Role::Coordenacao));
        assert_eq!(Role::from_group("coordenacao"), Some(Role::Coordenacao));
        assert_eq!(Role::from_group("professor"), Some(Role::Professor));
        assert_eq!(Role::from_group("Secretaria"), None);
    }

    #[tokio::test]
    async fn test_professor_lookup_falls_back_to_name() {
        let pool = connect_memory().await.expect("Failed to create test db");
        let by_name = repository::insert_professor(
            &pool,
            NewProfessorRequest {
                nome: "MARIA ALVES".to_string(),
                user_id: None,
                especialidade: String::new(),
            },
        )
        .await
        .unwrap();

        let found = professor_for(&pool, &caller(&[Role::Professor])).await.unwrap();
        assert_eq!(found.map(|p| p.id), Some(by_name.id.clone()));

        let linked = repository::insert_professor(
            &pool,
            NewProfessorRequest {
                nome: "Outro Nome".to_string(),
                user_id: Some("7".to_string()),
                especialidade: String::new(),
            },
        )
        .await
        .unwrap();
        let scope = scope_for(&pool, &caller(&[Role::Professor])).await.unwrap();
        assert_eq!(scope, Scope::Professor(linked.id));
    }

    #[tokio::test]
    async fn test_home_views() {
        let pool = connect_memory().await.expect("Failed to create test db");

        let root = Caller {
            is_superuser: true,
            ..caller(&[])
        };
        assert!(matches!(home(&pool, &root).await.unwrap(), HomeView::Admin));
        assert!(matches!(
            home(&pool, &caller(&[Role::Coordenacao])).await.unwrap(),
            HomeView::Coordenacao { .. }
        ));
        match home(&pool, &caller(&[Role::Professor])).await.unwrap() {
            HomeView::Professor {
                professor,
                agendamentos,
            } => {
                assert!(professor.is_none());
                assert!(agendamentos.is_empty());
            }
            other => panic!("unexpected view: {other:?}"),
        }
        assert!(matches!(home(&pool, &caller(&[])).await.unwrap(), HomeView::Default));
        assert_eq!(scope_for(&pool, &caller(&[])).await.unwrap(), Scope::Nothing);
    }
}
