pub mod agendamento;
pub mod aluno;
pub mod conteudo;
pub mod professor;
pub mod relatorio;

pub use agendamento::{
    Agendamento, AgendamentoDraft, AgendamentoView, Interval, NewAgendamentoRequest,
    OverlapCandidate, Party, Status, StatusChangeRequest, TimeWindow, UpdateAgendamentoRequest,
};
pub use aluno::{Aluno, AlunoFilter, AlunoOption, NewAlunoRequest, UpdateAlunoRequest};
pub use conteudo::{Conteudo, MAX_DURACAO_MINUTOS, NewConteudoRequest, UpdateConteudoRequest};
pub use professor::{NewProfessorRequest, Professor, UpdateProfessorRequest};
pub use relatorio::{ConcluidoPorConteudo, ReportRecord};
