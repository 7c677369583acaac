use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::form::FormState;
use crate::validation::{validate_for_submit, MSG_CAMPOS_OBRIGATORIOS};

/// Fixed catalog of relay protections offered by the multi-select. Hardcoded,
/// not derived from the reference sheet; the last entry is the explicit
/// "none tripped" sentinel.
pub const PROTECOES: [&str; 10] = [
    "21 - Prot. Distância",
    "27 - Subtensão",
    "59 - Sobretensão",
    "50 - Sobrecorrente Inst.",
    "51 - Sobrecorrente Temp.",
    "50/62BF - Falha de abertura DJ",
    "87T - Diferencial do TR",
    "87B - Diferencial de Barras",
    "81U/O - Sub/Sobrefrequência",
    "Nenhuma atuação de proteção",
];

/// Header order of the log worksheet. The append row follows this exactly.
pub const LOG_COLUMNS: [&str; 12] = [
    "Data de Início",
    "Hora de Início",
    "Data de Término",
    "Hora de Término",
    "UFV",
    "Família do Equipamento",
    "SE",
    "Equipamento",
    "Descrição da Ocorrência",
    "Proteções Atuantes",
    "Atuação de Bloqueio",
    "Observações",
];

/// Placeholder persisted when the optional end date/time is absent.
pub const SEM_VALOR: &str = "-";

const FORMATO_DATA: &str = "%d/%m/%Y";
const FORMATO_HORA: &str = "%H:%M";

/// A finished incident report, display-formatted, created only from a form
/// that passed validation. Immutable thereafter; persisted as one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ocorrencia {
    pub data_inicio: String,
    pub hora_inicio: String,
    pub data_termino: String,
    pub hora_termino: String,
    pub ufv: String,
    pub familia: String,
    pub se: String,
    pub equipamento: String,
    pub descricao: String,
    pub protecoes: String,
    pub bloqueio: String,
    pub observacoes: String,
}

impl Ocorrencia {
    /// Build the record from a validated form. Re-runs the submission gate so
    /// an unvalidated record cannot exist, then formats every field the way
    /// the log sheet expects: dates `DD/MM/YYYY`, times `HH:MM`, protections
    /// joined with `", "`, lockout as `Sim`/`Não`, absent end fields as `-`.
    pub fn from_form(state: &FormState) -> Result<Self, AppError> {
        validate_for_submit(state)?;

        let (Some(date_ini), Some(h_ini)) = (state.date_ini, state.h_ini) else {
            return Err(AppError::Validation(MSG_CAMPOS_OBRIGATORIOS.to_string()));
        };
        let sel = &state.selection;
        let (Some(ufv), Some(familia), Some(se), Some(equipamento)) = (
            sel.ufv.as_ref(),
            sel.familia.as_ref(),
            sel.se.as_ref(),
            sel.equipamento.as_ref(),
        ) else {
            return Err(AppError::Validation(MSG_CAMPOS_OBRIGATORIOS.to_string()));
        };

        Ok(Ocorrencia {
            data_inicio: date_ini.format(FORMATO_DATA).to_string(),
            hora_inicio: h_ini.format(FORMATO_HORA).to_string(),
            data_termino: state
                .date_fim
                .map(|d| d.format(FORMATO_DATA).to_string())
                .unwrap_or_else(|| SEM_VALOR.to_string()),
            hora_termino: state
                .h_fim
                .map(|t| t.format(FORMATO_HORA).to_string())
                .unwrap_or_else(|| SEM_VALOR.to_string()),
            ufv: ufv.clone(),
            familia: familia.clone(),
            se: se.clone(),
            equipamento: equipamento.clone(),
            descricao: state.descricao.clone(),
            protecoes: state.protecoes.join(", "),
            bloqueio: if state.bloqueio { "Sim" } else { "Não" }.to_string(),
            observacoes: state.observacoes.clone(),
        })
    }

    /// The append row, in `LOG_COLUMNS` order.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.data_inicio.clone(),
            self.hora_inicio.clone(),
            self.data_termino.clone(),
            self.hora_termino.clone(),
            self.ufv.clone(),
            self.familia.clone(),
            self.se.clone(),
            self.equipamento.clone(),
            self.descricao.clone(),
            self.protecoes.clone(),
            self.bloqueio.clone(),
            self.observacoes.clone(),
        ]
    }

    /// Human-readable summary offered to the user for copying after a
    /// successful save.
    pub fn resumo(&self) -> String {
        let protecao = if self.protecoes.is_empty() {
            "Nenhuma"
        } else {
            self.protecoes.as_str()
        };
        format!(
            "- Data/hora de início: {} - {}\n\
             - Data/hora de término: {} - {}\n\
             - Equipamento: {} - {}\n\
             - Proteção atuada: {}\n\
             - Bloqueio: {}\n\
             - Descrição: {}\n\
             - Observações: {}",
            self.data_inicio,
            self.hora_inicio,
            self.data_termino,
            self.hora_termino,
            self.se,
            self.equipamento,
            protecao,
            self.bloqueio,
            self.descricao,
            self.observacoes,
        )
    }
}
