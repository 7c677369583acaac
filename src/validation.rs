use chrono::NaiveDateTime;

use crate::error::AppError;
use crate::form::FormState;

pub const MSG_TEMPORAL: &str =
    "A data e hora final não podem ser anteriores à data e hora inicial.";
pub const MSG_CAMPOS_OBRIGATORIOS: &str =
    "Por favor, preencha todos os campos de data, hora e equipamento antes de gravar.";

/// The temporal-order error currently applicable to the form, if any.
///
/// Only evaluated when both timestamps are fully present; a partial end
/// timestamp is not an ordering problem (the `-` sentinel covers it at
/// submission time). Shown live on the page and re-checked on submit.
pub fn temporal_error(state: &FormState) -> Option<&'static str> {
    let (di, hi, df, hf) = (
        state.date_ini?,
        state.h_ini?,
        state.date_fim?,
        state.h_fim?,
    );
    let inicio = NaiveDateTime::new(di, hi);
    let fim = NaiveDateTime::new(df, hf);
    (fim < inicio).then_some(MSG_TEMPORAL)
}

/// The required-field error, if any: start date, start time and the four
/// selection levels must all be set.
pub fn completeness_error(state: &FormState) -> Option<&'static str> {
    let complete =
        state.date_ini.is_some() && state.h_ini.is_some() && state.selection.is_complete();
    (!complete).then_some(MSG_CAMPOS_OBRIGATORIOS)
}

/// Gate for submission: completeness first, then temporal order. Either
/// failure blocks the append entirely.
pub fn validate_for_submit(state: &FormState) -> Result<(), AppError> {
    if let Some(msg) = completeness_error(state) {
        return Err(AppError::Validation(msg.to_string()));
    }
    if let Some(msg) = temporal_error(state) {
        return Err(AppError::Validation(msg.to_string()));
    }
    Ok(())
}
