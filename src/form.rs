use chrono::{Local, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::cascade::{Level, Selection};
use crate::record::PROTECOES;

/// Everything the user has typed or picked, held server-side across
/// re-renders of the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormState {
    pub date_ini: Option<NaiveDate>,
    pub h_ini: Option<NaiveTime>,
    pub date_fim: Option<NaiveDate>,
    pub h_fim: Option<NaiveTime>,
    pub selection: Selection,
    pub descricao: String,
    pub protecoes: Vec<String>,
    pub bloqueio: bool,
    pub observacoes: String,
}

/// One user interaction. `apply` is the single transition function: pure,
/// total, and independent of the rendering side.
#[derive(Debug, Clone, PartialEq)]
pub enum FormEvent {
    SetDataInicial(Option<NaiveDate>),
    SetHoraInicial(Option<NaiveTime>),
    SetDataFinal(Option<NaiveDate>),
    SetHoraFinal(Option<NaiveTime>),
    SetNivel(Level, Option<String>),
    SetDescricao(String),
    SetProtecoes(Vec<String>),
    SetBloqueio(bool),
    SetObservacoes(String),
    Clear,
}

impl FormState {
    /// The documented defaults: start date preset to today, everything else
    /// unset, empty or false.
    pub fn cleared(today: NaiveDate) -> Self {
        FormState {
            date_ini: Some(today),
            h_ini: None,
            date_fim: None,
            h_fim: None,
            selection: Selection::default(),
            descricao: String::new(),
            protecoes: Vec::new(),
            bloqueio: false,
            observacoes: String::new(),
        }
    }

    pub fn new_today() -> Self {
        FormState::cleared(Local::now().date_naive())
    }

    /// Apply one event, producing the next state. Selector edits cascade
    /// through `Selection::set`; protection picks are restricted to the fixed
    /// catalog, preserving the order the user chose them in.
    pub fn apply(mut self, event: FormEvent) -> FormState {
        match event {
            FormEvent::SetDataInicial(d) => self.date_ini = d,
            FormEvent::SetHoraInicial(t) => self.h_ini = t,
            FormEvent::SetDataFinal(d) => self.date_fim = d,
            FormEvent::SetHoraFinal(t) => self.h_fim = t,
            FormEvent::SetNivel(level, value) => self.selection.set(level, value),
            FormEvent::SetDescricao(text) => self.descricao = text,
            FormEvent::SetProtecoes(picked) => {
                self.protecoes = picked
                    .into_iter()
                    .filter(|p| PROTECOES.contains(&p.as_str()))
                    .collect();
            }
            FormEvent::SetBloqueio(flag) => self.bloqueio = flag,
            FormEvent::SetObservacoes(text) => self.observacoes = text,
            FormEvent::Clear => return FormState::new_today(),
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn time(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn filled() -> FormState {
        let mut state = FormState::cleared(date("2024-01-10"));
        state.h_ini = Some(time("10:00"));
        state.selection.set(Level::Ufv, Some("UFV Norte".into()));
        state.selection.set(Level::Familia, Some("Transformador".into()));
        state.selection.set(Level::Se, Some("SE-01".into()));
        state.selection.set(Level::Equipamento, Some("TR-01".into()));
        state.descricao = "Desligamento intempestivo".into();
        state.protecoes = vec!["87T - Diferencial do TR".into()];
        state.bloqueio = true;
        state.observacoes = "Religado após inspeção".into();
        state
    }

    #[test]
    fn cleared_defaults() {
        let state = FormState::cleared(date("2024-01-10"));
        assert_eq!(state.date_ini, Some(date("2024-01-10")));
        assert!(state.h_ini.is_none());
        assert!(state.date_fim.is_none());
        assert!(state.h_fim.is_none());
        assert_eq!(state.selection, Selection::default());
        assert!(state.descricao.is_empty());
        assert!(state.protecoes.is_empty());
        assert!(!state.bloqueio);
        assert!(state.observacoes.is_empty());
    }

    #[test]
    fn selector_event_cascades() {
        let state = filled().apply(FormEvent::SetNivel(Level::Familia, Some("Inversor".into())));
        assert_eq!(state.selection.familia.as_deref(), Some("Inversor"));
        assert!(state.selection.se.is_none());
        assert!(state.selection.equipamento.is_none());
        // untouched fields survive the event
        assert_eq!(state.descricao, "Desligamento intempestivo");
    }

    #[test]
    fn unknown_protection_labels_are_dropped() {
        let state = filled().apply(FormEvent::SetProtecoes(vec![
            "27 - Subtensão".into(),
            "99 - Inventada".into(),
            "Nenhuma atuação de proteção".into(),
        ]));
        assert_eq!(
            state.protecoes,
            vec!["27 - Subtensão", "Nenhuma atuação de proteção"]
        );
    }

    #[test]
    fn clear_resets_every_field() {
        let state = filled().apply(FormEvent::Clear);
        assert!(state.date_ini.is_some());
        assert!(state.h_ini.is_none());
        assert!(state.date_fim.is_none());
        assert!(state.h_fim.is_none());
        assert_eq!(state.selection, Selection::default());
        assert!(state.descricao.is_empty());
        assert!(state.protecoes.is_empty());
        assert!(!state.bloqueio);
        assert!(state.observacoes.is_empty());
    }
}
