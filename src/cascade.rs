use serde::{Deserialize, Serialize};

use crate::reference::ReferenceTable;

/// The four ordered selector levels, top of the hierarchy first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Ufv,
    Familia,
    Se,
    Equipamento,
}

/// The user's partial selection in the equipment hierarchy.
///
/// Invariant: a set level is always a valid value under all of its set
/// ancestors, and a level is only ever set while every ancestor is set.
/// `set` maintains this by clearing everything below the edited level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub ufv: Option<String>,
    pub familia: Option<String>,
    pub se: Option<String>,
    pub equipamento: Option<String>,
}

impl Selection {
    /// Set (or clear, with `None`) one level. Every level below the edited
    /// one is unset, whatever the new value is.
    pub fn set(&mut self, level: Level, value: Option<String>) {
        match level {
            Level::Ufv => {
                self.ufv = value;
                self.familia = None;
                self.se = None;
                self.equipamento = None;
            }
            Level::Familia => {
                self.familia = value;
                self.se = None;
                self.equipamento = None;
            }
            Level::Se => {
                self.se = value;
                self.equipamento = None;
            }
            Level::Equipamento => {
                self.equipamento = value;
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        self.ufv.is_some()
            && self.familia.is_some()
            && self.se.is_some()
            && self.equipamento.is_some()
    }

    /// Option list for one level, or `None` when an ancestor is unset and the
    /// selector should stay hidden. Options are the distinct column values
    /// filtered by equality on every set ancestor, sorted ascending.
    pub fn options(&self, table: &ReferenceTable, level: Level) -> Option<Vec<String>> {
        match level {
            Level::Ufv => Some(table.distinct_sorted(|_| true, |r| r.ufv.as_str())),
            Level::Familia => {
                let ufv = self.ufv.as_deref()?;
                Some(table.distinct_sorted(|r| r.ufv == ufv, |r| r.familia.as_str()))
            }
            Level::Se => {
                let ufv = self.ufv.as_deref()?;
                let familia = self.familia.as_deref()?;
                Some(table.distinct_sorted(
                    |r| r.ufv == ufv && r.familia == familia,
                    |r| r.se.as_str(),
                ))
            }
            Level::Equipamento => {
                let ufv = self.ufv.as_deref()?;
                let familia = self.familia.as_deref()?;
                let se = self.se.as_deref()?;
                Some(table.distinct_sorted(
                    |r| r.ufv == ufv && r.familia == familia && r.se == se,
                    |r| r.equipamento.as_str(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::EquipmentRow;

    fn row(ufv: &str, familia: &str, se: &str, equipamento: &str) -> EquipmentRow {
        EquipmentRow {
            ufv: ufv.into(),
            familia: familia.into(),
            se: se.into(),
            equipamento: equipamento.into(),
        }
    }

    fn table() -> ReferenceTable {
        ReferenceTable::new(vec![
            row("UFV Sul", "Inversor", "SE-02", "INV-07"),
            row("UFV Norte", "Transformador", "SE-01", "TR-02"),
            row("UFV Norte", "Transformador", "SE-01", "TR-01"),
            row("UFV Norte", "Transformador", "SE-02", "TR-09"),
            row("UFV Norte", "Inversor", "SE-01", "INV-01"),
            // same family name recurring under another plant
            row("UFV Sul", "Transformador", "SE-05", "TR-30"),
        ])
    }

    fn sel(ufv: Option<&str>, familia: Option<&str>, se: Option<&str>) -> Selection {
        Selection {
            ufv: ufv.map(String::from),
            familia: familia.map(String::from),
            se: se.map(String::from),
            equipamento: None,
        }
    }

    #[test]
    fn ufv_options_are_sorted_distinct() {
        let s = Selection::default();
        assert_eq!(
            s.options(&table(), Level::Ufv).unwrap(),
            vec!["UFV Norte", "UFV Sul"]
        );
    }

    #[test]
    fn dependent_levels_hidden_until_ancestors_set() {
        let s = Selection::default();
        assert!(s.options(&table(), Level::Familia).is_none());
        assert!(s.options(&table(), Level::Se).is_none());
        assert!(s.options(&table(), Level::Equipamento).is_none());

        let s = sel(Some("UFV Norte"), None, None);
        assert!(s.options(&table(), Level::Familia).is_some());
        assert!(s.options(&table(), Level::Se).is_none());
    }

    #[test]
    fn se_options_filter_on_both_ancestors() {
        let s = sel(Some("UFV Norte"), Some("Transformador"), None);
        assert_eq!(s.options(&table(), Level::Se).unwrap(), vec!["SE-01", "SE-02"]);

        // the same family under the other plant yields its own areas
        let s = sel(Some("UFV Sul"), Some("Transformador"), None);
        assert_eq!(s.options(&table(), Level::Se).unwrap(), vec!["SE-05"]);
    }

    #[test]
    fn equipment_options_deduplicate_and_sort() {
        let s = sel(Some("UFV Norte"), Some("Transformador"), Some("SE-01"));
        assert_eq!(
            s.options(&table(), Level::Equipamento).unwrap(),
            vec!["TR-01", "TR-02"]
        );
    }

    #[test]
    fn changing_ufv_clears_everything_below() {
        let mut s = Selection {
            ufv: Some("UFV Norte".into()),
            familia: Some("Transformador".into()),
            se: Some("SE-01".into()),
            equipamento: Some("TR-01".into()),
        };
        s.set(Level::Ufv, Some("UFV Sul".into()));
        assert_eq!(s.ufv.as_deref(), Some("UFV Sul"));
        assert!(s.familia.is_none());
        assert!(s.se.is_none());
        assert!(s.equipamento.is_none());
    }

    #[test]
    fn changing_se_clears_only_equipment() {
        let mut s = Selection {
            ufv: Some("UFV Norte".into()),
            familia: Some("Transformador".into()),
            se: Some("SE-01".into()),
            equipamento: Some("TR-01".into()),
        };
        s.set(Level::Se, Some("SE-02".into()));
        assert_eq!(s.ufv.as_deref(), Some("UFV Norte"));
        assert_eq!(s.familia.as_deref(), Some("Transformador"));
        assert_eq!(s.se.as_deref(), Some("SE-02"));
        assert!(s.equipamento.is_none());
    }

    #[test]
    fn clearing_a_level_also_cascades() {
        let mut s = sel(Some("UFV Norte"), Some("Transformador"), Some("SE-01"));
        s.set(Level::Familia, None);
        assert_eq!(s.ufv.as_deref(), Some("UFV Norte"));
        assert!(s.familia.is_none());
        assert!(s.se.is_none());
    }
}
