use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Column headers the reference sheet must expose, in hierarchy order.
pub const COLUNA_UFV: &str = "UFV";
pub const COLUNA_FAMILIA: &str = "família do equipamento";
pub const COLUNA_SE: &str = "SE";
pub const COLUNA_EQUIPAMENTO: &str = "equipamento";

pub const REQUIRED_COLUMNS: [&str; 4] =
    [COLUNA_UFV, COLUNA_FAMILIA, COLUNA_SE, COLUNA_EQUIPAMENTO];

/// One row of the equipment reference sheet: a single equipment instance and
/// its position in the UFV → família → SE hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentRow {
    pub ufv: String,
    pub familia: String,
    pub se: String,
    pub equipamento: String,
}

/// The full reference table, immutable once loaded.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    rows: Vec<EquipmentRow>,
}

impl ReferenceTable {
    pub fn empty() -> Self {
        ReferenceTable { rows: Vec::new() }
    }

    pub fn new(rows: Vec<EquipmentRow>) -> Self {
        ReferenceTable { rows }
    }

    /// Parse the CSV export of the reference sheet.
    ///
    /// The header row must contain the four required columns (extra columns
    /// are ignored); rows where any of the four cells is blank are skipped.
    /// Missing columns are reported by name, matching the sheet they belong
    /// to, rather than failing on the first one.
    pub fn from_csv(text: &str) -> Result<Self, AppError> {
        let mut lines = text.lines();
        let header = lines
            .next()
            .ok_or_else(|| AppError::DataLoad("arquivo CSV vazio".to_string()))?;
        let header_fields = parse_csv_row(header);

        let mut indices = [0usize; 4];
        let mut missing: Vec<&str> = Vec::new();
        for (slot, name) in indices.iter_mut().zip(REQUIRED_COLUMNS) {
            match header_fields.iter().position(|h| h.trim() == name) {
                Some(i) => *slot = i,
                None => missing.push(name),
            }
        }
        if !missing.is_empty() {
            return Err(AppError::MissingColumns(missing.join(", ")));
        }

        let [i_ufv, i_fam, i_se, i_eq] = indices;
        let mut rows = Vec::new();
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            let fields = parse_csv_row(line);
            let cell = |i: usize| fields.get(i).map(|s| s.trim()).unwrap_or("");
            let (ufv, familia, se, equipamento) =
                (cell(i_ufv), cell(i_fam), cell(i_se), cell(i_eq));
            if ufv.is_empty() || familia.is_empty() || se.is_empty() || equipamento.is_empty() {
                continue;
            }
            rows.push(EquipmentRow {
                ufv: ufv.to_string(),
                familia: familia.to_string(),
                se: se.to_string(),
                equipamento: equipamento.to_string(),
            });
        }
        Ok(ReferenceTable { rows })
    }

    pub fn rows(&self) -> &[EquipmentRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Sorted distinct values of one column, filtered by a predicate over the
    /// whole row. `BTreeSet` gives the deterministic ascending order the
    /// selectors rely on.
    pub fn distinct_sorted<F, G>(&self, filter: F, column: G) -> Vec<String>
    where
        F: Fn(&EquipmentRow) -> bool,
        G: Fn(&EquipmentRow) -> &str,
    {
        let set: BTreeSet<&str> = self
            .rows
            .iter()
            .filter(|r| filter(r))
            .map(|r| column(r))
            .collect();
        set.into_iter().map(|s| s.to_string()).collect()
    }
}

// Parse a CSV row into a vector of strings, honouring quoted fields and
// doubled quotes. The gviz CSV export quotes every cell.
fn parse_csv_row(line: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if let Some(&next) = chars.peek() {
                    if next == '"' && in_quotes {
                        // Double quote inside quoted field - add a single quote
                        current_field.push('"');
                        chars.next();
                    } else {
                        in_quotes = !in_quotes;
                    }
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => {
                result.push(std::mem::take(&mut current_field));
            }
            '\r' => {}
            _ => {
                current_field.push(c);
            }
        }
    }

    result.push(current_field);
    result
}

/// Derive the published-CSV export URL from a Google Sheets share URL.
///
/// `https://docs.google.com/spreadsheets/d/<id>/edit?...` becomes
/// `https://docs.google.com/spreadsheets/d/<id>/gviz/tq?tqx=out:csv&tqs=0`.
pub fn gviz_csv_url(share_url: &str) -> Result<String, AppError> {
    let id = share_url
        .split_once("/d/")
        .map(|(_, rest)| rest.split('/').next().unwrap_or(rest))
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            AppError::DataLoad(format!("URL de planilha inválida: {share_url}"))
        })?;
    Ok(format!(
        "https://docs.google.com/spreadsheets/d/{id}/gviz/tq?tqx=out:csv&tqs=0"
    ))
}

/// Fetch and parse the reference sheet.
///
/// Network and HTTP-status failures come back as `DataLoad` so the caller can
/// degrade to an empty table with a banner instead of crashing the form.
pub async fn fetch_reference(
    client: &reqwest::Client,
    share_url: &str,
) -> Result<ReferenceTable, AppError> {
    let url = gviz_csv_url(share_url)?;
    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| AppError::DataLoad(e.to_string()))?
        .error_for_status()
        .map_err(|e| AppError::DataLoad(e.to_string()))?;
    let body = response
        .text()
        .await
        .map_err(|e| AppError::DataLoad(e.to_string()))?;
    let table = ReferenceTable::from_csv(&body)?;
    info!("reference sheet loaded: {} equipment rows", table.len());
    Ok(table)
}

/// Application-scoped cache of the reference table.
///
/// A fetched table (or a failed fetch, cached as an empty table plus the
/// error message) stays valid for the configured TTL; `invalidate` forces the
/// next access to re-fetch.
pub struct ReferenceCache {
    ttl: Duration,
    slot: Option<CachedTable>,
}

struct CachedTable {
    table: Arc<ReferenceTable>,
    load_error: Option<String>,
    fetched_at: Instant,
}

impl ReferenceCache {
    pub fn new(ttl: Duration) -> Self {
        ReferenceCache { ttl, slot: None }
    }

    /// The cached table, if still fresh, along with the load error that
    /// produced it (present when the cached entry is a degraded empty table).
    pub fn fresh(&self) -> Option<(Arc<ReferenceTable>, Option<String>)> {
        self.slot
            .as_ref()
            .filter(|c| c.fetched_at.elapsed() < self.ttl)
            .map(|c| (Arc::clone(&c.table), c.load_error.clone()))
    }

    pub fn store(&mut self, table: ReferenceTable) -> Arc<ReferenceTable> {
        let table = Arc::new(table);
        self.slot = Some(CachedTable {
            table: Arc::clone(&table),
            load_error: None,
            fetched_at: Instant::now(),
        });
        table
    }

    /// Cache a failed load as an empty table so every interaction does not
    /// re-hit an unreachable sheet before the TTL expires.
    pub fn store_failure(&mut self, error: &AppError) -> Arc<ReferenceTable> {
        warn!("reference load failed, caching empty table: {error}");
        let table = Arc::new(ReferenceTable::empty());
        self.slot = Some(CachedTable {
            table: Arc::clone(&table),
            load_error: Some(error.to_string()),
            fetched_at: Instant::now(),
        });
        table
    }

    pub fn invalidate(&mut self) {
        self.slot = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\"UFV\",\"família do equipamento\",\"SE\",\"equipamento\"\n\
                       \"UFV Norte\",\"Transformador\",\"SE-01\",\"TR-01\"\n\
                       \"UFV Norte\",\"Transformador\",\"SE-01\",\"TR-02\"\n\
                       \"UFV Sul\",\"Inversor\",\"SE-02\",\"INV-07\"\n";

    #[test]
    fn parses_quoted_csv_export() {
        let table = ReferenceTable::from_csv(CSV).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.rows()[0],
            EquipmentRow {
                ufv: "UFV Norte".into(),
                familia: "Transformador".into(),
                se: "SE-01".into(),
                equipamento: "TR-01".into(),
            }
        );
    }

    #[test]
    fn reports_all_missing_columns_by_name() {
        let err = ReferenceTable::from_csv("UFV,SE\na,b\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Colunas faltando no arquivo de equipamentos: família do equipamento, equipamento"
        );
    }

    #[test]
    fn skips_rows_with_blank_cells() {
        let csv = "UFV,família do equipamento,SE,equipamento\n\
                   UFV Norte,,SE-01,TR-01\n\
                   UFV Norte,Transformador,SE-01,TR-01\n";
        let table = ReferenceTable::from_csv(csv).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn handles_doubled_quotes_and_crlf() {
        let csv = "UFV,família do equipamento,SE,equipamento\r\n\
                   \"UFV \"\"A\"\"\",Religador,SE-03,\"RL, reserva\"\r\n";
        let table = ReferenceTable::from_csv(csv).unwrap();
        assert_eq!(table.rows()[0].ufv, "UFV \"A\"");
        assert_eq!(table.rows()[0].equipamento, "RL, reserva");
    }

    #[test]
    fn derives_gviz_url_from_share_url() {
        let url = gviz_csv_url(
            "https://docs.google.com/spreadsheets/d/1lUzy2PInVjaL2k7U5R4Wofc-9mvID-EF/edit?usp=sharing",
        )
        .unwrap();
        assert_eq!(
            url,
            "https://docs.google.com/spreadsheets/d/1lUzy2PInVjaL2k7U5R4Wofc-9mvID-EF/gviz/tq?tqx=out:csv&tqs=0"
        );
    }

    #[test]
    fn rejects_share_url_without_id() {
        assert!(gviz_csv_url("https://example.com/planilha.csv").is_err());
    }

    #[test]
    fn cache_expires_and_invalidates() {
        let mut cache = ReferenceCache::new(Duration::from_secs(600));
        assert!(cache.fresh().is_none());

        cache.store(ReferenceTable::from_csv(CSV).unwrap());
        let (table, err) = cache.fresh().expect("fresh after store");
        assert_eq!(table.len(), 3);
        assert!(err.is_none());

        cache.invalidate();
        assert!(cache.fresh().is_none());

        let mut expired = ReferenceCache::new(Duration::ZERO);
        expired.store(ReferenceTable::empty());
        assert!(expired.fresh().is_none());
    }

    #[test]
    fn cache_keeps_failure_banner() {
        let mut cache = ReferenceCache::new(Duration::from_secs(600));
        let table = cache.store_failure(&AppError::DataLoad("timeout".into()));
        assert!(table.is_empty());
        let (_, banner) = cache.fresh().unwrap();
        assert_eq!(
            banner.as_deref(),
            Some("Não foi possível carregar os dados dos equipamentos da planilha: timeout")
        );
    }
}
