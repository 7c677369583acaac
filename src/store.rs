use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::record::LOG_COLUMNS;

/// The incident log behind the form.
///
/// Each `append` is an independent, non-transactional operation: one row per
/// call, no deduplication of repeated submits, no conflict handling between
/// concurrent users beyond whatever the backing sheet provides.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Append exactly one row to the log.
    async fn append(&self, row: Vec<String>) -> Result<(), AppError>;

    /// Read every logged row, oldest first, each capped to the known
    /// 12-column schema.
    async fn read_all(&self) -> Result<Vec<Vec<String>>, AppError>;
}

fn cap_columns(mut row: Vec<String>) -> Vec<String> {
    row.truncate(LOG_COLUMNS.len());
    row
}

#[derive(Serialize)]
struct AppendRequest<'a> {
    worksheet: &'a str,
    values: &'a [String],
}

#[derive(Deserialize)]
struct ReadResponse {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// Log store backed by a spreadsheet gateway: a small web endpoint in front
/// of the worksheet that accepts JSON appends and serves JSON reads.
/// Authentication between the gateway and the sheet is the gateway's problem,
/// not this client's.
pub struct SheetsLogStore {
    client: reqwest::Client,
    endpoint: String,
    worksheet: String,
}

impl SheetsLogStore {
    /// `timeout` bounds every call; an elapsed timeout surfaces as a
    /// retryable persistence/read failure, never as a hang or a crash.
    pub fn new(
        endpoint: String,
        worksheet: String,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Persistence(e.to_string()))?;
        Ok(SheetsLogStore {
            client,
            endpoint,
            worksheet,
        })
    }

    fn describe(e: reqwest::Error) -> String {
        if e.is_timeout() {
            "tempo de resposta da planilha esgotado, tente novamente".to_string()
        } else {
            e.to_string()
        }
    }
}

#[async_trait]
impl LogStore for SheetsLogStore {
    async fn append(&self, row: Vec<String>) -> Result<(), AppError> {
        let body = AppendRequest {
            worksheet: &self.worksheet,
            values: &row,
        };
        self.client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Persistence(Self::describe(e)))?
            .error_for_status()
            .map_err(|e| AppError::Persistence(e.to_string()))?;
        info!("appended 1 row to worksheet '{}'", self.worksheet);
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<Vec<String>>, AppError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("worksheet", self.worksheet.as_str())])
            .send()
            .await
            .map_err(|e| AppError::LogRead(Self::describe(e)))?
            .error_for_status()
            .map_err(|e| AppError::LogRead(e.to_string()))?;
        let parsed: ReadResponse = response
            .json()
            .await
            .map_err(|e| AppError::LogRead(e.to_string()))?;
        Ok(parsed.values.into_iter().map(cap_columns).collect())
    }
}

/// In-memory log store, used by the tests and as the fallback when no
/// gateway endpoint is configured (submissions then last only for the
/// process lifetime).
#[derive(Default)]
pub struct MemoryLogStore {
    rows: Mutex<Vec<Vec<String>>>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        warn!("no log endpoint configured, incident rows are kept in memory only");
        MemoryLogStore::default()
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn append(&self, row: Vec<String>) -> Result<(), AppError> {
        self.rows
            .lock()
            .map_err(|_| AppError::Persistence("estado interno corrompido".to_string()))?
            .push(row);
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<Vec<String>>, AppError> {
        let rows = self
            .rows
            .lock()
            .map_err(|_| AppError::LogRead("estado interno corrompido".to_string()))?;
        Ok(rows.iter().cloned().map(cap_columns).collect())
    }
}

/// Log store that refuses every operation. Exercises the failure paths in
/// tests: a rejected append must leave the form untouched.
#[cfg(test)]
pub struct FailingLogStore;

#[cfg(test)]
#[async_trait]
impl LogStore for FailingLogStore {
    async fn append(&self, _row: Vec<String>) -> Result<(), AppError> {
        Err(AppError::Persistence("planilha indisponível".to_string()))
    }

    async fn read_all(&self) -> Result<Vec<Vec<String>>, AppError> {
        Err(AppError::LogRead("planilha indisponível".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_appends_in_order() {
        let store = MemoryLogStore::default();
        store.append(vec!["a".into()]).await.unwrap();
        store.append(vec!["b".into()]).await.unwrap();
        let rows = store.read_all().await.unwrap();
        assert_eq!(rows, vec![vec!["a".to_string()], vec!["b".to_string()]]);
    }

    #[tokio::test]
    async fn reads_cap_to_twelve_columns() {
        let store = MemoryLogStore::default();
        let wide: Vec<String> = (0..15).map(|i| i.to_string()).collect();
        store.append(wide).await.unwrap();
        let rows = store.read_all().await.unwrap();
        assert_eq!(rows[0].len(), LOG_COLUMNS.len());
        assert_eq!(rows[0][11], "11");
    }

    #[tokio::test]
    async fn failing_store_reports_taxonomy_kinds() {
        let store = FailingLogStore;
        let append_err = store.append(vec![]).await.unwrap_err();
        assert_eq!(append_err.kind(), "persistence");
        let read_err = store.read_all().await.unwrap_err();
        assert_eq!(read_err.kind(), "data_load");
        assert_eq!(
            read_err.to_string(),
            "Não foi possível ler as ocorrências da planilha: planilha indisponível"
        );
    }
}
