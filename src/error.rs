use thiserror::Error;

/// Error taxonomy of the application.
///
/// Every variant maps to a user-visible message; none of them is allowed to
/// terminate the process. `Validation` blocks a submission with the form
/// preserved, `Persistence` leaves the form untouched so the user can retry,
/// and `DataLoad` degrades the selectors to an empty option set plus a banner.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Não foi possível carregar os dados dos equipamentos da planilha: {0}")]
    DataLoad(String),

    #[error("Colunas faltando no arquivo de equipamentos: {0}")]
    MissingColumns(String),

    #[error("Não foi possível ler as ocorrências da planilha: {0}")]
    LogRead(String),

    #[error("{0}")]
    Validation(String),

    #[error("Ocorreu um erro ao gravar a ocorrência: {0}")]
    Persistence(String),
}

impl AppError {
    /// Stable machine-readable kind, used in JSON responses and log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::DataLoad(_) | AppError::MissingColumns(_) | AppError::LogRead(_) => {
                "data_load"
            }
            AppError::Validation(_) => "validation",
            AppError::Persistence(_) => "persistence",
        }
    }
}
