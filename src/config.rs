use std::env;
use std::time::Duration;

/// Runtime configuration, loaded once at startup from environment variables
/// (a `.env` file is honoured via `dotenvy` before this is read).
///
/// Everything has a default except the reference-sheet URL, which falls back
/// to the published equipment sheet the form was built around.
#[derive(Debug, Clone)]
pub struct Config {
    /// Share URL of the reference (equipment) spreadsheet.
    pub reference_sheet_url: String,

    /// Endpoint of the spreadsheet gateway used for the incident log.
    /// When absent the application runs with an in-memory log store.
    pub log_endpoint: Option<String>,

    /// Worksheet/tab that receives the appended incident rows.
    pub log_worksheet: String,

    /// Address the HTTP server binds to.
    pub bind_addr: String,

    /// Timeout applied to every remote spreadsheet call.
    pub request_timeout: Duration,

    /// How long a fetched reference table stays fresh.
    pub reference_ttl: Duration,
}

const DEFAULT_REFERENCE_URL: &str =
    "https://docs.google.com/spreadsheets/d/1lUzy2PInVjaL2k7U5R4Wofc-9mvID-EF/edit?usp=sharing";
const DEFAULT_WORKSHEET: &str = "Ocorrências";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_REFERENCE_TTL_SECS: u64 = 600;

impl Config {
    pub fn from_env() -> Self {
        let timeout = env::var("OCORRENCIAS_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let ttl = env::var("OCORRENCIAS_REFERENCE_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_REFERENCE_TTL_SECS);

        Config {
            reference_sheet_url: env::var("OCORRENCIAS_REFERENCE_URL")
                .unwrap_or_else(|_| DEFAULT_REFERENCE_URL.to_string()),
            log_endpoint: env::var("OCORRENCIAS_LOG_ENDPOINT").ok(),
            log_worksheet: env::var("OCORRENCIAS_LOG_WORKSHEET")
                .unwrap_or_else(|_| DEFAULT_WORKSHEET.to_string()),
            bind_addr: env::var("OCORRENCIAS_BIND_ADDR")
                .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            request_timeout: Duration::from_secs(timeout),
            reference_ttl: Duration::from_secs(ttl),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            reference_sheet_url: DEFAULT_REFERENCE_URL.to_string(),
            log_endpoint: None,
            log_worksheet: DEFAULT_WORKSHEET.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            reference_ttl: Duration::from_secs(DEFAULT_REFERENCE_TTL_SECS),
        }
    }
}
