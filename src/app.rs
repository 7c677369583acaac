use axum::{
    Json, Router,
    extract::State,
    response::{Html, IntoResponse},
    routing::{get, post},
};
use chrono::{NaiveDate, NaiveTime};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::cascade::Level;
use crate::config::Config;
use crate::error::AppError;
use crate::form::{FormEvent, FormState};
use crate::record::{LOG_COLUMNS, Ocorrencia, PROTECOES};
use crate::reference::{ReferenceCache, ReferenceTable, fetch_reference};
use crate::store::{LogStore, MemoryLogStore, SheetsLogStore};
use crate::validation::temporal_error;

pub struct AppState {
    form: Mutex<FormState>,
    cache: tokio::sync::Mutex<ReferenceCache>,
    store: Arc<dyn LogStore>,
    client: reqwest::Client,
    config: Config,
}

/// Everything the page needs to re-render itself after an interaction: the
/// current form state, the option list of each visible selector (absent list
/// = selector hidden), the live temporal-validation error and the
/// reference-load banner, if any.
#[derive(Serialize)]
struct ViewModel {
    form: FormState,
    options: SelectorOptions,
    temporal_error: Option<String>,
    reference_error: Option<String>,
    protecoes_catalogo: Vec<&'static str>,
}

#[derive(Serialize)]
struct SelectorOptions {
    ufv: Option<Vec<String>>,
    familia: Option<Vec<String>>,
    se: Option<Vec<String>>,
    equipamento: Option<Vec<String>>,
}

/// One form interaction posted by the page.
#[derive(Deserialize)]
struct EventRequest {
    field: String,
    #[serde(default)]
    value: serde_json::Value,
}

#[derive(Serialize)]
struct ActionResponse {
    status: String,
    message: Option<String>,
    kind: Option<&'static str>,
    resumo: Option<String>,
}

impl ActionResponse {
    fn ok(message: impl Into<String>) -> Self {
        ActionResponse {
            status: "ok".to_string(),
            message: Some(message.into()),
            kind: None,
            resumo: None,
        }
    }

    fn error(err: &AppError) -> Self {
        ActionResponse {
            status: "error".to_string(),
            message: Some(err.to_string()),
            kind: Some(err.kind()),
            resumo: None,
        }
    }
}

#[derive(Serialize)]
struct RecordsResponse {
    status: String,
    message: Option<String>,
    columns: Vec<&'static str>,
    rows: Vec<Vec<String>>,
}

pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let store: Arc<dyn LogStore> = match &config.log_endpoint {
        Some(endpoint) => Arc::new(SheetsLogStore::new(
            endpoint.clone(),
            config.log_worksheet.clone(),
            config.request_timeout,
        )?),
        None => Arc::new(MemoryLogStore::new()),
    };

    let client = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()?;

    let bind_addr = config.bind_addr.clone();
    let app_state = Arc::new(AppState {
        form: Mutex::new(FormState::new_today()),
        cache: tokio::sync::Mutex::new(ReferenceCache::new(config.reference_ttl)),
        store,
        client,
        config,
    });

    // Build router
    let app = router(app_state);

    // Start server
    let listener = TcpListener::bind(&bind_addr).await?;
    info!("listening on http://{bind_addr}");
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(serve_form_page))
        .route("/api/form", get(get_view))
        .route("/api/event", post(post_event))
        .route("/api/gravar", post(post_gravar))
        .route("/api/limpar", post(post_limpar))
        .route("/api/ocorrencias", get(get_ocorrencias))
        .route("/api/reference/refresh", post(post_refresh))
        .nest_service("/static", ServeDir::new("static"))
        .with_state(state)
}

async fn serve_form_page() -> Html<&'static str> {
    Html(include_str!("./static/form.html"))
}

/// The cached reference table, re-fetched when stale. A failed fetch is
/// cached as an empty table plus its banner so the form degrades instead of
/// crashing, and the sheet is not re-hit on every interaction.
async fn reference(state: &AppState) -> (Arc<ReferenceTable>, Option<String>) {
    let mut cache = state.cache.lock().await;
    if let Some(hit) = cache.fresh() {
        return hit;
    }
    match fetch_reference(&state.client, &state.config.reference_sheet_url).await {
        Ok(table) => (cache.store(table), None),
        Err(err) => {
            let message = err.to_string();
            (cache.store_failure(&err), Some(message))
        }
    }
}

fn current_form(state: &AppState) -> FormState {
    state
        .form
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

fn view_model(
    state: &AppState,
    table: &ReferenceTable,
    reference_error: Option<String>,
) -> ViewModel {
    let form = current_form(state);
    let sel = &form.selection;
    let options = SelectorOptions {
        ufv: sel.options(table, Level::Ufv),
        familia: sel.options(table, Level::Familia),
        se: sel.options(table, Level::Se),
        equipamento: sel.options(table, Level::Equipamento),
    };
    let temporal = temporal_error(&form).map(String::from);
    ViewModel {
        form,
        options,
        temporal_error: temporal,
        reference_error,
        protecoes_catalogo: PROTECOES.to_vec(),
    }
}

async fn get_view(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (table, banner) = reference(&state).await;
    Json(view_model(&state, &table, banner)).into_response()
}

async fn post_event(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EventRequest>,
) -> impl IntoResponse {
    let (table, banner) = reference(&state).await;

    let event = match parse_event(&request, &state, &table) {
        Ok(event) => event,
        Err(err) => return Json(ActionResponse::error(&err)).into_response(),
    };

    {
        let mut form = state
            .form
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let next = form.clone().apply(event);
        *form = next;
    }

    Json(view_model(&state, &table, banner)).into_response()
}

/// Translate a wire event into a typed `FormEvent`, rejecting malformed
/// values and selector options the current cascade does not offer.
fn parse_event(
    request: &EventRequest,
    state: &AppState,
    table: &ReferenceTable,
) -> Result<FormEvent, AppError> {
    let value = &request.value;
    match request.field.as_str() {
        "date_ini" => Ok(FormEvent::SetDataInicial(parse_date(value)?)),
        "date_fim" => Ok(FormEvent::SetDataFinal(parse_date(value)?)),
        "h_ini" => Ok(FormEvent::SetHoraInicial(parse_time(value)?)),
        "h_fim" => Ok(FormEvent::SetHoraFinal(parse_time(value)?)),
        "descricao" => Ok(FormEvent::SetDescricao(parse_text(value))),
        "observacoes" => Ok(FormEvent::SetObservacoes(parse_text(value))),
        "bloqueio" => Ok(FormEvent::SetBloqueio(value.as_bool().unwrap_or(false))),
        "protecoes" => {
            let picked = value
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|v| v.as_str().map(String::from))
                        .collect()
                })
                .unwrap_or_default();
            Ok(FormEvent::SetProtecoes(picked))
        }
        "ufv" | "familia" | "se" | "equipamento" => {
            let level = match request.field.as_str() {
                "ufv" => Level::Ufv,
                "familia" => Level::Familia,
                "se" => Level::Se,
                _ => Level::Equipamento,
            };
            let picked = match parse_text(value) {
                s if s.is_empty() => None,
                s => Some(s),
            };
            if let Some(choice) = &picked {
                let offered = current_form(state).selection.options(table, level);
                let valid = offered.map(|opts| opts.iter().any(|o| o == choice));
                if valid != Some(true) {
                    return Err(AppError::Validation(format!(
                        "Opção inválida para o seletor: {choice}"
                    )));
                }
            }
            Ok(FormEvent::SetNivel(level, picked))
        }
        other => Err(AppError::Validation(format!("Campo desconhecido: {other}"))),
    }
}

fn parse_text(value: &serde_json::Value) -> String {
    value.as_str().unwrap_or("").to_string()
}

fn parse_date(value: &serde_json::Value) -> Result<Option<NaiveDate>, AppError> {
    match value.as_str().map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| AppError::Validation(format!("Data inválida: {s}"))),
    }
}

fn parse_time(value: &serde_json::Value) -> Result<Option<NaiveTime>, AppError> {
    match value.as_str().map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveTime::parse_from_str(s, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
            .map(Some)
            .map_err(|_| AppError::Validation(format!("Hora inválida: {s}"))),
    }
}

/// Validate, format and append one incident record. At most one row is
/// appended per call; a failed append leaves the caller's form untouched.
pub async fn gravar(form: &FormState, store: &dyn LogStore) -> Result<Ocorrencia, AppError> {
    let record = Ocorrencia::from_form(form)?;
    store.append(record.to_row()).await?;
    Ok(record)
}

async fn post_gravar(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = current_form(&state);

    match gravar(&snapshot, state.store.as_ref()).await {
        Ok(record) => {
            // Only a committed submission resets the form.
            let mut form = state
                .form
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *form = FormState::new_today();
            info!("ocorrência gravada: {} / {}", record.se, record.equipamento);
            let mut response = ActionResponse::ok("Ocorrência gravada com sucesso!");
            response.resumo = Some(record.resumo());
            Json(response).into_response()
        }
        Err(err) => {
            error!("gravação recusada: {err}");
            Json(ActionResponse::error(&err)).into_response()
        }
    }
}

async fn post_limpar(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut form = state
        .form
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *form = FormState::new_today();
    Json(ActionResponse::ok("Formulário limpo!")).into_response()
}

async fn get_ocorrencias(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.read_all().await {
        Ok(rows) => {
            let message = rows
                .is_empty()
                .then(|| "Nenhuma ocorrência registrada ainda.".to_string());
            // most recent first
            let rows = rows.into_iter().rev().collect();
            Json(RecordsResponse {
                status: "ok".to_string(),
                message,
                columns: LOG_COLUMNS.to_vec(),
                rows,
            })
            .into_response()
        }
        Err(err) => {
            error!("leitura do log falhou: {err}");
            Json(RecordsResponse {
                status: "error".to_string(),
                message: Some(err.to_string()),
                columns: LOG_COLUMNS.to_vec(),
                rows: Vec::new(),
            })
            .into_response()
        }
    }
}

async fn post_refresh(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.cache.lock().await.invalidate();
    let (table, banner) = reference(&state).await;
    Json(view_model(&state, &table, banner)).into_response()
}
