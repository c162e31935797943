use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Extension, Form, Json, Router,
    extract::{FromRef, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Key, SignedCookieJar};
use handlebars::{Handlebars, TemplateError};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::config::{AppConfig, ConfigError, check_session_secret};
use crate::pages;
use crate::report::{self, Day, ReportQuery, Shift};
use crate::roster::{self, VerifyError};
use crate::session::{self, SessionData, require_verified, require_verified_api, slide_session};
use crate::sheets::GoogleSheets;
use crate::store::SheetStore;
use crate::submission::{self, METRIC_FIELDS, Submission, SubmitError};
use crate::week;

/// Why the application state could not be assembled
#[derive(Debug, Error)]
pub enum StateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("page templates failed to compile: {0}")]
    Template(#[from] TemplateError),
}

/// Shared by every request
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn SheetStore>,
    pub templates: Arc<Handlebars<'static>>,
    pub cookie_key: Key,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn SheetStore>) -> Result<Self, StateError> {
        let cookie_key = match config.session_secret.as_deref() {
            Some(secret) => {
                check_session_secret(secret)?;
                Key::derive_from(secret.as_bytes())
            }
            None => {
                log::warn!(
                    "SHIFT_REPORT_SESSION_SECRET not set; sessions will not survive a restart"
                );
                Key::generate()
            }
        };
        Ok(AppState {
            config: Arc::new(config),
            store,
            templates: Arc::new(pages::templates()?),
            cookie_key,
        })
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

#[derive(Deserialize)]
struct FlashQuery {
    error: Option<String>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct EmailForm {
    #[serde(default)]
    email: String,
}

#[derive(Deserialize)]
struct WeeklyParams {
    week: Option<String>,
}

#[derive(Deserialize)]
struct ReportParams {
    week: Option<String>,
    day: Option<String>,
    shift: Option<String>,
}

/// Build the router with every route and the session layer
pub fn router(state: AppState) -> Router {
    let pages = Router::new()
        .route("/form", get(serve_form))
        .route("/submit", post(handle_submit))
        .route("/dashboard", get(serve_dashboard))
        .route("/report", get(serve_report))
        .route_layer(middleware::from_fn(require_verified));

    let api = Router::new()
        .route("/api/report", get(api_report))
        .route("/api/weekly-metrics", get(api_weekly_metrics))
        .route_layer(middleware::from_fn(require_verified_api));

    Router::new()
        .route("/", get(serve_landing))
        .route("/verify-email", post(handle_verify_email))
        .route("/logout", post(handle_logout))
        .merge(pages)
        .merge(api)
        .nest_service("/static", ServeDir::new(&state.config.static_dir))
        .layer(middleware::from_fn_with_state(state.clone(), slide_session))
        .with_state(state)
}

/// Open the spreadsheet and serve until the process is stopped
pub async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store: Arc<dyn SheetStore> = Arc::new(GoogleSheets::new(&config));
    let state = AppState::new(config, store)?;
    let bind = state.config.bind;

    let listener = TcpListener::bind(bind).await?;
    log::info!("Listening on http://{}", bind);
    axum::serve(listener, router(state)).await?;

    Ok(())
}

fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn day_names() -> Vec<&'static str> {
    Day::ALL.iter().map(|d| d.name()).collect()
}

async fn serve_landing(
    State(state): State<AppState>,
    Query(flash): Query<FlashQuery>,
) -> Response {
    pages::render(
        &state.templates,
        "home",
        &json!({ "error": flash.error, "message": flash.message }),
    )
}

async fn handle_verify_email(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Form(form): Form<EmailForm>,
) -> Response {
    match roster::verify(state.store.as_ref(), &state.config.roster_sheet, &form.email).await {
        Ok(user) => {
            log::info!("Verified {}", user.email);
            let data = SessionData::for_verified(&user, session::now());
            let jar = session::store(jar, &data, state.config.session_ttl);
            (jar, Redirect::to("/form")).into_response()
        }
        Err(err) => {
            match &err {
                VerifyError::Store(e) => log::error!("Roster lookup failed: {}", e),
                other => log::info!("Verification refused: {}", other),
            }
            let target = format!("/?error={}", urlencoding::encode(&err.user_message()));
            Redirect::to(&target).into_response()
        }
    }
}

async fn handle_logout(jar: SignedCookieJar) -> (SignedCookieJar, Redirect) {
    (session::clear(jar), Redirect::to("/"))
}

async fn serve_dashboard(
    State(state): State<AppState>,
    Extension(session): Extension<SessionData>,
) -> Response {
    pages::render(
        &state.templates,
        "dashboard",
        &json!({ "user_full_name": session.user_full_name }),
    )
}

async fn serve_form(
    State(state): State<AppState>,
    Extension(session): Extension<SessionData>,
) -> Response {
    let latest_week = match week::resolve_latest_week(state.store.as_ref()).await {
        Ok(week) => week.unwrap_or_default(),
        Err(e) => {
            log::error!("Could not list worksheets for the form: {}", e);
            String::new()
        }
    };

    let fields: Vec<_> = METRIC_FIELDS
        .iter()
        .map(|f| json!({ "name": f.name, "label": f.label }))
        .collect();

    pages::render(
        &state.templates,
        "form",
        &json!({
            "latest_week": latest_week,
            "user_full_name": session.user_full_name,
            "days": day_names(),
            "fields": fields,
        }),
    )
}

async fn handle_submit(
    State(state): State<AppState>,
    Extension(session): Extension<SessionData>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let submission = match Submission::from_form(&form) {
        Ok(s) => s,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    let outcome = match submission::submit_metrics(state.store.as_ref(), &submission).await {
        Ok(outcome) => outcome,
        Err(SubmitError::WeekNotFound(week)) => {
            return (
                StatusCode::NOT_FOUND,
                format!("Sheet/tab not found: {}", week),
            )
                .into_response();
        }
        Err(e) => {
            log::error!("Submission by {} failed: {}", session.user_email, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    let message = outcome.message();
    log::info!(
        "{} submitted {} value(s) for {} {}",
        session.user_email,
        outcome.written.len(),
        submission.week,
        submission.day.name()
    );
    submission::log_submission(
        state.store.as_ref(),
        &state.config.log_sheet,
        &session.user_email,
        &submission,
        message,
    )
    .await;

    pages::render(
        &state.templates,
        "confirmation",
        &json!({
            "success": outcome.updated(),
            "message": message,
            "name": submission.submitted_by,
            "timestamp": submission.local_timestamp,
        }),
    )
}

async fn serve_report(
    State(state): State<AppState>,
    Extension(session): Extension<SessionData>,
) -> Response {
    let (week_names, error) = match week::resolve_report_weeks(state.store.as_ref()).await {
        Ok(weeks) => (weeks, None),
        Err(e) => {
            log::error!("Could not list weeks for the report page: {}", e);
            (Vec::new(), Some("Unable to load the list of weeks."))
        }
    };
    let default_week = week_names.first().cloned().unwrap_or_default();
    let shifts: Vec<_> = Shift::ALL.iter().map(|s| s.name()).collect();

    pages::render(
        &state.templates,
        "report",
        &json!({
            "week_names": week_names,
            "default_week": default_week,
            "user_full_name": session.user_full_name,
            "days": day_names(),
            "shifts": shifts,
            "error": error,
        }),
    )
}

async fn api_report(
    State(state): State<AppState>,
    Query(params): Query<ReportParams>,
) -> Response {
    let query = match ReportQuery::parse(
        params.week.as_deref(),
        params.day.as_deref(),
        params.shift.as_deref(),
    ) {
        Ok(query) => query,
        Err(e) => return api_error(StatusCode::BAD_REQUEST, e.to_string()),
    };

    match report::fetch_report(state.store.as_ref(), &query).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => {
            log::error!("Report for '{}' failed: {}", query.week, e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// Weekly totals of one week, or of the newest week for `latest` or no week
async fn api_weekly_metrics(
    State(state): State<AppState>,
    Query(params): Query<WeeklyParams>,
) -> Response {
    const READ_FAILED: &str = "Unable to read sheet data";

    let requested = params.week.filter(|w| !w.is_empty() && w != "latest");
    let week = match requested {
        Some(week) => week,
        None => match week::resolve_report_weeks(state.store.as_ref()).await {
            Ok(weeks) => match weeks.into_iter().next() {
                Some(week) => week,
                None => return api_error(StatusCode::NOT_FOUND, "No valid week found"),
            },
            Err(e) => {
                log::error!("Could not list weeks for weekly metrics: {}", e);
                return api_error(StatusCode::INTERNAL_SERVER_ERROR, READ_FAILED);
            }
        },
    };

    match report::fetch_weekly(state.store.as_ref(), &week).await {
        Ok(metrics) => Json(metrics).into_response(),
        Err(e) => {
            log::error!("Weekly metrics for '{}' failed: {}", week, e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, READ_FAILED)
        }
    }
}
