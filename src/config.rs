use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Default listen address, matching the port the reporting tool has always used.
pub const DEFAULT_BIND: &str = "127.0.0.1:5001";
pub const DEFAULT_ROSTER_SHEET: &str = "user-emails";
pub const DEFAULT_LOG_SHEET: &str = "submit_logs";
pub const DEFAULT_TOKEN_PATH: &str = "credentials/token.json";
pub const DEFAULT_STATIC_DIR: &str = "static";
pub const DEFAULT_SHEETS_API: &str = "https://sheets.googleapis.com/v4";
/// Sliding session window: 15 minutes since the last request.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 15 * 60;
/// Cookie signing keys are derived from at least this much secret material.
pub const MIN_SESSION_SECRET_BYTES: usize = 32;

/// Errors raised while reading configuration from the environment
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime configuration of the reporting service
///
/// Every value that used to be a literal in the source (spreadsheet id,
/// credential path, signing secret) is read here once at startup and then
/// handed to the router through [`crate::app::AppState`].
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP server listens on
    pub bind: SocketAddr,

    /// Identifier of the spreadsheet holding the roster and the week worksheets
    pub spreadsheet_id: String,

    /// Title of the worksheet listing authorized emails (A: email, B: first, C: last)
    pub roster_sheet: String,

    /// Title of the worksheet submissions are logged to
    pub log_sheet: String,

    /// Authorized-user token file (`type: authorized_user` with a
    /// `refresh_token`) used to talk to the spreadsheet service. Service-account
    /// key files are refused at the first store call.
    pub token_path: PathBuf,

    /// Secret used to sign the session cookie; `None` means a per-process key
    pub session_secret: Option<String>,

    /// Inactivity window after which a session is no longer verified
    pub session_ttl: Duration,

    /// Directory served under `/static`
    pub static_dir: PathBuf,

    /// Base URL of the spreadsheet REST API
    pub sheets_api: String,
}

impl AppConfig {
    /// Configuration with every optional value at its default
    pub fn for_spreadsheet(spreadsheet_id: impl Into<String>) -> Self {
        AppConfig {
            bind: DEFAULT_BIND
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 5001))),
            spreadsheet_id: spreadsheet_id.into(),
            roster_sheet: DEFAULT_ROSTER_SHEET.to_string(),
            log_sheet: DEFAULT_LOG_SHEET.to_string(),
            token_path: PathBuf::from(DEFAULT_TOKEN_PATH),
            session_secret: None,
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            sheets_api: DEFAULT_SHEETS_API.to_string(),
        }
    }

    /// Read the configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through an arbitrary variable lookup
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let spreadsheet_id = get("SHIFT_REPORT_SPREADSHEET_ID")
            .ok_or(ConfigError::Missing("SHIFT_REPORT_SPREADSHEET_ID"))?;
        let mut config = AppConfig::for_spreadsheet(spreadsheet_id);

        if let Some(bind) = get("SHIFT_REPORT_BIND") {
            config.bind = bind
                .parse()
                .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                    name: "SHIFT_REPORT_BIND",
                    value: bind.clone(),
                    reason: e.to_string(),
                })?;
        }
        if let Some(sheet) = get("SHIFT_REPORT_ROSTER_SHEET") {
            config.roster_sheet = sheet;
        }
        if let Some(sheet) = get("SHIFT_REPORT_LOG_SHEET") {
            config.log_sheet = sheet;
        }
        if let Some(path) = get("SHIFT_REPORT_TOKEN_PATH") {
            config.token_path = PathBuf::from(path);
        }
        if let Some(secret) = get("SHIFT_REPORT_SESSION_SECRET") {
            check_session_secret(&secret)?;
            config.session_secret = Some(secret);
        }
        if let Some(ttl) = get("SHIFT_REPORT_SESSION_TTL_SECS") {
            let secs: u64 = ttl
                .parse()
                .map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                    name: "SHIFT_REPORT_SESSION_TTL_SECS",
                    value: ttl.clone(),
                    reason: e.to_string(),
                })?;
            config.session_ttl = Duration::from_secs(secs);
        }
        if let Some(dir) = get("SHIFT_REPORT_STATIC_DIR") {
            config.static_dir = PathBuf::from(dir);
        }
        if let Some(api) = get("SHIFT_REPORT_SHEETS_API") {
            config.sheets_api = api.trim_end_matches('/').to_string();
        }

        Ok(config)
    }
}

/// Reject signing secrets too short to derive a cookie key from
pub fn check_session_secret(secret: &str) -> Result<(), ConfigError> {
    if secret.len() < MIN_SESSION_SECRET_BYTES {
        return Err(ConfigError::Invalid {
            name: "SHIFT_REPORT_SESSION_SECRET",
            value: "<redacted>".to_string(),
            reason: format!("must be at least {} bytes", MIN_SESSION_SECRET_BYTES),
        });
    }
    Ok(())
}
