pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod schedule;
pub mod service;
pub mod session;
pub mod state;

use chrono::{NaiveDate, Utc};
use tracing_subscriber::EnvFilter;

use crate::api::{ApiClient, ApiError};
use crate::config::{AppConfig, ConfigError};
use crate::error::{ErrorKind, ScheduleError};
use crate::models::{UserLogin, ViewMode};
use crate::service::ScheduleService;
use crate::session::SessionStore;
use crate::state::ScheduleState;

pub const USAGE: &str = "usage: slotbook [day|week|month] [YYYY-MM-DD]";

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("{0}\n{usage}", usage = USAGE)]
    Usage(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("{}", .0.user_message())]
    Schedule(#[from] ScheduleError),
    #[error("Not logged in: set SLOTBOOK_EMAIL and SLOTBOOK_PASSWORD")]
    NotLoggedIn,
    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

/// Positional arguments: optional view mode, then optional anchor date.
fn parse_args(args: &[String], today: NaiveDate) -> Result<(ViewMode, NaiveDate), StartupError> {
    let mut view = ViewMode::Week;
    let mut anchor = today;
    let mut rest = args.iter();

    if let Some(first) = rest.next() {
        match first.parse::<ViewMode>() {
            Ok(mode) => {
                view = mode;
                if let Some(date) = rest.next() {
                    anchor = parse_date(date)?;
                }
            }
            Err(_) => anchor = parse_date(first)?,
        }
    }
    if let Some(extra) = rest.next() {
        return Err(StartupError::Usage(format!("unexpected argument {extra:?}")));
    }
    Ok((view, anchor))
}

fn parse_date(raw: &str) -> Result<NaiveDate, StartupError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| StartupError::Usage(format!("not a view or date: {raw:?}")))
}

fn credentials(config: &AppConfig) -> Option<UserLogin> {
    Some(UserLogin {
        email: config.email.clone()?,
        password: config.password.clone()?,
    })
}

async fn show_calendar(config: AppConfig, view: ViewMode, anchor: NaiveDate) -> Result<(), StartupError> {
    let mut client = ApiClient::new(&config.api_url, config.timeout_secs)?;
    match config::session_file() {
        Some(path) => client = client.with_session(SessionStore::new(path)),
        None => tracing::warn!("No home directory; session will not be saved"),
    }

    let login = credentials(&config);
    if !client.restore_session() {
        let login = login.as_ref().ok_or(StartupError::NotLoggedIn)?;
        client.login(login).await?;
    }

    let state = ScheduleState::new(view, anchor, config.timezone, config.grid.clone());
    let service = ScheduleService::new(client, state, config.per_page);

    if let Err(e) = service.refresh().await {
        // A saved token may have expired; log in again once if we can.
        let login = match (&login, e.kind()) {
            (Some(login), ErrorKind::Auth) => login,
            _ => return Err(e.into()),
        };
        service.backend().login(login).await?;
        service.refresh().await?;
    }

    let grid = service.grid()?;
    println!("{}", serde_json::to_string_pretty(&grid)?);
    Ok(())
}

pub fn run() -> Result<(), StartupError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = AppConfig::from_env()?;
    let today = Utc::now().with_timezone(&config.timezone).date_naive();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (view, anchor) = parse_args(&args, today)?;
    tracing::info!(api = %config.api_url, %view, %anchor, tz = %config.timezone, "Loading calendar");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(show_calendar(config, view, anchor))
}
