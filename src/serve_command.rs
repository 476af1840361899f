use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, FixedOffset, Local, TimeZone};
use log::{debug, error, info};
use tokio::net::TcpListener;

use crate::config::Settings;
use crate::console::Outlook;
use crate::directory::ProjectDirectory;
use crate::error::StatError;
use crate::report::Report;
use crate::timecard::Timecard;
use crate::toggl::TogglRepository;

/// タイムカードをHTTPで提供するためのサブコマンド。
#[derive(Debug, clap::Args)]
pub struct ServeArgs {
    #[clap(
        short = 'p',
        long = "port",
        env = "PORT",
        default_value_t = 80,
        help = "Port to listen on"
    )]
    port: u16,
}

/// リクエスト間で共有する状態。
///
/// 設定は読み取り専用で、プロジェクトのキャッシュはidごとに排他的に埋められる。
pub struct AppState {
    toggl_client: Arc<dyn TogglRepository>,
    directory: Arc<ProjectDirectory>,
    settings: Arc<Settings>,
}

impl AppState {
    pub fn new(
        toggl_client: Arc<dyn TogglRepository>,
        directory: Arc<ProjectDirectory>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            toggl_client,
            directory,
            settings,
        }
    }

    async fn report<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<Report, StatError> {
        let report = Timecard::new(self.toggl_client.as_ref(), &self.directory, &self.settings)
            .report(now)
            .await;
        debug!(
            "cached projects: {}, cached clients: {}",
            self.directory.cached_projects(),
            self.directory.cached_clients()
        );
        report
    }
}

/// ルーティングを作成する。
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/report.json", get(report_json))
        .with_state(Arc::new(state))
}

/// `serve`サブコマンドの処理を行う。
///
/// リクエストごとにLocalタイムゾーンの現在時刻でタイムカードを計算する。
pub async fn serve_command(serve: ServeArgs, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", serve.port))
        .await
        .with_context(|| format!("Failed to listen on port {}", serve.port))?;
    info!("Ready to serve on port {}", serve.port);

    axum::serve(listener, router(state))
        .await
        .context("Server stopped unexpectedly")
}

/// 給与期間の終了予定時刻を表示するページ。
async fn index(State(state): State<Arc<AppState>>) -> Response {
    let now = Local::now();
    match state.report(&now).await {
        Ok(report) => Html(render_page(&report, &now.fixed_offset())).into_response(),
        Err(e) => {
            error!("Failed to calculate timecard: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error loading time").into_response()
        }
    }
}

/// タイムカードをJSONで返す。
async fn report_json(State(state): State<Arc<AppState>>) -> Response {
    match state.report(&Local::now()).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => {
            error!("Failed to calculate timecard: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error loading time").into_response()
        }
    }
}

/// 給与期間の終了予定時刻、または超過時間を中央に大きく表示するHTMLを作成する。
pub fn render_page(report: &Report, now: &DateTime<FixedOffset>) -> String {
    let value = match Outlook::new(now, report.pay_period.remaining) {
        Outlook::Eta(eta) => eta,
        Outlook::Overage(overage) => overage,
    };

    format!(
        r#"<html>
<title>Time</title>
<meta name="viewport" content="width=device-width,initial-scale=1">
<style>
body {{
display: flex;
width: 100%;
height: 100%;
margin: auto;
align-items:center;
justify-content:center;
text-align: center;
}}
</style>
<body><h1>{}</h1>"#,
        value
    )
}
