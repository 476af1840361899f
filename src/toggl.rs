use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
#[cfg(test)]
use mockall::automock;
use reqwest::{header::CONTENT_TYPE, Client as HttpClient};
use serde::{de::DeserializeOwned, Deserialize};

use crate::config::DEFAULT_API_URL;
use crate::error::StatError;
use crate::time_entry::{Client, Project, TimeEntry};

/// Toggl APIのtime entryをデシリアライズするための構造体。
#[derive(Debug, Deserialize)]
struct TogglTimeEntry {
    id: i64,
    workspace_id: i64,
    project_id: Option<i64>,
    start: DateTime<Utc>,
    duration: i64,
    #[serde(default)]
    billable: bool,
    description: Option<String>,
}

/// Toggl APIのプロジェクト情報をデシリアライズするための構造体。
#[derive(Debug, Deserialize)]
struct TogglProject {
    id: i64,
    workspace_id: i64,
    client_id: Option<i64>,
    name: String,
}

/// Toggl APIのクライアント情報をデシリアライズするための構造体。
#[derive(Debug, Deserialize)]
struct TogglClientRecord {
    id: i64,
    name: String,
}

/// タイムカードの計算に必要なToggl APIの操作。
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TogglRepository: Send + Sync {
    /// `[start_at, end_at)`に開始したtime entryを取得する。
    async fn read_time_entries(
        &self,
        start_at: &DateTime<Utc>,
        end_at: &DateTime<Utc>,
    ) -> Result<Vec<TimeEntry>, StatError>;

    /// プロジェクトを取得する。
    async fn read_project(&self, workspace_id: i64, project_id: i64)
        -> Result<Project, StatError>;

    /// クライアントを取得する。
    async fn read_client(&self, workspace_id: i64, client_id: i64) -> Result<Client, StatError>;
}

/// Toggl APIと通信するためのクライアント。
///
/// # Examples
///
/// ```
/// let client = TogglClient::new("api token");
/// let time_entries = client.read_time_entries(&start_at, &end_at).await.unwrap();
/// ```
pub struct TogglClient {
    client: HttpClient,
    api_url: String,
    api_token: String,
}

impl TogglClient {
    /// 新しい`TogglClient`を返す。
    ///
    /// # Arguments
    ///
    /// * `api_token` - Toggl APIのトークン
    pub fn new(api_token: &str) -> Self {
        Self {
            client: HttpClient::new(),
            api_url: DEFAULT_API_URL.to_string(),
            api_token: api_token.to_string(),
        }
    }

    /// 接続先のURLを変更する。
    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }

    /// `path`をGETし、レスポンスをデシリアライズする。
    async fn get<R: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<R, StatError> {
        let url = format!("{}/{}", self.api_url, path);
        debug!("GET {}", url);

        self.client
            .get(&url)
            .basic_auth(&self.api_token, Some("api_token"))
            .header(CONTENT_TYPE, "application/json")
            .query(query)
            .send()
            .await
            .map_err(|e| StatError::unavailable(path, e))?
            .error_for_status()
            .map_err(|e| StatError::unavailable(path, e))?
            .json::<R>()
            .await
            .map_err(|e| StatError::unavailable(path, e))
    }
}

#[async_trait]
impl TogglRepository for TogglClient {
    async fn read_time_entries(
        &self,
        start_at: &DateTime<Utc>,
        end_at: &DateTime<Utc>,
    ) -> Result<Vec<TimeEntry>, StatError> {
        let toggl_time_entries: Vec<TogglTimeEntry> = self
            .get(
                "me/time_entries",
                &[
                    ("start_date", start_at.to_rfc3339()),
                    ("end_date", end_at.to_rfc3339()),
                ],
            )
            .await?;
        info!("length of time entries: {}", toggl_time_entries.len());

        let time_entries = toggl_time_entries
            .into_iter()
            .map(|entry| TimeEntry {
                id: entry.id,
                workspace_id: entry.workspace_id,
                project_id: entry.project_id,
                start: entry.start,
                duration: entry.duration,
                billable: entry.billable,
                description: entry.description.unwrap_or_default(),
            })
            .collect();

        Ok(time_entries)
    }

    async fn read_project(
        &self,
        workspace_id: i64,
        project_id: i64,
    ) -> Result<Project, StatError> {
        let project: TogglProject = self
            .get(
                &format!("workspaces/{}/projects/{}", workspace_id, project_id),
                &[],
            )
            .await?;
        info!("loaded project {}: {}", project.id, project.name);

        Ok(Project {
            id: project.id,
            workspace_id: project.workspace_id,
            client_id: project.client_id,
            name: project.name,
        })
    }

    async fn read_client(&self, workspace_id: i64, client_id: i64) -> Result<Client, StatError> {
        let client: TogglClientRecord = self
            .get(
                &format!("workspaces/{}/clients/{}", workspace_id, client_id),
                &[],
            )
            .await?;
        info!("loaded client {}: {}", client.id, client.name);

        Ok(Client {
            id: client.id,
            name: client.name,
        })
    }
}
