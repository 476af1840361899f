use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Toggl APIのデフォルトのURL。
pub const DEFAULT_API_URL: &str = "https://api.track.toggl.com/api/v9";

/// 1日の目標時間のデフォルト値。
pub const DEFAULT_HOURS_IN_DAY: f64 = 8.0;

/// 集計に利用する設定。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// 1日の目標時間(時間単位)。
    pub hours_in_day: f64,
    /// 集計から除外するクライアント名。
    pub skip_clients: Vec<String>,
    /// 元のプロジェクト名から表示名への対応。
    pub rename_projects: HashMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            hours_in_day: DEFAULT_HOURS_IN_DAY,
            skip_clients: vec![],
            rename_projects: HashMap::new(),
        }
    }
}

impl Settings {
    /// 1日の目標時間を返す。0以下が設定されている場合はデフォルト値を利用する。
    pub fn daily_hours(&self) -> f64 {
        if self.hours_in_day > 0.0 {
            self.hours_in_day
        } else {
            DEFAULT_HOURS_IN_DAY
        }
    }

    pub fn is_skipped_client(&self, client_name: &str) -> bool {
        self.skip_clients.iter().any(|name| name == client_name)
    }

    /// 表示用のプロジェクト名を返す。
    pub fn display_name<'a>(&'a self, project_name: &'a str) -> &'a str {
        self.rename_projects
            .get(project_name)
            .map(String::as_str)
            .unwrap_or(project_name)
    }
}

/// アプリケーションの設定。
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_token: Option<String>,
    pub api_url: String,
    #[serde(flatten)]
    pub settings: Settings,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url)
            .field("settings", &self.settings)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_token: None,
            api_url: DEFAULT_API_URL.to_string(),
            settings: Settings::default(),
        }
    }
}

impl Config {
    /// 設定を読み込む。
    ///
    /// 優先度の低い順に、デフォルト値、`<config_dir>/togglstat/config.toml`、
    /// 引数で指定されたファイル、`TOGGL_API_TOKEN`、`TOGGLSTAT_*`環境変数を適用する。
    ///
    /// # Arguments
    ///
    /// * `config_path` - 追加で読み込む設定ファイル
    pub fn load_from(config_path: Option<&Path>) -> Result<Self> {
        figment(default_config_path().as_deref(), config_path)
            .extract()
            .context("Failed to load configuration")
    }

    /// APIトークンを返す。設定されていない場合はエラーを返す。
    pub fn api_token(&self) -> Result<&str> {
        self.api_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .with_context(|| {
                format!(
                    "An API token must be set in {} or with TOGGL_API_TOKEN",
                    default_config_path()
                        .map(|path| path.display().to_string())
                        .unwrap_or_else(|| "the config file".to_string())
                )
            })
    }
}

/// 設定の読み込み元を優先度の低い順に重ねる。
fn figment(user_config: Option<&Path>, config_path: Option<&Path>) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    if let Some(path) = user_config {
        figment = figment.merge(Toml::file(path));
    }
    if let Some(path) = config_path {
        figment = figment.merge(Toml::file(path));
    }

    figment
        .merge(
            Env::raw()
                .only(&["TOGGL_API_TOKEN"])
                .map(|_| "api_token".into()),
        )
        .merge(Env::prefixed("TOGGLSTAT_"))
}

/// デフォルトの設定ファイルのパスを返す。
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("togglstat").join("config.toml"))
}
