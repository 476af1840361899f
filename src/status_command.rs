use std::env;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use log::info;

use crate::config::Settings;
use crate::console::{ConsolePresenter, ConsoleTimecard, BITBAR_SUFFIX};
use crate::datetime::parse_local_date;
use crate::directory::ProjectDirectory;
use crate::report::Report;
use crate::timecard::Timecard;
use crate::toggl::TogglRepository;

/// タイムカードを表示するためのサブコマンド。
#[derive(Debug, Default, clap::Args)]
pub struct StatusArgs {
    #[clap(
        long = "now",
        help = "Show the timecard as of 00:00 of this date (YYYY-MM-DD) instead of the current time",
        parse(try_from_str = parse_local_date),
    )]
    now: Option<DateTime<Local>>,

    #[clap(long = "pto", help = "Show PTO above the bottom line")]
    pto: bool,
}

pub struct StatusCommand<'a, T: TogglRepository + ?Sized> {
    timecard: Timecard<'a, T>,
    hours_in_day: f64,
}

impl<'a, T: TogglRepository + ?Sized> StatusCommand<'a, T> {
    /// 新しい`StatusCommand`を返す。
    ///
    /// # Arguments
    /// * `toggl_client` - Toggl APIと通信するためのリポジトリ
    /// * `directory` - プロジェクトとクライアントのキャッシュ
    /// * `settings` - 集計の設定
    pub fn new(toggl_client: &'a T, directory: &'a ProjectDirectory, settings: &'a Settings) -> Self {
        Self {
            timecard: Timecard::new(toggl_client, directory, settings),
            hours_in_day: settings.daily_hours(),
        }
    }

    /// `status`サブコマンドの処理を行う。
    ///
    /// Localタイムゾーンで現在の給与期間のタイムカードを計算し、`writer`に出力する。
    /// 日付が指定された場合は、その日の00:00:00を基準にする。
    ///
    /// # Arguments
    ///
    /// * `status` - `status`サブコマンドの引数
    /// * `writer` - 出力先
    pub async fn run<W: Write>(&self, status: StatusArgs, writer: &mut W) -> Result<Report> {
        let now = status.now.unwrap_or_else(Local::now);
        info!("Now: {}", now);

        let report = self
            .timecard
            .report(&now)
            .await
            .context("Failed to calculate timecard")?;
        info!(
            "Pay period: {} ~ {}",
            report.pay_period.start, report.pay_period.end
        );

        let suffix = if env::var_os("BitBarDarkMode").is_some() {
            BITBAR_SUFFIX
        } else {
            ""
        };
        ConsoleTimecard::new(writer, self.hours_in_day)
            .with_pto(status.pto)
            .with_suffix(suffix)
            .show_report(&report, &now.fixed_offset())
            .context("Failed to show timecard")?;

        Ok(report)
    }
}
