use chrono::{DateTime, TimeZone};
use log::debug;

use crate::aggregator::aggregate;
use crate::calculator::calculate;
use crate::config::Settings;
use crate::datetime;
use crate::directory::ProjectDirectory;
use crate::error::StatError;
use crate::pay_period::resolve_pay_period;
use crate::report::Report;
use crate::toggl::TogglRepository;

/// 1回分のタイムカードの計算を行う。
pub struct Timecard<'a, T: TogglRepository + ?Sized> {
    toggl_client: &'a T,
    directory: &'a ProjectDirectory,
    settings: &'a Settings,
}

impl<'a, T: TogglRepository + ?Sized> Timecard<'a, T> {
    /// 新しい`Timecard`を返す。
    ///
    /// # Arguments
    ///
    /// * `toggl_client` - Toggl APIと通信するためのリポジトリ
    /// * `directory` - プロジェクトとクライアントのキャッシュ
    /// * `settings` - 集計の設定
    pub fn new(toggl_client: &'a T, directory: &'a ProjectDirectory, settings: &'a Settings) -> Self {
        Self {
            toggl_client,
            directory,
            settings,
        }
    }

    /// `now`時点のタイムカードを計算する。
    ///
    /// 給与期間のtime entryを取得し、日毎に集計する。
    /// いずれかの処理に失敗した場合は計算全体をエラーとする。
    pub async fn report<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<Report, StatError> {
        let period = resolve_pay_period(now)?;
        let entries = self
            .toggl_client
            .read_time_entries(&period.start.to_utc(), &period.end.to_utc())
            .await?;
        for entry in &entries {
            debug!(
                "Entry {}: {} ({}s, billable: {}) {}",
                entry.id, entry.start, entry.duration, entry.billable, entry.description
            );
        }
        let resolved = self
            .directory
            .resolve_all(self.toggl_client, &entries)
            .await?;
        let aggregation = aggregate(&resolved, &period, now, datetime::now(), self.settings)?;

        Ok(calculate(
            aggregation,
            &period,
            now,
            self.settings.daily_hours(),
        ))
    }
}
