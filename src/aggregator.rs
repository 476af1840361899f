use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc, Weekday};

use crate::config::Settings;
use crate::directory::ResolvedEntry;
use crate::error::StatError;
use crate::pay_period::PayPeriodBounds;
use crate::report::DayBucket;

/// 日毎の集計結果。
#[derive(Clone, Debug, PartialEq)]
pub struct Aggregation {
    /// 給与期間の各日の作業時間。`now`以降の日は空のまま残る。
    pub days: Vec<DayBucket>,
    /// `now`までに始まった平日かどうか。`days`と同じ順に並ぶ。
    pub business_days: Vec<bool>,
}

/// 平日(月曜から金曜)かどうかを返す。
pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// time entryを日毎、プロジェクトごとに集計する。
///
/// time entryは`now`のタイムゾーンにおける開始日で振り分ける。
/// `now`の日付より後の日は集計しない。
/// クライアントが`skip_clients`に含まれるtime entryは除外し、
/// 残りは`rename_projects`で置き換えたプロジェクト名で集計する。
///
/// # Arguments
///
/// * `entries` - プロジェクトが解決されたtime entry
/// * `period` - 集計する給与期間
/// * `now` - 集計の基準となる日時
/// * `current_instant` - 計測中のtime entryを評価する時刻
/// * `settings` - 除外、名前の置き換えの設定
pub fn aggregate<Tz: TimeZone>(
    entries: &[ResolvedEntry],
    period: &PayPeriodBounds<Tz>,
    now: &DateTime<Tz>,
    current_instant: DateTime<Utc>,
    settings: &Settings,
) -> Result<Aggregation, StatError> {
    let tz = now.timezone();
    let today = now.date_naive();
    let day_count = period.day_count();
    let mut days = Vec::with_capacity(day_count);
    let mut business_days = vec![false; day_count];
    let mut reached = 0;

    for index in 0..day_count {
        let date = period.date(index).ok_or(StatError::DateArithmetic {
            date: period.start.date_naive(),
        })?;
        if date <= today {
            business_days[index] = is_business_day(date);
            reached += 1;
        }
        days.push(DayBucket::new(index, date));
    }

    for resolved in entries {
        if resolved
            .client_name
            .as_deref()
            .is_some_and(|client| settings.is_skipped_client(client))
        {
            continue;
        }

        let date = resolved.entry.start.with_timezone(&tz).date_naive();
        let Some(bucket) = days[..reached].iter_mut().find(|day| day.date == date) else {
            continue;
        };
        bucket.add(
            settings.display_name(&resolved.project_name),
            resolved.entry.elapsed(current_instant),
        );
    }

    Ok(Aggregation {
        days,
        business_days,
    })
}
