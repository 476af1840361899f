use chrono::{DateTime, Duration, TimeZone};

use crate::aggregator::Aggregation;
use crate::pay_period::PayPeriodBounds;
use crate::report::{PayPeriod, Report};

/// 時間単位の値を`Duration`に変換する。小数の時間もミリ秒の精度で扱う。
pub fn hours(hours: f64) -> Duration {
    Duration::milliseconds((hours * 3_600_000.0).round() as i64)
}

/// 日毎の集計結果から今日と給与期間の作業時間、目標時間、残り時間を計算する。
///
/// 丸めは行わない。
pub fn calculate<Tz: TimeZone>(
    aggregation: Aggregation,
    period: &PayPeriodBounds<Tz>,
    now: &DateTime<Tz>,
    hours_in_day: f64,
) -> Report {
    let daily_target = hours(hours_in_day);
    let expected_days: Vec<Duration> = aggregation
        .business_days
        .iter()
        .map(|business_day| {
            if *business_day {
                daily_target
            } else {
                Duration::zero()
            }
        })
        .collect();
    let target: Duration = expected_days.iter().sum();

    let today = now.date_naive();
    let today_worked: Duration = aggregation
        .days
        .iter()
        .filter(|day| day.date == today)
        .map(|day| day.total())
        .sum();
    let worked: Duration = aggregation.days.iter().map(|day| day.total()).sum();

    Report {
        today_worked,
        today_remaining: daily_target - today_worked,
        pay_period: PayPeriod {
            start: period.start.fixed_offset(),
            end: period.end.fixed_offset(),
            target,
            worked,
            remaining: target - worked,
        },
        days: aggregation.days,
        expected_days,
    }
}
