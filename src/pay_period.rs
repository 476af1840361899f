use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, TimeZone};

use crate::error::StatError;

/// 給与期間の区切りとなる日。
const SECOND_HALF_START_DAY: u32 = 16;

/// 月の後半から翌月に確実に入るために加算する日数。
const ROLLOVER_DAYS: u64 = 17;

/// 夏時間の切り替えで飛ばされる時間の上限(分)。
const MAX_GAP_MINUTES: i64 = 24 * 60;

/// 給与期間の境界。`start`は含み、`end`は含まない。
#[derive(Clone, Debug, PartialEq)]
pub struct PayPeriodBounds<Tz: TimeZone> {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl<Tz: TimeZone> PayPeriodBounds<Tz> {
    /// 期間に含まれる日数を返す。
    pub fn day_count(&self) -> usize {
        let days = (self.end.date_naive() - self.start.date_naive()).num_days();
        usize::try_from(days).unwrap_or_default()
    }

    /// 期間の`index`日目の日付を返す。
    pub fn date(&self, index: usize) -> Option<NaiveDate> {
        self.start
            .date_naive()
            .checked_add_days(Days::new(u64::try_from(index).ok()?))
    }
}

/// `now`を含む給与期間を返す。
///
/// 15日までは1日から16日まで、16日以降は16日から翌月1日までとする。
/// 境界は`now`のタイムゾーンにおける00:00:00であり、期間中の夏時間の切り替えは補正しない。
pub fn resolve_pay_period<Tz: TimeZone>(now: &DateTime<Tz>) -> Result<PayPeriodBounds<Tz>, StatError> {
    let today = now.date_naive();
    let ymd = |year: i32, month: u32, day: u32| {
        NaiveDate::from_ymd_opt(year, month, day).ok_or(StatError::DateArithmetic { date: today })
    };
    let (start_date, end_date) = if today.day() < SECOND_HALF_START_DAY {
        (
            ymd(today.year(), today.month(), 1)?,
            ymd(today.year(), today.month(), SECOND_HALF_START_DAY)?,
        )
    } else {
        let rollover = today
            .checked_add_days(Days::new(ROLLOVER_DAYS))
            .ok_or(StatError::DateArithmetic { date: today })?;
        (
            ymd(today.year(), today.month(), SECOND_HALF_START_DAY)?,
            ymd(rollover.year(), rollover.month(), 1)?,
        )
    };

    let tz = now.timezone();
    Ok(PayPeriodBounds {
        start: local_midnight(&tz, start_date)?,
        end: local_midnight(&tz, end_date)?,
    })
}

/// `date`の00:00:00を`tz`で返す。
///
/// 夏時間で00:00:00が重複する場合は早い方を選ぶ。
/// 00:00:00が存在しない場合は、その日に最初に存在する時刻を返す。
pub fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Result<DateTime<Tz>, StatError> {
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or(StatError::DateArithmetic { date })?;

    (0..=MAX_GAP_MINUTES)
        .filter_map(|minutes| {
            let local = midnight.checked_add_signed(Duration::minutes(minutes))?;
            tz.from_local_datetime(&local).earliest()
        })
        .next()
        .ok_or(StatError::DateArithmetic { date })
}
