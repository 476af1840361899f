use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};

/// 計測中のtime entryを評価するための現在時刻を取得する。
#[cfg(not(test))]
pub fn now() -> DateTime<Utc> {
    Utc::now()
}


#[cfg(test)]
pub use mock_datetime::now;

/// `YYYY-MM-DD`形式の日付を、Localタイムゾーンの00:00:00としてパースする。
pub fn parse_local_date(s: &str) -> Result<DateTime<Local>> {
    let naive_date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Failed to parse date: {}", s))?;
    let naive_datetime = naive_date
        .and_hms_opt(0, 0, 0)
        .context("Failed to set hour, minute, and second")?;

    Local
        .from_local_datetime(&naive_datetime)
        .earliest()
        .with_context(|| format!("Local midnight does not exist on {}", s))
}
