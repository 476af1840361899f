use std::collections::BTreeMap;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use serde::{Serialize, Serializer};

/// 給与期間の集計結果。
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PayPeriod {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    /// `now`までの平日の目標時間の合計。
    #[serde(serialize_with = "seconds")]
    pub target: Duration,
    #[serde(serialize_with = "seconds")]
    pub worked: Duration,
    /// `target - worked`。負の値は超過を表す。
    #[serde(serialize_with = "seconds")]
    pub remaining: Duration,
}

/// 1日分のプロジェクトごとの作業時間。
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DayBucket {
    pub index: usize,
    pub date: NaiveDate,
    #[serde(serialize_with = "seconds_map")]
    pub projects: BTreeMap<String, Duration>,
}

impl DayBucket {
    pub fn new(index: usize, date: NaiveDate) -> Self {
        Self {
            index,
            date,
            projects: BTreeMap::new(),
        }
    }

    /// `project`に作業時間を加算する。
    pub fn add(&mut self, project: &str, duration: Duration) {
        let total = self
            .projects
            .entry(project.to_string())
            .or_insert_with(Duration::zero);
        *total = *total + duration;
    }

    /// その日の全プロジェクトの合計を返す。
    pub fn total(&self) -> Duration {
        self.projects
            .values()
            .fold(Duration::zero(), |acc, duration| acc + *duration)
    }
}

/// タイムカードの計算結果。計算後に変更されることはない。
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Report {
    #[serde(serialize_with = "seconds")]
    pub today_worked: Duration,
    /// 1日の目標時間から今日の作業時間を引いたもの。負の値は超過を表す。
    #[serde(serialize_with = "seconds")]
    pub today_remaining: Duration,
    pub pay_period: PayPeriod,
    /// 給与期間の各日。時系列順に並ぶ。
    pub days: Vec<DayBucket>,
    /// `days`と同じ順に並ぶ各日の目標時間。
    #[serde(serialize_with = "seconds_vec")]
    pub expected_days: Vec<Duration>,
}

/// 作業時間を秒(小数)としてシリアライズする。
fn seconds<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(as_seconds(duration))
}

fn seconds_vec<S: Serializer>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(durations.iter().map(as_seconds))
}

fn seconds_map<S: Serializer>(
    durations: &BTreeMap<String, Duration>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(
        durations
            .iter()
            .map(|(project, duration)| (project, as_seconds(duration))),
    )
}

fn as_seconds(duration: &Duration) -> f64 {
    duration.num_milliseconds() as f64 / 1000.0
}
