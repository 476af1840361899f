use chrono::{DateTime, Duration, Utc};

/// 記録された1つの作業区間。
#[derive(Clone, Debug, PartialEq)]
pub struct TimeEntry {
    pub id: i64,
    pub workspace_id: i64,
    pub project_id: Option<i64>,
    pub start: DateTime<Utc>,
    /// 秒単位の作業時間。負の値は計測中であることを表す。
    pub duration: i64,
    pub billable: bool,
    pub description: String,
}

impl TimeEntry {
    /// 計測中かどうかを返す。
    pub fn is_running(&self) -> bool {
        self.duration < 0
    }

    /// 実際の作業時間を返す。
    ///
    /// 計測中のtime entryは`current_instant`までの経過時間とする。
    ///
    /// # Arguments
    ///
    /// * `current_instant` - 計測中のtime entryを評価する時刻
    pub fn elapsed(&self, current_instant: DateTime<Utc>) -> Duration {
        if self.is_running() {
            current_instant - self.start
        } else {
            Duration::seconds(self.duration)
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Project {
    pub id: i64,
    pub workspace_id: i64,
    pub client_id: Option<i64>,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Client {
    pub id: i64,
    pub name: String,
}
