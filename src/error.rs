use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

/// 外部エラーをまとめて保持するための型。
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// タイムカードの計算中に発生するエラー。
///
/// 計算はすべて成功するか、いずれかのエラーで中断するかのどちらかであり、部分的な結果は返さない。
#[derive(Debug, Error)]
pub enum StatError {
    /// 給与期間の境界となる日時を計算できなかった。
    #[error("failed to compute a local midnight for {date}")]
    DateArithmetic { date: NaiveDate },

    /// プロジェクトが設定されていないtime entryが存在した。
    #[error("time entry {entry_id} starting at {start} has no project")]
    MissingProject { entry_id: i64, start: DateTime<Utc> },

    /// Toggl APIからの取得に失敗した。
    #[error("failed to fetch {resource} from Toggl")]
    SourceUnavailable {
        resource: String,
        #[source]
        source: BoxError,
    },

    /// 取得したレコードの名前が空だった。
    #[error("{kind} {id} resolved to an empty name")]
    DataInconsistency { kind: &'static str, id: i64 },
}

impl StatError {
    /// `SourceUnavailable`を作成する。
    pub fn unavailable(resource: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::SourceUnavailable {
            resource: resource.into(),
            source: source.into(),
        }
    }
}
