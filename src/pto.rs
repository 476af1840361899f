use chrono::Duration;

use crate::report::DayBucket;

/// 15分をミリ秒で表したもの。
const QUARTER_HOUR_MILLIS: i64 = 15 * 60 * 1000;

const HOUR_MILLIS: f64 = 3_600_000.0;

/// 日毎の有給休暇(PTO)の割り当て結果。
#[derive(Clone, Debug, PartialEq)]
pub struct PtoReconciliation {
    /// 各日のPTO(時間単位)。負になることはない。
    pub per_day: Vec<f64>,
    /// 割り当て後に残った超過時間(時間単位)。
    pub overage: f64,
}

impl PtoReconciliation {
    /// 給与期間のPTOの合計を返す。
    ///
    /// 残った超過時間を差し引くため、負の値になることがある。
    pub fn total(&self) -> f64 {
        self.per_day.iter().sum::<f64>() - self.overage
    }
}

/// 作業時間を15分単位に丸め、時間単位で返す。
///
/// ちょうど中間の場合は0から遠い方に丸める。
pub fn round_to_quarter_hour(duration: Duration) -> f64 {
    let millis = duration.num_milliseconds();
    let quarters = (millis.abs() + QUARTER_HOUR_MILLIS / 2) / QUARTER_HOUR_MILLIS;
    (quarters * QUARTER_HOUR_MILLIS * millis.signum()) as f64 / HOUR_MILLIS
}

/// 各日の作業時間を、プロジェクトごとに15分単位に丸めてから合計する。
pub fn rounded_day_totals(days: &[DayBucket]) -> Vec<f64> {
    days.iter()
        .map(|day| {
            day.projects
                .values()
                .map(|duration| round_to_quarter_hour(*duration))
                .sum::<f64>()
        })
        .collect()
}

/// 各日のPTOを計算する。
///
/// 期間の先頭から1回だけ走査し、超過時間を持ち越しながら次のように割り当てる。
///
/// - 平日で目標時間に満たない日は、不足分をPTOとする。
///   持ち越した超過時間が不足分より大きければ、PTOは0として超過時間から差し引く。
/// - 目標時間を超えた日は、超過分を持ち越しに加え、期間の先頭から順にPTOが残っている日を探して差し引く。
///
/// # Arguments
///
/// * `day_totals` - 15分単位に丸めた各日の作業時間(時間単位)
/// * `expected_days` - 各日の目標時間。0の日は平日として扱わない
/// * `hours_in_day` - 1日の目標時間
pub fn reconcile_pto(
    day_totals: &[f64],
    expected_days: &[Duration],
    hours_in_day: f64,
) -> PtoReconciliation {
    let mut per_day = vec![0.0; day_totals.len()];
    let mut overage = 0.0;

    for (index, worked) in day_totals.iter().copied().enumerate() {
        let expected = expected_days
            .get(index)
            .is_some_and(|target| *target > Duration::zero());

        if worked < hours_in_day && expected {
            per_day[index] = hours_in_day - worked;
            if overage > per_day[index] {
                overage -= per_day[index];
                per_day[index] = 0.0;
            }
        } else if worked > hours_in_day {
            overage += worked - hours_in_day;
            for pto in per_day.iter_mut().filter(|pto| **pto > 0.0) {
                if *pto > overage {
                    *pto -= overage;
                    overage = 0.0;
                    break;
                }
                overage -= *pto;
                *pto = 0.0;
            }
        }
    }

    PtoReconciliation { per_day, overage }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};
    use rstest::rstest;

    use super::{reconcile_pto, round_to_quarter_hour, rounded_day_totals, PtoReconciliation};
    use crate::report::DayBucket;

    fn expected(business_days: &[bool]) -> Vec<Duration> {
        business_days
            .iter()
            .map(|day| {
                if *day {
                    Duration::hours(8)
                } else {
                    Duration::zero()
                }
            })
            .collect()
    }

    fn assert_invariants(result: &PtoReconciliation) {
        assert!(result.per_day.iter().all(|pto| *pto >= 0.0));
        assert_eq!(
            result.per_day.iter().sum::<f64>() - result.overage,
            result.total()
        );
    }

    #[rstest]
    #[case::zero(Duration::zero(), 0.0)]
    #[case::below_half(Duration::minutes(7), 0.0)]
    #[case::half_rounds_up(Duration::seconds(450), 0.25)]
    #[case::ninety_minutes(Duration::minutes(90), 1.5)]
    #[case::just_below(Duration::minutes(8 * 60 - 5), 8.0)]
    #[case::negative(Duration::minutes(-38), -0.75)]
    fn test_round_to_quarter_hour(#[case] duration: Duration, #[case] expected: f64) {
        assert_eq!(round_to_quarter_hour(duration), expected);
    }

    #[test]
    fn test_rounded_day_totals_round_each_project() {
        let mut day = DayBucket::new(0, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        // 合計してから丸めると15分になるが、プロジェクトごとに丸めるため0になる
        day.add("Website", Duration::minutes(7));
        day.add("Support", Duration::minutes(7));
        let empty = DayBucket::new(1, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());

        assert_eq!(rounded_day_totals(&[day, empty]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_single_short_day() {
        let result = reconcile_pto(&[4.0], &expected(&[true]), 8.0);

        assert_eq!(result.per_day, vec![4.0]);
        assert_eq!(result.overage, 0.0);
        assert_eq!(result.total(), 4.0);
        assert_invariants(&result);
    }

    #[test]
    fn test_weekend_never_gets_pto() {
        let result = reconcile_pto(&[0.0, 0.0, 8.0], &expected(&[false, false, true]), 8.0);

        assert_eq!(result.per_day, vec![0.0, 0.0, 0.0]);
        assert_eq!(result.total(), 0.0);
    }

    #[test]
    fn test_overage_before_short_day_is_carried() {
        let result = reconcile_pto(&[10.0, 4.0], &expected(&[true, true]), 8.0);

        // 2時間の超過は4時間の不足を打ち消すほど大きくないため、持ち越されて合計から引かれる
        assert_eq!(result.per_day, vec![0.0, 4.0]);
        assert_eq!(result.overage, 2.0);
        assert_eq!(result.total(), 2.0);
        assert_invariants(&result);
    }

    #[test]
    fn test_overage_consumes_whole_short_day() {
        let result = reconcile_pto(&[12.0, 6.0], &expected(&[true, true]), 8.0);

        assert_eq!(result.per_day, vec![0.0, 0.0]);
        assert_eq!(result.overage, 2.0);
        assert_eq!(result.total(), -2.0);
        assert_invariants(&result);
    }

    /// 吸収し切った超過時間は0に戻す。
    /// 超過時間を残したままにすると、`total()`で同じ超過を二重に差し引くことになる。
    #[test]
    fn test_overage_claws_back_earliest_pto_first() {
        let result = reconcile_pto(
            &[4.0, 4.0, 13.0],
            &expected(&[true, true, true]),
            8.0,
        );

        assert_eq!(result.per_day, vec![0.0, 3.0, 0.0]);
        assert_eq!(result.overage, 0.0);
        assert_eq!(result.total(), 3.0);
        assert_invariants(&result);
    }

    #[test]
    fn test_absorbed_overage_is_not_subtracted_again() {
        let result = reconcile_pto(&[4.0, 10.0], &expected(&[true, true]), 8.0);

        assert_eq!(result.per_day, vec![2.0, 0.0]);
        assert_eq!(result.overage, 0.0);
        assert_eq!(result.total(), 2.0);
        assert_invariants(&result);
    }

    #[test]
    fn test_scan_starts_at_period_start() {
        // 超過した日に近い3日目ではなく、先頭の1日目から差し引く
        let result = reconcile_pto(
            &[6.0, 8.0, 6.0, 9.0],
            &expected(&[true, true, true, true]),
            8.0,
        );

        assert_eq!(result.per_day, vec![1.0, 0.0, 2.0, 0.0]);
        assert_eq!(result.total(), 3.0);
        assert_invariants(&result);
    }

    #[test]
    fn test_overage_larger_than_all_pto() {
        let result = reconcile_pto(&[7.0, 12.0], &expected(&[true, true]), 8.0);

        assert_eq!(result.per_day, vec![0.0, 0.0]);
        assert_eq!(result.overage, 3.0);
        assert_eq!(result.total(), -3.0);
        assert_invariants(&result);
    }

    #[test]
    fn test_no_days() {
        let result = reconcile_pto(&[], &[], 8.0);

        assert!(result.per_day.is_empty());
        assert_eq!(result.total(), 0.0);
    }
}
