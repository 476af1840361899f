use std::collections::BTreeSet;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Duration, FixedOffset, Weekday};
use owo_colors::OwoColorize;

use crate::pto::{reconcile_pto, round_to_quarter_hour, rounded_day_totals, PtoReconciliation};
use crate::report::Report;

/// BitBarのダークモードで表を揃えるために各行の末尾に付ける文字列。
pub const BITBAR_SUFFIX: &str = " | font=Menlo trim=false";

/// 日付の列の幅。`Jan 02`の長さ。
const DAY_COLUMN_WIDTH: usize = 6;

/// プロジェクト名の列の最小幅。
const MIN_NAME_WIDTH: usize = 5;

/// 作業時間を`HH:MM`形式にする。分は四捨五入する。
pub fn format_duration(duration: Duration) -> String {
    let minutes = (duration.num_milliseconds() as f64 / 60_000.0).round() as i64;
    let sign = if minutes < 0 { "-" } else { "" };
    let minutes = minutes.abs();
    format!("{}{:02}:{:02}", sign, minutes / 60, minutes % 60)
}

/// 残り時間から見た終了の見込み。
#[derive(Clone, Debug, PartialEq)]
pub enum Outlook {
    /// 終了予定時刻(`HH:MM`)。
    Eta(String),
    /// 超過時間(`+HH:MM`)。
    Overage(String),
}

impl Outlook {
    /// `remaining`が残っていれば`now`からの終了予定時刻を、超過していれば超過時間を返す。
    pub fn new(now: &DateTime<FixedOffset>, remaining: Duration) -> Self {
        if remaining > Duration::zero() {
            Self::Eta((*now + remaining).format("%H:%M").to_string())
        } else {
            Self::Overage(format!("+{}", format_duration(-remaining)))
        }
    }
}

/// Consoleにタイムカードを表示するためのtrait。
pub trait ConsolePresenter {
    /// タイムカードを表示する。
    ///
    /// # Arguments
    ///
    /// * `report` - 表示するタイムカード
    /// * `now` - 終了予定時刻の基準となる日時
    fn show_report(&mut self, report: &Report, now: &DateTime<FixedOffset>) -> Result<()>;
}

/// タイムカードをステータスバー向けのテキストで表示する。
///
/// 1行目に今日と給与期間の終了予定時刻を、`---`以降に詳細とプロジェクトごとの表を出力する。
pub struct ConsoleTimecard<'a, W: Write> {
    writer: &'a mut W,
    hours_in_day: f64,
    show_pto: bool,
    suffix: String,
}

impl<'a, W: Write> ConsoleTimecard<'a, W> {
    /// 新しい`ConsoleTimecard`を返す。
    pub fn new(writer: &'a mut W, hours_in_day: f64) -> Self {
        Self {
            writer,
            hours_in_day,
            show_pto: false,
            suffix: String::new(),
        }
    }

    /// PTOの行を表示するかどうかを設定する。
    pub fn with_pto(mut self, show_pto: bool) -> Self {
        self.show_pto = show_pto;
        self
    }

    /// 表の各行の末尾に付ける文字列を設定する。
    pub fn with_suffix(mut self, suffix: &str) -> Self {
        self.suffix = suffix.to_string();
        self
    }

    fn show_summary(&mut self, report: &Report, now: &DateTime<FixedOffset>) -> Result<()> {
        let day = match Outlook::new(now, report.today_remaining) {
            Outlook::Eta(eta) => eta.red().bold().to_string(),
            Outlook::Overage(overage) => overage,
        };
        let period = match Outlook::new(now, report.pay_period.remaining) {
            Outlook::Eta(eta) => format!("-{}", eta.red().bold()),
            Outlook::Overage(overage) => overage,
        };
        writeln!(self.writer, "{}{}", day, period)?;
        writeln!(self.writer, "---")?;

        writeln!(self.writer, "Day Duration: {}", format_duration(report.today_worked))?;
        writeln!(self.writer, "Day Remaining: {}", format_duration(report.today_remaining))?;
        match Outlook::new(now, report.today_remaining) {
            Outlook::Eta(eta) => writeln!(self.writer, "Day ETA: {}", eta)?,
            Outlook::Overage(overage) => writeln!(self.writer, "Day Overage: {}", overage)?,
        }

        let pay_period = &report.pay_period;
        writeln!(self.writer, "Payperiod Target: {}", format_duration(pay_period.target))?;
        writeln!(self.writer, "Payperiod Duration: {}", format_duration(pay_period.worked))?;
        writeln!(self.writer, "Payperiod Remaining: {}", format_duration(pay_period.remaining))?;
        match Outlook::new(now, pay_period.remaining) {
            Outlook::Eta(eta) => writeln!(self.writer, "Payperiod ETA: {}", eta)?,
            Outlook::Overage(overage) => writeln!(self.writer, "Payperiod Overage: {}", overage)?,
        }

        Ok(())
    }

    fn show_table(&mut self, report: &Report) -> Result<()> {
        let projects: BTreeSet<&str> = report
            .days
            .iter()
            .flat_map(|day| day.projects.keys().map(String::as_str))
            .collect();
        let name_width = projects
            .iter()
            .map(|project| project.chars().count())
            .max()
            .unwrap_or_default()
            .max(MIN_NAME_WIDTH);

        write!(self.writer, "{:<width$}", "", width = name_width)?;
        for day in &report.days {
            let label = day.date.format("%b %d").to_string();
            if matches!(day.date.weekday(), Weekday::Sat | Weekday::Sun) {
                write!(self.writer, " {}", label.italic())?;
            } else {
                write!(self.writer, " {}", label)?;
            }
        }
        writeln!(self.writer, " Total{}", self.suffix)?;

        for project in &projects {
            write!(self.writer, "{:<width$}", project, width = name_width)?;
            let mut project_total = 0.0;
            for day in &report.days {
                let hours = day
                    .projects
                    .get(*project)
                    .map(|duration| round_to_quarter_hour(*duration))
                    .unwrap_or_default();
                self.write_cell(hours, None)?;
                project_total += hours;
            }
            writeln!(self.writer, " {:>5.2}{}", project_total, self.suffix)?;
        }

        let day_totals = rounded_day_totals(&report.days);
        let pto = if self.show_pto {
            let pto = reconcile_pto(&day_totals, &report.expected_days, self.hours_in_day);
            self.show_pto_row(&pto, name_width)?;
            pto.per_day
        } else {
            vec![0.0; day_totals.len()]
        };

        write!(self.writer, "{:<width$}", "Total", width = name_width)?;
        let mut period_total = 0.0;
        for (worked, pto) in day_totals.iter().zip(&pto) {
            let day_total = worked + pto;
            period_total += day_total;
            self.write_cell(day_total, Some(self.hours_in_day))?;
        }
        writeln!(
            self.writer,
            "{}{}",
            format!(" {:>5.2}", period_total).bold(),
            self.suffix
        )?;

        Ok(())
    }

    fn show_pto_row(&mut self, pto: &PtoReconciliation, name_width: usize) -> Result<()> {
        write!(self.writer, "{:<width$}", "PTO", width = name_width)?;
        // 1日の目標時間ちょうどのPTOも強調する
        let low = self.hours_in_day + 0.01;
        for hours in &pto.per_day {
            self.write_cell(*hours, Some(low))?;
        }
        writeln!(self.writer, " {:>5.2}{}", pto.total(), self.suffix)?;
        Ok(())
    }

    /// 表の1マスを出力する。0以下の場合は空欄とし、`low`未満の場合は強調する。
    fn write_cell(&mut self, hours: f64, low: Option<f64>) -> Result<()> {
        if hours <= 0.0 {
            write!(self.writer, " {:>width$}", "", width = DAY_COLUMN_WIDTH)?;
            return Ok(());
        }
        let cell = format!(" {:>width$.2}", hours, width = DAY_COLUMN_WIDTH);
        match low {
            Some(low) if hours < low => write!(self.writer, "{}", cell.red().bold())?,
            _ => write!(self.writer, "{}", cell)?,
        }
        Ok(())
    }
}

impl<'a, W: Write> ConsolePresenter for ConsoleTimecard<'a, W> {
    fn show_report(&mut self, report: &Report, now: &DateTime<FixedOffset>) -> Result<()> {
        self.show_summary(report, now)
            .context("Failed to write timecard summary")?;
        self.show_table(report)
            .context("Failed to write timecard table")?;
        Ok(())
    }
}
