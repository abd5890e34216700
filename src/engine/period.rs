// ==========================================
// 轮胎厂生产 KPI 系统 - 周期切片聚合
// ==========================================
// 职责: 以数据中最晚日期为锚点划分周期窗口，并对切片求和/求均值
// 窗口: 当日 / 前一日 / 本 ISO 周 / 上 ISO 周 / 本月 / 上月
// 红线: 锚点取数据最晚日期而非系统时间（生产数据存在滞后）
// ==========================================

use crate::domain::record::{CanonicalDataset, CanonicalRecord};
use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// PeriodWindow - 周期窗口
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodWindow {
    Today,
    Yesterday,
    ThisWeek,
    PrevWeek,
    ThisMonth,
    PrevMonth,
}

impl PeriodWindow {
    pub const ALL: [PeriodWindow; 6] = [
        PeriodWindow::Today,
        PeriodWindow::Yesterday,
        PeriodWindow::ThisWeek,
        PeriodWindow::PrevWeek,
        PeriodWindow::ThisMonth,
        PeriodWindow::PrevMonth,
    ];

    /// 闭区间 [start, end]
    pub fn bounds(&self, anchor: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            PeriodWindow::Today => (anchor, anchor),
            PeriodWindow::Yesterday => {
                let day = shift_back(anchor, 1);
                (day, day)
            }
            PeriodWindow::ThisWeek => week_bounds(anchor),
            PeriodWindow::PrevWeek => week_bounds(shift_back(anchor, 7)),
            PeriodWindow::ThisMonth => month_bounds(anchor),
            PeriodWindow::PrevMonth => {
                let (start, _) = month_bounds(anchor);
                month_bounds(shift_back(start, 1))
            }
        }
    }

    pub fn contains(&self, anchor: NaiveDate, date: NaiveDate) -> bool {
        let (start, end) = self.bounds(anchor);
        date >= start && date <= end
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodWindow::Today => "today",
            PeriodWindow::Yesterday => "yesterday",
            PeriodWindow::ThisWeek => "this_week",
            PeriodWindow::PrevWeek => "prev_week",
            PeriodWindow::ThisMonth => "this_month",
            PeriodWindow::PrevMonth => "prev_month",
        }
    }
}

impl fmt::Display for PeriodWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn shift_back(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days)).unwrap_or(date)
}

/// ISO 周（周一开始）
fn week_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = shift_back(date, date.weekday().num_days_from_monday() as u64);
    let end = start.checked_add_days(Days::new(6)).unwrap_or(start);
    (start, end)
}

fn month_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date);
    let next = if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    };
    let end = next.map(|n| shift_back(n, 1)).unwrap_or(date);
    (start, end)
}

/// 周期锚点：数据最晚日期；空数据集退回 now 的日期
pub fn anchor_date(dataset: &CanonicalDataset, now: DateTime<Utc>) -> NaiveDate {
    dataset.latest_date().unwrap_or_else(|| now.date_naive())
}

/// 取窗口切片
pub fn slice<'a>(
    dataset: &'a CanonicalDataset,
    window: PeriodWindow,
    anchor: NaiveDate,
) -> Vec<&'a CanonicalRecord> {
    let (start, end) = window.bounds(anchor);
    dataset.between(start, end)
}

// ==========================================
// PeriodTotals - 切片累加器
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PeriodTotals {
    pub rows: usize,
    pub quantity: f64,
    pub target: f64,
    pub a_grade: f64,
    pub b_grade: f64,
    pub scrap: f64,
    pub rework: f64,
    oee_sum: f64,
    oee_count: usize,
    fpy_sum: f64,
    fpy_count: usize,
}

impl PeriodTotals {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a CanonicalRecord>,
    {
        let mut totals = Self::default();
        for record in records {
            totals.add(record);
        }
        totals
    }

    pub fn add(&mut self, record: &CanonicalRecord) {
        self.rows += 1;
        self.quantity += record.quantity;
        self.target += record.target;
        self.a_grade += record.a_grade;
        self.b_grade += record.b_grade;
        self.scrap += record.scrap;
        self.rework += record.rework;
        if let Some(oee) = record.oee {
            self.oee_sum += oee;
            self.oee_count += 1;
        }
        if let Some(fpy) = record.fpy {
            self.fpy_sum += fpy;
            self.fpy_count += 1;
        }
    }

    /// OEE 均值（无值为 0）
    pub fn oee_mean(&self) -> f64 {
        mean(self.oee_sum, self.oee_count)
    }

    /// FPY 均值（无值为 0）
    pub fn fpy_mean(&self) -> f64 {
        mean(self.fpy_sum, self.fpy_count)
    }

    pub fn has_oee(&self) -> bool {
        self.oee_count > 0
    }

    pub fn has_fpy(&self) -> bool {
        self.fpy_count > 0
    }
}

fn mean(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
