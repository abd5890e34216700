// ==========================================
// 轮胎厂生产 KPI 系统 - 趋势（滚动均值）
// ==========================================
// 职责: 按日聚合后计算滚动均值（窗口按行数，样本不足为缺失）
// ==========================================

use crate::domain::kpi::TrendPoint;
use crate::domain::record::CanonicalDataset;
use crate::engine::period::PeriodTotals;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 单日聚合
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub quantity: f64,
    pub scrap: f64,
    pub oee: Option<f64>, // 当日均值
    pub fpy: Option<f64>,
}

/// 按日期聚合（升序）
pub fn daily_aggregates(dataset: &CanonicalDataset) -> Vec<DailyPoint> {
    let mut by_date: BTreeMap<NaiveDate, PeriodTotals> = BTreeMap::new();
    for record in dataset {
        by_date.entry(record.date).or_default().add(record);
    }

    by_date
        .into_iter()
        .map(|(date, totals)| DailyPoint {
            date,
            quantity: totals.quantity,
            scrap: totals.scrap,
            oee: totals.has_oee().then(|| totals.oee_mean()),
            fpy: totals.has_fpy().then(|| totals.fpy_mean()),
        })
        .collect()
}

/// 滚动均值
pub fn rolling_trend(daily: &[DailyPoint], window: usize, min_periods: usize) -> Vec<TrendPoint> {
    let window = window.max(1);
    let min_periods = min_periods.max(1);

    (0..daily.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let frame = &daily[start..=i];
            TrendPoint {
                date: daily[i].date,
                quantity: rolling_mean(frame.iter().map(|p| Some(p.quantity)), min_periods),
                scrap: rolling_mean(frame.iter().map(|p| Some(p.scrap)), min_periods),
                oee: rolling_mean(frame.iter().map(|p| p.oee), min_periods),
                fpy: rolling_mean(frame.iter().map(|p| p.fpy), min_periods),
            }
        })
        .collect()
}

fn rolling_mean(values: impl Iterator<Item = Option<f64>>, min_periods: usize) -> Option<f64> {
    let (sum, count) = values
        .flatten()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count >= min_periods).then(|| sum / count as f64)
}
