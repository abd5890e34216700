// ==========================================
// 轮胎厂生产 KPI 系统 - KPI 引擎
// ==========================================
// 职责: 数据集（或切片）→ 标量 KPI + 周期 KPI + 环比变化
// 公式:
// - oee / fpy = 列均值（无值为 0，不从分项推导）
// - production = Σquantity，target = Σtarget
// - target_achievement = production / target * 100（target = 0 时为 0）
// - quality_rate = ΣA / (ΣA + ΣB) * 100（分母为 0 时为 0）
// - scrap_rate = Σscrap / production * 100（production = 0 时为 0）
// 红线: 对任意输入（含空集）都有结果，不抛错，不修改数据集
// ==========================================

use crate::config::KpiConfig;
use crate::domain::kpi::{
    KpiChange, KpiSet, KpiSnapshot, PeriodChanges, PeriodKpis, SizeProduction, TrendPoint,
};
use crate::domain::record::{CanonicalDataset, CanonicalRecord};
use crate::engine::period::{anchor_date, slice, PeriodTotals, PeriodWindow};
use crate::engine::trend::{daily_aggregates, rolling_trend};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, info};

// ==========================================
// KpiEngine
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct KpiEngine {
    config: KpiConfig,
}

impl KpiEngine {
    pub fn new(config: KpiConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &KpiConfig {
        &self.config
    }

    // ==========================================
    // 标量 KPI
    // ==========================================

    /// 对任意记录集合计算标量 KPI
    pub fn compute<'a, I>(&self, records: I) -> KpiSet
    where
        I: IntoIterator<Item = &'a CanonicalRecord>,
    {
        kpis_from_totals(&PeriodTotals::from_records(records))
    }

    /// 各周期窗口的 KPI
    pub fn period_kpis(&self, dataset: &CanonicalDataset, anchor: chrono::NaiveDate) -> PeriodKpis {
        let kpis = |window: PeriodWindow| self.compute(slice(dataset, window, anchor));
        PeriodKpis {
            today: kpis(PeriodWindow::Today),
            yesterday: kpis(PeriodWindow::Yesterday),
            this_week: kpis(PeriodWindow::ThisWeek),
            prev_week: kpis(PeriodWindow::PrevWeek),
            this_month: kpis(PeriodWindow::ThisMonth),
            prev_month: kpis(PeriodWindow::PrevMonth),
        }
    }

    // ==========================================
    // 快照
    // ==========================================

    /// 以当前时间计算快照
    pub fn snapshot(&self, dataset: &CanonicalDataset) -> KpiSnapshot {
        self.snapshot_at(dataset, Utc::now())
    }

    /// 以指定时间计算快照（now 仅在数据集为空时作为锚点后备）
    pub fn snapshot_at(&self, dataset: &CanonicalDataset, now: DateTime<Utc>) -> KpiSnapshot {
        let overall = self.compute(dataset);

        let (periods, changes) = if dataset.is_empty() {
            (None, None)
        } else {
            let anchor = anchor_date(dataset, now);
            let periods = self.period_kpis(dataset, anchor);
            let changes = PeriodChanges {
                day: change_between(&periods.today, &periods.yesterday),
                week: change_between(&periods.this_week, &periods.prev_week),
                month: change_between(&periods.this_month, &periods.prev_month),
            };
            debug!(anchor = %anchor, "周期 KPI 计算完成");
            (Some(periods), Some(changes))
        };

        let snapshot = KpiSnapshot {
            overall,
            row_count: dataset.len(),
            latest_date: dataset.latest_date(),
            computed_at: now,
            periods,
            changes,
            top_sizes: self.top_sizes(dataset),
            recommendations: self.recommendations(dataset, &overall),
            trend: self.trend(dataset),
        };

        info!(
            rows = snapshot.row_count,
            production = overall.production,
            target_achievement = overall.target_achievement,
            quality_rate = overall.quality_rate,
            scrap_rate = overall.scrap_rate,
            "KPI 快照计算完成"
        );
        snapshot
    }

    // ==========================================
    // 附加指标
    // ==========================================

    /// 按日滚动趋势（窗口与最少样本数取自配置）
    pub fn trend(&self, dataset: &CanonicalDataset) -> Vec<TrendPoint> {
        rolling_trend(
            &daily_aggregates(dataset),
            self.config.trend_window,
            self.config.trend_min_periods,
        )
    }

    /// 按规格汇总产量，降序取前 N（同产量按规格名排序）
    pub fn top_sizes(&self, dataset: &CanonicalDataset) -> Vec<SizeProduction> {
        let mut by_size: HashMap<&str, f64> = HashMap::new();
        for record in dataset {
            *by_size.entry(record.tyre_size.as_str()).or_insert(0.0) += record.quantity;
        }

        let mut sizes: Vec<SizeProduction> = by_size
            .into_iter()
            .map(|(tyre_size, production)| SizeProduction {
                tyre_size: tyre_size.to_string(),
                production,
            })
            .collect();
        sizes.sort_by(|a, b| {
            b.production
                .total_cmp(&a.production)
                .then_with(|| a.tyre_size.cmp(&b.tyre_size))
        });
        sizes.truncate(self.config.top_sizes_limit);
        sizes
    }

    /// 改进建议
    pub fn recommendations(&self, dataset: &CanonicalDataset, overall: &KpiSet) -> Vec<String> {
        if dataset.is_empty() {
            return vec!["数据不足，无法计算 KPI".to_string()];
        }

        let totals = PeriodTotals::from_records(dataset);
        let mut recs = Vec::new();

        if totals.a_grade + totals.b_grade > 0.0 && overall.quality_rate < self.config.quality_rate_alert {
            recs.push(format!(
                "A 级品率 {:.1}% 低于 {:.0}%，建议排查主要缺陷原因",
                overall.quality_rate, self.config.quality_rate_alert
            ));
        }
        if overall.target > 0.0 && overall.target_achievement < self.config.target_achievement_alert {
            recs.push(format!(
                "计划达成率 {:.1}% 低于 {:.0}%，建议核查产能瓶颈或物料供应",
                overall.target_achievement, self.config.target_achievement_alert
            ));
        }
        recs
    }
}

/// 累加结果 → 标量 KPI
pub fn kpis_from_totals(totals: &PeriodTotals) -> KpiSet {
    let production = totals.quantity;
    let target = totals.target;
    let graded = totals.a_grade + totals.b_grade;

    KpiSet {
        oee: totals.oee_mean(),
        fpy: totals.fpy_mean(),
        production,
        target,
        target_achievement: ratio_pct(production, target),
        quality_rate: ratio_pct(totals.a_grade, graded),
        scrap_rate: ratio_pct(totals.scrap, production),
    }
}

/// numerator / denominator * 100；分母 ≤ 0 时为 0，结果不小于 0
fn ratio_pct(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        (numerator / denominator * 100.0).max(0.0)
    } else {
        0.0
    }
}

/// 环比变化 (current - previous) / previous * 100；previous = 0 时为 0
pub fn pct_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        0.0
    } else {
        (current - previous) / previous * 100.0
    }
}

pub fn change_between(current: &KpiSet, previous: &KpiSet) -> KpiChange {
    KpiChange {
        oee: pct_change(current.oee, previous.oee),
        fpy: pct_change(current.fpy, previous.fpy),
        production: pct_change(current.production, previous.production),
        target: pct_change(current.target, previous.target),
        target_achievement: pct_change(current.target_achievement, previous.target_achievement),
        quality_rate: pct_change(current.quality_rate, previous.quality_rate),
        scrap_rate: pct_change(current.scrap_rate, previous.scrap_rate),
    }
}
