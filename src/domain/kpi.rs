// ==========================================
// 轮胎厂生产 KPI 系统 - KPI 快照模型
// ==========================================
// 职责: KPI 引擎的输出结构（标量 KPI + 周期 KPI + 环比变化）
// 红线: 快照一经计算不可修改；数据变化时整体重算
// ==========================================

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// KpiSet - 一组标量 KPI
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KpiSet {
    pub oee: f64,                // 设备综合效率均值（%）
    pub fpy: f64,                // 一次合格率均值（%）
    pub production: f64,         // 总产量
    pub target: f64,             // 总计划
    pub target_achievement: f64, // 计划达成率（%），无计划时为 0
    pub quality_rate: f64,       // A 级品率（%）
    pub scrap_rate: f64,         // 废品率（%）
}

// ==========================================
// KpiChange - 两个周期之间的百分比变化
// ==========================================
// 上一周期为 0 时变化记为 0
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KpiChange {
    pub oee: f64,
    pub fpy: f64,
    pub production: f64,
    pub target: f64,
    pub target_achievement: f64,
    pub quality_rate: f64,
    pub scrap_rate: f64,
}

// ==========================================
// PeriodKpis - 各周期窗口的 KPI
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodKpis {
    pub today: KpiSet,
    pub yesterday: KpiSet,
    pub this_week: KpiSet,
    pub prev_week: KpiSet,
    pub this_month: KpiSet,
    pub prev_month: KpiSet,
}

// ==========================================
// PeriodChanges - 环比变化
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodChanges {
    pub day: KpiChange,   // today vs yesterday
    pub week: KpiChange,  // this_week vs prev_week
    pub month: KpiChange, // this_month vs prev_month
}

// ==========================================
// SizeProduction - 规格产量排行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeProduction {
    pub tyre_size: String,
    pub production: f64,
}

// ==========================================
// TrendPoint - 按日滚动均值
// ==========================================
// 样本不足 min_periods 时为 None
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub quantity: Option<f64>,
    pub scrap: Option<f64>,
    pub oee: Option<f64>,
    pub fpy: Option<f64>,
}

// ==========================================
// KpiSnapshot - KPI 快照
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiSnapshot {
    #[serde(flatten)]
    pub overall: KpiSet,

    pub row_count: usize,
    pub latest_date: Option<NaiveDate>, // 周期锚点（数据中最晚日期）
    pub computed_at: DateTime<Utc>,

    // 空数据集时为 None
    pub periods: Option<PeriodKpis>,
    pub changes: Option<PeriodChanges>,

    pub top_sizes: Vec<SizeProduction>,
    pub recommendations: Vec<String>,

    #[serde(default)]
    pub trend: Vec<TrendPoint>, // 每日一点，升序
}

impl KpiSnapshot {
    /// 纯文本摘要（供报表/外部文本生成器使用）
    pub fn summary_text(&self) -> String {
        let k = &self.overall;
        let mut lines = vec![
            "关键绩效指标 (KPI)".to_string(),
            "---------------------------".to_string(),
            format!("设备综合效率 (OEE): {:.2}%", k.oee),
            format!("一次合格率 (FPY): {:.2}%", k.fpy),
            format!("总产量: {:.0}", k.production),
            format!("计划达成率: {:.2}%", k.target_achievement),
            format!("A 级品率: {:.2}%", k.quality_rate),
            format!("废品率: {:.2}%", k.scrap_rate),
        ];

        if let Some(date) = self.latest_date {
            lines.push(format!("数据截至: {}", date));
        }

        if let Some(quantity) = self.trend.last().and_then(|p| p.quantity) {
            lines.push(format!("滚动日均产量: {:.0}", quantity));
        }

        if !self.top_sizes.is_empty() {
            lines.push("产量前列规格:".to_string());
            for size in &self.top_sizes {
                lines.push(format!("  {}: {:.0}", size.tyre_size, size.production));
            }
        }

        if !self.recommendations.is_empty() {
            lines.push("建议:".to_string());
            for rec in &self.recommendations {
                lines.push(format!("- {}", rec));
            }
        }

        lines.push("---------------------------".to_string());
        lines.join("\n")
    }
}
