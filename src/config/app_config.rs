// ==========================================
// 轮胎厂生产 KPI 系统 - 应用配置
// ==========================================
// 职责: 加载层 / KPI 引擎 / 交叉校验的全部可调参数
// 红线: 配置显式传入各组件，不使用全局可变状态
// ==========================================

use crate::domain::types::{CanonicalColumn, DedupPolicy};
use serde::{Deserialize, Serialize};

/// 默认表头关键字
pub const DEFAULT_HEADER_KEYWORDS: [&str; 18] = [
    "date",
    "tyre",
    "size",
    "qty",
    "quantity",
    "oee",
    "fpy",
    "cpk",
    "a_grade",
    "b_grade",
    "target",
    "scrap",
    "production",
    "output",
    "efficiency",
    "performance",
    "quality",
    "availability",
];

/// 默认日期格式（按优先级）
///
/// 工厂报表以日在前为主，`%d/%m/%Y` 排在 `%m/%d/%Y` 之前
pub const DEFAULT_DATE_FORMATS: [&str; 14] = [
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%m/%d/%Y",
    "%Y%m%d",
    "%d-%b-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d/%m/%y",
    "%d-%b-%y",
];

// ==========================================
// LoaderConfig - 加载层配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// 表头关键字（小写子串匹配）
    pub header_keywords: Vec<String>,

    /// 判定为表头的最低得分
    pub min_header_score: usize,

    /// 必要列
    pub essential_columns: Vec<CanonicalColumn>,

    /// 工作表至少需要命中的必要列数量
    pub min_essential_overlap: usize,

    /// 日期格式（按优先级）
    pub date_formats: Vec<String>,

    /// 参与加载的文件扩展名（小写，不含点）
    pub file_extensions: Vec<String>,

    /// (date, tyre_size) 去重策略
    pub dedup_policy: DedupPolicy,

    /// 合计行标记（tyre_size 或首个单元格以这些词整词开头的行跳过）
    pub summary_row_markers: Vec<String>,

    /// 无产量列时是否用 A+B+R 推导产量
    pub derive_quantity_from_grades: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            header_keywords: DEFAULT_HEADER_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            min_header_score: 2,
            essential_columns: vec![
                CanonicalColumn::Date,
                CanonicalColumn::TyreSize,
                CanonicalColumn::Quantity,
            ],
            min_essential_overlap: 1,
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|s| s.to_string()).collect(),
            file_extensions: ["xlsx", "xlsm", "xls", "ods", "csv"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            dedup_policy: DedupPolicy::KeepFirst,
            summary_row_markers: ["total", "grand total", "subtotal", "sum"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            derive_quantity_from_grades: true,
        }
    }
}

impl LoaderConfig {
    pub fn accepts_extension(&self, ext: &str) -> bool {
        let ext = ext.to_lowercase();
        self.file_extensions.iter().any(|e| *e == ext)
    }
}

// ==========================================
// KpiConfig - KPI 引擎配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KpiConfig {
    /// A 级品率告警线（%）
    pub quality_rate_alert: f64,

    /// 计划达成率告警线（%）
    pub target_achievement_alert: f64,

    /// 规格产量排行数量
    pub top_sizes_limit: usize,

    /// 趋势滚动窗口（天）
    pub trend_window: usize,

    /// 趋势最少样本数
    pub trend_min_periods: usize,
}

impl Default for KpiConfig {
    fn default() -> Self {
        Self {
            quality_rate_alert: 95.0,
            target_achievement_alert: 90.0,
            top_sizes_limit: 5,
            trend_window: 7,
            trend_min_periods: 3,
        }
    }
}

// ==========================================
// CrossCheckConfig - 看板照片交叉校验配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossCheckConfig {
    /// 允许的最大偏差（%）
    pub max_variance_pct: f64,
}

impl Default for CrossCheckConfig {
    fn default() -> Self {
        Self {
            max_variance_pct: 10.0,
        }
    }
}

// ==========================================
// AppConfig - 聚合配置
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub loader: LoaderConfig,
    pub kpi: KpiConfig,
    pub cross_check: CrossCheckConfig,
}

impl AppConfig {
    /// 从 JSON 解析（缺省字段取默认值）
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_loader_config() {
        let config = LoaderConfig::default();
        assert_eq!(config.min_header_score, 2);
        assert_eq!(config.min_essential_overlap, 1);
        assert_eq!(config.dedup_policy, DedupPolicy::KeepFirst);
        assert!(config.header_keywords.contains(&"tyre".to_string()));
        assert_eq!(config.date_formats[0], "%Y-%m-%d");
    }

    #[test]
    fn test_accepts_extension_case_insensitive() {
        let config = LoaderConfig::default();
        assert!(config.accepts_extension("XLSX"));
        assert!(config.accepts_extension("csv"));
        assert!(!config.accepts_extension("png"));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = AppConfig::from_json_str(
            r#"{"loader": {"min_header_score": 3, "dedup_policy": "keep_last"}, "kpi": {"top_sizes_limit": 10}}"#,
        )
        .unwrap();

        assert_eq!(config.loader.min_header_score, 3);
        assert_eq!(config.loader.dedup_policy, DedupPolicy::KeepLast);
        assert_eq!(config.loader.min_essential_overlap, 1);
        assert_eq!(config.kpi.top_sizes_limit, 10);
        assert_eq!(config.kpi.quality_rate_alert, 95.0);
        assert_eq!(config.cross_check.max_variance_pct, 10.0);
    }
}
