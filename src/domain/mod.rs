// ==========================================
// 轮胎厂生产 KPI 系统 - 领域模型层
// ==========================================
// 职责: 定义标准记录、数据集、加载报告、KPI 快照
// 红线: 不含文件读取逻辑，不含指标计算逻辑
// ==========================================

pub mod kpi;
pub mod load_report;
pub mod record;
pub mod types;

// 重导出核心类型
pub use kpi::{
    KpiChange, KpiSet, KpiSnapshot, PeriodChanges, PeriodKpis, SizeProduction, TrendPoint,
};
pub use load_report::{
    FileSummary, IssueKind, IssueLevel, LoadIssue, LoadOutcome, LoadReport, SheetLayout,
    SheetSummary,
};
pub use record::{dedup_records, CanonicalDataset, CanonicalRecord};
pub use types::{CanonicalColumn, Column, ColumnRole, DedupPolicy, SourceKind};
