// ==========================================
// 轮胎厂生产 KPI 系统 - 引擎层
// ==========================================
// 职责: 标准数据集 → 周期切片 / KPI / 趋势 / 质量发现 / 看板交叉校验
// 红线: Engine 不读文件、不拼 SQL，不修改数据集
// ==========================================

pub mod board_reading;
pub mod collaborators;
pub mod cross_validation;
pub mod kpi_engine;
pub mod period;
pub mod quality_checker;
pub mod trend;

// 重导出核心引擎
pub use board_reading::{date_from_file_name, parse_board_text, BoardReading};
pub use collaborators::{
    collect_readings, list_board_images, BoardReader, CollaboratorError, NarrativeGenerator,
    PlainNarrative, SidecarTextReader, BOARD_IMAGE_EXTENSIONS,
};
pub use cross_validation::{CrossCheckResult, CrossCheckStatus, CrossValidator};
pub use kpi_engine::{change_between, kpis_from_totals, pct_change, KpiEngine};
pub use period::{anchor_date, slice, PeriodTotals, PeriodWindow};
pub use quality_checker::{FindingKind, QualityChecker, QualityFinding};
pub use trend::{daily_aggregates, rolling_trend, DailyPoint};
