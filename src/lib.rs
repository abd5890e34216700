// ==========================================
// 轮胎厂生产 KPI 系统 - 核心库
// ==========================================
// 技术栈: Rust + calamine/csv + SQLite
// 系统定位: 松散报表 → 标准数据集 → KPI 快照
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 记录、数据集、报告、快照
pub mod domain;

// 加载层 - 报表文件
pub mod importer;

// 引擎层 - KPI / 质量检查 / 交叉校验
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 数据仓储层 - KPI 快照历史
pub mod repository;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{CanonicalColumn, DedupPolicy, SourceKind};

// 领域实体
pub use domain::{
    CanonicalDataset, CanonicalRecord, KpiSet, KpiSnapshot, LoadIssue, LoadOutcome, LoadReport,
};

// 加载与引擎
pub use engine::{CrossValidator, KpiEngine, QualityChecker, QualityFinding};
pub use importer::{ColumnNormalizer, HeaderDetector, ImportError, ProductionLoader};

// 配置
pub use config::{AppConfig, ConfigManager};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "轮胎厂生产 KPI 系统";
