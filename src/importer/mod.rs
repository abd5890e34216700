// ==========================================
// 轮胎厂生产 KPI 系统 - 加载层
// ==========================================
// 职责: 松散结构的报表文件 → 标准数据集
// 支持: Excel (.xlsx/.xlsm/.xls) / ODS / CSV / 内存表
// ==========================================

// 模块声明
pub mod cell;
pub mod coercion;
pub mod column_normalizer;
pub mod error;
pub mod file_parser;
pub mod header_detector;
pub mod production_loader;
pub mod sheet_processor;

// 重导出核心类型
pub use cell::{RawCell, RawGrid};
pub use coercion::{CoercionStrategy, DateParser, StrategyChain, ValueCoercer};
pub use column_normalizer::{slugify, ColumnNormalizer, ColumnRule, NormalizedHeader};
pub use error::{ImportError, ImportResult};
pub use file_parser::{list_source_files, SheetRead, WorkbookReader};
pub use header_detector::HeaderDetector;
pub use production_loader::{ProductionLoader, SourceTable};
pub use sheet_processor::{SheetOutcome, SheetProcessor};
